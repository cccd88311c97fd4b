// This file is part of pol_spec_scan.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::cell::RefCell;
use std::time::Duration;

use crate::utility::Sleeper;

/// Sleeper that records the requested durations and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    pub durations: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Create a new recording sleeper.
    ///
    /// # Returns
    /// A new recording sleeper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations requested so far in second.
    pub fn seconds(&self) -> Vec<f64> {
        self.durations
            .borrow()
            .iter()
            .map(|duration| duration.as_secs_f64())
            .collect()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.durations.borrow_mut().push(duration);
    }
}
