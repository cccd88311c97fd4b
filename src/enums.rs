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

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, FromRepr, VariantNames};

/// Lifecycle state of a rotation stage wrapped by the health monitor.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, VariantNames)]
#[repr(u8)]
pub enum DeviceState {
    Disconnected = 1,
    Connecting = 2,
    HomingOrHandshake = 3,
    ConnectivityCheck = 4,
    Ready = 5,
    Faulted = 6,
}

impl DeviceState {
    /// Terminal state or not.
    ///
    /// # Returns
    /// True if no further transition is allowed. Otherwise, false.
    pub fn is_terminal(&self) -> bool {
        *self == DeviceState::Faulted
    }
}

/// State of the acquisition run.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr, VariantNames)]
#[repr(u8)]
pub enum RunState {
    Idle = 1,
    BackgroundCapture = 2,
    Stepping = 3,
    Finalizing = 4,
    Saved = 5,
    Aborted = 6,
}

impl RunState {
    /// Terminal state or not.
    ///
    /// # Returns
    /// True if the run is saved or aborted. Otherwise, false.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Saved | RunState::Aborted)
    }
}

/// Role of the rotation stage in the optical setup. The primary stage is the
/// front polarizer and defines the plan. The secondary stage is the back
/// polarizer and follows the primary with an offset.
#[derive(
    FromRepr,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    AsRefStr,
    EnumIter,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum AxisRole {
    Primary = 1,
    Secondary = 2,
}

impl AxisRole {
    /// Key of the axis in the configuration file.
    ///
    /// # Returns
    /// Lowercase name of the axis.
    pub fn config_key(&self) -> String {
        self.as_ref().to_lowercase()
    }
}

impl std::fmt::Display for AxisRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.config_key())
    }
}
