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

use serde_json::{json, Value};
use std::path::Path;

use crate::device::fault::FaultEvent;
use crate::enums::{AxisRole, RunState};
use crate::error::ScanError;

pub struct Event;
impl Event {
    /// Get the message of the run state.
    ///
    /// # Arguments
    /// * `state` - Run state.
    ///
    /// # Returns
    /// The message of the run state.
    pub fn get_message_run_state(state: RunState) -> Value {
        json!({
            "id": "runState",
            "state": state.as_ref(),
        })
    }

    /// Get the message that the axes reached the plan position.
    ///
    /// # Arguments
    /// * `index` - 0-based index in the plan.
    /// * `positions` - Position of each axis in degree. The first one is the
    /// primary axis.
    ///
    /// # Returns
    /// The message that the axes reached the plan position.
    pub fn get_message_position_reached(index: usize, positions: &[f64]) -> Value {
        json!({
            "id": "positionReached",
            "index": index,
            "positions": positions,
        })
    }

    /// Get the message of the captured background.
    ///
    /// # Arguments
    /// * `num_pixel` - Number of the pixels.
    ///
    /// # Returns
    /// The message of the captured background.
    pub fn get_message_background_captured(num_pixel: usize) -> Value {
        json!({
            "id": "backgroundCaptured",
            "numPixel": num_pixel,
        })
    }

    /// Get the message of the captured sample.
    ///
    /// # Arguments
    /// * `index` - 0-based index in the plan.
    /// * `max_intensity` - Maximum intensity in counts.
    ///
    /// # Returns
    /// The message of the captured sample.
    pub fn get_message_sample_captured(index: usize, max_intensity: f64) -> Value {
        json!({
            "id": "sampleCaptured",
            "index": index,
            "maxIntensity": max_intensity,
        })
    }

    /// Get the message of the device fault.
    ///
    /// # Arguments
    /// * `axis` - Role of the rotation stage.
    /// * `fault` - Fault reported by the driver.
    ///
    /// # Returns
    /// The message of the device fault.
    pub fn get_message_fault(axis: AxisRole, fault: &FaultEvent) -> Value {
        json!({
            "id": "deviceFault",
            "axis": axis.config_key(),
            "code": fault.code,
            "message": fault.message,
        })
    }

    /// Get the message that the run is aborted.
    ///
    /// # Arguments
    /// * `error` - Reason of the abort.
    ///
    /// # Returns
    /// The message that the run is aborted.
    pub fn get_message_run_aborted(error: &ScanError) -> Value {
        json!({
            "id": "runAborted",
            "reason": error.to_string(),
        })
    }

    /// Get the message that the run is saved.
    ///
    /// # Arguments
    /// * `path` - Path of the result file.
    ///
    /// # Returns
    /// The message that the run is saved.
    pub fn get_message_run_saved(path: &Path) -> Value {
        json!({
            "id": "runSaved",
            "path": path.display().to_string(),
        })
    }
}
