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

//! Capability interface of a single-axis rotation stage. The wire protocol of
//! each controller family lives in the driver that implements these traits.
//! All the positions, velocities and accelerations are in native units.

use crate::device::device_info::DeviceInfo;
use crate::device::fault::FaultSender;
use crate::error::DeviceError;

/// Open connection to one rotation stage.
pub trait ActuatorHandle {
    /// Home the stage.
    fn home(&mut self) -> Result<(), DeviceError>;

    /// Set the acceleration and maximum velocity.
    ///
    /// # Arguments
    /// * `acceleration` - Acceleration in native units.
    /// * `max_velocity` - Maximum velocity in native units.
    fn set_velocity_params(&mut self, acceleration: i32, max_velocity: i32)
        -> Result<(), DeviceError>;

    /// Start a move to the absolute position. It does not wait for the
    /// arrival.
    ///
    /// # Arguments
    /// * `native_position` - Position in counts.
    fn move_absolute(&mut self, native_position: i32) -> Result<(), DeviceError>;

    /// Read the current position in counts.
    fn current_native_position(&mut self) -> Result<i32, DeviceError>;

    /// Connection health reported by the controller.
    fn is_healthy(&mut self) -> bool;

    /// Register the channel to report asynchronous faults.
    ///
    /// # Notes
    /// The channel is bounded. The driver must report with
    /// `SyncSender::try_send` and drop the fault when the channel is full, so
    /// its I/O thread never blocks between two polls of the monitor.
    fn register_fault_callback(&mut self, sender: FaultSender);

    /// Release the connection.
    fn close(&mut self);
}

/// Factory of the actuator connections.
pub trait ActuatorConnector {
    /// Open the connection.
    ///
    /// # Arguments
    /// * `identifier` - Port path or serial number.
    ///
    /// # Returns
    /// The connection handle.
    fn connect(&mut self, identifier: &str) -> Result<Box<dyn ActuatorHandle>, DeviceError>;

    /// List the controllers visible to this connector.
    ///
    /// # Returns
    /// Visible controllers. The identifier of each can be passed to
    /// `connect()`.
    fn list_devices(&mut self) -> Result<Vec<DeviceInfo>, DeviceError>;
}
