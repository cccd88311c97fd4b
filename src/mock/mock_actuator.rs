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
use std::collections::HashMap;
use std::rc::Rc;

use crate::device::actuator::{ActuatorConnector, ActuatorHandle};
use crate::device::device_info::DeviceInfo;
use crate::device::fault::{FaultEvent, FaultSender};
use crate::error::DeviceError;
use crate::mock::mock_constants::{MOCK_ACTUATOR_DESCRIPTION, MOCK_MANUFACTURER};

/// State of the mock rotation stage. It is shared between the handle and the
/// test so the test can inject the failures and inspect the commands.
///
/// The move counts below are 1-based counts of the moves issued to the
/// handle, including the moves of the recovery maneuver.
#[derive(Default)]
pub struct MockActuatorState {
    // Commanded position in counts.
    pub position: i32,
    // All the commanded positions in counts.
    pub moves: Vec<i32>,
    pub home_count: usize,
    pub close_count: usize,
    // Acceleration and maximum velocity in native units.
    pub velocity_params: Option<(i32, i32)>,
    // Connection health reported by the controller.
    pub is_healthy: bool,
    // The connection becomes healthy after the next move.
    pub recover_on_move: bool,
    // The connection becomes unhealthy after this move.
    pub disconnect_at_move: Option<usize>,
    // Offset in counts added to the reported position from this move.
    pub drift_counts: i32,
    pub drift_at_move: Option<usize>,
    // Fault reported through the registered channel at this move.
    pub fault_at_move: Option<(usize, FaultEvent)>,
    pub fault_sender: Option<FaultSender>,
    // Reject all the move commands.
    pub fail_move: bool,
}

impl MockActuatorState {
    /// Healthy rotation stage at the home position.
    ///
    /// # Returns
    /// A new state.
    pub fn new() -> Self {
        Self {
            is_healthy: true,
            ..Default::default()
        }
    }

    /// Position reported by the controller in counts.
    pub fn reported_position(&self) -> i32 {
        if self
            .drift_at_move
            .is_some_and(|num_move| self.moves.len() >= num_move)
        {
            self.position + self.drift_counts
        } else {
            self.position
        }
    }
}

/// Mock rotation stage. A move arrives immediately.
pub struct MockActuator {
    _state: Rc<RefCell<MockActuatorState>>,
}

impl MockActuator {
    /// Create a mock rotation stage.
    ///
    /// # Arguments
    /// * `state` - Shared state.
    ///
    /// # Returns
    /// A new mock rotation stage.
    pub fn new(state: Rc<RefCell<MockActuatorState>>) -> Self {
        Self { _state: state }
    }
}

impl ActuatorHandle for MockActuator {
    fn home(&mut self) -> Result<(), DeviceError> {
        let mut state = self._state.borrow_mut();
        state.home_count += 1;
        state.position = 0;

        Ok(())
    }

    fn set_velocity_params(
        &mut self,
        acceleration: i32,
        max_velocity: i32,
    ) -> Result<(), DeviceError> {
        self._state.borrow_mut().velocity_params = Some((acceleration, max_velocity));

        Ok(())
    }

    fn move_absolute(&mut self, native_position: i32) -> Result<(), DeviceError> {
        let mut state = self._state.borrow_mut();
        if state.fail_move {
            return Err(DeviceError::Communication(String::from(
                "move command is rejected",
            )));
        }

        state.moves.push(native_position);
        state.position = native_position;

        let num_move = state.moves.len();
        if state.recover_on_move {
            state.is_healthy = true;
        }
        if state.disconnect_at_move == Some(num_move) {
            state.is_healthy = false;
        }

        let fault = match &state.fault_at_move {
            Some((at_move, fault)) if *at_move == num_move => Some(fault.clone()),
            _ => None,
        };
        if let (Some(fault), Some(sender)) = (fault, &state.fault_sender) {
            let _ = sender.try_send(fault);
        }

        Ok(())
    }

    fn current_native_position(&mut self) -> Result<i32, DeviceError> {
        Ok(self._state.borrow().reported_position())
    }

    fn is_healthy(&mut self) -> bool {
        self._state.borrow().is_healthy
    }

    fn register_fault_callback(&mut self, sender: FaultSender) {
        self._state.borrow_mut().fault_sender = Some(sender);
    }

    fn close(&mut self) {
        let mut state = self._state.borrow_mut();
        state.close_count += 1;
        state.fault_sender = None;
    }
}

/// Connector of the mock rotation stages by the identifier.
#[derive(Default)]
pub struct MockActuatorConnector {
    _actuators: HashMap<String, Rc<RefCell<MockActuatorState>>>,
    pub connect_count: usize,
}

impl MockActuatorConnector {
    /// Create a connector without any rotation stage.
    ///
    /// # Returns
    /// A new connector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a healthy rotation stage.
    ///
    /// # Arguments
    /// * `identifier` - Port path or serial number.
    ///
    /// # Returns
    /// Shared state of the rotation stage.
    pub fn add_actuator(&mut self, identifier: &str) -> Rc<RefCell<MockActuatorState>> {
        let state = Rc::new(RefCell::new(MockActuatorState::new()));
        self._actuators
            .insert(String::from(identifier), Rc::clone(&state));

        state
    }
}

impl ActuatorConnector for MockActuatorConnector {
    fn connect(&mut self, identifier: &str) -> Result<Box<dyn ActuatorHandle>, DeviceError> {
        self.connect_count += 1;

        match self._actuators.get(identifier) {
            Some(state) => Ok(Box::new(MockActuator::new(Rc::clone(state)))),
            None => Err(DeviceError::Open(format!("no rotation stage at {identifier}"))),
        }
    }

    fn list_devices(&mut self) -> Result<Vec<DeviceInfo>, DeviceError> {
        let mut identifiers: Vec<&String> = self._actuators.keys().collect();
        identifiers.sort();

        Ok(identifiers
            .into_iter()
            .map(|identifier| {
                let mut device = DeviceInfo::new(identifier, MOCK_ACTUATOR_DESCRIPTION);
                device.manufacturer = Some(String::from(MOCK_MANUFACTURER));

                device
            })
            .collect())
    }
}
