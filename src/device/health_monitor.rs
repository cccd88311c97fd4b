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

use log::{debug, error, info, warn};
use std::rc::Rc;

use crate::config::AxisConfig;
use crate::device::actuator::{ActuatorConnector, ActuatorHandle};
use crate::device::fault::{FaultEvent, FaultLatch};
use crate::enums::{AxisRole, DeviceState};
use crate::error::{DeviceError, ScanError, ScanResult};
use crate::motion::unit_conversion::{
    to_native, to_native_acceleration, to_native_velocity, to_physical,
};
use crate::utility::{seconds_to_duration, Sleeper};

/// Connection and health lifecycle of one rotation stage. The monitor owns
/// the handle exclusively and closes it exactly once.
pub struct HealthMonitor {
    // Role of the rotation stage.
    pub role: AxisRole,
    // Lifecycle state.
    _state: DeviceState,
    // Configuration of the axis.
    _config: AxisConfig,
    // Connection handle. None before the connection and after the release.
    _handle: Option<Box<dyn ActuatorHandle>>,
    // Faults reported by the driver.
    _faults: Option<FaultLatch>,
    // Used for the settle time and the recovery dwell.
    _sleeper: Rc<dyn Sleeper>,
}

impl HealthMonitor {
    /// Create a new health monitor in the disconnected state.
    ///
    /// # Arguments
    /// * `role` - Role of the rotation stage.
    /// * `config` - Configuration of the axis.
    /// * `sleeper` - Sleeper for the waits.
    ///
    /// # Returns
    /// A new health monitor.
    pub fn new(role: AxisRole, config: AxisConfig, sleeper: Rc<dyn Sleeper>) -> Self {
        Self {
            role,
            _state: DeviceState::Disconnected,
            _config: config,
            _handle: None,
            _faults: None,
            _sleeper: sleeper,
        }
    }

    /// Lifecycle state.
    pub fn state(&self) -> DeviceState {
        self._state
    }

    /// Most recent fault reported by the driver.
    pub fn last_fault(&self) -> Option<FaultEvent> {
        self._faults
            .as_ref()
            .and_then(|faults| faults.last_fault.clone())
    }

    /// Name of the device used in the messages.
    pub fn device_name(&self) -> String {
        format!("{} actuator ({})", self.role, self._config.identifier)
    }

    /// Connect to the rotation stage and verify the connection.
    ///
    /// # Notes
    /// The stage is homed if configured, the velocity parameters are set,
    /// and the fault channel is registered. After the settle time, the
    /// connection health is checked. An unhealthy connection gets one
    /// recovery maneuver: move to the recovery offset and back to zero with
    /// the recovery dwell after each move. There is no further retry.
    ///
    /// # Arguments
    /// * `connector` - Factory of the connections.
    ///
    /// # Errors
    /// `InvalidState` if not disconnected. `Connection` if the handle can not
    /// be opened or configured. `ConnectionNotEstablished` if the connection
    /// is still unhealthy after the recovery maneuver. The monitor is faulted
    /// and the handle is closed in the error cases except `InvalidState`.
    pub fn connect(&mut self, connector: &mut dyn ActuatorConnector) -> ScanResult<()> {
        if self._state != DeviceState::Disconnected {
            return Err(ScanError::invalid_device_state("connect", self._state));
        }

        self.transition(DeviceState::Connecting);
        let handle = connector
            .connect(&self._config.identifier)
            .map_err(|error| self.fail_connection(error))?;
        self._handle = Some(handle);

        self.transition(DeviceState::HomingOrHandshake);
        self.handshake().map_err(|error| self.fail_connection(error))?;

        self._sleeper
            .sleep(seconds_to_duration(self._config.settle_time));

        self.transition(DeviceState::ConnectivityCheck);
        if !self.poll_health() {
            warn!(
                "{} is unhealthy. Try the recovery maneuver.",
                self.device_name()
            );

            self.recover().map_err(|error| self.fail_connection(error))?;

            if !self.poll_health() {
                error!(
                    "{} is still unhealthy after the recovery maneuver.",
                    self.device_name()
                );

                self.close();
                self.transition(DeviceState::Faulted);

                return Err(ScanError::ConnectionNotEstablished {
                    device: self.device_name(),
                });
            }
        }

        self.transition(DeviceState::Ready);

        Ok(())
    }

    /// Home the stage, set the velocity parameters, and register the fault
    /// channel.
    fn handshake(&mut self) -> Result<(), DeviceError> {
        let calibration = self._config.calibration;
        let acceleration = to_native_acceleration(self._config.acceleration, &calibration);
        let max_velocity = to_native_velocity(self._config.max_velocity, &calibration);

        let (sender, faults) = FaultLatch::channel();
        self._faults = Some(faults);

        let home_on_connect = self._config.home_on_connect;
        let handle = self.handle_mut()?;
        if home_on_connect {
            handle.home()?;
        }
        handle.set_velocity_params(acceleration, max_velocity)?;
        handle.register_fault_callback(sender);

        Ok(())
    }

    /// Move away from zero and back with the recovery dwell.
    fn recover(&mut self) -> Result<(), DeviceError> {
        let offset = self._config.recovery_offset;
        let dwell = seconds_to_duration(self._config.recovery_dwell);

        for angle in [offset, 0.0] {
            let native_position = to_native(angle, &self._config.calibration);
            self.handle_mut()?.move_absolute(native_position)?;
            self._sleeper.sleep(dwell);
        }

        Ok(())
    }

    /// Close the handle and fault the monitor.
    ///
    /// # Arguments
    /// * `error` - Error from the driver.
    ///
    /// # Returns
    /// The connection error.
    fn fail_connection(&mut self, error: DeviceError) -> ScanError {
        error!("Failed to connect to {}: {error}.", self.device_name());

        self.close();
        self.transition(DeviceState::Faulted);

        ScanError::Connection {
            device: self.device_name(),
            reason: error.to_string(),
        }
    }

    /// Query the connection health. It is polled before every move and never
    /// cached. A fault reported since the last poll counts as unhealthy.
    ///
    /// # Returns
    /// True if healthy. Otherwise, false. A ready monitor becomes faulted
    /// when unhealthy.
    pub fn is_healthy(&mut self) -> bool {
        let is_healthy = self.poll_health();
        if !is_healthy && self._state == DeviceState::Ready {
            error!("{} is disconnected.", self.device_name());
            self.transition(DeviceState::Faulted);
        }

        is_healthy
    }

    /// Poll the fault channel and the connection health without the state
    /// transition.
    fn poll_health(&mut self) -> bool {
        let fault = match self._faults.as_mut() {
            Some(faults) => {
                let fault = faults.poll();
                if faults.is_sender_dropped {
                    debug!("Fault channel of {} is closed by the driver.", self.role);
                }

                fault
            }
            None => None,
        };

        if let Some(fault) = &fault {
            error!("{} reports a fault: {fault}.", self.device_name());
        }

        let is_connection_healthy = match self._handle.as_mut() {
            Some(handle) => handle.is_healthy(),
            None => false,
        };

        is_connection_healthy && fault.is_none()
    }

    /// Start the move to the absolute position. It does not wait for the
    /// arrival.
    ///
    /// # Arguments
    /// * `angle` - Position in degree.
    ///
    /// # Errors
    /// `InvalidState` if not ready. `Device` if the driver rejects the move.
    pub fn move_absolute(&mut self, angle: f64) -> ScanResult<()> {
        if self._state != DeviceState::Ready {
            warn!(
                "Reject the move of {} in the {} state.",
                self.device_name(),
                self._state.as_ref()
            );
            return Err(ScanError::invalid_device_state("move", self._state));
        }

        let native_position = to_native(angle, &self._config.calibration);
        debug!(
            "Move {} to {angle} deg ({native_position} counts).",
            self.device_name()
        );

        self.handle_mut()
            .and_then(|handle| handle.move_absolute(native_position))
            .map_err(|error| self.device_error(error))
    }

    /// Read the current position.
    ///
    /// # Returns
    /// Position in degree.
    ///
    /// # Errors
    /// `InvalidState` if there is no connection. `Device` if the driver fails
    /// to read.
    pub fn current_position(&mut self) -> ScanResult<f64> {
        let calibration = self._config.calibration;
        let state = self._state;

        let handle = self
            ._handle
            .as_mut()
            .ok_or_else(|| ScanError::invalid_device_state("read the position", state))?;

        handle
            .current_native_position()
            .map(|counts| to_physical(counts, &calibration))
            .map_err(|error| self.device_error(error))
    }

    /// Release the handle. It is safe to call more than once and the handle
    /// is closed only once.
    pub fn close(&mut self) {
        if let Some(mut handle) = self._handle.take() {
            handle.close();
            info!("{} is closed.", self.device_name());

            if !self._state.is_terminal() {
                self.transition(DeviceState::Disconnected);
            }
        }
    }

    fn handle_mut(&mut self) -> Result<&mut Box<dyn ActuatorHandle>, DeviceError> {
        self._handle
            .as_mut()
            .ok_or_else(|| DeviceError::Communication(String::from("handle is closed")))
    }

    fn device_error(&self, error: DeviceError) -> ScanError {
        ScanError::Device {
            device: self.device_name(),
            index: None,
            reason: error.to_string(),
        }
    }

    fn transition(&mut self, state: DeviceState) {
        if self._state != state {
            info!(
                "{} state: {} -> {}.",
                self.device_name(),
                self._state.as_ref(),
                state.as_ref()
            );
            self._state = state;
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::path::Path;

    use crate::mock::mock_actuator::{MockActuatorConnector, MockActuatorState};
    use crate::mock::mock_constants::TEST_PRIMARY_PORT;
    use crate::mock::mock_sleeper::RecordingSleeper;
    use crate::utility::get_config;

    fn create_axis_config() -> AxisConfig {
        let config = get_config(Path::new("config/parameters_actuator.yaml")).unwrap();

        AxisConfig::new(&config, AxisRole::Primary, TEST_PRIMARY_PORT).unwrap()
    }

    fn create_monitor() -> (
        HealthMonitor,
        MockActuatorConnector,
        Rc<RefCell<MockActuatorState>>,
        Rc<RecordingSleeper>,
    ) {
        let mut connector = MockActuatorConnector::new();
        let state = connector.add_actuator(TEST_PRIMARY_PORT);

        let sleeper = Rc::new(RecordingSleeper::new());
        let monitor = HealthMonitor::new(
            AxisRole::Primary,
            create_axis_config(),
            Rc::clone(&sleeper) as Rc<dyn Sleeper>,
        );

        (monitor, connector, state, sleeper)
    }

    #[test]
    fn test_new() {
        let (monitor, _, _, _) = create_monitor();

        assert_eq!(monitor.state(), DeviceState::Disconnected);
        assert!(monitor.last_fault().is_none());
        assert_eq!(monitor.device_name(), "primary actuator (/dev/ttyUSB0)");
    }

    #[test]
    fn test_connect() {
        let (mut monitor, mut connector, state, sleeper) = create_monitor();

        monitor.connect(&mut connector).unwrap();

        assert_eq!(monitor.state(), DeviceState::Ready);
        assert_eq!(state.borrow().home_count, 1);
        assert_eq!(state.borrow().velocity_params, Some((146, 429416)));
        assert!(state.borrow().fault_sender.is_some());
        assert!(state.borrow().moves.is_empty());

        // Settle time only
        assert_eq!(sleeper.seconds(), vec![30.0]);
    }

    #[test]
    fn test_connect_without_home() {
        let mut connector = MockActuatorConnector::new();
        let state = connector.add_actuator(TEST_PRIMARY_PORT);

        let mut config = create_axis_config();
        config.home_on_connect = false;
        let mut monitor = HealthMonitor::new(
            AxisRole::Primary,
            config,
            Rc::new(RecordingSleeper::new()),
        );

        monitor.connect(&mut connector).unwrap();

        assert_eq!(state.borrow().home_count, 0);
    }

    #[test]
    fn test_connect_open_fail() {
        let (_, _, _, sleeper) = create_monitor();
        let mut connector = MockActuatorConnector::new();

        let mut monitor = HealthMonitor::new(AxisRole::Primary, create_axis_config(), sleeper);

        assert!(matches!(
            monitor.connect(&mut connector),
            Err(ScanError::Connection { .. })
        ));
        assert_eq!(monitor.state(), DeviceState::Faulted);
    }

    #[test]
    fn test_connect_recovery() {
        let (mut monitor, mut connector, state, sleeper) = create_monitor();
        state.borrow_mut().is_healthy = false;
        state.borrow_mut().recover_on_move = true;

        monitor.connect(&mut connector).unwrap();

        assert_eq!(monitor.state(), DeviceState::Ready);
        assert_eq!(state.borrow().moves, vec![9598, 0]);
        assert_eq!(sleeper.seconds(), vec![30.0, 10.0, 10.0]);
    }

    #[test]
    fn test_connect_not_established() {
        let (mut monitor, mut connector, state, _) = create_monitor();
        state.borrow_mut().is_healthy = false;

        assert!(matches!(
            monitor.connect(&mut connector),
            Err(ScanError::ConnectionNotEstablished { .. })
        ));

        assert_eq!(monitor.state(), DeviceState::Faulted);

        // Recovery is attempted only once
        assert_eq!(state.borrow().moves.len(), 2);
        assert_eq!(state.borrow().close_count, 1);

        // Closed already
        drop(monitor);
        assert_eq!(state.borrow().close_count, 1);
    }

    #[test]
    fn test_connect_twice() {
        let (mut monitor, mut connector, _, _) = create_monitor();

        monitor.connect(&mut connector).unwrap();

        assert!(matches!(
            monitor.connect(&mut connector),
            Err(ScanError::InvalidState { .. })
        ));
        assert_eq!(connector.connect_count, 1);
    }

    #[test]
    fn test_move_absolute() {
        let (mut monitor, mut connector, state, _) = create_monitor();

        monitor.connect(&mut connector).unwrap();
        monitor.move_absolute(45.0).unwrap();

        assert_eq!(state.borrow().moves, vec![86383]);
        assert_relative_eq!(
            monitor.current_position().unwrap(),
            45.0,
            epsilon = 1.0 / 1919.6418578623391
        );
    }

    #[test]
    fn test_move_absolute_not_ready() {
        let (mut monitor, _, state, _) = create_monitor();

        assert!(matches!(
            monitor.move_absolute(45.0),
            Err(ScanError::InvalidState { .. })
        ));
        assert!(state.borrow().moves.is_empty());
    }

    #[test]
    fn test_move_absolute_device_error() {
        let (mut monitor, mut connector, state, _) = create_monitor();

        monitor.connect(&mut connector).unwrap();
        state.borrow_mut().fail_move = true;

        assert!(matches!(
            monitor.move_absolute(45.0),
            Err(ScanError::Device { .. })
        ));
    }

    #[test]
    fn test_is_healthy() {
        let (mut monitor, mut connector, state, _) = create_monitor();

        monitor.connect(&mut connector).unwrap();
        assert!(monitor.is_healthy());

        state.borrow_mut().is_healthy = false;

        assert!(!monitor.is_healthy());
        assert_eq!(monitor.state(), DeviceState::Faulted);
    }

    #[test]
    fn test_is_healthy_fault() {
        let (mut monitor, mut connector, state, _) = create_monitor();

        monitor.connect(&mut connector).unwrap();

        let sender = state.borrow().fault_sender.clone().unwrap();
        sender.send(FaultEvent::new(5, "limit switch")).unwrap();

        assert!(!monitor.is_healthy());
        assert_eq!(monitor.last_fault(), Some(FaultEvent::new(5, "limit switch")));
        assert_eq!(monitor.state(), DeviceState::Faulted);
    }

    #[test]
    fn test_close() {
        let (mut monitor, mut connector, state, _) = create_monitor();

        monitor.connect(&mut connector).unwrap();

        monitor.close();
        monitor.close();

        assert_eq!(state.borrow().close_count, 1);
        assert_eq!(monitor.state(), DeviceState::Disconnected);

        assert!(matches!(
            monitor.current_position(),
            Err(ScanError::InvalidState { .. })
        ));
        assert!(!monitor.is_healthy());
    }

    #[test]
    fn test_drop() {
        let (mut monitor, mut connector, state, _) = create_monitor();

        monitor.connect(&mut connector).unwrap();
        drop(monitor);

        assert_eq!(state.borrow().close_count, 1);
    }
}
