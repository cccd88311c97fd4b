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
use std::rc::Rc;

use crate::device::device_info::DeviceInfo;
use crate::device::spectrometer::{SpectrometerConnector, SpectrometerHandle};
use crate::error::DeviceError;
use crate::mock::mock_actuator::MockActuatorState;
use crate::mock::mock_constants::{
    MOCK_MANUFACTURER, MOCK_SPECTROMETER_DESCRIPTION, TEST_DARK_COUNT, TEST_NUM_PIXEL, TEST_PEAK_INTENSITY, TEST_PEAK_WAVELENGTH, TEST_PEAK_WIDTH,
    TEST_WAVELENGTH_START, TEST_WAVELENGTH_STEP,
};
use crate::motion::unit_conversion::{to_physical, CalibrationProfile};

/// State of the mock spectrometer shared with the test.
///
/// The capture counts below are 1-based. The background is the first
/// capture of a run.
pub struct MockSpectrometerState {
    // Wavelength grid in nm.
    pub wavelengths: Vec<f64>,
    pub integration_time_micros: Option<u32>,
    // Number of the integration time commands to reject.
    pub integration_time_failures: usize,
    pub capture_count: usize,
    // Shift in nm applied to the wavelengths from this capture.
    pub shift_at_capture: Option<(usize, f64)>,
    // Reject this capture.
    pub fail_capture_at: Option<usize>,
    pub close_count: usize,
    // Rotation stage holding the polarizer in front of the light source. The
    // intensity follows the Malus's law when it is set.
    pub polarizer: Option<Rc<RefCell<MockActuatorState>>>,
}

impl MockSpectrometerState {
    /// Spectrometer with the default wavelength grid.
    ///
    /// # Returns
    /// A new state.
    pub fn new() -> Self {
        Self {
            wavelengths: (0..TEST_NUM_PIXEL)
                .map(|idx| TEST_WAVELENGTH_START + (idx as f64) * TEST_WAVELENGTH_STEP)
                .collect(),
            integration_time_micros: None,
            integration_time_failures: 0,
            capture_count: 0,
            shift_at_capture: None,
            fail_capture_at: None,
            close_count: 0,
            polarizer: None,
        }
    }

    /// Transmission of the polarizer.
    ///
    /// # Returns
    /// Value in [0, 1].
    fn transmission(&self) -> f64 {
        match &self.polarizer {
            Some(polarizer) => {
                let angle = to_physical(
                    polarizer.borrow().reported_position(),
                    &CalibrationProfile::prm1_z8(),
                );

                angle.to_radians().cos().powi(2)
            }
            None => 1.0,
        }
    }
}

impl Default for MockSpectrometerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock spectrometer that observes a Gaussian emission line.
pub struct MockSpectrometer {
    _state: Rc<RefCell<MockSpectrometerState>>,
}

impl MockSpectrometer {
    /// Create a mock spectrometer.
    ///
    /// # Arguments
    /// * `state` - Shared state.
    ///
    /// # Returns
    /// A new mock spectrometer.
    pub fn new(state: Rc<RefCell<MockSpectrometerState>>) -> Self {
        Self { _state: state }
    }
}

impl SpectrometerHandle for MockSpectrometer {
    fn set_integration_time_micros(&mut self, micros: u32) -> Result<(), DeviceError> {
        let mut state = self._state.borrow_mut();
        if state.integration_time_failures > 0 {
            state.integration_time_failures -= 1;
            return Err(DeviceError::Communication(String::from(
                "integration time is not acknowledged",
            )));
        }

        state.integration_time_micros = Some(micros);

        Ok(())
    }

    fn capture_spectrum(&mut self) -> Result<(Vec<f64>, Vec<f64>), DeviceError> {
        let mut state = self._state.borrow_mut();
        state.capture_count += 1;

        let capture = state.capture_count;
        if state.fail_capture_at == Some(capture) {
            return Err(DeviceError::Communication(String::from("capture timed out")));
        }

        let shift = match state.shift_at_capture {
            Some((at_capture, shift)) if capture >= at_capture => shift,
            _ => 0.0,
        };
        let wavelengths: Vec<f64> = state
            .wavelengths
            .iter()
            .map(|wavelength| wavelength + shift)
            .collect();

        let transmission = state.transmission();
        let intensities = wavelengths
            .iter()
            .map(|wavelength| {
                let x = (wavelength - TEST_PEAK_WAVELENGTH) / TEST_PEAK_WIDTH;
                TEST_DARK_COUNT + TEST_PEAK_INTENSITY * transmission * (-x * x).exp()
            })
            .collect();

        Ok((wavelengths, intensities))
    }

    fn close(&mut self) {
        self._state.borrow_mut().close_count += 1;
    }
}

/// Connector of the mock spectrometer by the serial number.
pub struct MockSpectrometerConnector {
    _serial: String,
    pub state: Rc<RefCell<MockSpectrometerState>>,
}

impl MockSpectrometerConnector {
    /// Create a connector with one spectrometer.
    ///
    /// # Arguments
    /// * `serial` - Serial number of the spectrometer.
    ///
    /// # Returns
    /// A new connector.
    pub fn new(serial: &str) -> Self {
        Self {
            _serial: String::from(serial),
            state: Rc::new(RefCell::new(MockSpectrometerState::new())),
        }
    }
}

impl SpectrometerConnector for MockSpectrometerConnector {
    fn connect(&mut self, serial: &str) -> Result<Box<dyn SpectrometerHandle>, DeviceError> {
        if serial != self._serial {
            return Err(DeviceError::Open(format!("no spectrometer with serial {serial}")));
        }

        Ok(Box::new(MockSpectrometer::new(Rc::clone(&self.state))))
    }

    fn list_devices(&mut self) -> Result<Vec<DeviceInfo>, DeviceError> {
        let mut device = DeviceInfo::new(&self._serial, MOCK_SPECTROMETER_DESCRIPTION);
        device.manufacturer = Some(String::from(MOCK_MANUFACTURER));
        device.serial_number = Some(self._serial.clone());

        Ok(vec![device])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::mock::mock_constants::TEST_SPECTROMETER_SERIAL;

    fn create_spectrometer() -> (MockSpectrometer, Rc<RefCell<MockSpectrometerState>>) {
        let state = Rc::new(RefCell::new(MockSpectrometerState::new()));

        (MockSpectrometer::new(Rc::clone(&state)), state)
    }

    #[test]
    fn test_capture_spectrum() {
        let (mut spectrometer, state) = create_spectrometer();

        let (wavelengths, intensities) = spectrometer.capture_spectrum().unwrap();

        assert_eq!(wavelengths.len(), TEST_NUM_PIXEL);
        assert_eq!(intensities.len(), TEST_NUM_PIXEL);
        assert_eq!(state.borrow().capture_count, 1);

        // Peak at 550 nm
        let idx = ((TEST_PEAK_WAVELENGTH - TEST_WAVELENGTH_START) / TEST_WAVELENGTH_STEP) as usize;
        assert_relative_eq!(intensities[idx], TEST_DARK_COUNT + TEST_PEAK_INTENSITY);
    }

    #[test]
    fn test_capture_spectrum_shift() {
        let (mut spectrometer, state) = create_spectrometer();
        state.borrow_mut().shift_at_capture = Some((2, 0.5));

        let (first, _) = spectrometer.capture_spectrum().unwrap();
        let (second, _) = spectrometer.capture_spectrum().unwrap();

        assert_relative_eq!(second[0] - first[0], 0.5);
    }

    #[test]
    fn test_capture_spectrum_fail() {
        let (mut spectrometer, state) = create_spectrometer();
        state.borrow_mut().fail_capture_at = Some(1);

        assert!(spectrometer.capture_spectrum().is_err());
        assert!(spectrometer.capture_spectrum().is_ok());
    }

    #[test]
    fn test_capture_spectrum_polarizer() {
        let (mut spectrometer, state) = create_spectrometer();

        let polarizer = Rc::new(RefCell::new(MockActuatorState::new()));
        polarizer.borrow_mut().position = 172768;
        state.borrow_mut().polarizer = Some(Rc::clone(&polarizer));

        // Crossed at 90 deg
        let (_, intensities) = spectrometer.capture_spectrum().unwrap();
        for intensity in intensities {
            assert_relative_eq!(intensity, TEST_DARK_COUNT, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_set_integration_time_micros() {
        let (mut spectrometer, state) = create_spectrometer();
        state.borrow_mut().integration_time_failures = 1;

        assert!(spectrometer.set_integration_time_micros(1000).is_err());
        assert!(spectrometer.set_integration_time_micros(1000).is_ok());
        assert_eq!(state.borrow().integration_time_micros, Some(1000));
    }

    #[test]
    fn test_connect() {
        let mut connector = MockSpectrometerConnector::new(TEST_SPECTROMETER_SERIAL);

        assert!(connector.connect(TEST_SPECTROMETER_SERIAL).is_ok());
        assert!(connector.connect("wrong").is_err());

        connector.connect(TEST_SPECTROMETER_SERIAL).unwrap().close();
        assert_eq!(connector.state.borrow().close_count, 1);
    }

    #[test]
    fn test_list_devices() {
        let mut connector = MockSpectrometerConnector::new(TEST_SPECTROMETER_SERIAL);

        let devices = connector.list_devices().unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].identifier, TEST_SPECTROMETER_SERIAL);
        assert_eq!(
            devices[0].serial_number.as_deref(),
            Some(TEST_SPECTROMETER_SERIAL)
        );
        assert_eq!(connector.state.borrow().capture_count, 0);
    }
}
