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

use log::warn;

use crate::device::device_info::DeviceInfo;
use crate::error::DeviceError;

/// Open connection to the spectrometer.
pub trait SpectrometerHandle {
    /// Set the integration time.
    ///
    /// # Arguments
    /// * `micros` - Integration time in microsecond.
    fn set_integration_time_micros(&mut self, micros: u32) -> Result<(), DeviceError>;

    /// Capture a spectrum.
    ///
    /// # Returns
    /// Wavelengths in nm and intensities in counts.
    fn capture_spectrum(&mut self) -> Result<(Vec<f64>, Vec<f64>), DeviceError>;

    /// Release the connection.
    fn close(&mut self);
}

/// Factory of the spectrometer connections.
pub trait SpectrometerConnector {
    /// Open the connection.
    ///
    /// # Arguments
    /// * `serial` - Serial number of the spectrometer.
    ///
    /// # Returns
    /// The connection handle.
    fn connect(&mut self, serial: &str) -> Result<Box<dyn SpectrometerHandle>, DeviceError>;

    /// List the spectrometers visible to this connector.
    ///
    /// # Returns
    /// Visible spectrometers identified by the serial number.
    fn list_devices(&mut self) -> Result<Vec<DeviceInfo>, DeviceError>;
}

/// Set the integration time. The first command after the connection is
/// known to fail now and then, so a failure is retried once.
///
/// # Arguments
/// * `handle` - Spectrometer.
/// * `integration_time_ms` - Integration time in millisecond.
///
/// # Returns
/// The error of the second attempt if both attempts fail.
pub fn set_integration_time(
    handle: &mut dyn SpectrometerHandle,
    integration_time_ms: u32,
) -> Result<(), DeviceError> {
    let micros = integration_time_ms.saturating_mul(1000);
    if let Err(error) = handle.set_integration_time_micros(micros) {
        warn!("Failed to set the integration time ({error}). Retry once.");

        return handle.set_integration_time_micros(micros);
    }

    Ok(())
}
