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

use serde::Serialize;
use std::fmt;

/// Device visible to a connector before it is opened.
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct DeviceInfo {
    // Port path or serial number used to connect.
    pub identifier: String,
    pub description: String,
    // Only USB devices report the manufacturer and serial number.
    pub manufacturer: Option<String>,
    pub serial_number: Option<String>,
}

impl DeviceInfo {
    /// Create the information of a device.
    ///
    /// # Arguments
    /// * `identifier` - Port path or serial number used to connect.
    /// * `description` - Description reported by the device.
    ///
    /// # Returns
    /// A new device information without the USB details.
    pub fn new(identifier: &str, description: &str) -> Self {
        Self {
            identifier: String::from(identifier),
            description: String::from(description),
            manufacturer: None,
            serial_number: None,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.identifier, self.description)?;

        if let Some(manufacturer) = &self.manufacturer {
            write!(f, ", {manufacturer}")?;
        }
        if let Some(serial_number) = &self.serial_number {
            write!(f, " (S/N {serial_number})")?;
        }

        Ok(())
    }
}

/// Find the identifier of the device by its description.
///
/// # Arguments
/// * `devices` - Visible devices.
/// * `description` - Description to match exactly.
///
/// # Returns
/// Identifier of the first match.
pub fn find_by_description<'a>(devices: &'a [DeviceInfo], description: &str) -> Option<&'a str> {
    devices
        .iter()
        .find(|device| device.description == description)
        .map(|device| device.identifier.as_str())
}

/// Find the identifier of the device by its serial number.
///
/// # Arguments
/// * `devices` - Visible devices.
/// * `serial_number` - Serial number to match exactly.
///
/// # Returns
/// Identifier of the first match.
pub fn find_by_serial_number<'a>(
    devices: &'a [DeviceInfo],
    serial_number: &str,
) -> Option<&'a str> {
    devices
        .iter()
        .find(|device| device.serial_number.as_deref() == Some(serial_number))
        .map(|device| device.identifier.as_str())
}
