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

pub const TEST_PRIMARY_PORT: &str = "/dev/ttyUSB0";
pub const TEST_SECONDARY_PORT: &str = "/dev/ttyUSB1";
pub const TEST_SPECTROMETER_SERIAL: &str = "HR4C0001";

// Reported by the device listing of the mock connectors.
pub const MOCK_MANUFACTURER: &str = "Simulation";
pub const MOCK_ACTUATOR_DESCRIPTION: &str = "Mock rotation stage";
pub const MOCK_SPECTROMETER_DESCRIPTION: &str = "Mock spectrometer";

// Wavelength grid of the mock spectrometer in nm.
pub const TEST_NUM_PIXEL: usize = 64;
pub const TEST_WAVELENGTH_START: f64 = 400.0;
pub const TEST_WAVELENGTH_STEP: f64 = 5.0;

// Gaussian line of the mock light source.
pub const TEST_PEAK_WAVELENGTH: f64 = 550.0;
pub const TEST_PEAK_WIDTH: f64 = 40.0;
pub const TEST_PEAK_INTENSITY: f64 = 3000.0;
pub const TEST_DARK_COUNT: f64 = 100.0;
