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

// Absolute arrival tolerance of a rotation stage in degree.
pub const POSITION_TOLERANCE_DEG: f64 = 0.2;

// Valid angular range of a rotation stage is [0, 360) degree.
pub const MAX_ANGLE_DEG: f64 = 360.0;

// Minimum dwell time in second. Steps below the threshold need the short
// dwell, larger steps need the long one.
pub const DWELL_TIME_SMALL_STEP: f64 = 10.0;
pub const DWELL_TIME_LARGE_STEP: f64 = 20.0;
pub const LARGE_STEP_THRESHOLD_DEG: f64 = 80.0;

// Thorlabs PRM1-Z8 driven by the TDC001/KDC101 controllers.
pub const PRM1Z8_COUNTS_PER_DEGREE: f64 = 1919.6418578623391;
pub const PRM1Z8_SAMPLING_INTERVAL: f64 = 2048.0 / 6e6;
pub const APT_VELOCITY_ACCEL_SCALE: f64 = 65536.0;

// Same defaults as numpy.allclose().
pub const SPECTRAL_TOLERANCE_RELATIVE: f64 = 1e-5;
pub const SPECTRAL_TOLERANCE_ABSOLUTE: f64 = 1e-8;

pub const BOUND_FAULT_CHANNEL: usize = 16;

// Used to decide the number of plan positions from (final - initial) / step.
pub const PLAN_EPSILON: f64 = 1e-9;

// Upper bound of the plan positions.
pub const MAX_PLAN_POSITIONS: usize = 100_000;

// Slack of the arrival comparison so that a difference of exactly the
// tolerance is accepted at any target angle.
pub const POSITION_TOLERANCE_SLACK_DEG: f64 = 1e-9;

// Numeric suffixes tried to resolve the naming conflict of the result file.
pub const MAX_NAMING_SUFFIX: usize = 999;
