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

//! Conversion between the physical units (degree, degree/s, degree/s^2) and
//! the encoder counts of a rotation stage.
//!
//! The forward direction truncates toward zero, so a round trip is exact only
//! up to the angular resolution of the stage (1 / counts_per_degree degree).
//!
//! Native values are 32-bit. The caller must not pass values whose native
//! representation exceeds the i32 range; this is a precondition and is not
//! checked at runtime.

use serde::{Deserialize, Serialize};

use crate::constants::{
    APT_VELOCITY_ACCEL_SCALE, PRM1Z8_COUNTS_PER_DEGREE, PRM1Z8_SAMPLING_INTERVAL,
};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct CalibrationProfile {
    // Encoder counts per degree.
    pub counts_per_degree: f64,
    // Sampling interval of the motion controller in second.
    pub sampling_interval: f64,
    // Extra scale applied to the velocity and acceleration.
    pub velocity_accel_scale: f64,
}

impl CalibrationProfile {
    /// Create a new calibration profile.
    ///
    /// # Arguments
    /// * `counts_per_degree` - Encoder counts per degree.
    /// * `sampling_interval` - Sampling interval in second.
    /// * `velocity_accel_scale` - Extra scale of the velocity and
    /// acceleration.
    ///
    /// # Returns
    /// A new calibration profile.
    pub const fn new(counts_per_degree: f64, sampling_interval: f64, velocity_accel_scale: f64) -> Self {
        Self {
            counts_per_degree,
            sampling_interval,
            velocity_accel_scale,
        }
    }

    /// Calibration of the Thorlabs PRM1-Z8 rotation stage.
    ///
    /// # Returns
    /// The calibration profile.
    pub const fn prm1_z8() -> Self {
        Self::new(
            PRM1Z8_COUNTS_PER_DEGREE,
            PRM1Z8_SAMPLING_INTERVAL,
            APT_VELOCITY_ACCEL_SCALE,
        )
    }

    /// Angular resolution in degree.
    ///
    /// # Returns
    /// The smallest angle the encoder can resolve.
    pub fn resolution(&self) -> f64 {
        1.0 / self.counts_per_degree
    }

    fn velocity_factor(&self) -> f64 {
        self.counts_per_degree * self.sampling_interval * self.velocity_accel_scale
    }

    fn acceleration_factor(&self) -> f64 {
        self.velocity_factor() * self.sampling_interval
    }
}

/// Convert the angle to encoder counts.
///
/// # Arguments
/// * `angle` - Angle in degree.
/// * `profile` - Calibration profile.
///
/// # Returns
/// Angle in counts, truncated toward zero.
pub fn to_native(angle: f64, profile: &CalibrationProfile) -> i32 {
    (profile.counts_per_degree * angle) as i32
}

/// Convert the encoder counts to angle.
///
/// # Arguments
/// * `counts` - Angle in counts.
/// * `profile` - Calibration profile.
///
/// # Returns
/// Angle in degree.
pub fn to_physical(counts: i32, profile: &CalibrationProfile) -> f64 {
    counts as f64 / profile.counts_per_degree
}

/// Convert the angular velocity to native units.
///
/// # Arguments
/// * `velocity` - Angular velocity in degree/s.
/// * `profile` - Calibration profile.
///
/// # Returns
/// Angular velocity in native units, truncated toward zero.
pub fn to_native_velocity(velocity: f64, profile: &CalibrationProfile) -> i32 {
    (profile.velocity_factor() * velocity) as i32
}

/// Convert the native angular velocity to degree/s.
pub fn to_physical_velocity(counts: i32, profile: &CalibrationProfile) -> f64 {
    counts as f64 / profile.velocity_factor()
}

/// Convert the angular acceleration to native units.
///
/// # Arguments
/// * `acceleration` - Angular acceleration in degree/s^2.
/// * `profile` - Calibration profile.
///
/// # Returns
/// Angular acceleration in native units, truncated toward zero.
pub fn to_native_acceleration(acceleration: f64, profile: &CalibrationProfile) -> i32 {
    (profile.acceleration_factor() * acceleration) as i32
}

/// Convert the native angular acceleration to degree/s^2.
pub fn to_physical_acceleration(counts: i32, profile: &CalibrationProfile) -> f64 {
    counts as f64 / profile.acceleration_factor()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn test_to_native() {
        let profile = CalibrationProfile::prm1_z8();

        assert_eq!(to_native(0.0, &profile), 0);
        assert_eq!(to_native(1.0, &profile), 1919);
        assert_eq!(to_native(10.0, &profile), 19196);
        assert_eq!(to_native(45.0, &profile), 86383);

        // Truncate toward zero for the negative angle
        assert_eq!(to_native(-1.0, &profile), -1919);
    }

    #[test]
    fn test_to_physical() {
        let profile = CalibrationProfile::new(100.0, 1.0, 1.0);

        assert_relative_eq!(to_physical(4500, &profile), 45.0);
        assert_relative_eq!(to_physical(-150, &profile), -1.5);
    }

    #[test]
    fn test_round_trip_within_resolution() {
        for profile in [
            CalibrationProfile::prm1_z8(),
            CalibrationProfile::new(398.22, 1.0, 1.0),
            CalibrationProfile::new(12.5, 1e-3, 10.0),
        ] {
            let mut angle = 0.0;
            while angle < 360.0 {
                let round_trip = to_physical(to_native(angle, &profile), &profile);

                assert!((round_trip - angle).abs() <= profile.resolution());
                assert!(round_trip <= angle);

                angle += 0.37;
            }
        }
    }

    #[test]
    fn test_velocity() {
        let profile = CalibrationProfile::prm1_z8();

        // 10 deg/s is the homing velocity of the PRM1-Z8
        assert_eq!(to_native_velocity(10.0, &profile), 429416);
        assert_relative_eq!(
            to_physical_velocity(429416, &profile),
            10.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_acceleration() {
        let profile = CalibrationProfile::prm1_z8();

        assert_eq!(to_native_acceleration(10.0, &profile), 146);
        assert_relative_eq!(
            to_physical_acceleration(146, &profile),
            10.0,
            epsilon = 0.1
        );
    }

    #[test]
    fn test_resolution() {
        let profile = CalibrationProfile::new(4.0, 1.0, 1.0);

        assert_eq!(profile.resolution(), 0.25);
    }
}
