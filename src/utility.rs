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

use approx::assert_relative_eq;
use config::Config;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use crate::error::{ScanError, ScanResult};

/// Wait for a fixed duration. The dwell times of a scan are implemented by
/// this trait so that the simulation and tests do not need to block.
pub trait Sleeper {
    /// Block the current thread.
    ///
    /// # Arguments
    /// * `duration` - Duration to wait.
    fn sleep(&self, duration: Duration);
}

/// Sleeper that blocks the thread for a scaled duration.
pub struct ThreadSleeper {
    // Scale applied to every requested duration. 1.0 is the real time.
    pub time_scale: f64,
}

impl ThreadSleeper {
    /// Create a sleeper in the real time.
    ///
    /// # Returns
    /// A new sleeper.
    pub fn new() -> Self {
        Self { time_scale: 1.0 }
    }

    /// Create a sleeper with the scaled time.
    ///
    /// # Arguments
    /// * `time_scale` - Scale applied to every requested duration. Negative
    /// values are treated as 0.
    ///
    /// # Returns
    /// A new sleeper.
    pub fn scaled(time_scale: f64) -> Self {
        Self {
            time_scale: time_scale.max(0.0),
        }
    }
}

impl Default for ThreadSleeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        let scaled = duration.mul_f64(self.time_scale);
        if !scaled.is_zero() {
            sleep(scaled);
        }
    }
}

/// Get the configuation from the file.
///
/// # Parameters
/// * `filepath` - Path to the config file.
///
/// # Returns
/// The configuration.
///
/// # Errors
/// If the file does not exist or can not be parsed.
pub fn get_config(filepath: &Path) -> ScanResult<Config> {
    let name = filepath.to_str().ok_or_else(|| {
        ScanError::Configuration(format!("Should have the file name in the {:?}", filepath))
    })?;

    Ok(Config::builder()
        .add_source(config::File::with_name(name))
        .build()?)
}

/// Get the parameter from the configuration.
///
/// # Parameters
/// * `config` - Configuration.
/// * `key` - Key to find the parameter. Nested keys are separated by a dot.
///
/// # Returns
/// The parameter.
///
/// # Errors
/// If the key is missing or has the wrong type.
pub fn get_parameter<T: DeserializeOwned>(config: &Config, key: &str) -> ScanResult<T> {
    config
        .get::<T>(key)
        .map_err(|error| ScanError::Configuration(format!("Should find the {key}: {error}")))
}

/// Get the optional parameter from the configuration. A missing key or a
/// null value is `None`.
///
/// # Parameters
/// * `config` - Configuration.
/// * `key` - Key to find the parameter.
///
/// # Returns
/// The parameter if it exists.
///
/// # Errors
/// If the key exists but has the wrong type.
pub fn get_optional_parameter<T: DeserializeOwned>(
    config: &Config,
    key: &str,
) -> ScanResult<Option<T>> {
    match config.get::<Option<T>>(key) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(error) => Err(ScanError::Configuration(format!(
            "Should parse the {key}: {error}"
        ))),
    }
}

/// Convert the time in second to the duration.
///
/// # Arguments
/// * `seconds` - Time in second. Negative values are treated as 0.
///
/// # Returns
/// Duration.
pub fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::from_secs_f64(seconds.max(0.0))
}

/// Assert that two vectors are equal within a relative tolerance.
///
/// # Parameters
/// * `v1` - First vector.
/// * `v2` - Second vector.
/// * `epsilon` - Relative tolerance.
///
/// # Panics
/// If the two vectors are not equal within the relative tolerance.
pub fn assert_relative_eq_vector(v1: &[f64], v2: &[f64], epsilon: f64) {
    assert_eq!(v1.len(), v2.len());
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert_relative_eq!(a, b, epsilon = epsilon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    #[test]
    fn test_get_config() {
        let config = get_config(Path::new("config/parameters_scan.yaml")).unwrap();

        assert_relative_eq!(config.get_float("step").unwrap(), 45.0);
    }

    #[test]
    fn test_get_config_error() {
        assert!(get_config(Path::new("wrong.yaml")).is_err());
    }

    #[test]
    fn test_get_parameter() {
        let config = get_config(Path::new("config/parameters_actuator.yaml")).unwrap();

        let counts_per_degree: f64 =
            get_parameter(&config, "primary.calibration.counts_per_degree").unwrap();
        assert_relative_eq!(counts_per_degree, 1919.6418578623391);

        let home_on_connect: bool = get_parameter(&config, "primary.home_on_connect").unwrap();
        assert!(home_on_connect);

        let result: ScanResult<f64> = get_parameter(&config, "primary.wrong");
        assert!(matches!(result, Err(ScanError::Configuration(_))));
    }

    #[test]
    fn test_get_optional_parameter() {
        let config = get_config(Path::new("config/parameters_scan.yaml")).unwrap();

        let offset: Option<f64> = get_optional_parameter(&config, "offset_angle").unwrap();
        assert!(offset.is_none());

        let missing: Option<f64> = get_optional_parameter(&config, "not_there").unwrap();
        assert!(missing.is_none());

        let serial: Option<String> =
            get_optional_parameter(&config, "spectrometer_serial").unwrap();
        assert_eq!(serial.unwrap(), "HR4C0001");
    }

    #[test]
    fn test_seconds_to_duration() {
        assert_eq!(seconds_to_duration(1.5), Duration::from_millis(1500));
        assert_eq!(seconds_to_duration(-1.0), Duration::ZERO);
    }

    #[test]
    fn test_thread_sleeper_scaled() {
        let sleeper = ThreadSleeper::scaled(0.0);

        let start = Instant::now();
        sleeper.sleep(Duration::from_secs(10));

        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(ThreadSleeper::scaled(-2.0).time_scale, 0.0);
    }

    #[test]
    fn test_assert_relative_eq_vector() {
        assert_relative_eq_vector(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], f64::EPSILON);
    }

    #[test]
    #[should_panic(expected = "`left == right` failed")]
    fn test_assert_relative_eq_vector_panic() {
        assert_relative_eq_vector(&[0.0, 0.0], &[0.0, 1.0, 0.0], f64::EPSILON);
    }
}
