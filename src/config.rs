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

use config::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::enums::AxisRole;
use crate::error::{ScanError, ScanResult};
use crate::motion::motion_plan::MotionPlan;
use crate::motion::sequencer::validate_dwell_time;
use crate::motion::unit_conversion::CalibrationProfile;
use crate::utility::{get_config, get_optional_parameter, get_parameter};

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct AxisConfig {
    // Port path or serial number.
    pub identifier: String,
    // Conversion between the physical and native units.
    pub calibration: CalibrationProfile,
    // Home the stage after the connection or not.
    pub home_on_connect: bool,
    // Wait after the connection before the health check in second.
    pub settle_time: f64,
    // Maximum velocity in deg/s.
    pub max_velocity: f64,
    // Acceleration in deg/s^2.
    pub acceleration: f64,
    // Offset of the recovery maneuver in degree.
    pub recovery_offset: f64,
    // Dwell time of each recovery move in second.
    pub recovery_dwell: f64,
}

impl AxisConfig {
    /// Read the configuration of the rotation stage.
    ///
    /// # Arguments
    /// * `config` - Actuator configuration.
    /// * `role` - Role of the rotation stage.
    /// * `identifier` - Port path or serial number.
    ///
    /// # Returns
    /// A new axis configuration.
    ///
    /// # Errors
    /// If any key of the axis is missing.
    pub fn new(config: &Config, role: AxisRole, identifier: &str) -> ScanResult<Self> {
        let key = role.config_key();

        Ok(Self {
            identifier: String::from(identifier),
            calibration: get_parameter(config, &format!("{key}.calibration"))?,
            home_on_connect: get_parameter(config, &format!("{key}.home_on_connect"))?,
            settle_time: get_parameter(config, &format!("{key}.settle_time"))?,
            max_velocity: get_parameter(config, &format!("{key}.max_velocity"))?,
            acceleration: get_parameter(config, &format!("{key}.acceleration"))?,
            recovery_offset: get_parameter(config, &format!("{key}.recovery_offset"))?,
            recovery_dwell: get_parameter(config, &format!("{key}.recovery_dwell"))?,
        })
    }

    /// Validate the axis configuration.
    ///
    /// # Arguments
    /// * `role` - Role of the rotation stage.
    ///
    /// # Errors
    /// If the identifier is empty or any value is out of range.
    pub fn validate(&self, role: AxisRole) -> ScanResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(ScanError::Configuration(format!(
                "{role} axis should have an identifier"
            )));
        }

        let calibration = &self.calibration;
        if !(calibration.counts_per_degree > 0.0
            && calibration.sampling_interval > 0.0
            && calibration.velocity_accel_scale > 0.0)
        {
            return Err(ScanError::Configuration(format!(
                "{role} axis should have the positive calibration factors"
            )));
        }

        if !(self.max_velocity > 0.0 && self.acceleration > 0.0) {
            return Err(ScanError::Configuration(format!(
                "{role} axis should have the positive velocity and acceleration"
            )));
        }

        if !(self.settle_time >= 0.0 && self.recovery_dwell >= 0.0) {
            return Err(ScanError::Configuration(format!(
                "{role} axis should not have the negative wait time"
            )));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ScanConfig {
    // Configuration filename.
    pub filename: String,
    // Front polarizer. It defines the motion plan.
    pub primary: AxisConfig,
    // Back polarizer for the dual-axis run.
    pub secondary: Option<AxisConfig>,
    // Offset of the back polarizer to the front polarizer in degree.
    pub offset_angle: Option<f64>,
    // Motion plan in degree.
    pub initial_angle: f64,
    pub final_angle: f64,
    pub step: f64,
    // Dwell time after each move in second.
    pub dwell_time: f64,
    // Serial number of the spectrometer.
    pub spectrometer_serial: String,
    // Integration time in millisecond.
    pub integration_time_ms: u32,
    // Tolerance to compare the wavelengths.
    pub spectral_tolerance_relative: f64,
    pub spectral_tolerance_absolute: f64,
    // Result file.
    pub output_dir: PathBuf,
    pub output_file: String,
    // Wait for the operator before the background and the collection.
    pub use_operator_gate: bool,
    // Scale of the dwell times in the simulation mode.
    pub simulation_time_scale: f64,
}

impl ScanConfig {
    /// Create a new scan configuration. It is validated before return.
    ///
    /// # Arguments
    /// * `filepath_parameters_scan` - Path to the scan parameters file.
    /// * `filepath_parameters_actuator` - Path to the actuator parameters
    /// file.
    ///
    /// # Returns
    /// A new scan configuration.
    ///
    /// # Errors
    /// If a file can not be read, a key is missing, or the configuration is
    /// not valid.
    pub fn new(
        filepath_parameters_scan: &Path,
        filepath_parameters_actuator: &Path,
    ) -> ScanResult<Self> {
        let config_scan = get_config(filepath_parameters_scan)?;
        let config_actuator = get_config(filepath_parameters_actuator)?;

        let primary_port: String = get_parameter(&config_scan, "primary_port")?;
        let secondary_port: Option<String> =
            get_optional_parameter(&config_scan, "secondary_port")?;

        let secondary = match secondary_port {
            Some(port) => Some(AxisConfig::new(
                &config_actuator,
                AxisRole::Secondary,
                &port,
            )?),
            None => None,
        };

        let output_dir: String = get_parameter(&config_scan, "output_dir")?;

        let scan_config = Self {
            filename: filepath_parameters_scan.display().to_string(),
            primary: AxisConfig::new(&config_actuator, AxisRole::Primary, &primary_port)?,
            secondary,
            offset_angle: get_optional_parameter(&config_scan, "offset_angle")?,
            initial_angle: get_parameter(&config_scan, "initial_angle")?,
            final_angle: get_parameter(&config_scan, "final_angle")?,
            step: get_parameter(&config_scan, "step")?,
            dwell_time: get_parameter(&config_scan, "dwell_time")?,
            spectrometer_serial: get_parameter(&config_scan, "spectrometer_serial")?,
            integration_time_ms: get_parameter(&config_scan, "integration_time_ms")?,
            spectral_tolerance_relative: get_parameter(
                &config_scan,
                "spectral_tolerance_relative",
            )?,
            spectral_tolerance_absolute: get_parameter(
                &config_scan,
                "spectral_tolerance_absolute",
            )?,
            output_dir: PathBuf::from(output_dir),
            output_file: get_parameter(&config_scan, "output_file")?,
            use_operator_gate: get_parameter(&config_scan, "use_operator_gate")?,
            simulation_time_scale: get_parameter(&config_scan, "simulation_time_scale")?,
        };
        scan_config.validate()?;

        Ok(scan_config)
    }

    /// Validate the configuration before any device is opened.
    ///
    /// # Errors
    /// If the motion plan can not be built, the dwell time is too short for
    /// the step, the offset and the secondary axis do not come together, or
    /// any other value is out of range.
    pub fn validate(&self) -> ScanResult<()> {
        self.build_plans()?;
        validate_dwell_time(self.step, self.dwell_time)?;

        self.primary.validate(AxisRole::Primary)?;
        match (&self.secondary, self.offset_angle) {
            (Some(secondary), Some(_)) => secondary.validate(AxisRole::Secondary)?,
            (None, None) => {}
            (Some(_), None) => {
                return Err(ScanError::Configuration(String::from(
                    "secondary axis should have the offset angle",
                )));
            }
            (None, Some(_)) => {
                return Err(ScanError::Configuration(String::from(
                    "offset angle should have the secondary axis",
                )));
            }
        }

        if self.spectrometer_serial.trim().is_empty() {
            return Err(ScanError::Configuration(String::from(
                "spectrometer should have a serial number",
            )));
        }

        if self.integration_time_ms == 0 {
            return Err(ScanError::Configuration(String::from(
                "integration time should be positive",
            )));
        }

        if !(self.spectral_tolerance_relative >= 0.0 && self.spectral_tolerance_absolute >= 0.0) {
            return Err(ScanError::Configuration(String::from(
                "spectral tolerances should not be negative",
            )));
        }

        if self.output_file.trim().is_empty() {
            return Err(ScanError::Configuration(String::from(
                "output file should have a name",
            )));
        }

        if !(self.simulation_time_scale >= 0.0) {
            return Err(ScanError::Configuration(String::from(
                "simulation time scale should not be negative",
            )));
        }

        Ok(())
    }

    /// Build the motion plans.
    ///
    /// # Returns
    /// Plan of the primary axis and the plan of the secondary axis if any.
    ///
    /// # Errors
    /// If any plan is not valid.
    pub fn build_plans(&self) -> ScanResult<(MotionPlan, Option<MotionPlan>)> {
        let plan = MotionPlan::build(self.initial_angle, self.final_angle, self.step)?;
        let secondary_plan = match self.offset_angle {
            Some(offset) => Some(plan.with_offset(offset)?),
            None => None,
        };

        Ok((plan, secondary_plan))
    }

    /// Path of the result file.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file)
    }
}
