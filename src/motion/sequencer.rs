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

use log::{debug, error, info};
use std::rc::Rc;

use crate::constants::{
    DWELL_TIME_LARGE_STEP, DWELL_TIME_SMALL_STEP, LARGE_STEP_THRESHOLD_DEG, POSITION_TOLERANCE_DEG,
    POSITION_TOLERANCE_SLACK_DEG,
};
use crate::device::health_monitor::HealthMonitor;
use crate::enums::AxisRole;
use crate::error::{ScanError, ScanResult};
use crate::motion::motion_plan::MotionPlan;
use crate::utility::{seconds_to_duration, Sleeper};

/// Validate the dwell time for the step.
///
/// # Notes
/// The steps below 80 degree need at least 10 seconds. The larger steps
/// need at least 20 seconds.
///
/// # Arguments
/// * `step` - Step in degree. The sign is ignored.
/// * `dwell_time` - Dwell time in second.
///
/// # Errors
/// If the dwell time is too short.
pub fn validate_dwell_time(step: f64, dwell_time: f64) -> ScanResult<()> {
    let min_dwell_time = if step.abs() < LARGE_STEP_THRESHOLD_DEG {
        DWELL_TIME_SMALL_STEP
    } else {
        DWELL_TIME_LARGE_STEP
    };

    if !(dwell_time >= min_dwell_time) {
        return Err(ScanError::Configuration(format!(
            "dwell time {dwell_time} s is shorter than {min_dwell_time} s for the step {step} deg"
        )));
    }

    Ok(())
}

/// Compare the measured position with the target.
///
/// # Arguments
/// * `axis` - Role of the rotation stage.
/// * `expected` - Target position in degree.
/// * `actual` - Measured position in degree.
///
/// # Errors
/// `PositionDrift` if the difference is larger than 0.2 degree. The
/// difference at exactly 0.2 degree is accepted.
pub fn check_arrival(axis: AxisRole, expected: f64, actual: f64) -> ScanResult<()> {
    if (actual - expected).abs() > POSITION_TOLERANCE_DEG + POSITION_TOLERANCE_SLACK_DEG {
        return Err(ScanError::PositionDrift {
            axis,
            index: None,
            expected,
            actual,
        });
    }

    Ok(())
}

/// Drive the rotation stages through the motion plan with the position
/// verification. The primary axis follows the plan and the secondary axis,
/// if any, follows the plan shifted by the offset angle.
pub struct MotionSequencer {
    // Plan of each axis. The order is the same as the axes.
    _plans: Vec<MotionPlan>,
    // Connected rotation stages. The first one is the primary.
    _axes: Vec<HealthMonitor>,
    // Dwell time after each move in second.
    _dwell_time: f64,
    _sleeper: Rc<dyn Sleeper>,
}

impl MotionSequencer {
    /// Create a new motion sequencer.
    ///
    /// # Arguments
    /// * `plan` - Plan of the primary axis.
    /// * `primary` - Primary rotation stage.
    /// * `secondary` - Secondary rotation stage and its offset angle in
    /// degree.
    /// * `dwell_time` - Dwell time after each move in second.
    /// * `sleeper` - Sleeper for the dwell.
    ///
    /// # Returns
    /// A new motion sequencer.
    ///
    /// # Errors
    /// If the dwell time is too short for the step or the shifted plan is
    /// out of range. The rotation stages are closed when dropped.
    pub fn new(
        plan: MotionPlan,
        primary: HealthMonitor,
        secondary: Option<(HealthMonitor, f64)>,
        dwell_time: f64,
        sleeper: Rc<dyn Sleeper>,
    ) -> ScanResult<Self> {
        validate_dwell_time(plan.step, dwell_time)?;

        let mut plans = Vec::new();
        let mut axes = vec![primary];
        if let Some((monitor, offset)) = secondary {
            plans.push(plan.with_offset(offset)?);
            axes.push(monitor);
        }
        plans.insert(0, plan);

        Ok(Self {
            _plans: plans,
            _axes: axes,
            _dwell_time: dwell_time,
            _sleeper: sleeper,
        })
    }

    /// Plan of the primary axis.
    pub fn plan(&self) -> &MotionPlan {
        &self._plans[0]
    }

    /// Offset angle of the secondary axis in degree if any.
    pub fn offset_angle(&self) -> Option<f64> {
        self._plans
            .get(1)
            .map(|secondary| secondary.initial - self._plans[0].initial)
    }

    /// Move to the first position of the plan before any capture.
    ///
    /// # Errors
    /// Same as `step_to()` at the index 0.
    pub fn initial_positioning(&mut self) -> ScanResult<()> {
        info!("Move to the initial position.");

        self.step_to(0)
    }

    /// Move all the axes to the plan position at the index and verify the
    /// arrival.
    ///
    /// # Notes
    /// The health of every axis is polled first. The moves are then issued
    /// back-to-back followed by a single dwell, and each axis is verified in
    /// order.
    ///
    /// # Arguments
    /// * `index` - 0-based index in the plan.
    ///
    /// # Errors
    /// `InvalidPlan` if the index is out of the plan. `DeviceDisconnected` if
    /// an axis is unhealthy. `PositionDrift` if an axis does not arrive.
    /// `Device` if a driver call fails. All of them record the index.
    pub fn step_to(&mut self, index: usize) -> ScanResult<()> {
        let targets = self.targets(index)?;

        self.step_to_targets(&targets)
            .map_err(|error| error.at_index(index))
    }

    /// Target of each axis at the plan index. The first one is the primary.
    pub fn targets(&self, index: usize) -> ScanResult<Vec<f64>> {
        self._plans
            .iter()
            .map(|plan| {
                plan.get(index).ok_or_else(|| {
                    ScanError::InvalidPlan(format!(
                        "index {index} is out of the plan with {} positions",
                        plan.len()
                    ))
                })
            })
            .collect()
    }

    fn step_to_targets(&mut self, targets: &[f64]) -> ScanResult<()> {
        for axis in self._axes.iter_mut() {
            if !axis.is_healthy() {
                return Err(ScanError::DeviceDisconnected {
                    axis: axis.role,
                    index: None,
                    fault: axis.last_fault(),
                });
            }
        }

        for (axis, target) in self._axes.iter_mut().zip(targets) {
            axis.move_absolute(*target)?;
        }

        self._sleeper.sleep(seconds_to_duration(self._dwell_time));

        for (axis, target) in self._axes.iter_mut().zip(targets) {
            let actual = axis.current_position()?;
            debug!("{} axis at {actual} deg (target: {target} deg).", axis.role);

            if let Err(drift) = check_arrival(axis.role, *target, actual) {
                error!("{drift}.");
                return Err(drift);
            }
        }

        Ok(())
    }

    /// Release all the rotation stages.
    pub fn close_all(&mut self) {
        for axis in self._axes.iter_mut() {
            axis.close();
        }
    }
}
