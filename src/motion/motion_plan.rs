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

use crate::constants::{MAX_ANGLE_DEG, MAX_PLAN_POSITIONS, PLAN_EPSILON};
use crate::error::{ScanError, ScanResult};

#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct MotionPlan {
    // Initial angle in degree.
    pub initial: f64,
    // Final angle in degree.
    pub last: f64,
    // Step in degree. Negative step walks downward.
    pub step: f64,
    // Ordered target angles in degree.
    positions: Vec<f64>,
}

impl MotionPlan {
    /// Build the plan from the initial angle to the final angle.
    ///
    /// # Notes
    /// Both endpoints are included when the final angle is a whole number of
    /// steps away from the initial angle. Otherwise, the plan stops at the
    /// last position before the final angle. Each position is calculated as
    /// `initial + i * step` instead of accumulating the step.
    ///
    /// # Arguments
    /// * `initial` - Initial angle in degree.
    /// * `last` - Final angle in degree.
    /// * `step` - Step in degree.
    ///
    /// # Returns
    /// A new motion plan.
    ///
    /// # Errors
    /// If the step is zero or not finite, if the step points away from the
    /// final angle, if any position is outside [0, 360) degree, or if the
    /// plan has more than `MAX_PLAN_POSITIONS` positions.
    pub fn build(initial: f64, last: f64, step: f64) -> ScanResult<Self> {
        if !(initial.is_finite() && last.is_finite() && step.is_finite()) {
            return Err(ScanError::InvalidPlan(String::from(
                "angles and step should be finite",
            )));
        }

        if step == 0.0 {
            return Err(ScanError::InvalidPlan(String::from(
                "step should not be zero",
            )));
        }

        for angle in [initial, last] {
            Self::check_angle(angle)?;
        }

        let num_step = (last - initial) / step;
        if num_step < -PLAN_EPSILON {
            return Err(ScanError::InvalidPlan(format!(
                "step {step} can not reach {last} from {initial}"
            )));
        }

        if num_step + PLAN_EPSILON >= MAX_PLAN_POSITIONS as f64 {
            return Err(ScanError::InvalidPlan(format!(
                "step {step} gives more than {MAX_PLAN_POSITIONS} positions"
            )));
        }

        let count = (num_step + PLAN_EPSILON).floor() as usize + 1;
        let positions: Vec<f64> = (0..count)
            .map(|idx| initial + (idx as f64) * step)
            .collect();

        let plan = Self {
            initial,
            last,
            step,
            positions,
        };
        plan.check_range()?;

        Ok(plan)
    }

    /// Plan of the secondary axis that follows this plan with an offset.
    ///
    /// # Arguments
    /// * `offset` - Offset angle in degree.
    ///
    /// # Returns
    /// A new motion plan.
    ///
    /// # Errors
    /// If any shifted position is outside [0, 360) degree.
    pub fn with_offset(&self, offset: f64) -> ScanResult<Self> {
        let plan = Self {
            initial: self.initial + offset,
            last: self.last + offset,
            step: self.step,
            positions: self.positions.iter().map(|position| position + offset).collect(),
        };
        plan.check_range()?;

        Ok(plan)
    }

    /// Check all the positions are in [0, 360) degree.
    fn check_range(&self) -> ScanResult<()> {
        self.positions
            .iter()
            .try_for_each(|position| Self::check_angle(*position))
    }

    fn check_angle(angle: f64) -> ScanResult<()> {
        if !(0.0..MAX_ANGLE_DEG).contains(&angle) {
            return Err(ScanError::InvalidPlan(format!(
                "position {angle} deg is outside [0, {MAX_ANGLE_DEG})"
            )));
        }

        Ok(())
    }

    /// Ordered target angles in degree.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Target angle at the index.
    ///
    /// # Arguments
    /// * `index` - 0-based index.
    ///
    /// # Returns
    /// Angle in degree if the index is in the plan.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.positions.get(index).copied()
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// The plan is never empty once built.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
