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

use nalgebra::DMatrix;
use serde::Serialize;

use crate::acquisition::spectrum::{SpectralTolerance, Spectrum};
use crate::error::{ScanError, ScanResult};
use crate::motion::motion_plan::MotionPlan;

/// Data of one run. It is valid for the persistence only when there is
/// exactly one sample per plan position.
#[derive(Serialize, Clone, Debug)]
pub struct AcquisitionRun {
    // Plan of the primary axis.
    pub plan: MotionPlan,
    // Reference spectrum at the first plan position. Its wavelengths are the
    // domain of the run.
    pub background: Spectrum,
    // Offset of the secondary axis in degree.
    pub offset_angle: Option<f64>,
    // Samples in the plan order.
    _samples: Vec<Spectrum>,
    // Tolerance to compare the wavelengths.
    _tolerance: SpectralTolerance,
}

impl AcquisitionRun {
    /// Start a run with the background.
    ///
    /// # Arguments
    /// * `plan` - Plan of the primary axis.
    /// * `background` - Background spectrum.
    /// * `offset_angle` - Offset of the secondary axis in degree if any.
    /// * `tolerance` - Tolerance to compare the wavelengths.
    ///
    /// # Returns
    /// A new run without any sample.
    pub fn new(
        plan: MotionPlan,
        background: Spectrum,
        offset_angle: Option<f64>,
        tolerance: SpectralTolerance,
    ) -> Self {
        let capacity = plan.len();

        Self {
            plan,
            background,
            offset_angle,
            _samples: Vec::with_capacity(capacity),
            _tolerance: tolerance,
        }
    }

    /// Append the sample of the plan position.
    ///
    /// # Arguments
    /// * `index` - 0-based index in the plan.
    /// * `spectrum` - Captured spectrum.
    ///
    /// # Errors
    /// `InvalidPlan` if the index is not the next one. `SpectralDomainMismatch`
    /// if the wavelengths differ from the background.
    pub fn push_sample(&mut self, index: usize, spectrum: Spectrum) -> ScanResult<()> {
        if index != self._samples.len() || index >= self.plan.len() {
            return Err(ScanError::InvalidPlan(format!(
                "sample {index} is not the next one of {} in the plan with {} positions",
                self._samples.len(),
                self.plan.len()
            )));
        }

        self._tolerance
            .check_domain(&self.background, &spectrum)
            .map_err(|error| error.at_index(index))?;

        self._samples.push(spectrum);

        Ok(())
    }

    pub fn samples(&self) -> &[Spectrum] {
        &self._samples
    }

    /// There is one sample per plan position.
    pub fn is_complete(&self) -> bool {
        self._samples.len() == self.plan.len()
    }

    /// Result matrix. The columns are the wavelengths, background, and the
    /// intensities of each plan position.
    ///
    /// # Returns
    /// Matrix with one row per pixel.
    ///
    /// # Errors
    /// `IncompleteRun` if any sample is missing.
    pub fn to_matrix(&self) -> ScanResult<DMatrix<f64>> {
        if !self.is_complete() {
            return Err(ScanError::IncompleteRun);
        }

        let mut columns = vec![self.background.wavelengths(), self.background.intensities()];
        columns.extend(self._samples.iter().map(|sample| sample.intensities()));

        Ok(DMatrix::from_fn(
            self.background.len(),
            columns.len(),
            |row, column| columns[column][row],
        ))
    }
}
