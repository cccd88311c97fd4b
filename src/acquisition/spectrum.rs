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

use approx::relative_eq;
use serde::Serialize;

use crate::constants::{SPECTRAL_TOLERANCE_ABSOLUTE, SPECTRAL_TOLERANCE_RELATIVE};
use crate::error::{ScanError, ScanResult};

#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct Spectrum {
    // Wavelengths in nm.
    wavelengths: Vec<f64>,
    // Intensities in counts.
    intensities: Vec<f64>,
}

impl Spectrum {
    /// Create a new spectrum.
    ///
    /// # Arguments
    /// * `wavelengths` - Wavelengths in nm.
    /// * `intensities` - Intensities in counts.
    ///
    /// # Returns
    /// A new spectrum.
    ///
    /// # Errors
    /// If the spectrum is empty or the lengths are different.
    pub fn new(wavelengths: Vec<f64>, intensities: Vec<f64>) -> ScanResult<Self> {
        if wavelengths.is_empty() {
            return Err(ScanError::SpectralDomainMismatch {
                index: None,
                detail: String::from("spectrum is empty"),
            });
        }

        if wavelengths.len() != intensities.len() {
            return Err(ScanError::SpectralDomainMismatch {
                index: None,
                detail: format!(
                    "{} wavelengths do not match {} intensities",
                    wavelengths.len(),
                    intensities.len()
                ),
            });
        }

        Ok(Self {
            wavelengths,
            intensities,
        })
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }
}

/// Tolerance to compare two wavelength axes. Two wavelengths match if the
/// difference is within the absolute tolerance or within the relative
/// tolerance of the larger magnitude.
#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
pub struct SpectralTolerance {
    pub relative: f64,
    pub absolute: f64,
}

impl SpectralTolerance {
    pub fn new(relative: f64, absolute: f64) -> Self {
        Self { relative, absolute }
    }

    /// Check the spectrum has the same wavelengths as the reference.
    ///
    /// # Arguments
    /// * `reference` - Reference spectrum. It is the background of a run.
    /// * `spectrum` - Spectrum to check.
    ///
    /// # Errors
    /// `SpectralDomainMismatch` with the first mismatched pixel.
    pub fn check_domain(&self, reference: &Spectrum, spectrum: &Spectrum) -> ScanResult<()> {
        if reference.len() != spectrum.len() {
            return Err(ScanError::SpectralDomainMismatch {
                index: None,
                detail: format!(
                    "{} pixels instead of {}",
                    spectrum.len(),
                    reference.len()
                ),
            });
        }

        let mismatch = reference
            .wavelengths()
            .iter()
            .zip(spectrum.wavelengths())
            .enumerate()
            .find(|(_, (expected, actual))| {
                !relative_eq!(
                    **expected,
                    **actual,
                    epsilon = self.absolute,
                    max_relative = self.relative
                )
            });

        if let Some((pixel, (expected, actual))) = mismatch {
            return Err(ScanError::SpectralDomainMismatch {
                index: None,
                detail: format!("pixel {pixel} is at {actual} nm instead of {expected} nm"),
            });
        }

        Ok(())
    }
}

impl Default for SpectralTolerance {
    fn default() -> Self {
        Self::new(SPECTRAL_TOLERANCE_RELATIVE, SPECTRAL_TOLERANCE_ABSOLUTE)
    }
}
