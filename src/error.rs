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

//! Error types of the scan.
//!
//! `DeviceError` is what a device driver reports. `ScanError` is what the
//! library reports to its caller: every variant names the failure kind and
//! carries the axis, plan index and values needed to inspect the optical
//! setup before the whole run is repeated.

use std::path::PathBuf;
use thiserror::Error;

use crate::device::fault::FaultEvent;
use crate::enums::{AxisRole, DeviceState, RunState};

/// Convenience alias for results using the scan error type.
pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Failure reported by a device driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("failed to open the device: {0}")]
    Open(String),

    #[error("device communication failed: {0}")]
    Communication(String),
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to connect to {device}: {reason}")]
    Connection { device: String, reason: String },

    #[error("connection of {device} is not established after the recovery maneuver")]
    ConnectionNotEstablished { device: String },

    #[error("{axis} axis drifted at plan index {index:?}: expected {expected} deg, actual {actual} deg")]
    PositionDrift {
        axis: AxisRole,
        index: Option<usize>,
        expected: f64,
        actual: f64,
    },

    #[error("{axis} axis is disconnected at plan index {index:?} (last fault: {fault:?})")]
    DeviceDisconnected {
        axis: AxisRole,
        index: Option<usize>,
        fault: Option<FaultEvent>,
    },

    #[error("spectral domain changed at plan index {index:?}: {detail}")]
    SpectralDomainMismatch { index: Option<usize>, detail: String },

    #[error("file {path:?} already exists and will not be overwritten")]
    NamingConflict { path: PathBuf },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid motion plan: {0}")]
    InvalidPlan(String),

    #[error("cannot {operation} in the {state} state")]
    InvalidState { operation: String, state: String },

    #[error("{device} failed at plan index {index:?}: {reason}")]
    Device {
        device: String,
        index: Option<usize>,
        reason: String,
    },

    #[error("run cancelled before plan index {index}")]
    Cancelled { index: usize },

    #[error("run is incomplete and cannot be persisted")]
    IncompleteRun,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration file error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ScanError {
    /// Attach the plan index to the error if it records one.
    ///
    /// # Arguments
    /// * `plan_index` - 0-based index in the motion plan.
    ///
    /// # Returns
    /// The same error with the index filled in.
    pub fn at_index(mut self, plan_index: usize) -> Self {
        match &mut self {
            ScanError::PositionDrift { index, .. }
            | ScanError::DeviceDisconnected { index, .. }
            | ScanError::SpectralDomainMismatch { index, .. }
            | ScanError::Device { index, .. } => {
                *index = Some(plan_index);
            }
            _ => {}
        }

        self
    }

    /// Create the error of a rejected operation in the device state.
    pub fn invalid_device_state(operation: &str, state: DeviceState) -> Self {
        ScanError::InvalidState {
            operation: String::from(operation),
            state: String::from(state.as_ref()),
        }
    }

    /// Create the error of a rejected operation in the run state.
    pub fn invalid_run_state(operation: &str, state: RunState) -> Self {
        ScanError::InvalidState {
            operation: String::from(operation),
            state: String::from(state.as_ref()),
        }
    }
}
