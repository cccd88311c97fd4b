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

use csv::WriterBuilder;
use log::info;
use std::fs::create_dir_all;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::acquisition::acquisition_run::AcquisitionRun;
use crate::error::{ScanError, ScanResult};

/// Store a completed run.
pub trait RunPersistence {
    /// Save the run. An existing file is never overwritten.
    ///
    /// # Arguments
    /// * `run` - Completed run.
    /// * `path` - Target path.
    ///
    /// # Errors
    /// `IncompleteRun` if any sample is missing. `NamingConflict` if the path
    /// exists already.
    fn save(&mut self, run: &AcquisitionRun, path: &Path) -> ScanResult<()>;
}

/// Comma-separated text file. The commented header records the creation
/// time, the offset angle of the secondary axis, and the plan positions. Each
/// row is one pixel: wavelength, background, and the intensity at each plan
/// position.
///
/// The file is written to a temporary file in the target directory first and
/// then moved to the target path without replacing an existing file. A failed
/// write leaves nothing at the target path.
#[derive(Default)]
pub struct CsvPersistence;

impl CsvPersistence {
    pub fn new() -> Self {
        Self
    }

    /// Header lines of the file.
    fn header(run: &AcquisitionRun) -> ScanResult<Vec<String>> {
        let created = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|error| io::Error::new(io::ErrorKind::Other, error.to_string()))?;

        let positions: Vec<String> = run
            .plan
            .positions()
            .iter()
            .map(|position| position.to_string())
            .collect();

        let mut lines = vec![format!("# Created: {created}")];
        if let Some(offset) = run.offset_angle {
            lines.push(format!("# Offset angle (deg): {offset}"));
        }
        lines.push(format!("# Positions (deg): {}", positions.join(", ")));
        lines.push(String::from(
            "# Columns: wavelength (nm), background, intensity at each position",
        ));

        Ok(lines)
    }

    /// Write the header and the rows of the run.
    ///
    /// # Arguments
    /// * `run` - Completed run.
    /// * `writer` - Destination.
    ///
    /// # Errors
    /// `IncompleteRun` if any sample is missing, or the error of the writer.
    pub fn write_run<W: Write>(run: &AcquisitionRun, mut writer: W) -> ScanResult<()> {
        let matrix = run.to_matrix()?;

        for line in Self::header(run)? {
            writeln!(writer, "{line}")?;
        }

        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        for row in matrix.row_iter() {
            csv_writer.write_record(row.iter().map(|value| value.to_string()))?;
        }
        csv_writer.flush()?;

        Ok(())
    }
}

impl RunPersistence for CsvPersistence {
    fn save(&mut self, run: &AcquisitionRun, path: &Path) -> ScanResult<()> {
        if !run.is_complete() {
            return Err(ScanError::IncompleteRun);
        }

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        create_dir_all(directory)?;

        if path.exists() {
            return Err(ScanError::NamingConflict {
                path: PathBuf::from(path),
            });
        }

        let mut file = NamedTempFile::new_in(directory)?;
        Self::write_run(run, file.as_file_mut())?;
        file.as_file().sync_all()?;

        file.persist_noclobber(path)
            .map_err(|error| match error.error.kind() {
                io::ErrorKind::AlreadyExists => ScanError::NamingConflict {
                    path: PathBuf::from(path),
                },
                _ => ScanError::Io(error.error),
            })?;

        info!("Run is saved to {path:?}.");

        Ok(())
    }
}

/// Path with a numeric suffix to resolve the naming conflict. For example,
/// "data/scan.txt" becomes "data/scan_1.txt".
///
/// # Arguments
/// * `path` - Conflicted path.
/// * `suffix` - Numeric suffix.
///
/// # Returns
/// New path.
pub fn path_with_suffix(path: &Path, suffix: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match path.extension() {
        Some(extension) => format!("{stem}_{suffix}.{}", extension.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    };

    path.with_file_name(file_name)
}
