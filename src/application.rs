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

use log::{error, info, warn};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag::register,
};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::acquisition::operator_gate::{AutoProceedGate, ConsoleGate, OperatorGate};
use crate::acquisition::orchestrator::AcquisitionOrchestrator;
use crate::acquisition::persistence::{path_with_suffix, CsvPersistence, RunPersistence};
use crate::config::ScanConfig;
use crate::constants::MAX_NAMING_SUFFIX;
use crate::device::actuator::ActuatorConnector;
use crate::device::device_info::DeviceInfo;
use crate::device::spectrometer::SpectrometerConnector;
use crate::error::{ScanError, ScanResult};
use crate::event_queue::EventQueue;
use crate::mock::mock_actuator::MockActuatorConnector;
use crate::mock::mock_spectrometer::MockSpectrometerConnector;
use crate::utility::{Sleeper, ThreadSleeper};

/// Options of the application from the command line.
#[derive(Clone, Debug)]
pub struct RunOptions {
    // Scan parameters file.
    pub filepath_scan: PathBuf,
    // Actuator parameters file.
    pub filepath_actuator: PathBuf,
    // Run with the simulated devices or not.
    pub is_simulation_mode: bool,
    // Proceed without the operator confirmation or not.
    pub skip_operator_gate: bool,
    // Override of the result file name.
    pub output_file: Option<String>,
}

/// Run the application.
///
/// # Arguments
/// * `options` - Options from the command line.
///
/// # Returns
/// Path of the saved result file.
///
/// # Errors
/// If the configuration is not valid, the run is aborted, or the result can
/// not be saved.
pub fn run(options: &RunOptions) -> ScanResult<PathBuf> {
    let mode = if options.is_simulation_mode {
        "simulation mode"
    } else {
        "hardware mode"
    };
    info!("Run the polarization scan in {mode}.");

    let mut config = ScanConfig::new(&options.filepath_scan, &options.filepath_actuator)?;
    if let Some(output_file) = &options.output_file {
        config.output_file = output_file.clone();
        config.validate()?;
    }

    // Register the signals that stop the run
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT] {
        if let Err(error) = register(signal, Arc::clone(&stop)) {
            warn!("Failed to register the signal {signal}: {error}.");
        }
    }

    let gate: Box<dyn OperatorGate> = if options.skip_operator_gate
        || options.is_simulation_mode
        || !config.use_operator_gate
    {
        Box::new(AutoProceedGate::new())
    } else {
        Box::new(ConsoleGate::new())
    };

    let (mut actuators, mut spectrometers) = create_simulation_devices(&config, options)?;

    let sleeper: Rc<dyn Sleeper> = Rc::new(ThreadSleeper::scaled(config.simulation_time_scale));

    execute_run(
        &config,
        &mut actuators,
        &mut spectrometers,
        gate,
        stop,
        sleeper,
    )
}

/// List the devices visible to the connectors without opening them.
///
/// # Arguments
/// * `options` - Options from the command line.
///
/// # Returns
/// Visible rotation stages followed by the visible spectrometers.
///
/// # Errors
/// If the configuration is not valid or the devices can not be listed.
pub fn list_available_devices(options: &RunOptions) -> ScanResult<Vec<DeviceInfo>> {
    let config = ScanConfig::new(&options.filepath_scan, &options.filepath_actuator)?;
    let (mut actuators, mut spectrometers) = create_simulation_devices(&config, options)?;

    list_devices(&mut actuators, &mut spectrometers)
}

/// List the devices visible to the connectors.
///
/// # Arguments
/// * `actuators` - Factory of the actuator connections.
/// * `spectrometers` - Factory of the spectrometer connections.
///
/// # Returns
/// Visible rotation stages followed by the visible spectrometers.
///
/// # Errors
/// If any connector fails to list its devices.
pub fn list_devices(
    actuators: &mut dyn ActuatorConnector,
    spectrometers: &mut dyn SpectrometerConnector,
) -> ScanResult<Vec<DeviceInfo>> {
    let mut devices = actuators
        .list_devices()
        .map_err(|error| ScanError::Device {
            device: String::from("actuator connector"),
            index: None,
            reason: error.to_string(),
        })?;

    devices.extend(
        spectrometers
            .list_devices()
            .map_err(|error| ScanError::Device {
                device: String::from("spectrometer connector"),
                index: None,
                reason: error.to_string(),
            })?,
    );

    Ok(devices)
}

/// Create the simulated devices named in the configuration.
///
/// # Arguments
/// * `config` - Validated scan configuration.
/// * `options` - Options from the command line.
///
/// # Returns
/// Connectors of the simulated rotation stages and spectrometer.
///
/// # Errors
/// Not in the simulation mode. No hardware driver is linked into this
/// build.
fn create_simulation_devices(
    config: &ScanConfig,
    options: &RunOptions,
) -> ScanResult<(MockActuatorConnector, MockSpectrometerConnector)> {
    if !options.is_simulation_mode {
        return Err(ScanError::Configuration(String::from(
            "no hardware driver is linked into this build. Use the simulation mode",
        )));
    }

    let mut actuators = MockActuatorConnector::new();
    let polarizer = actuators.add_actuator(&config.primary.identifier);
    if let Some(secondary) = &config.secondary {
        actuators.add_actuator(&secondary.identifier);
    }

    let spectrometers = MockSpectrometerConnector::new(&config.spectrometer_serial);
    spectrometers.state.borrow_mut().polarizer = Some(polarizer);

    Ok((actuators, spectrometers))
}

/// Connect the devices, execute the run, and save the result.
///
/// # Arguments
/// * `config` - Validated scan configuration.
/// * `actuators` - Factory of the actuator connections.
/// * `spectrometers` - Factory of the spectrometer connections.
/// * `gate` - Operator gate.
/// * `stop` - Stop flag set by the termination signal.
/// * `sleeper` - Sleeper for the waits.
///
/// # Returns
/// Path of the saved result file.
///
/// # Errors
/// If any device fails to connect, the run is aborted, or the result can not
/// be saved.
pub fn execute_run(
    config: &ScanConfig,
    actuators: &mut dyn ActuatorConnector,
    spectrometers: &mut dyn SpectrometerConnector,
    gate: Box<dyn OperatorGate>,
    stop: Arc<AtomicBool>,
    sleeper: Rc<dyn Sleeper>,
) -> ScanResult<PathBuf> {
    match list_devices(actuators, spectrometers) {
        Ok(devices) => {
            for device in devices {
                info!("Visible device: {device}.");
            }
        }
        Err(error) => warn!("Failed to list the devices: {error}."),
    }

    let mut orchestrator =
        AcquisitionOrchestrator::connect(config, actuators, spectrometers, gate, stop, sleeper)?;

    let result = orchestrator.execute();
    log_events(&mut orchestrator.event_queue);
    if let Err(error) = result {
        error!("Run is aborted. No data is saved.");
        return Err(error);
    }

    let path = save_run(
        &mut orchestrator,
        &mut CsvPersistence::new(),
        &config.output_path(),
    );
    log_events(&mut orchestrator.event_queue);

    path
}

/// Save the completed run. A naming conflict is resolved by the numeric
/// suffix.
///
/// # Arguments
/// * `orchestrator` - Orchestrator holding the completed run.
/// * `persistence` - Persistence of the run.
/// * `path` - Preferred path.
///
/// # Returns
/// Path of the saved file.
///
/// # Errors
/// If the run can not be saved or every suffix is taken.
pub fn save_run(
    orchestrator: &mut AcquisitionOrchestrator,
    persistence: &mut dyn RunPersistence,
    path: &Path,
) -> ScanResult<PathBuf> {
    for suffix in 0..=MAX_NAMING_SUFFIX {
        let candidate = if suffix == 0 {
            PathBuf::from(path)
        } else {
            path_with_suffix(path, suffix)
        };

        match orchestrator.finalize(persistence, &candidate) {
            Ok(()) => return Ok(candidate),
            Err(ScanError::NamingConflict { .. }) => {
                warn!("{candidate:?} exists already. Try another name.");
            }
            Err(error) => return Err(error),
        }
    }

    Err(ScanError::NamingConflict {
        path: PathBuf::from(path),
    })
}

/// Log and clear the events.
///
/// # Arguments
/// * `event_queue` - Event queue.
fn log_events(event_queue: &mut EventQueue) {
    for event in event_queue.get_events_and_clear() {
        info!("Event: {event}");
    }
}
