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

//! Top-level driver of a run.
//!
//! A run either ends with a fully validated sample at every plan position or
//! ends with no data at all. Any failure during the background capture or the
//! stepping aborts the run: the partial data is dropped, every device handle
//! is closed once, and the error is returned with the axis, plan index, and
//! values needed to inspect the setup.

use log::{error, info, warn};
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::acquisition::acquisition_run::AcquisitionRun;
use crate::acquisition::operator_gate::OperatorGate;
use crate::acquisition::persistence::RunPersistence;
use crate::acquisition::spectrum::{SpectralTolerance, Spectrum};
use crate::config::ScanConfig;
use crate::device::actuator::ActuatorConnector;
use crate::device::health_monitor::HealthMonitor;
use crate::device::spectrometer::{set_integration_time, SpectrometerConnector, SpectrometerHandle};
use crate::enums::{AxisRole, RunState};
use crate::error::{ScanError, ScanResult};
use crate::event::Event;
use crate::event_queue::EventQueue;
use crate::motion::sequencer::MotionSequencer;
use crate::utility::Sleeper;

const SPECTROMETER: &str = "spectrometer";

const PROMPT_BACKGROUND: &str = "Block the light source to capture the background.";
const PROMPT_COLLECTION: &str = "Unblock the light source to begin collecting.";

pub struct AcquisitionOrchestrator {
    // Run state.
    _state: RunState,
    // Events of the run.
    pub event_queue: EventQueue,
    // Rotation stages and the plan.
    _sequencer: MotionSequencer,
    // Spectrometer. None after the release.
    _spectrometer: Option<Box<dyn SpectrometerHandle>>,
    // Confirmation before the background and before the collection.
    _gate: Box<dyn OperatorGate>,
    // Tolerance to compare the wavelengths with the background.
    _tolerance: SpectralTolerance,
    // Set by the termination signal.
    _stop: Arc<AtomicBool>,
    // Run in progress, or the completed run waiting for the persistence.
    _run: Option<AcquisitionRun>,
}

impl AcquisitionOrchestrator {
    /// Create a new orchestrator with the connected devices.
    ///
    /// # Arguments
    /// * `sequencer` - Connected rotation stages and the plan.
    /// * `spectrometer` - Connected spectrometer.
    /// * `gate` - Operator gate.
    /// * `tolerance` - Tolerance to compare the wavelengths.
    /// * `stop` - Stop flag set by the termination signal.
    ///
    /// # Returns
    /// A new orchestrator in the idle state.
    pub fn new(
        sequencer: MotionSequencer,
        spectrometer: Box<dyn SpectrometerHandle>,
        gate: Box<dyn OperatorGate>,
        tolerance: SpectralTolerance,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let mut event_queue = EventQueue::new();
        event_queue.add_event(Event::get_message_run_state(RunState::Idle));

        Self {
            _state: RunState::Idle,
            event_queue,
            _sequencer: sequencer,
            _spectrometer: Some(spectrometer),
            _gate: gate,
            _tolerance: tolerance,
            _stop: stop,
            _run: None,
        }
    }

    /// Connect all the devices and create the orchestrator.
    ///
    /// # Notes
    /// The actuators connect first (primary, then secondary) and the
    /// spectrometer last. A failure at any stage closes every handle opened
    /// so far.
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
    /// A new orchestrator in the idle state.
    ///
    /// # Errors
    /// If the plan is not valid or any device fails to connect.
    pub fn connect(
        config: &ScanConfig,
        actuators: &mut dyn ActuatorConnector,
        spectrometers: &mut dyn SpectrometerConnector,
        gate: Box<dyn OperatorGate>,
        stop: Arc<AtomicBool>,
        sleeper: Rc<dyn Sleeper>,
    ) -> ScanResult<Self> {
        let (plan, _) = config.build_plans()?;

        let mut primary = HealthMonitor::new(
            AxisRole::Primary,
            config.primary.clone(),
            Rc::clone(&sleeper),
        );
        primary.connect(actuators)?;

        let secondary = match (&config.secondary, config.offset_angle) {
            (Some(axis_config), Some(offset)) => {
                let mut monitor = HealthMonitor::new(
                    AxisRole::Secondary,
                    axis_config.clone(),
                    Rc::clone(&sleeper),
                );
                monitor.connect(actuators)?;

                Some((monitor, offset))
            }
            _ => None,
        };

        let sequencer = MotionSequencer::new(plan, primary, secondary, config.dwell_time, sleeper)?;

        let device = format!("{SPECTROMETER} ({})", config.spectrometer_serial);
        let mut spectrometer = spectrometers
            .connect(&config.spectrometer_serial)
            .map_err(|error| ScanError::Connection {
                device: device.clone(),
                reason: error.to_string(),
            })?;

        if let Err(error) = set_integration_time(spectrometer.as_mut(), config.integration_time_ms)
        {
            spectrometer.close();
            return Err(ScanError::Connection {
                device,
                reason: error.to_string(),
            });
        }
        info!("{device} is ready.");

        Ok(Self::new(
            sequencer,
            spectrometer,
            gate,
            SpectralTolerance::new(
                config.spectral_tolerance_relative,
                config.spectral_tolerance_absolute,
            ),
            stop,
        ))
    }

    /// Run state.
    pub fn state(&self) -> RunState {
        self._state
    }

    /// Run in progress or the completed run. None after the abort.
    pub fn run(&self) -> Option<&AcquisitionRun> {
        self._run.as_ref()
    }

    /// Execute the whole run: the background and every plan position.
    ///
    /// # Errors
    /// The error that aborted the run.
    pub fn execute(&mut self) -> ScanResult<()> {
        self.run_background()?;

        for index in 0..self._sequencer.plan().len() {
            self.run_step(index)?;
        }

        Ok(())
    }

    /// Move to the first plan position and capture the background. Its
    /// wavelengths become the domain of the run.
    ///
    /// # Notes
    /// The operator is asked to block the light before the capture and to
    /// unblock it after the capture.
    ///
    /// # Errors
    /// `InvalidState` if not idle. Any other error aborts the run.
    pub fn run_background(&mut self) -> ScanResult<()> {
        if self._state != RunState::Idle {
            return Err(ScanError::invalid_run_state(
                "capture the background",
                self._state,
            ));
        }

        self.transition(RunState::BackgroundCapture);

        let result = self.capture_background();
        result.map_err(|error| self.abort(error))?;

        self.transition(RunState::Stepping);

        Ok(())
    }

    fn capture_background(&mut self) -> ScanResult<()> {
        self.check_stop(0)?;
        self._sequencer.initial_positioning()?;

        self._gate.wait_for_proceed(PROMPT_BACKGROUND)?;
        let background = self.capture().map_err(|error| error.at_index(0))?;

        info!("Background is captured with {} pixels.", background.len());
        self.event_queue
            .add_event(Event::get_message_background_captured(background.len()));

        self._run = Some(AcquisitionRun::new(
            self._sequencer.plan().clone(),
            background,
            self._sequencer.offset_angle(),
            self._tolerance,
        ));

        self._gate.wait_for_proceed(PROMPT_COLLECTION)
    }

    /// Move to the plan position at the index and capture the sample. The
    /// run is finalizing after the last sample and every device handle is
    /// closed.
    ///
    /// # Arguments
    /// * `index` - 0-based index in the plan. It should be the next one.
    ///
    /// # Errors
    /// `InvalidState` if not stepping. `InvalidPlan` if the index is not the
    /// next one. Any other error aborts the run.
    pub fn run_step(&mut self, index: usize) -> ScanResult<()> {
        if self._state != RunState::Stepping {
            return Err(ScanError::invalid_run_state("run a step", self._state));
        }

        let num_sample = self.run().map_or(0, |run| run.samples().len());
        if index != num_sample {
            warn!("Reject the step {index}. The next one is {num_sample}.");
            return Err(ScanError::InvalidPlan(format!(
                "step {index} is not the next one {num_sample}"
            )));
        }

        let result = self.capture_sample(index);
        result.map_err(|error| self.abort(error))?;

        if self.run().is_some_and(|run| run.is_complete()) {
            self.close_all();
            self.transition(RunState::Finalizing);
        }

        Ok(())
    }

    fn capture_sample(&mut self, index: usize) -> ScanResult<()> {
        self.check_stop(index)?;

        let targets = self._sequencer.targets(index)?;
        self._sequencer.step_to(index)?;
        self.event_queue
            .add_event(Event::get_message_position_reached(index, &targets));

        let spectrum = self.capture().map_err(|error| error.at_index(index))?;
        let max_intensity = spectrum
            .intensities()
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        let run = self
            ._run
            .as_mut()
            .ok_or_else(|| ScanError::invalid_run_state("add a sample", RunState::Stepping))?;
        run.push_sample(index, spectrum)?;

        info!(
            "Sample {}/{} is captured at {targets:?} deg.",
            index + 1,
            run.plan.len()
        );
        self.event_queue
            .add_event(Event::get_message_sample_captured(index, max_intensity));

        Ok(())
    }

    /// Save the completed run. The run is kept when the persistence fails so
    /// that the caller can retry with another path.
    ///
    /// # Arguments
    /// * `persistence` - Persistence of the run.
    /// * `path` - Target path.
    ///
    /// # Errors
    /// `InvalidState` if not finalizing. The error of the persistence, such
    /// as `NamingConflict`, otherwise.
    pub fn finalize(
        &mut self,
        persistence: &mut dyn RunPersistence,
        path: &Path,
    ) -> ScanResult<()> {
        if self._state != RunState::Finalizing {
            return Err(ScanError::invalid_run_state("save the run", self._state));
        }

        let run = self
            ._run
            .as_ref()
            .ok_or_else(|| ScanError::invalid_run_state("save the run", self._state))?;

        if let Err(error) = persistence.save(run, path) {
            warn!("Failed to save the run: {error}.");
            return Err(error);
        }

        self.event_queue.add_event(Event::get_message_run_saved(path));
        self.transition(RunState::Saved);

        Ok(())
    }

    /// Abort the run. The partial data is dropped and every device handle is
    /// closed.
    ///
    /// # Arguments
    /// * `error` - Reason of the abort.
    ///
    /// # Returns
    /// The same error for the caller.
    fn abort(&mut self, error: ScanError) -> ScanError {
        error!("Abort the run: {error}.");

        if let ScanError::DeviceDisconnected {
            axis,
            fault: Some(fault),
            ..
        } = &error
        {
            self.event_queue
                .add_event(Event::get_message_fault(*axis, fault));
        }
        self.event_queue
            .add_event(Event::get_message_run_aborted(&error));

        self._run = None;
        self.close_all();
        self.transition(RunState::Aborted);

        error
    }

    /// Capture a spectrum.
    fn capture(&mut self) -> ScanResult<Spectrum> {
        let state = self._state;
        let spectrometer = self
            ._spectrometer
            .as_mut()
            .ok_or_else(|| ScanError::invalid_run_state("capture a spectrum", state))?;

        let (wavelengths, intensities) =
            spectrometer
                .capture_spectrum()
                .map_err(|error| ScanError::Device {
                    device: String::from(SPECTROMETER),
                    index: None,
                    reason: error.to_string(),
                })?;

        Spectrum::new(wavelengths, intensities)
    }

    /// Check the termination signal.
    fn check_stop(&self, index: usize) -> ScanResult<()> {
        if self._stop.load(Ordering::SeqCst) {
            return Err(ScanError::Cancelled { index });
        }

        Ok(())
    }

    /// Release all the device handles. Each handle is closed only once.
    fn close_all(&mut self) {
        self._sequencer.close_all();

        if let Some(mut spectrometer) = self._spectrometer.take() {
            spectrometer.close();
            info!("Spectrometer is closed.");
        }
    }

    fn transition(&mut self, state: RunState) {
        info!("Run state: {} -> {}.", self._state.as_ref(), state.as_ref());

        self._state = state;
        self.event_queue
            .add_event(Event::get_message_run_state(state));
    }
}

impl Drop for AcquisitionOrchestrator {
    fn drop(&mut self) {
        if !self._state.is_terminal() {
            warn!(
                "Run is dropped in the {} state. Unsaved data is discarded.",
                self._state.as_ref()
            );
        }

        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::fs::write;
    use tempfile::tempdir;

    use crate::acquisition::operator_gate::AutoProceedGate;
    use crate::acquisition::persistence::CsvPersistence;
    use crate::device::fault::FaultEvent;
    use crate::mock::mock_actuator::{MockActuatorConnector, MockActuatorState};
    use crate::mock::mock_constants::{
        TEST_PRIMARY_PORT, TEST_SECONDARY_PORT, TEST_SPECTROMETER_SERIAL,
    };
    use crate::mock::mock_sleeper::RecordingSleeper;
    use crate::mock::mock_spectrometer::{MockSpectrometerConnector, MockSpectrometerState};

    struct Rig {
        actuators: MockActuatorConnector,
        primary: Rc<RefCell<MockActuatorState>>,
        secondary: Rc<RefCell<MockActuatorState>>,
        spectrometers: MockSpectrometerConnector,
        spectrometer: Rc<RefCell<MockSpectrometerState>>,
        stop: Arc<AtomicBool>,
        sleeper: Rc<RecordingSleeper>,
    }

    struct SharedGate {
        prompts: Rc<RefCell<Vec<String>>>,
    }

    impl OperatorGate for SharedGate {
        fn wait_for_proceed(&mut self, prompt: &str) -> ScanResult<()> {
            self.prompts.borrow_mut().push(String::from(prompt));

            Ok(())
        }
    }

    fn create_config(offset: Option<f64>) -> ScanConfig {
        let mut config = ScanConfig::new(
            Path::new("config/parameters_scan.yaml"),
            Path::new("config/parameters_actuator.yaml"),
        )
        .unwrap();

        if offset.is_some() {
            let mut secondary = config.primary.clone();
            secondary.identifier = String::from(TEST_SECONDARY_PORT);

            config.secondary = Some(secondary);
            config.offset_angle = offset;
        }

        config
    }

    fn create_rig() -> Rig {
        let mut actuators = MockActuatorConnector::new();
        let primary = actuators.add_actuator(TEST_PRIMARY_PORT);
        let secondary = actuators.add_actuator(TEST_SECONDARY_PORT);

        let spectrometers = MockSpectrometerConnector::new(TEST_SPECTROMETER_SERIAL);
        let spectrometer = Rc::clone(&spectrometers.state);

        Rig {
            actuators,
            primary,
            secondary,
            spectrometers,
            spectrometer,
            stop: Arc::new(AtomicBool::new(false)),
            sleeper: Rc::new(RecordingSleeper::new()),
        }
    }

    fn create_orchestrator(rig: &mut Rig, config: &ScanConfig) -> ScanResult<AcquisitionOrchestrator> {
        AcquisitionOrchestrator::connect(
            config,
            &mut rig.actuators,
            &mut rig.spectrometers,
            Box::new(AutoProceedGate::new()),
            Arc::clone(&rig.stop),
            Rc::clone(&rig.sleeper) as Rc<dyn Sleeper>,
        )
    }

    fn assert_all_closed_once(rig: &Rig, is_dual_axis: bool) {
        assert_eq!(rig.primary.borrow().close_count, 1);
        assert_eq!(
            rig.secondary.borrow().close_count,
            if is_dual_axis { 1 } else { 0 }
        );
        assert_eq!(rig.spectrometer.borrow().close_count, 1);
    }

    #[test]
    fn test_connect() {
        let mut rig = create_rig();

        let orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        assert_eq!(orchestrator.state(), RunState::Idle);
        assert!(orchestrator.run().is_none());
        assert_eq!(
            rig.spectrometer.borrow().integration_time_micros,
            Some(100000)
        );
        assert_eq!(rig.actuators.connect_count, 1);
    }

    #[test]
    fn test_connect_integration_time_retry() {
        let mut rig = create_rig();
        rig.spectrometer.borrow_mut().integration_time_failures = 1;

        assert!(create_orchestrator(&mut rig, &create_config(None)).is_ok());
    }

    #[test]
    fn test_connect_integration_time_fail() {
        let mut rig = create_rig();
        rig.spectrometer.borrow_mut().integration_time_failures = 2;

        assert!(matches!(
            create_orchestrator(&mut rig, &create_config(None)),
            Err(ScanError::Connection { .. })
        ));
        assert_all_closed_once(&rig, false);
    }

    #[test]
    fn test_connect_spectrometer_fail() {
        let mut rig = create_rig();
        let mut config = create_config(Some(10.0));
        config.spectrometer_serial = String::from("wrong");

        assert!(matches!(
            create_orchestrator(&mut rig, &config),
            Err(ScanError::Connection { .. })
        ));

        // Actuators are closed
        assert_eq!(rig.primary.borrow().close_count, 1);
        assert_eq!(rig.secondary.borrow().close_count, 1);
    }

    #[test]
    fn test_connect_secondary_fail() {
        let mut rig = create_rig();
        rig.secondary.borrow_mut().is_healthy = false;

        assert!(matches!(
            create_orchestrator(&mut rig, &create_config(Some(10.0))),
            Err(ScanError::ConnectionNotEstablished { .. })
        ));

        assert_eq!(rig.primary.borrow().close_count, 1);
        assert_eq!(rig.secondary.borrow().close_count, 1);
        assert_eq!(rig.spectrometer.borrow().close_count, 0);
    }

    #[test]
    fn test_execute() {
        let mut rig = create_rig();
        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        orchestrator.execute().unwrap();

        assert_eq!(orchestrator.state(), RunState::Finalizing);

        let run = orchestrator.run().unwrap();
        assert!(run.is_complete());
        assert_eq!(run.samples().len(), 5);
        assert!(run.offset_angle.is_none());

        // Initial positioning and the five steps
        assert_eq!(
            rig.primary.borrow().moves,
            vec![0, 0, 86383, 172767, 259151, 345535]
        );
        assert_eq!(rig.spectrometer.borrow().capture_count, 6);
        assert_eq!(rig.sleeper.seconds(), vec![30.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0]);

        assert_all_closed_once(&rig, false);

        let states: Vec<String> = orchestrator
            .event_queue
            .find_events("runState")
            .iter()
            .map(|event| String::from(event["state"].as_str().unwrap()))
            .collect();
        assert_eq!(
            states,
            vec!["Idle", "BackgroundCapture", "Stepping", "Finalizing"]
        );
        assert_eq!(orchestrator.event_queue.find_events("sampleCaptured").len(), 5);
    }

    #[test]
    fn test_execute_dual_axis() {
        let mut rig = create_rig();
        let mut orchestrator =
            create_orchestrator(&mut rig, &create_config(Some(90.0))).unwrap();

        orchestrator.execute().unwrap();

        assert_eq!(orchestrator.run().unwrap().offset_angle, Some(90.0));
        assert_eq!(rig.secondary.borrow().moves.len(), 6);
        assert_eq!(rig.secondary.borrow().moves[1], 172767);

        let events = orchestrator.event_queue.find_events("positionReached");
        assert_eq!(events[4]["positions"][0], 180.0);
        assert_eq!(events[4]["positions"][1], 270.0);

        assert_all_closed_once(&rig, true);
    }

    #[test]
    fn test_operator_gates() {
        let mut rig = create_rig();
        let prompts = Rc::new(RefCell::new(Vec::new()));

        let mut orchestrator = AcquisitionOrchestrator::connect(
            &create_config(None),
            &mut rig.actuators,
            &mut rig.spectrometers,
            Box::new(SharedGate {
                prompts: Rc::clone(&prompts),
            }),
            Arc::clone(&rig.stop),
            Rc::clone(&rig.sleeper) as Rc<dyn Sleeper>,
        )
        .unwrap();

        orchestrator.run_background().unwrap();

        assert_eq!(
            *prompts.borrow(),
            vec![PROMPT_BACKGROUND, PROMPT_COLLECTION]
        );
        assert_eq!(orchestrator.state(), RunState::Stepping);
    }

    #[test]
    fn test_abort_disconnected() {
        let mut rig = create_rig();
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.txt");

        // Unhealthy before the third step
        rig.primary.borrow_mut().disconnect_at_move = Some(3);

        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        let error = orchestrator.execute().unwrap_err();
        assert!(matches!(
            error,
            ScanError::DeviceDisconnected {
                axis: AxisRole::Primary,
                index: Some(2),
                ..
            }
        ));

        assert_eq!(orchestrator.state(), RunState::Aborted);
        assert!(orchestrator.run().is_none());
        assert_all_closed_once(&rig, false);

        // Nothing to persist
        assert!(matches!(
            orchestrator.finalize(&mut CsvPersistence::new(), &path),
            Err(ScanError::InvalidState { .. })
        ));
        assert!(!path.exists());

        drop(orchestrator);
        assert_all_closed_once(&rig, false);
    }

    #[test]
    fn test_abort_fault() {
        let mut rig = create_rig();
        rig.primary.borrow_mut().fault_at_move = Some((2, FaultEvent::new(3, "overcurrent")));

        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        let error = orchestrator.execute().unwrap_err();
        assert!(matches!(
            error,
            ScanError::DeviceDisconnected {
                index: Some(1),
                fault: Some(_),
                ..
            }
        ));

        let events = orchestrator.event_queue.find_events("deviceFault");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["code"], 3);
    }

    #[test]
    fn test_abort_spectral_domain_mismatch() {
        let mut rig = create_rig();

        // Fifth sample after four validated ones
        rig.spectrometer.borrow_mut().shift_at_capture = Some((6, 0.5));

        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        let error = orchestrator.execute().unwrap_err();
        assert!(matches!(
            error,
            ScanError::SpectralDomainMismatch { index: Some(4), .. }
        ));

        assert_eq!(orchestrator.state(), RunState::Aborted);
        assert!(orchestrator.run().is_none());
        assert_all_closed_once(&rig, false);
        assert_eq!(orchestrator.event_queue.find_events("sampleCaptured").len(), 4);
    }

    #[test]
    fn test_abort_drift() {
        let mut rig = create_rig();
        rig.primary.borrow_mut().drift_counts = 480;
        rig.primary.borrow_mut().drift_at_move = Some(3);

        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        match orchestrator.execute().unwrap_err() {
            ScanError::PositionDrift {
                axis,
                index,
                expected,
                ..
            } => {
                assert_eq!(axis, AxisRole::Primary);
                assert_eq!(index, Some(1));
                assert_eq!(expected, 45.0);
            }
            error => panic!("Unexpected error: {error}"),
        }
        assert_all_closed_once(&rig, false);
    }

    #[test]
    fn test_abort_initial_positioning() {
        let mut rig = create_rig();
        rig.primary.borrow_mut().drift_counts = -1000;
        rig.primary.borrow_mut().drift_at_move = Some(1);

        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        assert!(matches!(
            orchestrator.run_background(),
            Err(ScanError::PositionDrift { index: Some(0), .. })
        ));
        assert_eq!(orchestrator.state(), RunState::Aborted);
        assert_eq!(rig.spectrometer.borrow().capture_count, 0);
        assert_all_closed_once(&rig, false);
    }

    #[test]
    fn test_abort_capture_fail() {
        let mut rig = create_rig();
        rig.spectrometer.borrow_mut().fail_capture_at = Some(3);

        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        assert!(matches!(
            orchestrator.execute(),
            Err(ScanError::Device { index: Some(1), .. })
        ));
        assert_all_closed_once(&rig, false);
    }

    #[test]
    fn test_cancelled() {
        let mut rig = create_rig();
        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        orchestrator.run_background().unwrap();
        orchestrator.run_step(0).unwrap();

        rig.stop.store(true, Ordering::SeqCst);

        assert!(matches!(
            orchestrator.run_step(1),
            Err(ScanError::Cancelled { index: 1 })
        ));
        assert_eq!(orchestrator.state(), RunState::Aborted);
        assert!(orchestrator.run().is_none());

        // No move after the signal
        assert_eq!(rig.primary.borrow().moves.len(), 2);
        assert_all_closed_once(&rig, false);
    }

    #[test]
    fn test_run_step_invalid_state() {
        let mut rig = create_rig();
        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        assert!(matches!(
            orchestrator.run_step(0),
            Err(ScanError::InvalidState { .. })
        ));
        assert_eq!(orchestrator.state(), RunState::Idle);

        orchestrator.run_background().unwrap();
        assert!(matches!(
            orchestrator.run_background(),
            Err(ScanError::InvalidState { .. })
        ));
        assert_eq!(orchestrator.state(), RunState::Stepping);
    }

    #[test]
    fn test_run_step_out_of_order() {
        let mut rig = create_rig();
        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        orchestrator.run_background().unwrap();

        assert!(matches!(
            orchestrator.run_step(1),
            Err(ScanError::InvalidPlan(_))
        ));
        assert_eq!(orchestrator.state(), RunState::Stepping);
        assert_eq!(rig.primary.borrow().moves.len(), 1);
    }

    #[test]
    fn test_finalize() {
        let mut rig = create_rig();
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.txt");

        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();
        orchestrator.execute().unwrap();

        orchestrator
            .finalize(&mut CsvPersistence::new(), &path)
            .unwrap();

        assert_eq!(orchestrator.state(), RunState::Saved);
        assert!(path.exists());
        assert_eq!(orchestrator.event_queue.find_events("runSaved").len(), 1);
    }

    #[test]
    fn test_finalize_naming_conflict() {
        let mut rig = create_rig();
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.txt");
        write(&path, "existing").unwrap();

        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();
        orchestrator.execute().unwrap();

        assert!(matches!(
            orchestrator.finalize(&mut CsvPersistence::new(), &path),
            Err(ScanError::NamingConflict { .. })
        ));

        // Run is kept for another path
        assert_eq!(orchestrator.state(), RunState::Finalizing);
        assert!(orchestrator.run().is_some());

        let path_new = dir.path().join("scan_1.txt");
        orchestrator
            .finalize(&mut CsvPersistence::new(), &path_new)
            .unwrap();

        assert_eq!(orchestrator.state(), RunState::Saved);
        assert!(path_new.exists());
    }

    #[test]
    fn test_finalize_invalid_state() {
        let mut rig = create_rig();
        let dir = tempdir().unwrap();

        let mut orchestrator = create_orchestrator(&mut rig, &create_config(None)).unwrap();

        assert!(matches!(
            orchestrator.finalize(&mut CsvPersistence::new(), &dir.path().join("scan.txt")),
            Err(ScanError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_drop() {
        let mut rig = create_rig();
        let orchestrator = create_orchestrator(&mut rig, &create_config(Some(10.0))).unwrap();

        drop(orchestrator);

        assert_all_closed_once(&rig, true);
    }
}
