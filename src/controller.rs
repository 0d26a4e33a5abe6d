// THEORY:
// The `controller` module is the top level of the sorter: the state machine
// that owns the frame source, the analyzers, and the actuator port, and drives
// them through the sorting cycle. Conceptually the loop walks
// Homing -> ConveyorRunning -> Evaluating -> Stopped(for pick) -> PickPlace
// and back to ConveyorRunning, with a single ShuttingDown exit shared by every
// path out.
//
// Key architectural principles:
// 1.  **One synchronous thread of control**: There are no concurrent pick
//     cycles and no background workers. Frame capture is the only blocking
//     suspension point; every actuator command is sequential and followed by
//     an explicit settle wait, because the link is fire-and-forget with no
//     completion signal to poll.
// 2.  **Transient vs fatal**: A missing frame or a vanished object is an
//     ordinary cycle outcome and never escalates; the loop logs and carries
//     on. Any actuator failure is fatal, tagged with the stage it hit, and
//     unwinds through the shutdown path.
// 3.  **Exactly-once shutdown**: Whatever ends the loop - a stop request or a
//     fatal error - the same cleanup runs once: release the camera, force
//     suction off, zero the conveyor, close the transport, in that order.
//     Cleanup steps are best-effort so a dead transport cannot block them.
// 4.  **Controller-owned conveyor state**: The belt has no feedback sensor.
//     The only record of its speed is the `ConveyorState` the controller
//     mutates; no other component reads or writes it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::config::{ConfigError, DropZoneTable, SorterConfig};
use crate::core_modules::actuator::{ActuatorError, ActuatorPort, RobotPosition};
use crate::core_modules::condition_classifier::{
    ClassificationResult, Condition, ConditionClassifier,
};
use crate::core_modules::frame_source::FrameSource;
use crate::core_modules::object_locator::ObjectLocator;

/// Which part of the loop a fatal failure hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Homing,
    ConveyorControl,
    PickPlace,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Homing => "homing",
            Stage::ConveyorControl => "conveyor control",
            Stage::PickPlace => "pick/place",
        };
        f.write_str(label)
    }
}

/// Fatal sorting-loop failure.
#[derive(Debug, Error)]
pub enum SorterError {
    #[error("actuator failure during {stage}: {source}")]
    Actuator {
        stage: Stage,
        #[source]
        source: ActuatorError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What a single loop iteration amounted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// The frame source had nothing; retry next iteration.
    NoFrame,
    /// Frame seen, but no object inside the pick zone.
    OutOfZone,
    /// The zone triggered but grading found nothing; conveyor resumed.
    FalseTrigger,
    /// A biscuit was graded, picked, and placed.
    Sorted {
        condition: Condition,
        confidence: f64,
    },
}

/// Last commanded conveyor duty. Never read back from the hardware; there is
/// no feedback sensor.
#[derive(Debug, Clone, Copy)]
struct ConveyorState {
    speed_percent: u8,
}

/// The sorting state machine. Generic over its two hardware boundaries so the
/// whole loop runs against fakes in tests.
pub struct SortingController<S: FrameSource, A: ActuatorPort> {
    frame_source: S,
    actuator: A,
    locator: ObjectLocator,
    classifier: ConditionClassifier,
    drop_zones: DropZoneTable,
    run_speed: u8,
    settle_delay: Duration,
    conveyor: ConveyorState,
    stop_flag: Arc<AtomicBool>,
    shutdown_done: bool,
}

impl<S: FrameSource, A: ActuatorPort> SortingController<S, A> {
    /// Validates the configuration once and assembles the loop. The stop flag
    /// is observed between cycles; setting it requests a clean shutdown.
    pub fn new(
        config: &SorterConfig,
        frame_source: S,
        actuator: A,
        stop_flag: Arc<AtomicBool>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            frame_source,
            actuator,
            locator: ObjectLocator::new(config),
            classifier: ConditionClassifier::new(config),
            drop_zones: DropZoneTable::from_map(&config.drop_zones)?,
            run_speed: config.conveyor_run_speed,
            settle_delay: config.settle_delay,
            conveyor: ConveyorState { speed_percent: 0 },
            stop_flag,
            shutdown_done: false,
        })
    }

    /// Last commanded conveyor duty, percent.
    pub fn conveyor_speed(&self) -> u8 {
        self.conveyor.speed_percent
    }

    /// Homes the arm, starts the conveyor, and sorts until a stop is
    /// requested or an actuator failure ends the run. The shutdown cleanup
    /// executes on every exit path, exactly once.
    pub fn run(&mut self) -> Result<(), SorterError> {
        let outcome = self.drive();
        self.shutdown();
        outcome
    }

    fn drive(&mut self) -> Result<(), SorterError> {
        self.actuator.home().map_err(|source| SorterError::Actuator {
            stage: Stage::Homing,
            source,
        })?;
        log::info!("homing complete, conveyor starting at {}%", self.run_speed);
        self.set_conveyor(self.run_speed)?;

        loop {
            // Cancellation is cooperative: checked once per iteration, never
            // mid pick-place.
            if self.stop_flag.load(Ordering::SeqCst) {
                log::info!("stop requested, ending sorting loop");
                return Ok(());
            }
            self.run_cycle()?;
        }
    }

    /// One full observe/decide/act iteration. Public so a cycle can be driven
    /// frame by frame, the way the sorting loop itself does.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, SorterError> {
        let Some(frame) = self.frame_source.next_frame() else {
            log::warn!("frame capture failed, retrying next cycle");
            return Ok(CycleOutcome::NoFrame);
        };

        let observation = self.locator.locate(&frame);
        if !observation.in_pick_zone {
            log::debug!("no object in pick zone, conveyor keeps moving");
            return Ok(CycleOutcome::OutOfZone);
        }

        // Halt the belt before grading; the pick position is derived from the
        // same frame that triggered the zone.
        let pick = self.locator.pick_position(frame.width(), &observation);
        self.set_conveyor(0)?;
        let graded = self.classifier.classify(&frame);
        self.finish_pick_cycle(pick, &graded)
    }

    fn finish_pick_cycle(
        &mut self,
        pick: RobotPosition,
        graded: &ClassificationResult,
    ) -> Result<CycleOutcome, SorterError> {
        let Some(drop) = self.drop_zones.position_for(graded.condition) else {
            // The object left the zone between locating and grading, or the
            // locator latched onto a shadow. Resume and move on.
            log::debug!("pick zone triggered without a gradable object, resuming conveyor");
            self.set_conveyor(self.run_speed)?;
            return Ok(CycleOutcome::FalseTrigger);
        };

        log::info!(
            "detected {} with confidence {:.2}",
            graded.condition,
            graded.confidence
        );
        self.pick_place(pick, drop)
            .map_err(|source| SorterError::Actuator {
                stage: Stage::PickPlace,
                source,
            })?;
        self.set_conveyor(self.run_speed)?;

        Ok(CycleOutcome::Sorted {
            condition: graded.condition,
            confidence: graded.confidence,
        })
    }

    /// The fixed pick/place motion sequence. Every command is followed by the
    /// settle delay; the mechanism needs the pause to stabilize before the
    /// next command.
    fn pick_place(&mut self, pick: RobotPosition, drop: RobotPosition) -> Result<(), ActuatorError> {
        self.actuator.move_to(pick)?;
        self.settle();
        self.actuator.set_suction(true)?;
        self.settle();
        self.actuator.move_to(drop)?;
        self.settle();
        self.actuator.set_suction(false)?;
        self.settle();
        Ok(())
    }

    fn settle(&self) {
        thread::sleep(self.settle_delay);
    }

    fn set_conveyor(&mut self, percent: u8) -> Result<(), SorterError> {
        self.actuator
            .set_conveyor_speed(percent)
            .map_err(|source| SorterError::Actuator {
                stage: Stage::ConveyorControl,
                source,
            })?;
        self.conveyor.speed_percent = percent;
        Ok(())
    }

    /// The cleanup sequence: release the camera, force suction off, zero the
    /// conveyor, close the transport. Runs at most once; later calls are
    /// no-ops. Each step is attempted even if an earlier one fails.
    pub fn shutdown(&mut self) {
        if self.shutdown_done {
            return;
        }
        self.shutdown_done = true;

        log::info!("shutting down: releasing camera, parking hardware, closing transport");
        self.frame_source.release();
        if let Err(error) = self.actuator.set_suction(false) {
            log::warn!("shutdown could not force suction off: {error}");
        }
        if let Err(error) = self.actuator.set_conveyor_speed(0) {
            log::warn!("shutdown could not stop the conveyor: {error}");
        }
        self.conveyor.speed_percent = 0;
        if let Err(error) = self.actuator.close() {
            log::warn!("shutdown could not close the transport: {error}");
        }
    }
}
