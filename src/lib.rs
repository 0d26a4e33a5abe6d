// THEORY:
// This file is the main entry point for the `biscuit_sorter` library crate.
// It exposes the `SortingController` and its configuration as the high-level
// interface for the whole sorting engine, together with the two hardware
// boundary traits (`FrameSource`, `ActuatorPort`) a deployment implements for
// its own camera and arm. The internal analysis modules live under
// `core_modules` and are surfaced only through curated re-exports.

pub mod config;
pub mod controller;
pub mod core_modules;

// Re-export key data structures for the public API.
pub use config::{ConfigError, DropZoneTable, SorterConfig};
pub use controller::{CycleOutcome, SorterError, SortingController, Stage};
pub use core_modules::actuator::{ActuatorError, ActuatorPort, RobotPosition, UartActuator};
pub use core_modules::condition_classifier::{
    ClassificationMetrics, ClassificationResult, ClassifierThresholds, Condition,
    ConditionClassifier,
};
pub use core_modules::frame::{Frame, IntensityPlane};
pub use core_modules::frame_source::{FrameSource, ImageDirSource};
pub use core_modules::object_locator::{ObjectLocator, ObjectObservation};
