// THEORY:
// Every tunable the sorting loop depends on lives here: pick-zone geometry,
// conveyor speed, grading thresholds, drop-zone coordinates, settle timing.
// Defaults mirror the line's commissioning values; a TOML file can override
// any subset of them, and everything is validated once at startup so the loop
// itself never re-checks configuration.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::core_modules::actuator::RobotPosition;
use crate::core_modules::condition_classifier::{ClassifierThresholds, Condition};

const DEFAULT_CONFIG_NAME: &str = "biscuit-sorter.toml";
const CONFIG_ENV_VAR: &str = "BISCUIT_SORTER_CONFIG";

/// Configuration rejected at startup. Never raised once the loop is running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no drop zone configured for condition `{0}`")]
    MissingDropZone(Condition),
    #[error("conveyor run speed {0} is outside 0..=100")]
    SpeedOutOfRange(u8),
    #[error("pick zone margin must be positive, got {0}")]
    MarginNotPositive(f64),
}

/// Full configuration surface of the sorter.
#[derive(Debug, Clone)]
pub struct SorterConfig {
    /// Half-width of the pick zone around the frame center, in pixels.
    pub pick_zone_margin_px: f64,
    /// Lateral span of the arm workspace the frame width maps onto, in mm.
    pub workspace_width_mm: f64,
    /// Fixed pick position along the conveyor axis.
    pub pick_x_mm: f64,
    /// Fixed pick height.
    pub pick_z_mm: f64,
    /// Conveyor duty while scanning for objects, percent.
    pub conveyor_run_speed: u8,
    /// Global foreground threshold for the binarized intensity plane.
    pub binarize_threshold: u8,
    /// Pause after every motion/actuation command.
    pub settle_delay: Duration,
    /// Grading rule boundaries.
    pub thresholds: ClassifierThresholds,
    /// Where each graded condition gets placed.
    pub drop_zones: HashMap<Condition, RobotPosition>,
    /// Serial device carrying the arm/conveyor link.
    pub serial_device: PathBuf,
    /// Directory the replay frame source reads from.
    pub frames_dir: PathBuf,
}

impl Default for SorterConfig {
    fn default() -> Self {
        let drop_zones = HashMap::from([
            (Condition::Good, RobotPosition::new(200.0, 0.0, 50.0)),
            (Condition::Broken, RobotPosition::new(200.0, 100.0, 50.0)),
            (Condition::SemiBurned, RobotPosition::new(200.0, -100.0, 50.0)),
            (Condition::FullyBurned, RobotPosition::new(200.0, -200.0, 50.0)),
        ]);
        Self {
            pick_zone_margin_px: 50.0,
            workspace_width_mm: 400.0,
            pick_x_mm: 200.0,
            pick_z_mm: 50.0,
            conveyor_run_speed: 30,
            binarize_threshold: 127,
            settle_delay: Duration::from_millis(500),
            thresholds: ClassifierThresholds::default(),
            drop_zones,
            serial_device: PathBuf::from("/dev/ttyUSB0"),
            frames_dir: PathBuf::from("frames"),
        }
    }
}

/// Raw overlay file: every field optional, unset fields keep their defaults.
#[derive(Debug, Deserialize, Default)]
struct SorterConfigFile {
    pick_zone_margin_px: Option<f64>,
    workspace_width_mm: Option<f64>,
    pick_x_mm: Option<f64>,
    pick_z_mm: Option<f64>,
    conveyor_run_speed: Option<u8>,
    binarize_threshold: Option<u8>,
    settle_delay_ms: Option<u64>,
    serial_device: Option<String>,
    frames_dir: Option<String>,
    classifier: Option<ClassifierSection>,
    drop_zones: Option<HashMap<Condition, [f64; 3]>>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierSection {
    good_band: Option<(u8, u8)>,
    fully_burned_max: Option<u8>,
    semi_burned_max: Option<u8>,
}

impl SorterConfig {
    /// Defaults overlaid with the config file, if one is present. The file
    /// path comes from `BISCUIT_SORTER_CONFIG` or falls back to
    /// `biscuit-sorter.toml` in the working directory.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_path(Path::new(&path)).unwrap_or_default();
        }
        Self::from_path(Path::new(DEFAULT_CONFIG_NAME)).unwrap_or_default()
    }

    /// Reads one overlay file. `None` when the file is missing or malformed.
    pub fn from_path(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let raw = fs::read_to_string(path).ok()?;
        let file: SorterConfigFile = match toml::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(error) => {
                log::warn!("ignoring malformed config {}: {error}", path.display());
                return None;
            }
        };

        let mut config = Self::default();
        if let Some(value) = file.pick_zone_margin_px {
            config.pick_zone_margin_px = value;
        }
        if let Some(value) = file.workspace_width_mm {
            config.workspace_width_mm = value;
        }
        if let Some(value) = file.pick_x_mm {
            config.pick_x_mm = value;
        }
        if let Some(value) = file.pick_z_mm {
            config.pick_z_mm = value;
        }
        if let Some(value) = file.conveyor_run_speed {
            config.conveyor_run_speed = value;
        }
        if let Some(value) = file.binarize_threshold {
            config.binarize_threshold = value;
        }
        if let Some(value) = file.settle_delay_ms {
            config.settle_delay = Duration::from_millis(value);
        }
        if let Some(value) = file.serial_device {
            config.serial_device = PathBuf::from(value);
        }
        if let Some(value) = file.frames_dir {
            config.frames_dir = PathBuf::from(value);
        }
        if let Some(section) = file.classifier {
            if let Some(band) = section.good_band {
                config.thresholds.good_band = band;
            }
            if let Some(value) = section.fully_burned_max {
                config.thresholds.fully_burned_max = value;
            }
            if let Some(value) = section.semi_burned_max {
                config.thresholds.semi_burned_max = value;
            }
        }
        if let Some(zones) = file.drop_zones {
            config.drop_zones = zones
                .into_iter()
                .map(|(condition, [x, y, z])| (condition, RobotPosition::new(x, y, z)))
                .collect();
        }
        Some(config)
    }

    /// One-time startup validation. The drop-zone table must cover every
    /// pickable condition; geometry and speed must be in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pick_zone_margin_px <= 0.0 {
            return Err(ConfigError::MarginNotPositive(self.pick_zone_margin_px));
        }
        if self.conveyor_run_speed > 100 {
            return Err(ConfigError::SpeedOutOfRange(self.conveyor_run_speed));
        }
        DropZoneTable::from_map(&self.drop_zones).map(|_| ())
    }
}

/// Validated drop-zone lookup: one fixed placement per pickable condition.
#[derive(Debug, Clone, Copy)]
pub struct DropZoneTable {
    good: RobotPosition,
    broken: RobotPosition,
    semi_burned: RobotPosition,
    fully_burned: RobotPosition,
}

impl DropZoneTable {
    /// Builds the table, rejecting a map that misses any pickable condition.
    pub fn from_map(map: &HashMap<Condition, RobotPosition>) -> Result<Self, ConfigError> {
        let fetch = |condition: Condition| {
            map.get(&condition)
                .copied()
                .ok_or(ConfigError::MissingDropZone(condition))
        };
        Ok(Self {
            good: fetch(Condition::Good)?,
            broken: fetch(Condition::Broken)?,
            semi_burned: fetch(Condition::SemiBurned)?,
            fully_burned: fetch(Condition::FullyBurned)?,
        })
    }

    /// Placement for a graded condition. `NoObject` has no drop zone.
    pub fn position_for(&self, condition: Condition) -> Option<RobotPosition> {
        match condition {
            Condition::Good => Some(self.good),
            Condition::Broken => Some(self.broken),
            Condition::SemiBurned => Some(self.semi_burned),
            Condition::FullyBurned => Some(self.fully_burned),
            Condition::NoObject => None,
        }
    }
}
