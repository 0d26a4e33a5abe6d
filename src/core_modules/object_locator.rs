// THEORY:
// The `ObjectLocator` answers the per-frame question "is there something under
// the arm, and where". It reduces the frame to the shared intensity plane,
// keeps the largest foreground region as "the object", and reports its centroid
// together with a pick-zone verdict.
//
// Key architectural principles:
// 1.  **Absence is normal**: A frame with no foreground region, or a region
//     with a degenerate zero area moment, is an ordinary empty-conveyor
//     observation. The locator reports a sentinel (0,0) centroid with
//     `in_pick_zone = false` instead of an error.
// 2.  **Frame space vs workspace**: `locate` stays in pixel coordinates; the
//     translation to arm coordinates is a separate, explicitly linear mapping.
//     The conveyor travel axis is assumed orthogonal to the camera's
//     horizontal axis with uniform scale, so only the lateral offset varies;
//     pick height and depth are fixed constants. No lens or perspective
//     correction is modeled.
// 3.  **Exclusive zone boundary**: an object sitting exactly at the margin
//     distance is out of the zone.

use crate::config::SorterConfig;
use crate::core_modules::actuator::RobotPosition;
use crate::core_modules::contour::{self, Region};
use crate::core_modules::frame::Frame;

/// Where the dominant foreground object sits in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectObservation {
    /// Object centroid in frame pixels; (0.0, 0.0) when nothing was found.
    pub centroid: (f64, f64),
    /// Whether the centroid is close enough to the frame center to pick.
    pub in_pick_zone: bool,
}

/// Per-frame object finder over the binarized intensity plane.
pub struct ObjectLocator {
    binarize_threshold: u8,
    pick_zone_margin_px: f64,
    pick_x_mm: f64,
    pick_z_mm: f64,
    workspace_width_mm: f64,
}

impl ObjectLocator {
    pub fn new(config: &SorterConfig) -> Self {
        Self {
            binarize_threshold: config.binarize_threshold,
            pick_zone_margin_px: config.pick_zone_margin_px,
            pick_x_mm: config.pick_x_mm,
            pick_z_mm: config.pick_z_mm,
            workspace_width_mm: config.workspace_width_mm,
        }
    }

    /// Finds the dominant foreground object and tests it against the pick
    /// zone. Deterministic: the same frame always yields the same observation.
    pub fn locate(&self, frame: &Frame) -> ObjectObservation {
        let plane = frame.intensity_plane();
        let mask = plane.threshold_mask(self.binarize_threshold);
        let regions = contour::find_regions(&mask, plane.width(), plane.height());

        let Some(centroid) = contour::largest_region(&regions).and_then(Region::centroid) else {
            return ObjectObservation {
                centroid: (0.0, 0.0),
                in_pick_zone: false,
            };
        };

        let lateral_offset = centroid.0 - frame.width() as f64 / 2.0;
        ObjectObservation {
            centroid,
            in_pick_zone: lateral_offset.abs() < self.pick_zone_margin_px,
        }
    }

    /// Maps an observation into the arm's pick position. Pick x and z are
    /// fixed; y scales the lateral pixel offset linearly into the workspace.
    pub fn pick_position(&self, frame_width: u32, observation: &ObjectObservation) -> RobotPosition {
        let lateral_offset = observation.centroid.0 - frame_width as f64 / 2.0;
        RobotPosition::new(
            self.pick_x_mm,
            lateral_offset / frame_width as f64 * self.workspace_width_mm,
            self.pick_z_mm,
        )
    }
}
