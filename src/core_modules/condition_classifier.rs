// THEORY:
// The `ConditionClassifier` grades one biscuit frame into a condition
// category. It is a deliberate heuristic, not a trained model: the primary
// feature is the intensity histogram's peak bin, backed by the observed
// intensity range and the area of the largest foreground region.
//
// Key architectural principles:
// 1.  **Ordered rules, first match wins**: Burn severity reads visually darker
//     than either the good or the broken category, so the darkness rules are
//     evaluated before the residual "broken" bucket. The rule ranges are NOT
//     mutually exclusive; evaluation order is a load-bearing part of the
//     contract and is kept as an explicit rule list rather than nested
//     conditionals.
// 2.  **Independent analysis**: The classifier extracts its own foreground
//     region from the shared intensity plane. It never reuses the locator's
//     region, even when both ran on the same frame.
// 3.  **Absence is normal**: No foreground region at all grades as `NoObject`
//     with zero confidence. The controller treats that as an ordinary empty
//     cycle. The metrics block is populated on every branch, `NoObject`
//     included.

use std::fmt;

use serde::Deserialize;

use crate::config::SorterConfig;
use crate::core_modules::contour;
use crate::core_modules::frame::Frame;

/// Condition categories a graded frame can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Good,
    Broken,
    SemiBurned,
    FullyBurned,
    NoObject,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Condition::Good => "good",
            Condition::Broken => "broken",
            Condition::SemiBurned => "semi_burned",
            Condition::FullyBurned => "fully_burned",
            Condition::NoObject => "no_object",
        };
        f.write_str(label)
    }
}

/// Boundary constants for the grading rules. Externally overridable through
/// the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierThresholds {
    /// Inclusive peak-intensity band graded as `Good`.
    pub good_band: (u8, u8),
    /// Peak at or below this grades as `FullyBurned`.
    pub fully_burned_max: u8,
    /// Peak at or below this (and above `fully_burned_max`) grades as
    /// `SemiBurned`.
    pub semi_burned_max: u8,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            good_band: (100, 180),
            fully_burned_max: 45,
            semi_burned_max: 100,
        }
    }
}

/// The feature values a grading decision was based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationMetrics {
    /// Histogram bin with the highest pixel count.
    pub peak_intensity: u8,
    /// Observed (minimum, maximum) intensity.
    pub intensity_range: (u8, u8),
    /// Foreground pixel count of the largest region, 0 when none was found.
    pub area: u32,
}

/// One graded frame: the condition, how sure the heuristic is, and the
/// features it looked at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationResult {
    pub condition: Condition,
    pub confidence: f64,
    pub metrics: ClassificationMetrics,
}

/// Peak-intensity predicate of a single grading rule.
#[derive(Debug, Clone, Copy)]
enum PeakTest {
    Within(u8, u8),
    AtMost(u8),
    Fallback,
}

impl PeakTest {
    fn matches(self, peak: u8) -> bool {
        match self {
            PeakTest::Within(low, high) => peak >= low && peak <= high,
            PeakTest::AtMost(limit) => peak <= limit,
            PeakTest::Fallback => true,
        }
    }
}

/// One entry of the ordered grading sequence.
#[derive(Debug, Clone, Copy)]
struct GradingRule {
    test: PeakTest,
    condition: Condition,
    confidence: f64,
}

/// Histogram-and-shape condition grader.
pub struct ConditionClassifier {
    binarize_threshold: u8,
    rules: [GradingRule; 4],
}

impl ConditionClassifier {
    pub fn new(config: &SorterConfig) -> Self {
        let t = &config.thresholds;
        Self {
            binarize_threshold: config.binarize_threshold,
            // Evaluated top to bottom; the first match wins.
            rules: [
                GradingRule {
                    test: PeakTest::Within(t.good_band.0, t.good_band.1),
                    condition: Condition::Good,
                    confidence: 0.9,
                },
                GradingRule {
                    test: PeakTest::AtMost(t.fully_burned_max),
                    condition: Condition::FullyBurned,
                    confidence: 0.85,
                },
                GradingRule {
                    test: PeakTest::AtMost(t.semi_burned_max),
                    condition: Condition::SemiBurned,
                    confidence: 0.80,
                },
                GradingRule {
                    test: PeakTest::Fallback,
                    condition: Condition::Broken,
                    confidence: 0.75,
                },
            ],
        }
    }

    /// Grades one frame. `NoObject` with zero confidence when the frame has no
    /// foreground region at all.
    pub fn classify(&self, frame: &Frame) -> ClassificationResult {
        let plane = frame.intensity_plane();
        let peak = plane.peak_intensity();
        let range = plane.intensity_range();

        let mask = plane.threshold_mask(self.binarize_threshold);
        let regions = contour::find_regions(&mask, plane.width(), plane.height());
        let area = contour::largest_region(&regions).map_or(0, |region| region.area);

        let metrics = ClassificationMetrics {
            peak_intensity: peak,
            intensity_range: range,
            area,
        };

        if regions.is_empty() {
            return ClassificationResult {
                condition: Condition::NoObject,
                confidence: 0.0,
                metrics,
            };
        }

        let rule = self
            .rules
            .iter()
            .find(|rule| rule.test.matches(peak))
            .unwrap_or(&self.rules[3]);

        ClassificationResult {
            condition: rule.condition,
            confidence: rule.confidence,
            metrics,
        }
    }
}
