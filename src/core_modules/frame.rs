// THEORY:
// The `frame` module holds the two "dumb" data containers at the bottom of the
// vision stack: the raw `Frame` delivered by a frame source, and the
// `IntensityPlane` derived from it.
//
// Key architectural principles:
// 1.  **Immutable per-cycle data**: A `Frame` is produced once per capture and
//     is only ever read. The locator and the classifier both consume it for a
//     single sorting cycle and then it is dropped; nothing downstream holds on
//     to pixel data across cycles.
// 2.  **Shared preprocessing**: Both analyses operate on an `IntensityPlane`,
//     the single-channel reduction of the frame after a fixed small-kernel
//     smoothing pass. Producing that plane in one place guarantees the locator
//     and the classifier see identically preprocessed data for the same frame.
// 3.  **Summary calculations only**: The plane knows how to summarize itself
//     (histogram, min/max, threshold mask) but performs no detection. Region
//     analysis lives in `contour`, decisions live above that.

/// Number of interleaved channels in a raw frame buffer (RGBA8).
const CHANNELS: usize = 4;

/// Five-tap binomial kernel, applied once horizontally and once vertically.
/// Close enough to the classic 5x5 Gaussian for sensor-noise suppression.
const SMOOTHING_KERNEL: [u32; 5] = [1, 4, 6, 4, 1];
const SMOOTHING_KERNEL_SUM: u32 = 16;

/// A single captured camera frame: an immutable RGBA8 pixel grid.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wraps a raw RGBA8 buffer. The buffer length must match the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert!(width > 0 && height > 0, "frame dimensions must be positive");
        assert_eq!(
            data.len(),
            (width * height) as usize * CHANNELS,
            "frame buffer length does not match {width}x{height} RGBA8"
        );
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reduces the frame to smoothed single-channel intensities.
    /// This is the one preprocessing path shared by locating and classification.
    pub fn intensity_plane(&self) -> IntensityPlane {
        IntensityPlane::from_frame(self).smoothed()
    }
}

/// A single-channel intensity image derived from a `Frame`.
#[derive(Debug, Clone)]
pub struct IntensityPlane {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl IntensityPlane {
    /// Collapses RGBA to grayscale using Rec. 601 luma weights.
    pub fn from_frame(frame: &Frame) -> Self {
        let mut data = Vec::with_capacity((frame.width * frame.height) as usize);
        for rgba in frame.data.chunks_exact(CHANNELS) {
            let luma = 0.299_f64 * rgba[0] as f64
                + 0.587_f64 * rgba[1] as f64
                + 0.114_f64 * rgba[2] as f64;
            data.push(luma.round().min(255.0) as u8);
        }
        Self {
            width: frame.width,
            height: frame.height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Applies the fixed separable smoothing kernel with clamped borders.
    pub fn smoothed(&self) -> Self {
        let width = self.width as usize;
        let height = self.height as usize;
        let radius = SMOOTHING_KERNEL.len() as i64 / 2;

        // Horizontal pass.
        let mut horizontal = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                let mut accumulator = 0u32;
                for (tap, weight) in SMOOTHING_KERNEL.iter().enumerate() {
                    let sample_x =
                        (x as i64 + tap as i64 - radius).clamp(0, width as i64 - 1) as usize;
                    accumulator += weight * self.data[y * width + sample_x] as u32;
                }
                horizontal[y * width + x] = (accumulator / SMOOTHING_KERNEL_SUM) as u8;
            }
        }

        // Vertical pass.
        let mut data = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                let mut accumulator = 0u32;
                for (tap, weight) in SMOOTHING_KERNEL.iter().enumerate() {
                    let sample_y =
                        (y as i64 + tap as i64 - radius).clamp(0, height as i64 - 1) as usize;
                    accumulator += weight * horizontal[sample_y * width + x] as u32;
                }
                data[y * width + x] = (accumulator / SMOOTHING_KERNEL_SUM) as u8;
            }
        }

        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Per-intensity pixel counts over the full plane.
    pub fn histogram(&self) -> [u32; 256] {
        let mut bins = [0u32; 256];
        for &value in &self.data {
            bins[value as usize] += 1;
        }
        bins
    }

    /// The intensity with the highest pixel count. Ties resolve to the lowest
    /// bin, matching argmax-of-first-maximum.
    pub fn peak_intensity(&self) -> u8 {
        let bins = self.histogram();
        let mut peak = 0usize;
        for (bin, &count) in bins.iter().enumerate() {
            if count > bins[peak] {
                peak = bin;
            }
        }
        peak as u8
    }

    /// Observed (minimum, maximum) intensity.
    pub fn intensity_range(&self) -> (u8, u8) {
        let mut minimum = u8::MAX;
        let mut maximum = u8::MIN;
        for &value in &self.data {
            minimum = minimum.min(value);
            maximum = maximum.max(value);
        }
        (minimum, maximum)
    }

    /// Fixed global binarization: foreground iff intensity is strictly above
    /// the threshold.
    pub fn threshold_mask(&self, threshold: u8) -> Vec<bool> {
        self.data.iter().map(|&value| value > threshold).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, gray: u8) -> Frame {
        let mut data = Vec::new();
        for _ in 0..width * height {
            data.extend_from_slice(&[gray, gray, gray, 255]);
        }
        Frame::new(width, height, data)
    }

    #[test]
    fn solid_frame_reduces_to_its_own_intensity() {
        let plane = solid_frame(8, 8, 150).intensity_plane();
        assert_eq!(plane.peak_intensity(), 150);
        assert_eq!(plane.intensity_range(), (150, 150));
    }

    #[test]
    fn smoothing_preserves_constant_regions() {
        let plane = IntensityPlane::from_frame(&solid_frame(16, 16, 90)).smoothed();
        assert!(plane.data().iter().all(|&v| v == 90));
    }

    #[test]
    fn peak_ties_resolve_to_lowest_bin() {
        // Two pixels at 10, two at 200.
        let mut data = Vec::new();
        for gray in [10u8, 10, 200, 200] {
            data.extend_from_slice(&[gray, gray, gray, 255]);
        }
        let plane = IntensityPlane::from_frame(&Frame::new(4, 1, data));
        assert_eq!(plane.peak_intensity(), 10);
    }

    #[test]
    fn threshold_is_exclusive_at_the_boundary() {
        let plane = IntensityPlane::from_frame(&solid_frame(2, 2, 127));
        assert!(plane.threshold_mask(127).iter().all(|&fg| !fg));
        let plane = IntensityPlane::from_frame(&solid_frame(2, 2, 128));
        assert!(plane.threshold_mask(127).iter().all(|&fg| fg));
    }
}
