// THEORY:
// The `frame_source` module is the camera boundary. The controller only ever
// asks one question, "give me the next frame", and an absent frame is a
// normal, retryable answer rather than an error. Live camera drivers stay
// outside the crate; they plug in by implementing `FrameSource`.
//
// The shipped implementation replays a directory of still images in filename
// order, which is how the sorter runs against recorded conveyor footage and
// how integration tests feed it deterministic scenes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core_modules::frame::Frame;

/// On-demand frame supplier for the sorting loop.
pub trait FrameSource {
    /// The next captured frame, or `None` when no frame is available right
    /// now. The caller retries on the next iteration.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Releases the capture device. Called exactly once during shutdown.
    fn release(&mut self) {}
}

/// Replays the image files of a directory as a frame stream, in filename
/// order.
pub struct ImageDirSource {
    paths: Vec<PathBuf>,
    cursor: usize,
}

impl ImageDirSource {
    /// Collects the supported image files under `dir`, sorted by filename.
    pub fn open(dir: &Path) -> io::Result<Self> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("png") | Some("jpg") | Some("jpeg")
                )
            })
            .collect();
        paths.sort();
        Ok(Self { paths, cursor: 0 })
    }

    pub fn remaining(&self) -> usize {
        self.paths.len() - self.cursor
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Option<Frame> {
        let path = self.paths.get(self.cursor)?;
        self.cursor += 1;
        match image::open(path) {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                let (width, height) = rgba.dimensions();
                Some(Frame::new(width, height, rgba.into_raw()))
            }
            Err(error) => {
                // A corrupt file is a failed capture; skip it and move on.
                log::warn!("could not decode {}: {error}", path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn scratch_dir(tag: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("biscuit-sorter-frames-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    #[test]
    fn replays_files_in_name_order_then_runs_dry() {
        let dir = scratch_dir("order");
        for (name, shade) in [("b.png", 200u8), ("a.png", 10u8)] {
            let image = RgbaImage::from_pixel(4, 4, Rgba([shade, shade, shade, 255]));
            image.save(dir.join(name)).expect("write test frame");
        }

        let mut source = ImageDirSource::open(&dir).expect("open frame dir");
        assert_eq!(source.remaining(), 2);

        // a.png first: dark pixels.
        let first = source.next_frame().expect("first frame");
        assert_eq!(first.data()[0], 10);
        let second = source.next_frame().expect("second frame");
        assert_eq!(second.data()[0], 200);
        assert!(source.next_frame().is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn ignores_non_image_files() {
        let dir = scratch_dir("filter");
        fs::write(dir.join("notes.txt"), "not a frame").expect("write stray file");
        let mut source = ImageDirSource::open(&dir).expect("open frame dir");
        assert_eq!(source.remaining(), 0);
        assert!(source.next_frame().is_none());
        let _ = fs::remove_dir_all(&dir);
    }
}
