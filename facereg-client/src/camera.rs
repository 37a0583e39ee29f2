//! Directory-backed camera
//!
//! Replays the still images in a directory (sorted by file name, looping) as
//! if they were live frames. Stands in for a webcam on headless hosts.

use image::DynamicImage;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::capture::{Camera, FrameSource};
use crate::error::CaptureError;

const FRAME_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub struct DirectoryCamera {
    dir: PathBuf,
}

impl DirectoryCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FRAME_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

impl Camera for DirectoryCamera {
    fn open(&mut self) -> Result<Box<dyn FrameSource>, CaptureError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                CaptureError::PermissionDenied(self.dir.display().to_string())
            }
            _ => CaptureError::Unavailable(format!("{}: {}", self.dir.display(), e)),
        })?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && is_frame_file(path))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(CaptureError::Unavailable(format!(
                "no .jpg/.jpeg/.png frames in {}",
                self.dir.display()
            )));
        }

        info!(dir = %self.dir.display(), frames = frames.len(), "Opened directory camera");
        Ok(Box::new(DirectoryFrames { frames, next: 0 }))
    }
}

struct DirectoryFrames {
    frames: Vec<PathBuf>,
    next: usize,
}

impl FrameSource for DirectoryFrames {
    fn grab(&mut self) -> Result<DynamicImage, CaptureError> {
        let path = &self.frames[self.next];
        self.next = (self.next + 1) % self.frames.len();

        image::open(path).map_err(|e| CaptureError::Frame(format!("{}: {}", path.display(), e)))
    }
}
