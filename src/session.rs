use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::codec;
use crate::composite::{composite, Feather};
use crate::error::{Error, Result};
use crate::frames::{Direction, FrameDir, Navigator};
use crate::geometry::{ImagePoint, Mapper, Viewport, ZoomRegion};

/// Which of the two frame images the canvas shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayTarget {
    #[default]
    Merged,
    Original,
}

/// The two images of one frame, as loaded from disk.
#[derive(Clone, Debug)]
pub struct FramePair {
    pub index: u32,
    pub merged: RgbImage,
    pub original: RgbImage,
}

/// Everything the reviewer is working on.
///
/// The egui layer only reads from this and calls its operations; all file
/// access and pixel work happens here.
#[derive(Debug, Default)]
pub struct Session {
    frames: Option<FrameDir>,
    nav: Navigator,
    pair: Option<FramePair>,
    undo: Option<RgbImage>,
    zoom: Option<ZoomRegion>,
    display: DisplayTarget,
    revision: u64,
}

impl Session {
    /// Select a working directory and load the current frame from it.
    ///
    /// The previous directory's frame, undo image and zoom are dropped as soon
    /// as the new directory scans, even if its frame then fails to load.
    pub fn open_directory(&mut self, dir: &Path) -> Result<()> {
        let frames = FrameDir::scan(dir)?;
        self.frames = Some(frames);
        self.pair = None;
        self.undo = None;
        self.zoom = None;
        self.revision += 1;
        self.load_current()
    }

    pub fn frames(&self) -> Option<&FrameDir> {
        self.frames.as_ref()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    pub fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.nav
    }

    pub fn pair(&self) -> Option<&FramePair> {
        self.pair.as_ref()
    }

    /// Bumped whenever the displayed pixels may have changed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Load merged and original for the navigator's index.
    ///
    /// Both files must load before anything changes; on failure the previous
    /// frame stays on screen while the index keeps its new value.
    pub fn load_current(&mut self) -> Result<()> {
        self.load(self.nav.index())
    }

    fn load(&mut self, index: u32) -> Result<()> {
        let frames = self.frames.as_ref().ok_or(Error::NoDirectory)?;
        let merged = codec::load_rgb(&frames.merged_path(index))?;
        let original = codec::load_rgb(&frames.original_path(index))?;

        if self.pair.as_ref().map(|p| p.index) != Some(index) {
            self.undo = None;
        }
        let (w, h) = merged.dimensions();
        self.zoom = self.zoom.and_then(|z| z.clamped_to(w, h));
        self.pair = Some(FramePair {
            index,
            merged,
            original,
        });
        self.revision += 1;
        log::debug!("Loaded frame {}", index);
        Ok(())
    }

    /// Step the navigator and load the frame it lands on.
    /// Returns false if the navigator didn't move (backwards at frame 1).
    pub fn navigate(&mut self, direction: Direction) -> Result<bool> {
        if !self.nav.step(direction) {
            return Ok(false);
        }
        self.load_current()?;
        Ok(true)
    }

    pub fn go_to(&mut self, index: u32) -> Result<()> {
        self.nav.go_to(index)?;
        self.load_current()
    }

    /// Re-read both images from disk and switch to the merged view.
    pub fn process(&mut self) -> Result<()> {
        self.load_current()?;
        self.display = DisplayTarget::Merged;
        Ok(())
    }

    /// Copy original pixels into the merged image inside `polygon`.
    ///
    /// The pre-edit merged image goes to the undo slot. Returns false, with
    /// nothing changed, if the polygon is degenerate.
    pub fn apply_polygon(&mut self, polygon: &[ImagePoint], feather: Feather) -> Result<bool> {
        let pair = self.pair.as_mut().ok_or(Error::NoFrameLoaded)?;
        let edited = match composite(&pair.merged, &pair.original, polygon, feather) {
            Ok(img) => img,
            Err(Error::DegenerateGeometry) => {
                log::debug!("Ignoring trace with {} points", polygon.len());
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        self.undo = Some(std::mem::replace(&mut pair.merged, edited));
        self.display = DisplayTarget::Merged;
        self.revision += 1;
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.undo.is_some()
    }

    /// Restore the image from before the last edit. Only one level deep.
    pub fn undo(&mut self) -> bool {
        let (Some(pair), Some(previous)) = (self.pair.as_mut(), self.undo.take()) else {
            return false;
        };
        pair.merged = previous;
        self.revision += 1;
        true
    }

    /// Write the merged image back over its file, then reload it.
    ///
    /// With `backup`, an existing file is first renamed to `<name>.bak`. On a
    /// write failure the in-memory image is kept so the save can be retried.
    /// A failed reload after a good write comes back as `Error::Reload`.
    pub fn save(&mut self, backup: bool) -> Result<PathBuf> {
        let frames = self.frames.as_ref().ok_or(Error::NoDirectory)?;
        let pair = self.pair.as_ref().ok_or(Error::NoFrameLoaded)?;
        let index = pair.index;
        let path = frames.merged_path(index);
        if backup {
            codec::backup(&path)?;
        }
        codec::save_png(&pair.merged, &path)?;
        self.load(index).map_err(|e| Error::Reload {
            path: path.clone(),
            source: Box::new(e),
        })?;
        Ok(path)
    }

    /// Replace the loaded frame's merged file with its original file, then
    /// move on to the next frame.
    pub fn use_original(&mut self, backup: bool) -> Result<()> {
        let frames = self.frames.as_ref().ok_or(Error::NoDirectory)?;
        let index = self.pair.as_ref().ok_or(Error::NoFrameLoaded)?.index;
        let original = frames.original_path(index);
        let merged = frames.merged_path(index);
        if !original.is_file() {
            return Err(Error::NotFound(original));
        }
        if backup {
            codec::backup(&merged)?;
        }
        codec::copy_verbatim(&original, &merged)?;
        log::info!("Copied original image to {}", merged.display());

        self.navigate(Direction::Forward)?;
        Ok(())
    }

    pub fn zoom(&self) -> Option<ZoomRegion> {
        self.zoom
    }

    /// Show only `region`. Replaces any earlier region.
    pub fn set_zoom(&mut self, region: ZoomRegion) {
        self.zoom = Some(region);
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = None;
    }

    pub fn display(&self) -> DisplayTarget {
        self.display
    }

    pub fn set_display(&mut self, target: DisplayTarget) {
        if self.display != target {
            self.display = target;
            self.revision += 1;
        }
    }

    pub fn displayed_image(&self) -> Option<&RgbImage> {
        let pair = self.pair.as_ref()?;
        Some(match self.display {
            DisplayTarget::Merged => &pair.merged,
            DisplayTarget::Original => &pair.original,
        })
    }

    /// Mapper for the current image and zoom on `viewport`.
    pub fn mapper(&self, viewport: Viewport) -> Option<Mapper> {
        let pair = self.pair.as_ref()?;
        Some(Mapper::new(viewport, pair.merged.dimensions(), self.zoom))
    }

    pub fn progress(&self) -> Option<(String, f32)> {
        let frames = self.frames.as_ref()?;
        Some(self.nav.progress(frames.max_index()))
    }
}
