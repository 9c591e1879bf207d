use crate::{
    anno_log::AnnotationLog,
    error::{Error, Result},
    store::{AnnotationSet, Point},
};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditCommand {
    Save,
    Clear,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Drawing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Editing state of one image, from open to quit.
pub struct CanvasSession {
    image_path: PathBuf,
    image: RgbaImage,
    annotations: AnnotationSet,
    status: Option<String>,
}

impl CanvasSession {
    /// Loads the image. Fails for missing or undecodable files, in which case
    /// nothing is shown.
    pub fn open(image_path: &Path) -> Result<Self> {
        let image = image::open(image_path)
            .map_err(|source| Error::ImageLoad {
                path: image_path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        info!("annotating image {image_path:?}");
        Ok(Self {
            image_path: image_path.to_path_buf(),
            image,
            annotations: AnnotationSet::new(),
            status: None,
        })
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down(p) => {
                debug!("contour started at {p}");
                self.annotations.begin_contour(p);
            }
            PointerEvent::Move(p) => self.annotations.extend_current(p),
            PointerEvent::Up(p) => {
                if self.annotations.is_drawing() {
                    self.annotations.end_contour(p);
                    debug!(
                        "contour finished at {p} with {} points",
                        self.annotations.contours().last().map_or(0, |c| c.points().len())
                    );
                }
            }
        }
    }

    /// Quitting mid-gesture keeps the unfinished contour as it is.
    pub fn command(&mut self, cmd: EditCommand, log: &AnnotationLog) -> Result<Flow> {
        match cmd {
            EditCommand::Save => {
                log.append(&self.image_path, &self.annotations)?;
                info!("annotations saved");
                self.status = Some(if self.annotations.is_empty() {
                    format!("Saved an empty block to {}", log.path().display())
                } else {
                    format!(
                        "Saved {} contour(s) to {}",
                        self.annotations.len(),
                        log.path().display()
                    )
                });
                Ok(Flow::Continue)
            }
            EditCommand::Clear => {
                self.annotations.clear();
                info!("annotations cleared");
                self.status = Some("Annotations cleared".to_string());
                Ok(Flow::Continue)
            }
            EditCommand::Quit => {
                info!("exiting annotation for {:?}", self.image_path);
                Ok(Flow::Quit)
            }
        }
    }

    pub fn state(&self) -> GestureState {
        if self.annotations.is_drawing() {
            GestureState::Drawing
        } else {
            GestureState::Idle
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}
