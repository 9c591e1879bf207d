use crate::{
    error::{Error, Result},
    store::AnnotationSet,
};
use std::{
    fs::OpenOptions,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

pub const DEFAULT_LOG_FILE: &str = "annotations.txt";

/// Formats one save record. An empty set still yields the header and the
/// separating blank line.
pub fn format_block(image_name: &str, annotations: &AnnotationSet) -> String {
    let mut block = format!("Image: {image_name}\n");
    for contour in annotations.contours() {
        block.push_str(&contour.to_string());
        block.push('\n');
    }
    block.push('\n');
    block
}

fn image_name(image_path: &Path) -> String {
    image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_path.to_string_lossy().into_owned())
}

/// Append-only record of every save action.
#[derive(Clone, Debug)]
pub struct AnnotationLog {
    path: PathBuf,
}

impl AnnotationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens, appends and closes the log. Never overwrites earlier blocks.
    pub fn append(&self, image_path: &Path, annotations: &AnnotationSet) -> Result<()> {
        let to_err = |source| Error::LogWrite {
            path: self.path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(to_err)?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(format_block(&image_name(image_path), annotations).as_bytes())
            .map_err(to_err)?;
        writer.flush().map_err(to_err)?;
        info!(
            "appended {} contour(s) of {:?} to {:?}",
            annotations.len(),
            image_path,
            self.path
        );
        Ok(())
    }
}
