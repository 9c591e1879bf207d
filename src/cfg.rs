use crate::{
    anno_log::DEFAULT_LOG_FILE,
    error::{Error, Result},
};
use clap::Parser;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

pub const DEFAULT_CFG_FILE: &str = "contour-annotate.toml";

/// What the navigator does when an image cannot be loaded.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadFailurePolicy {
    /// End the whole run.
    #[default]
    Abort,
    /// Continue with the neighbouring image in the direction of travel.
    Skip,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StrokeCfg {
    pub color: [u8; 3],
    pub width: f32,
}

impl Default for StrokeCfg {
    fn default() -> Self {
        Self {
            color: [0, 255, 0],
            width: 2.0,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Cfg {
    pub image_dir: Option<PathBuf>,
    pub log_file: PathBuf,
    pub poll_interval_ms: u64,
    pub on_load_failure: LoadFailurePolicy,
    pub stroke: StrokeCfg,
}

impl Default for Cfg {
    fn default() -> Self {
        Self {
            image_dir: None,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            poll_interval_ms: 16,
            on_load_failure: LoadFailurePolicy::default(),
            stroke: StrokeCfg::default(),
        }
    }
}

impl Cfg {
    pub fn from_toml_str(s: &str, path: &Path) -> Result<Self> {
        toml::from_str(s).map_err(|source| Error::CfgParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path).map_err(|source| Error::CfgRead {
            path: path.to_path_buf(),
            source,
        })?;
        info!("loaded config from {path:?}");
        Self::from_toml_str(&s, path)
    }

    /// An explicitly given config file must exist, the default one is optional.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut cfg = match &cli.config {
            Some(path) => Self::read(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CFG_FILE);
                if default_path.is_file() {
                    Self::read(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_cli(cli);
        Ok(cfg)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.image_dir {
            self.image_dir = Some(dir.clone());
        }
        if let Some(log_file) = &cli.log_file {
            self.log_file = log_file.clone();
        }
        if cli.skip_unreadable {
            self.on_load_failure = LoadFailurePolicy::Skip;
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Draw free-hand contours on a folder of images", long_about = None)]
pub struct Cli {
    /// Folder containing .png, .jpg or .jpeg images. Opens a folder dialog if omitted.
    pub image_dir: Option<PathBuf>,
    /// TOML config file [default: ./contour-annotate.toml if present]
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// File the annotations are appended to [default: ./annotations.txt]
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,
    /// Move on to the next image instead of stopping when an image cannot be loaded
    #[arg(long)]
    pub skip_unreadable: bool,
}
