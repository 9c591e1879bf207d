use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to load image at {path:?}: {source}")]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("could not append annotations to {path:?}: {source}")]
    LogWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not list directory {path:?}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not read config file {path:?}: {source}")]
    CfgRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}: {source}")]
    CfgParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("window error: {0}")]
    Window(#[from] eframe::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
