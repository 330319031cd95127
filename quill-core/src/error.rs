use std::path::PathBuf;

use thiserror::Error;

/// Problems with the site configuration. These are fatal for the render that
/// hits them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),

    #[error(
        "Invalid logo_position '{0}'. Valid values are either \"left\" or \"right\" and are case sensitive."
    )]
    InvalidLogoPosition(String),

    #[error("Unknown part processor '{0}'")]
    UnknownPartProcessor(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Content directory does not exist: {}", .0.display())]
    MissingDir(PathBuf),

    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),
}
