use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("Invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("Plugin source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Staging directory already exists: {}\n\n\
             Hint: unrealpack stages the plugin next to its source folder and never\n\
             deletes a directory it did not create.\n\n\
             Solutions:\n\
             1. Remove or rename the existing directory\n\
             2. Pick another product name with --product\n\
             3. Make sure the source folder is not itself named after the product",
             .0.display())]
    StagingExists(PathBuf),

    #[error("Excluded entry not found in plugin source: {0}\n\n\
             Hint: [staging].strict is enabled, so every exclusion pattern must match.\n\
             Set strict = false in unrealpack.toml to skip missing entries.")]
    MissingExclusion(String),

    #[error("License file not found: {}", .0.display())]
    LicenseNotFound(PathBuf),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}
