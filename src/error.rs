use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to provide the path to the configuration file. Please provide the path to the configuration file in the environment variable \"BEANCOUNT_IMPORT_CONFIG\" to fix this error.")]
    ConfigPath,

    #[error("Failed to read configuration file \"{}\"", .0.to_string_lossy())]
    ConfigRead(PathBuf),

    #[error("Failed to parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Mapping file \"{}\" does not exist", .0.to_string_lossy())]
    ConfigNotFound(PathBuf),

    #[error("Format of mapping file \"{}\" has not been recognized. Make sure it is YAML or JSON", .0.to_string_lossy())]
    UnsupportedFormat(PathBuf),

    #[error("Failed to parse mapping file \"{}\": {reason}", .path.to_string_lossy())]
    MappingParse { path: PathBuf, reason: String },

    #[error("\"{0}\" is not a valid amount")]
    MalformedAmount(String),

    #[error("Malformed row {row} in \"{}\": {reason}", .file.to_string_lossy())]
    MalformedRow {
        file: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("Failed to read input file \"{}\"", .0.to_string_lossy())]
    InputFileRead(PathBuf),

    #[error("Input file \"{}\" is not valid {encoding}", .path.to_string_lossy())]
    Encoding {
        path: PathBuf,
        encoding: &'static str,
    },

    #[error("Unknown text encoding \"{0}\"")]
    UnknownEncoding(String),

    #[error("Failed to parse input file: {0}")]
    InputParse(String),

    #[error("Invalid regular expression: {0}")]
    Regex(String),

    #[cfg(feature = "bbva")]
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ImportError {
    pub fn malformed_row(file: &std::path::Path, row: usize, reason: impl ToString) -> Self {
        ImportError::MalformedRow {
            file: file.to_path_buf(),
            row,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
