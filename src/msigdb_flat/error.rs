use thiserror::Error;

// SourceDataShape means an input table or file didn't have the layout we
// expect, Validation means a threshold or identity check on otherwise
// well-formed data failed, Consistency means two derived parts of the
// output disagree with each other and InvalidArgument means the caller
// passed something unusable.  the rest wrap errors from the libraries
// underneath
#[derive(Debug, Error)]
pub enum FlatTableError {
    #[error("source data shape error: {0}")]
    SourceDataShape(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("consistency check failed: {0}")]
    Consistency(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("snapshot database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("snapshot archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("delimited file error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FlatResult<T> = Result<T, FlatTableError>;
