use thiserror::Error;

/// A filter expression that could not be compiled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("unknown filter operator `{0}`")]
    UnknownOperator(String),

    #[error("operator `{op}` expects at least {expected} arguments, got {got}")]
    Arity {
        op: String,
        expected: usize,
        got: usize,
    },

    #[error("operator `{0}` expects a property name")]
    KeyNotString(String),

    #[error("operator `{0}` expects a numeric operand")]
    NotNumeric(String),

    #[error("malformed filter expression: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum StyleError {
    #[error("failed to read style document: {0}")]
    Io(#[from] std::io::Error),

    #[error("style document is not valid JSON: {0}")]
    Json(#[from] simd_json::Error),

    #[error("style document has no `layers` array")]
    MissingLayers,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

#[derive(Debug, Error)]
pub enum TileError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("gzip stream is corrupt: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("vector tile decode failed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("nothing to render: no valid coordinates")]
    NoCoordinates,

    #[error("leg {index} out of range ({len} legs)")]
    LegOutOfRange { index: usize, len: usize },
}
