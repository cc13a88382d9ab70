use thiserror::Error;

/// Errors returned by Axera operations.
///
/// The infallible client methods ([`AxeraClient::generate`],
/// [`AxeraClient::interrogate`], ...) never surface these directly; they fold
/// them into a failure value carrying the `Display` text.
///
/// [`AxeraClient::generate`]: crate::AxeraClient::generate
/// [`AxeraClient::interrogate`]: crate::AxeraClient::interrogate
#[derive(Error, Debug)]
pub enum AxeraError {
    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The service returned a non-success HTTP status.
    #[error("Axera returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body was malformed or missing expected fields.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service answered but reported a logical failure.
    #[error("Error: {0}")]
    Server(String),

    /// Image bytes or their base64 transport could not be decoded.
    #[error("Image error: {0}")]
    Image(String),

    /// Structured interrogation was asked for with nothing to ask about.
    #[error("No valid categories provided")]
    NoCategories,

    /// A loop or client was configured with values it cannot run with.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<image::ImageError> for AxeraError {
    fn from(err: image::ImageError) -> Self {
        AxeraError::Image(err.to_string())
    }
}

impl From<base64::DecodeError> for AxeraError {
    fn from(err: base64::DecodeError) -> Self {
        AxeraError::Image(format!("invalid base64: {}", err))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AxeraError>;
