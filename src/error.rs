use thiserror::Error;

/// Why a piece of serialized table state could not be read
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64 state: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("invalid state JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid value {value:?} for query parameter {key:?}")]
    InvalidParameter { key: String, value: String },
}

impl CodecError {
    pub fn invalid_parameter(key: impl Into<String>, value: impl Into<String>) -> Self {
        CodecError::InvalidParameter {
            key: key.into(),
            value: value.into(),
        }
    }
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
