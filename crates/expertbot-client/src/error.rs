use thiserror::Error;

/// Errors talking to the expert-system backend
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("api error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("request timed out")]
    Timeout,

    /// The body parsed but matches none of the known response shapes.
    #[error("invalid response format from server")]
    UnrecognizedResponse,

    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ClientError::Api {
            status: 500,
            message: "Internal Server Error".to_string(),
        };
        assert_eq!(err.to_string(), "api error: 500 - Internal Server Error");
        assert_eq!(
            ClientError::UnrecognizedResponse.to_string(),
            "invalid response format from server"
        );
    }
}
