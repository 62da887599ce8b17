use std::fmt;

/// API errors with user-friendly messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Network-level failure (connection, timeout, DNS)
    Network(String),
    /// HTTP error response (4xx, 5xx) with the server's message
    HttpStatus(u16, String),
    /// Failed to parse response
    Parse(String),
    /// Client could not be configured (bad base URL, TLS setup)
    Config(String),
}

impl ApiError {
    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(details) => {
                if details.contains("timed out") {
                    "Request timed out. Please try again.".into()
                } else if details.contains("dns") || details.contains("resolve") {
                    "Network error: Could not reach server.".into()
                } else {
                    format!("Network error: {details}")
                }
            }
            Self::HttpStatus(401 | 403, _) => "Not authorized. Check your access token.".into(),
            Self::HttpStatus(429, _) => "Rate limited. Please wait a moment.".into(),
            Self::HttpStatus(404, _) => "Not found.".into(),
            Self::HttpStatus(500..=599, _) => "Server error. Please try again later.".into(),
            Self::HttpStatus(code, msg) => format!("HTTP error {code}: {msg}"),
            Self::Parse(details) => format!("Failed to parse response: {details}"),
            Self::Config(details) => format!("Invalid configuration: {details}"),
        }
    }

    /// Returns true if retrying the same request may succeed.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::HttpStatus(code, _) => *code == 429 || *code >= 500,
            Self::Parse(_) | Self::Config(_) => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network("request timed out".into())
        } else if err.is_connect() {
            Self::Network("connection failed".into())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else if err.is_builder() {
            Self::Config(err.to_string())
        } else if let Some(status) = err.status() {
            Self::HttpStatus(
                status.as_u16(),
                status.canonical_reason().unwrap_or("").into(),
            )
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_is_friendly() {
        let err = ApiError::Network("request timed out".into());
        assert_eq!(err.user_message(), "Request timed out. Please try again.");
    }

    #[test]
    fn http_status_falls_back_to_server_message() {
        let err = ApiError::HttpStatus(422, "Invalid category".into());
        assert_eq!(err.to_string(), "HTTP error 422: Invalid category");
    }

    #[test]
    fn server_errors_and_rate_limits_are_transient() {
        assert!(ApiError::HttpStatus(503, "Service Unavailable".into()).is_transient());
        assert!(ApiError::HttpStatus(429, "Too Many Requests".into()).is_transient());
        assert!(ApiError::Network("connection failed".into()).is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        assert!(!ApiError::HttpStatus(400, "Bad Request".into()).is_transient());
        assert!(!ApiError::HttpStatus(404, "Not Found".into()).is_transient());
        assert!(!ApiError::Parse("eof".into()).is_transient());
    }
}
