use thiserror::Error;

/// Raw body of a failed HTTP response, kept as the error's cause.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ResponseBody(pub String);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("cannot reach API endpoint '{url}'")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("API request to '{url}' timed out")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("API endpoint '{url}' returned HTTP {status}")]
    Status {
        url: String,
        status: u16,
        #[source]
        body: ResponseBody,
    },
    #[error("API request to '{url}' failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn name(&self) -> &'static str {
        match self {
            ApiError::Connect { .. } => "ConnectError",
            ApiError::Timeout { .. } => "TimeoutError",
            ApiError::Status { .. } => "APICallError",
            ApiError::Transport { .. } => "TransportError",
        }
    }

    pub fn status(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        ApiError::Status {
            url: url.into(),
            status,
            body: ResponseBody(body.into()),
        }
    }

    pub(crate) fn from_reqwest(error: reqwest::Error, url: &str) -> Self {
        let url = url.to_string();
        if error.is_connect() {
            return ApiError::Connect { url, source: error };
        }
        if error.is_timeout() {
            return ApiError::Timeout { url, source: error };
        }
        ApiError::Transport { url, source: error }
    }
}
