use thiserror::Error;

/// Failures talking to a hosted model (chat or embedding).
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to {provider} failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {provider}: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} stream failed: {message}")]
    Stream {
        provider: &'static str,
        message: String,
    },
}

impl LlmError {
    pub fn http(provider: &'static str, source: reqwest::Error) -> Self {
        LlmError::Http { provider, source }
    }

    pub fn decode(provider: &'static str, message: impl Into<String>) -> Self {
        LlmError::Decode {
            provider,
            message: message.into(),
        }
    }

    pub fn stream(provider: &'static str, message: impl Into<String>) -> Self {
        LlmError::Stream {
            provider,
            message: message.into(),
        }
    }
}

/// Turns a non-2xx response into [`LlmError::Status`], keeping the body for the logs.
pub async fn error_for_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Status {
        provider,
        status: status.as_u16(),
        body,
    })
}
