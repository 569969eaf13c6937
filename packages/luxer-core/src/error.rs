//! Error taxonomy shared by the API client, the login session and the poller.

use thiserror::Error;

/// Failure of a single API call.
///
/// The split matters to callers: [`ApiError::Authorization`] means the token is
/// no longer accepted and only a new login can fix it, while
/// [`ApiError::Transport`] covers everything that may succeed on a later try.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with the `ApiAuthorizationRequired` marker.
    #[error("token rejected by Luxer One API - reauthentication required")]
    Authorization,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ApiError {
    pub fn is_authorization(&self) -> bool {
        matches!(self, ApiError::Authorization)
    }
}

/// Any non-authorization failure of a request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS or timeout failure before a body was read.
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    /// Non-2xx response that did not carry the authorization marker.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not JSON.
    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// The body was JSON but not the shape the endpoint promises.
    #[error("unexpected response from {endpoint}: {source}")]
    Shape {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("token cannot be sent as a header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Outcome classification of a coordinator phase.
#[derive(Debug, Error)]
pub enum PollError {
    /// The token was rejected; polling stops until a new login.
    #[error("authentication failed - reauthentication required")]
    AuthRequired,

    /// A transient failure of one setup attempt or one refresh tick.
    #[error("Error fetching {phase}: {source}")]
    UpdateFailed {
        phase: &'static str,
        #[source]
        source: TransportError,
    },
}

impl PollError {
    pub(crate) fn classify(phase: &'static str, err: ApiError) -> Self {
        match err {
            ApiError::Authorization => PollError::AuthRequired,
            ApiError::Transport(source) => PollError::UpdateFailed { phase, source },
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, PollError::AuthRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_keeps_authorization_separate() {
        let err = PollError::classify("locations", ApiError::Authorization);
        assert!(err.is_auth_required());

        let transport = TransportError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        let err = PollError::classify("deliveries", ApiError::Transport(transport));
        assert!(!err.is_auth_required());
        assert_eq!(
            err.to_string(),
            "Error fetching deliveries: server returned 502: bad gateway"
        );
    }
}
