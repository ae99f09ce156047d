//! Emulator errors

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the emulator crates.
pub type Result<T> = anyhow::Result<T, Error>;

/// Domain level error type returned by the emulator.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// The request payload is invalid or missing required fields.
    #[error("code: 400, description: {0}")]
    BadRequest(String),

    /// The requested device or resource could not be found.
    #[error("code: 404, description: {0}")]
    NotFound(String),

    /// The operation is not valid for the device's current lifecycle state.
    #[error("code: 409, description: invalid_state {0}")]
    InvalidState(String),

    /// The directions provider could not supply a usable route.
    #[error("code: 502, description: route_unavailable {0}")]
    RouteUnavailable(String),

    /// The transport could not reach the remote host.
    #[error("code: 503, description: connection {0}")]
    Connection(String),

    /// The remote host did not answer in time.
    #[error("code: 504, description: timeout {0}")]
    Timeout(String),

    /// A payload could not be (de)serialized.
    #[error("code: 500, description: invalid_format {0}")]
    InvalidFormat(String),

    /// A non recoverable internal error occurred.
    #[error("code: 500, description: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the stable error code associated with the variant.
    #[must_use]
    pub const fn code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::RouteUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::InvalidFormat(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        let chain = err.chain().map(ToString::to_string).collect::<Vec<_>>().join(" -> ");

        // if type is Error, return it with the newly added context
        if let Some(inner) = err.downcast_ref::<Self>() {
            tracing::debug!("Error: {err}, caused by: {inner}");

            return match inner {
                Self::BadRequest(_) => Self::BadRequest(chain),
                Self::NotFound(_) => Self::NotFound(chain),
                Self::InvalidState(_) => Self::InvalidState(chain),
                Self::Internal(_) => Self::Internal(chain),
                Self::RouteUnavailable(e) => Self::RouteUnavailable(format!("{err}: {e}")),
                Self::Connection(e) => Self::Connection(format!("{err}: {e}")),
                Self::Timeout(e) => Self::Timeout(format!("{err}: {e}")),
                Self::InvalidFormat(e) => Self::InvalidFormat(format!("{err}: {e}")),
            };
        }

        // otherwise, return an Internal error
        Self::Internal(chain)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

/// Error rendered by the HTTP front end.
pub struct HttpError {
    status: StatusCode,
    error: String,
}

impl From<Error> for HttpError {
    fn from(e: Error) -> Self {
        Self { status: e.code(), error: e.to_string() }
    }
}

impl From<anyhow::Error> for HttpError {
    fn from(e: anyhow::Error) -> Self {
        let error = format!("{e}, caused by: {}", e.root_cause());
        let status = e.downcast_ref().map_or(StatusCode::INTERNAL_SERVER_ERROR, Error::code);
        Self { status, error }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, self.error).into_response()
    }
}

#[macro_export]
macro_rules! bad_request {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::BadRequest(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::BadRequest(format!($err))
    };
}

#[macro_export]
macro_rules! not_found {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::NotFound(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::NotFound(format!($err))
    };
}

#[macro_export]
macro_rules! invalid_state {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::InvalidState(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::InvalidState(format!($err))
    };
}

#[macro_export]
macro_rules! route_unavailable {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::RouteUnavailable(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::RouteUnavailable(format!($err))
    };
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, Result, anyhow};
    use http::StatusCode;
    use serde_json::Value;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Registry, fmt};

    use super::Error;

    #[test]
    fn error_display() {
        let err = Error::InvalidState("device 0101234 already active".to_string());
        assert_eq!(
            format!("{err}"),
            "code: 409, description: invalid_state device 0101234 already active"
        );
        assert_eq!(err.code(), StatusCode::CONFLICT);
    }

    #[test]
    fn with_context() {
        Registry::default().with(EnvFilter::new("debug")).with(fmt::layer()).init();

        let context_error = || -> Result<(), Error> {
            Err(Error::NotFound("device 0101234".to_string()))
                .context("looking up session")
                .context("stopping emulator")?;
            Ok(())
        };

        let result = context_error();
        assert_eq!(
            result.unwrap_err(),
            Error::NotFound(
                "stopping emulator -> looking up session -> code: 404, description: device 0101234"
                    .to_string()
            )
        );
    }

    #[test]
    fn timeout_context() {
        let result =
            Err::<(), Error>(Error::Timeout("after 10s".to_string())).context("sending gps log");
        let err: Error = result.unwrap_err().into();

        assert_eq!(err.to_string(), "code: 504, description: timeout sending gps log: after 10s");
        assert_eq!(err.code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn route_context() {
        let result = Err::<(), Error>(Error::RouteUnavailable("no routes".to_string()))
            .context("fetching directions");
        let err: Error = result.unwrap_err().into();

        assert_eq!(
            err.to_string(),
            "code: 502, description: route_unavailable fetching directions: no routes"
        );
    }

    #[test]
    fn anyhow_context() {
        let result = Err::<(), anyhow::Error>(anyhow!("one-off error")).context("error context");
        let err: Error = result.unwrap_err().into();

        assert_eq!(err.to_string(), "code: 500, description: error context -> one-off error");
    }

    #[test]
    fn serde_context() {
        let result: Result<Value, anyhow::Error> =
            serde_json::from_str(r#"{"foo": "bar""#).context("error context");
        let err: Error = result.unwrap_err().into();

        assert_eq!(
            err.to_string(),
            "code: 500, description: error context -> EOF while parsing an object at line 1 column 13"
        );
    }
}
