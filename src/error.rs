//! Crate-level error types for backend calls and operator actions.

/// Error returned when a one-shot backend call fails.
///
/// Transport failures and malformed payloads are *transient* from the
/// caller's point of view: loops that own state (the lock gate) log them and
/// keep the previous state, and one-shot callers simply surface them. No
/// variant is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network or protocol failure reported by the HTTP client.
    ///
    /// Covers connection errors, timeouts on one-shot calls, and transport
    /// errors while reading a response body.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status code.
    #[error("unexpected status {status} from {endpoint}")]
    BadStatus {
        /// Path of the endpoint that produced the response.
        endpoint: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The response body was not the expected JSON shape.
    ///
    /// Treated identically to a transport failure: logged by owning loops,
    /// previous state retained.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Error returned when triggering a bulk operation fails.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The action's precondition does not hold (e.g., retrying failed mail
    /// when nothing has failed).
    ///
    /// Disabled actions must not fire; the caller decides whether to tell
    /// the operator or simply grey out the affordance.
    #[error("action {action} is disabled: {reason}")]
    Disabled {
        /// Name of the refused action.
        action: &'static str,
        /// Why the precondition failed.
        reason: &'static str,
    },

    /// The underlying backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_status_display_names_endpoint_and_code() {
        let err = ApiError::BadStatus {
            endpoint: "/api/teams".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "unexpected status 503 from /api/teams");
    }

    #[test]
    fn malformed_wraps_serde_error() {
        let serde_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = ApiError::from(serde_err);
        assert!(err.to_string().starts_with("malformed payload:"));
    }

    #[test]
    fn disabled_display_names_action_and_reason() {
        let err = DispatchError::Disabled {
            action: "retry-failed-mails",
            reason: "no failed mails",
        };
        assert_eq!(
            err.to_string(),
            "action retry-failed-mails is disabled: no failed mails"
        );
    }

    #[test]
    fn api_error_is_transparent_through_dispatch_error() {
        let inner = ApiError::BadStatus {
            endpoint: "/api/admin/generate-all-qrs/stream".to_string(),
            status: 500,
        };
        let display = inner.to_string();
        let err = DispatchError::from(inner);
        assert_eq!(err.to_string(), display);
    }

    // Verify `Send + Sync` bounds are satisfied so errors can cross thread
    // boundaries, which is required for use with `tokio` channels.
    const _: () = {
        #[allow(dead_code)]
        fn assert_send_sync<T: Send + Sync>() {}

        #[allow(dead_code)]
        fn check() {
            assert_send_sync::<ApiError>();
            assert_send_sync::<DispatchError>();
        }
    };
}
