//! Crate-level error types for bridge construction, dispatch, and inbound decoding.

use std::time::Duration;

use crate::action::ActionId;

/// Error returned when an [`AppBridge`](crate::AppBridge) cannot be constructed.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The frame reports no page location.
    ///
    /// The bridge only makes sense inside a browser-hosted rendering
    /// context with a parent to talk to.
    #[error("app bridge requires a browser context with an embedding page")]
    NoBrowserContext,

    /// No tokio runtime is available to drive dispatch timers.
    #[error("app bridge must be constructed inside a tokio runtime")]
    NoRuntime,
}

/// Error returned when a dispatched action does not complete successfully.
///
/// Each variant is a distinct terminal outcome; callers branch on the
/// variant rather than on the message text.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The host answered with `ok: false`.
    ///
    /// The host understood the action but rejected or failed it. Any
    /// `result` it attached is forwarded.
    #[error("host rejected action {action_id}")]
    Rejected {
        /// Correlation id of the rejected action.
        action_id: ActionId,
        /// Optional detail supplied by the host.
        result: Option<serde_json::Value>,
    },

    /// No matching response arrived within the dispatch window.
    #[error("action {action_id} timed out after {}ms", after.as_millis())]
    Timeout {
        /// Correlation id of the action that timed out.
        action_id: ActionId,
        /// The window that elapsed.
        after: Duration,
    },

    /// Posting the action to the parent frame failed.
    #[error("failed to post action to host: {0}")]
    Channel(#[from] ChannelError),

    /// The bridge is not listening yet, so a response could never be matched.
    ///
    /// Only reachable during construction; see [`Lifecycle`](crate::Lifecycle).
    #[error("app bridge is not listening yet")]
    NotListening,

    /// The bridge was dropped while the action was in flight.
    #[error("app bridge is no longer running")]
    BridgeGone,
}

impl DispatchError {
    /// Returns `true` for [`DispatchError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` for [`DispatchError::Rejected`].
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Error raised by a [`FrameWindow`](crate::FrameWindow) when posting to the parent fails.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The page has no parent frame to post to.
    #[error("no parent frame to post to")]
    NoParent,

    /// The message could not be serialized for the wire.
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Platform-specific failure, described by the frame implementation.
    #[error("{0}")]
    Other(String),
}

/// Error returned when claims cannot be read from a dashboard token.
#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    /// The token is not a three-part JWT.
    #[error("token is not a JWT")]
    Malformed,

    /// The payload segment is not valid base64url.
    #[error("token payload is not base64url: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The payload segment is not the expected JSON shape.
    #[error("token payload is not valid claims JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error returned when an inbound message cannot be decoded into an event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The message carries no string `type` discriminant.
    #[error("inbound message has no string `type` field")]
    MissingType,

    /// A known event type arrived with a payload of the wrong shape.
    #[error("malformed `{event_type}` payload: {source}")]
    Payload {
        /// The discriminant that was recognised.
        event_type: &'static str,
        /// The underlying deserialization failure.
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_display_names_action() {
        let id = ActionId::from("a-1");
        let err = DispatchError::Rejected {
            action_id: id,
            result: None,
        };
        assert_eq!(err.to_string(), "host rejected action a-1");
        assert!(err.is_rejected());
        assert!(!err.is_timeout());
    }

    #[test]
    fn timeout_display_includes_window() {
        let err = DispatchError::Timeout {
            action_id: ActionId::from("a-2"),
            after: Duration::from_millis(1000),
        };
        assert_eq!(err.to_string(), "action a-2 timed out after 1000ms");
        assert!(err.is_timeout());
        assert!(!err.is_rejected());
    }

    #[test]
    fn channel_error_converts_into_dispatch_error() {
        let err = DispatchError::from(ChannelError::NoParent);
        assert!(matches!(err, DispatchError::Channel(ChannelError::NoParent)));
        assert!(err.to_string().contains("no parent frame"));
    }

    #[test]
    fn bridge_error_display() {
        assert_eq!(
            BridgeError::NoBrowserContext.to_string(),
            "app bridge requires a browser context with an embedding page"
        );
    }

    #[test]
    fn claims_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ClaimsError::from(json_err);
        assert!(err.to_string().starts_with("token payload is not valid claims JSON"));
    }

    // Errors travel through oneshot channels and across tasks.
    const _: () = {
        #[allow(dead_code)]
        fn assert_send_sync<T: Send + Sync + 'static>() {}

        #[allow(dead_code)]
        fn check() {
            assert_send_sync::<BridgeError>();
            assert_send_sync::<DispatchError>();
            assert_send_sync::<ChannelError>();
            assert_send_sync::<ClaimsError>();
            assert_send_sync::<EventError>();
        }
    };
}
