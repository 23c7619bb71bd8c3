//! Inbound events sent by the dashboard host.
//!
//! Each event is a `{ "type": ..., "payload": ... }` record. The set of
//! kinds is closed on this side, but the host may evolve independently, so
//! decoding routes unknown discriminants to [`InboundEvent::Unrecognized`]
//! instead of failing.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::ActionId;
use crate::error::EventError;
use crate::locale::LocaleCode;
use crate::state::Theme;

/// Discriminant of an inbound [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    /// `handshake`
    Handshake,
    /// `redirect`
    Redirect,
    /// `theme`
    Theme,
    /// `localeChanged`
    LocaleChanged,
    /// `tokenRefresh`
    TokenRefresh,
    /// `response`
    Response,
}

impl EventType {
    /// Every known event type.
    pub const ALL: [EventType; 6] = [
        Self::Handshake,
        Self::Redirect,
        Self::Theme,
        Self::LocaleChanged,
        Self::TokenRefresh,
        Self::Response,
    ];

    /// The wire discriminant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handshake => "handshake",
            Self::Redirect => "redirect",
            Self::Theme => "theme",
            Self::LocaleChanged => "localeChanged",
            Self::TokenRefresh => "tokenRefresh",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// Sent once by the host when the app frame is ready to talk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakePayload {
    /// Dashboard auth token for the app.
    pub token: String,
    /// Bridge protocol version spoken by the host.
    pub version: u32,
    /// Version of the Saleor core behind the dashboard, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saleor_version: Option<String>,
    /// Version of the dashboard itself, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_version: Option<String>,
}

/// The host navigated the app to a new route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectPayload {
    /// Route inside the app the dashboard now shows.
    pub path: String,
}

/// The dashboard theme changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePayload {
    /// The theme now in effect.
    pub theme: Theme,
}

/// The dashboard locale changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleChangedPayload {
    /// The locale now in effect.
    pub locale: LocaleCode,
}

/// The host issued a fresh auth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRefreshPayload {
    /// Replacement for the handshake token.
    pub token: String,
}

/// The host's answer to a dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    /// Correlation id of the action being answered.
    pub action_id: ActionId,
    /// Whether the host carried out the action.
    pub ok: bool,
    /// Optional detail, forwarded to the dispatcher on success and rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// A decoded inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// Opens the session and hands over the auth token.
    Handshake(HandshakePayload),
    /// The dashboard moved the app to another route.
    Redirect(RedirectPayload),
    /// The dashboard switched theme.
    Theme(ThemePayload),
    /// The dashboard switched locale.
    LocaleChanged(LocaleChangedPayload),
    /// The auth token was renewed.
    TokenRefresh(TokenRefreshPayload),
    /// Answer to an action this app dispatched.
    Response(ResponsePayload),
}

impl Event {
    /// The discriminant of this event.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Handshake(_) => EventType::Handshake,
            Self::Redirect(_) => EventType::Redirect,
            Self::Theme(_) => EventType::Theme,
            Self::LocaleChanged(_) => EventType::LocaleChanged,
            Self::TokenRefresh(_) => EventType::TokenRefresh,
            Self::Response(_) => EventType::Response,
        }
    }

    /// Encode as the `{ type, payload }` wire object.
    pub fn to_wire(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Result of decoding a raw inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// One of the event kinds this client understands.
    Known(Event),
    /// A discriminant this client does not know. Carried for diagnostics.
    Unrecognized {
        /// The raw `type` discriminant.
        event_type: String,
        /// The raw `payload`, or `null` if absent.
        payload: Value,
    },
}

impl InboundEvent {
    /// Decode a raw `{ type, payload }` message.
    ///
    /// # Errors
    ///
    /// * [`EventError::MissingType`] if there is no string `type` field.
    /// * [`EventError::Payload`] if a known type carries a payload of the
    ///   wrong shape.
    pub fn decode(data: &Value) -> Result<Self, EventError> {
        let raw_type = data
            .get("type")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingType)?;
        let payload = data.get("payload").cloned().unwrap_or(Value::Null);

        let Ok(kind) = raw_type.parse::<EventType>() else {
            return Ok(Self::Unrecognized {
                event_type: raw_type.to_owned(),
                payload,
            });
        };

        let event = match kind {
            EventType::Handshake => Event::Handshake(decode_payload(kind, payload)?),
            EventType::Redirect => Event::Redirect(decode_payload(kind, payload)?),
            EventType::Theme => Event::Theme(decode_payload(kind, payload)?),
            EventType::LocaleChanged => Event::LocaleChanged(decode_payload(kind, payload)?),
            EventType::TokenRefresh => Event::TokenRefresh(decode_payload(kind, payload)?),
            EventType::Response => Event::Response(decode_payload(kind, payload)?),
        };
        Ok(Self::Known(event))
    }
}

fn decode_payload<T: DeserializeOwned>(kind: EventType, payload: Value) -> Result<T, EventError> {
    serde_json::from_value(payload).map_err(|source| EventError::Payload {
        event_type: kind.as_str(),
        source,
    })
}

/// A payload type that belongs to exactly one [`EventType`].
///
/// Lets [`AppBridge::subscribe`](crate::AppBridge::subscribe) hand
/// callbacks the payload they asked for rather than the whole [`Event`].
pub trait EventPayload: Send + Sync + 'static {
    /// The event type this payload is carried by.
    const EVENT_TYPE: EventType;

    /// Borrow this payload out of `event` if it is the matching kind.
    fn from_event(event: &Event) -> Option<&Self>;
}

macro_rules! event_payload {
    ($payload:ty, $variant:ident) => {
        impl EventPayload for $payload {
            const EVENT_TYPE: EventType = EventType::$variant;

            fn from_event(event: &Event) -> Option<&Self> {
                match event {
                    Event::$variant(payload) => Some(payload),
                    _ => None,
                }
            }
        }
    };
}

event_payload!(HandshakePayload, Handshake);
event_payload!(RedirectPayload, Redirect);
event_payload!(ThemePayload, Theme);
event_payload!(LocaleChangedPayload, LocaleChanged);
event_payload!(TokenRefreshPayload, TokenRefresh);
event_payload!(ResponsePayload, Response);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_theme_event() {
        let raw = json!({"type": "theme", "payload": {"theme": "dark"}});
        let decoded = InboundEvent::decode(&raw).expect("decode should succeed");
        assert_eq!(
            decoded,
            InboundEvent::Known(Event::Theme(ThemePayload { theme: Theme::Dark }))
        );
    }

    #[test]
    fn decode_handshake_with_versions() {
        let raw = json!({
            "type": "handshake",
            "payload": {
                "token": "t",
                "version": 1,
                "saleorVersion": "3.20.0",
                "dashboardVersion": "3.20.1"
            }
        });
        let InboundEvent::Known(Event::Handshake(payload)) =
            InboundEvent::decode(&raw).expect("decode should succeed")
        else {
            panic!("expected handshake");
        };
        assert_eq!(payload.token, "t");
        assert_eq!(payload.version, 1);
        assert_eq!(payload.saleor_version.as_deref(), Some("3.20.0"));
        assert_eq!(payload.dashboard_version.as_deref(), Some("3.20.1"));
    }

    #[test]
    fn decode_response_without_result() {
        let raw = json!({"type": "response", "payload": {"actionId": "a-1", "ok": true}});
        let decoded = InboundEvent::decode(&raw).expect("decode should succeed");
        let InboundEvent::Known(Event::Response(payload)) = decoded else {
            panic!("expected response, got {decoded:?}");
        };
        assert_eq!(payload.action_id.as_str(), "a-1");
        assert!(payload.ok);
        assert_eq!(payload.result, None);
    }

    #[test]
    fn unknown_type_is_unrecognized_not_error() {
        let raw = json!({"type": "formPayload", "payload": {"form": "x"}});
        let decoded = InboundEvent::decode(&raw).expect("unknown types are tolerated");
        assert_eq!(
            decoded,
            InboundEvent::Unrecognized {
                event_type: "formPayload".into(),
                payload: json!({"form": "x"}),
            }
        );
    }

    #[test]
    fn missing_type_is_an_error() {
        let result = InboundEvent::decode(&json!({"payload": {}}));
        assert!(matches!(result, Err(EventError::MissingType)), "got {result:?}");

        let result = InboundEvent::decode(&json!("handshake"));
        assert!(matches!(result, Err(EventError::MissingType)), "got {result:?}");
    }

    #[test]
    fn wrong_payload_shape_names_the_type() {
        let raw = json!({"type": "localeChanged", "payload": {"locale": "klingon"}});
        let result = InboundEvent::decode(&raw);
        assert!(
            matches!(
                result,
                Err(EventError::Payload {
                    event_type: "localeChanged",
                    ..
                })
            ),
            "got {result:?}"
        );
    }

    #[test]
    fn to_wire_matches_decode() {
        let event = Event::Redirect(RedirectPayload {
            path: "/orders".into(),
        });
        let wire = event.to_wire().expect("encode should succeed");
        assert_eq!(wire, json!({"type": "redirect", "payload": {"path": "/orders"}}));
        assert_eq!(
            InboundEvent::decode(&wire).expect("decode should succeed"),
            InboundEvent::Known(event)
        );
    }

    #[test]
    fn event_type_strings_round_trip() {
        for kind in EventType::ALL {
            assert_eq!(kind.as_str().parse::<EventType>(), Ok(kind));
        }
        assert!("notifyReady".parse::<EventType>().is_err());
    }

    #[test]
    fn payload_extraction_matches_only_its_kind() {
        let event = Event::TokenRefresh(TokenRefreshPayload {
            token: "new".into(),
        });
        assert_eq!(
            TokenRefreshPayload::from_event(&event).map(|p| p.token.as_str()),
            Some("new")
        );
        assert!(ThemePayload::from_event(&event).is_none());
        assert_eq!(TokenRefreshPayload::EVENT_TYPE, EventType::TokenRefresh);
    }
}
