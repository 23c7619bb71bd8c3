//! Pure state transitions driven by inbound events.
//!
//! [`reduce`] is the only place an inbound event changes the meaning of the
//! session state. It is total: unknown events and unreadable token claims
//! leave the affected fields untouched and log a diagnostic instead of
//! failing.

use crate::claims::ClaimsExtractor;
use crate::event::{Event, InboundEvent};
use crate::state::{AppState, StatePatch};

/// Apply a single inbound event to produce the next state.
///
/// | event | effect |
/// |---|---|
/// | `handshake` | `ready = true`, token, versions, user and app permissions |
/// | `redirect` | `path` |
/// | `theme` | `theme` |
/// | `localeChanged` | `locale` |
/// | `tokenRefresh` | `token` |
/// | `response` | none; matched by the dispatcher |
/// | unrecognized | none |
///
/// # Arguments
///
/// * `state` - The current snapshot, consumed.
/// * `event` - The decoded inbound event.
/// * `claims` - Reads user and app permissions from a handshake token.
///   A failure leaves `user` and `app_permissions` as they were.
///
/// # Returns
///
/// The next snapshot. Never fails.
pub fn reduce(state: AppState, event: &InboundEvent, claims: &dyn ClaimsExtractor) -> AppState {
    match event {
        InboundEvent::Known(event) => {
            let patch = patch_for(event, claims);
            state.merge(patch)
        }
        InboundEvent::Unrecognized { event_type, .. } => {
            tracing::warn!(event_type = %event_type, "ignoring unrecognized event type");
            state
        }
    }
}

/// The partial update a known event produces.
fn patch_for(event: &Event, claims: &dyn ClaimsExtractor) -> StatePatch {
    match event {
        Event::Handshake(payload) => {
            // Claims are best effort. A token we cannot read still makes the
            // session ready; the user and permissions keep their old values.
            let user = match claims.user(&payload.token) {
                Ok(user) => Some(Some(user)),
                Err(e) => {
                    tracing::warn!(error = %e, "could not read user from handshake token");
                    None
                }
            };
            let app_permissions = match claims.app_permissions(&payload.token) {
                Ok(perms) => Some(Some(perms)),
                Err(e) => {
                    tracing::warn!(error = %e, "could not read app permissions from handshake token");
                    None
                }
            };
            StatePatch {
                ready: Some(true),
                token: Some(Some(payload.token.clone())),
                saleor_version: Some(payload.saleor_version.clone()),
                dashboard_version: Some(payload.dashboard_version.clone()),
                user,
                app_permissions,
                ..StatePatch::default()
            }
        }
        Event::Redirect(payload) => StatePatch {
            path: Some(payload.path.clone()),
            ..StatePatch::default()
        },
        Event::Theme(payload) => StatePatch {
            theme: Some(payload.theme),
            ..StatePatch::default()
        },
        Event::LocaleChanged(payload) => StatePatch {
            locale: Some(payload.locale),
            ..StatePatch::default()
        },
        Event::TokenRefresh(payload) => StatePatch {
            token: Some(Some(payload.token.clone())),
            ..StatePatch::default()
        },
        Event::Response(_) => StatePatch::default(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::action::ActionId;
    use crate::claims::JwtClaims;
    use crate::claims::test_fixtures::staff_token;
    use crate::event::{
        HandshakePayload, LocaleChangedPayload, RedirectPayload, ResponsePayload, ThemePayload,
        TokenRefreshPayload,
    };
    use crate::locale::LocaleCode;
    use crate::state::{Theme, User};

    fn known(event: Event) -> InboundEvent {
        InboundEvent::Known(event)
    }

    fn handshake(token: String) -> InboundEvent {
        known(Event::Handshake(HandshakePayload {
            token,
            version: 1,
            saleor_version: Some("3.20.0".into()),
            dashboard_version: Some("3.20.4".into()),
        }))
    }

    #[test]
    fn theme_event_changes_only_theme() {
        let initial = AppState::default();
        let next = reduce(
            initial.clone(),
            &known(Event::Theme(ThemePayload { theme: Theme::Dark })),
            &JwtClaims,
        );
        assert_eq!(
            next,
            AppState {
                theme: Theme::Dark,
                ..initial
            }
        );
    }

    #[test]
    fn handshake_sets_ready_token_and_claims() {
        let token = staff_token();
        let next = reduce(AppState::default(), &handshake(token.clone()), &JwtClaims);

        assert!(next.ready);
        assert_eq!(next.token.as_deref(), Some(token.as_str()));
        assert_eq!(next.saleor_version.as_deref(), Some("3.20.0"));
        assert_eq!(next.dashboard_version.as_deref(), Some("3.20.4"));
        assert_eq!(
            next.user,
            Some(User {
                email: "staff@shop.example".into(),
                permissions: vec!["MANAGE_ORDERS".into(), "MANAGE_PRODUCTS".into()],
            })
        );
        assert_eq!(next.app_permissions, Some(vec!["MANAGE_ORDERS".into()]));
    }

    #[test]
    fn handshake_with_unreadable_token_still_becomes_ready() {
        let next = reduce(
            AppState::default(),
            &handshake("garbage".into()),
            &JwtClaims,
        );
        assert!(next.ready);
        assert_eq!(next.token.as_deref(), Some("garbage"));
        assert_eq!(next.user, None);
        assert_eq!(next.app_permissions, None);
    }

    #[test]
    fn simple_events_set_their_field() {
        let state = reduce(
            AppState::default(),
            &known(Event::Redirect(RedirectPayload {
                path: "/orders/1".into(),
            })),
            &JwtClaims,
        );
        assert_eq!(state.path, "/orders/1");

        let state = reduce(
            state,
            &known(Event::LocaleChanged(LocaleChangedPayload {
                locale: LocaleCode::Pl,
            })),
            &JwtClaims,
        );
        assert_eq!(state.locale, LocaleCode::Pl);

        let state = reduce(
            state,
            &known(Event::TokenRefresh(TokenRefreshPayload {
                token: "fresh".into(),
            })),
            &JwtClaims,
        );
        assert_eq!(state.token.as_deref(), Some("fresh"));
        assert_eq!(state.path, "/orders/1");
    }

    #[test]
    fn response_and_unrecognized_leave_state_unchanged() {
        let initial = AppState {
            id: "app".into(),
            ..AppState::default()
        };
        let response = known(Event::Response(ResponsePayload {
            action_id: ActionId::from("x"),
            ok: true,
            result: None,
        }));
        assert_eq!(reduce(initial.clone(), &response, &JwtClaims), initial);

        let unknown = InboundEvent::Unrecognized {
            event_type: "formPayload".into(),
            payload: json!({}),
        };
        assert_eq!(reduce(initial.clone(), &unknown, &JwtClaims), initial);
    }

    fn arb_event() -> impl Strategy<Value = InboundEvent> {
        prop_oneof![
            "[a-z]{1,8}".prop_map(handshake),
            "/[a-z/]{0,12}".prop_map(|path| known(Event::Redirect(RedirectPayload { path }))),
            prop_oneof![Just(Theme::Light), Just(Theme::Dark)]
                .prop_map(|theme| known(Event::Theme(ThemePayload { theme }))),
            proptest::sample::select(LocaleCode::ALL.to_vec())
                .prop_map(|locale| known(Event::LocaleChanged(LocaleChangedPayload { locale }))),
            "[a-z]{1,8}"
                .prop_map(|token| known(Event::TokenRefresh(TokenRefreshPayload { token }))),
            "[a-zA-Z]{1,10}".prop_map(|event_type| InboundEvent::Unrecognized {
                event_type,
                payload: json!(null),
            }),
        ]
    }

    proptest! {
        #[test]
        fn replaying_a_sequence_is_deterministic(events in prop::collection::vec(arb_event(), 0..32)) {
            let fold = || {
                events
                    .iter()
                    .fold(AppState::default(), |state, event| reduce(state, event, &JwtClaims))
            };
            prop_assert_eq!(fold(), fold());
        }

        #[test]
        fn ready_never_reverts_after_handshake(events in prop::collection::vec(arb_event(), 0..32)) {
            let mut state = reduce(AppState::default(), &handshake("t".into()), &JwtClaims);
            for event in &events {
                state = reduce(state, event, &JwtClaims);
                prop_assert!(state.ready);
            }
        }
    }
}
