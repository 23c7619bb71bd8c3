//! Session state the embedded app derives from its dashboard host.
//!
//! [`AppState`] is the snapshot; [`StatePatch`] is a partial update that is
//! shallow-merged onto it; [`StateContainer`] holds the current snapshot.
//! The container has no business logic of its own: meaning is assigned by
//! the [`reducer`](crate::reducer) and by construction-time seeding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::locale::LocaleCode;

/// Dashboard colour theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background. The default.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl Theme {
    /// The wire representation (`"light"` or `"dark"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(()),
        }
    }
}

/// The dashboard user the app is rendered for, read from the handshake token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Email address of the signed-in staff user.
    pub email: String,
    /// Permission codes granted to the user (e.g. `"MANAGE_ORDERS"`).
    pub permissions: Vec<String>,
}

/// Snapshot of the embedded app's view of its hosting context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Opaque dashboard auth token; absent until the handshake.
    pub token: Option<String>,
    /// App instance id.
    pub id: String,
    /// Set once by the handshake and never cleared.
    pub ready: bool,
    /// Saleor domain the app talks to. May be empty.
    pub domain: String,
    /// Current logical route inside the app.
    pub path: String,
    /// Dashboard theme the app should render with.
    pub theme: Theme,
    /// Dashboard locale the app should render with.
    pub locale: LocaleCode,
    /// Full GraphQL endpoint of the Saleor instance. May be empty.
    pub saleor_api_url: String,
    /// Saleor core version reported by the handshake.
    pub saleor_version: Option<String>,
    /// Dashboard version reported by the handshake.
    pub dashboard_version: Option<String>,
    /// Signed-in user, once the handshake token has been read.
    pub user: Option<User>,
    /// Permissions granted to the app, once the handshake token has been read.
    pub app_permissions: Option<Vec<String>>,
}

/// A partial update to [`AppState`].
///
/// Every `Some` field replaces the corresponding snapshot field; `None`
/// fields leave it untouched. Optional snapshot fields therefore take a
/// nested `Option`, where `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    /// Replaces [`AppState::token`].
    pub token: Option<Option<String>>,
    /// Replaces [`AppState::id`].
    pub id: Option<String>,
    /// Replaces [`AppState::ready`].
    pub ready: Option<bool>,
    /// Replaces [`AppState::domain`].
    pub domain: Option<String>,
    /// Replaces [`AppState::path`].
    pub path: Option<String>,
    /// Replaces [`AppState::theme`].
    pub theme: Option<Theme>,
    /// Replaces [`AppState::locale`].
    pub locale: Option<LocaleCode>,
    /// Replaces [`AppState::saleor_api_url`].
    pub saleor_api_url: Option<String>,
    /// Replaces [`AppState::saleor_version`].
    pub saleor_version: Option<Option<String>>,
    /// Replaces [`AppState::dashboard_version`].
    pub dashboard_version: Option<Option<String>>,
    /// Replaces [`AppState::user`].
    pub user: Option<Option<User>>,
    /// Replaces [`AppState::app_permissions`].
    pub app_permissions: Option<Option<Vec<String>>>,
}

impl StatePatch {
    /// Returns `true` if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl AppState {
    /// Shallow-merge `patch` onto this snapshot and return the result.
    pub fn merge(mut self, patch: StatePatch) -> Self {
        let StatePatch {
            token,
            id,
            ready,
            domain,
            path,
            theme,
            locale,
            saleor_api_url,
            saleor_version,
            dashboard_version,
            user,
            app_permissions,
        } = patch;

        if let Some(token) = token {
            self.token = token;
        }
        if let Some(id) = id {
            self.id = id;
        }
        if let Some(ready) = ready {
            self.ready = ready;
        }
        if let Some(domain) = domain {
            self.domain = domain;
        }
        if let Some(path) = path {
            self.path = path;
        }
        if let Some(theme) = theme {
            self.theme = theme;
        }
        if let Some(locale) = locale {
            self.locale = locale;
        }
        if let Some(url) = saleor_api_url {
            self.saleor_api_url = url;
        }
        if let Some(version) = saleor_version {
            self.saleor_version = version;
        }
        if let Some(version) = dashboard_version {
            self.dashboard_version = version;
        }
        if let Some(user) = user {
            self.user = user;
        }
        if let Some(permissions) = app_permissions {
            self.app_permissions = permissions;
        }
        self
    }
}

/// Holds the current [`AppState`] snapshot.
#[derive(Debug, Clone, Default)]
pub struct StateContainer {
    state: AppState,
}

impl StateContainer {
    /// Create a container holding `initial`.
    pub fn new(initial: AppState) -> Self {
        Self { state: initial }
    }

    /// Create a container with default state, seeded with a locale and theme.
    pub fn seeded(locale: LocaleCode, theme: Theme) -> Self {
        Self::new(AppState {
            locale,
            theme,
            ..AppState::default()
        })
    }

    /// The current snapshot.
    pub fn get_state(&self) -> &AppState {
        &self.state
    }

    /// Shallow-merge `patch` onto the current snapshot and return the new one.
    pub fn set_state(&mut self, patch: StatePatch) -> &AppState {
        let current = std::mem::take(&mut self.state);
        self.state = current.merge(patch);
        &self.state
    }

    /// Replace the snapshot wholesale.
    pub(crate) fn replace(&mut self, state: AppState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_not_ready_and_light() {
        let state = AppState::default();
        assert!(!state.ready);
        assert_eq!(state.theme, Theme::Light);
        assert_eq!(state.locale, LocaleCode::En);
        assert_eq!(state.token, None);
        assert_eq!(state.domain, "");
    }

    #[test]
    fn set_state_preserves_fields_absent_from_patch() {
        let mut container = StateContainer::seeded(LocaleCode::De, Theme::Dark);
        container.set_state(StatePatch {
            domain: Some("shop.example".into()),
            ..StatePatch::default()
        });
        let state = container.set_state(StatePatch {
            path: Some("/orders".into()),
            ..StatePatch::default()
        });

        assert_eq!(state.domain, "shop.example");
        assert_eq!(state.path, "/orders");
        assert_eq!(state.locale, LocaleCode::De);
        assert_eq!(state.theme, Theme::Dark);
    }

    #[test]
    fn nested_none_clears_optional_field() {
        let mut container = StateContainer::default();
        container.set_state(StatePatch {
            token: Some(Some("t-1".into())),
            ..StatePatch::default()
        });
        assert_eq!(container.get_state().token.as_deref(), Some("t-1"));

        container.set_state(StatePatch {
            token: Some(None),
            ..StatePatch::default()
        });
        assert_eq!(container.get_state().token, None);
    }

    #[test]
    fn empty_patch_is_identity() {
        let patch = StatePatch::default();
        assert!(patch.is_empty());

        let state = AppState {
            id: "app-1".into(),
            ready: true,
            ..AppState::default()
        };
        assert_eq!(state.clone().merge(patch), state);
    }

    #[test]
    fn theme_parses_only_known_values() {
        assert_eq!("dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!("light".parse::<Theme>(), Ok(Theme::Light));
        assert!("sepia".parse::<Theme>().is_err());
        assert!("Dark".parse::<Theme>().is_err());
    }

    #[test]
    fn state_serializes_camel_case() {
        let state = AppState {
            saleor_api_url: "https://shop.example/graphql/".into(),
            ..AppState::default()
        };
        let json = serde_json::to_value(&state).expect("serialization should succeed");
        assert_eq!(json["saleorApiUrl"], "https://shop.example/graphql/");
        assert_eq!(json["theme"], "light");
        assert_eq!(json["locale"], "en");
    }
}
