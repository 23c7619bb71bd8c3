//! Construction options and their resolution against the app page URL.
//!
//! The dashboard renders the app with query parameters describing its
//! context (`domain`, `saleorApiUrl`, `locale`, `theme`, `id`). Anything the
//! caller sets explicitly on [`BridgeOptions`] wins over those parameters.

use std::time::Duration;

use url::Url;

use crate::locale::LocaleCode;
use crate::state::Theme;

/// How long a dispatched action waits for its response: 1 second.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_millis(1000);

/// Options for [`AppBridge::new`](crate::AppBridge::new).
///
/// # Examples
///
/// ```
/// use saleor_app_bridge::{BridgeOptions, LocaleCode, Theme};
///
/// let options = BridgeOptions::default()
///     .with_target_domain("shop.example")
///     .with_initial_locale(LocaleCode::De)
///     .with_initial_theme(Theme::Dark)
///     .with_auto_notify_ready(false);
/// assert_eq!(options.target_domain.as_deref(), Some("shop.example"));
/// assert!(!options.auto_notify_ready);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Saleor domain. Falls back to the `domain` query parameter.
    pub target_domain: Option<String>,
    /// GraphQL endpoint. Falls back to the `saleorApiUrl` query parameter.
    pub saleor_api_url: Option<String>,
    /// Falls back to the `locale` query parameter, then to [`LocaleCode::En`].
    pub initial_locale: Option<LocaleCode>,
    /// Falls back to the `theme` query parameter, then to [`Theme::Light`].
    pub initial_theme: Option<Theme>,
    /// Dispatch `notifyReady` as soon as the bridge is listening.
    ///
    /// Default: `true`.
    pub auto_notify_ready: bool,
    /// How long a dispatch waits for the host's response.
    ///
    /// Default: [`DEFAULT_DISPATCH_TIMEOUT`].
    pub dispatch_timeout: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            target_domain: None,
            saleor_api_url: None,
            initial_locale: None,
            initial_theme: None,
            auto_notify_ready: true,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }
}

impl BridgeOptions {
    /// Set the Saleor domain.
    ///
    /// # Arguments
    ///
    /// * `domain` - Host name of the Saleor instance (e.g. `"shop.example"`).
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn with_target_domain(mut self, domain: impl Into<String>) -> Self {
        self.target_domain = Some(domain.into());
        self
    }

    /// Set the GraphQL endpoint of the Saleor instance.
    pub fn with_saleor_api_url(mut self, url: impl Into<String>) -> Self {
        self.saleor_api_url = Some(url.into());
        self
    }

    /// Set the locale the session starts with.
    pub fn with_initial_locale(mut self, locale: LocaleCode) -> Self {
        self.initial_locale = Some(locale);
        self
    }

    /// Set the theme the session starts with.
    pub fn with_initial_theme(mut self, theme: Theme) -> Self {
        self.initial_theme = Some(theme);
        self
    }

    /// Enable or disable dispatching `notifyReady` at construction.
    pub fn with_auto_notify_ready(mut self, enabled: bool) -> Self {
        self.auto_notify_ready = enabled;
        self
    }

    /// Set how long each dispatch waits for the host's response.
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Merge these options with the query parameters of `location`.
    ///
    /// Explicit options win. Otherwise `domain`, `saleorApiUrl`, `locale`
    /// and `theme` come from the query; `id` always does. Missing values
    /// fall back to empty strings, [`LocaleCode::En`] and [`Theme::Light`].
    ///
    /// # Arguments
    ///
    /// * `location` - URL of the app page, as rendered by the dashboard.
    ///
    /// # Returns
    ///
    /// The fully resolved [`ResolvedOptions`].
    pub fn resolve(&self, location: &Url) -> ResolvedOptions {
        let query = QueryParams::from_url(location);
        ResolvedOptions {
            target_domain: self
                .target_domain
                .clone()
                .or(query.domain)
                .unwrap_or_default(),
            saleor_api_url: self
                .saleor_api_url
                .clone()
                .or(query.saleor_api_url)
                .unwrap_or_default(),
            locale: self.initial_locale.or(query.locale).unwrap_or_default(),
            theme: self.initial_theme.or(query.theme).unwrap_or_default(),
            app_id: query.id.unwrap_or_default(),
            path: location.path().to_owned(),
            auto_notify_ready: self.auto_notify_ready,
            dispatch_timeout: self.dispatch_timeout,
        }
    }
}

/// [`BridgeOptions`] after merging with the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Saleor domain; seeds `state.domain`. May be empty.
    pub target_domain: String,
    /// GraphQL endpoint; seeds `state.saleor_api_url`. May be empty.
    pub saleor_api_url: String,
    /// Seeds `state.locale`.
    pub locale: LocaleCode,
    /// Seeds `state.theme`.
    pub theme: Theme,
    /// From the `id` query parameter; seeds `state.id` only.
    pub app_id: String,
    /// Path of the app page; seeds `state.path`.
    pub path: String,
    /// Whether `notifyReady` is dispatched at construction.
    pub auto_notify_ready: bool,
    /// How long each dispatch waits for its response.
    pub dispatch_timeout: Duration,
}

/// Recognised query parameters. Invalid `locale`/`theme` values are dropped.
#[derive(Debug, Default)]
struct QueryParams {
    domain: Option<String>,
    saleor_api_url: Option<String>,
    locale: Option<LocaleCode>,
    theme: Option<Theme>,
    id: Option<String>,
}

impl QueryParams {
    fn from_url(url: &Url) -> Self {
        Self {
            domain: query_param(url, "domain"),
            saleor_api_url: query_param(url, "saleorApiUrl"),
            locale: query_param(url, "locale").and_then(|v| v.parse().ok()),
            theme: query_param(url, "theme").and_then(|v| v.parse().ok()),
            id: query_param(url, "id"),
        }
    }
}

/// First value of `name`, as with `URLSearchParams.get`.
fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("test URL should parse")
    }

    #[test]
    fn defaults_without_query() {
        let resolved = BridgeOptions::default().resolve(&url("https://app.example/dashboard"));
        assert_eq!(resolved.target_domain, "");
        assert_eq!(resolved.saleor_api_url, "");
        assert_eq!(resolved.locale, LocaleCode::En);
        assert_eq!(resolved.theme, Theme::Light);
        assert_eq!(resolved.app_id, "");
        assert_eq!(resolved.path, "/dashboard");
        assert!(resolved.auto_notify_ready);
        assert_eq!(resolved.dispatch_timeout, DEFAULT_DISPATCH_TIMEOUT);
    }

    #[test]
    fn query_parameters_fill_unset_options() {
        let resolved = BridgeOptions::default().resolve(&url(
            "https://app.example/?domain=shop.example&saleorApiUrl=https%3A%2F%2Fshop.example%2Fgraphql%2F&locale=fr&theme=dark&id=app-7",
        ));
        assert_eq!(resolved.target_domain, "shop.example");
        assert_eq!(resolved.saleor_api_url, "https://shop.example/graphql/");
        assert_eq!(resolved.locale, LocaleCode::Fr);
        assert_eq!(resolved.theme, Theme::Dark);
        assert_eq!(resolved.app_id, "app-7");
    }

    #[test]
    fn explicit_options_win_over_query() {
        let options = BridgeOptions::default()
            .with_target_domain("explicit.example")
            .with_saleor_api_url("https://explicit.example/graphql/")
            .with_initial_locale(LocaleCode::Ja)
            .with_initial_theme(Theme::Light);
        let resolved = options.resolve(&url(
            "https://app.example/?domain=query.example&saleorApiUrl=q&locale=fr&theme=dark",
        ));
        assert_eq!(resolved.target_domain, "explicit.example");
        assert_eq!(resolved.saleor_api_url, "https://explicit.example/graphql/");
        assert_eq!(resolved.locale, LocaleCode::Ja);
        assert_eq!(resolved.theme, Theme::Light);
    }

    #[test]
    fn invalid_theme_and_locale_count_as_absent() {
        let resolved =
            BridgeOptions::default().resolve(&url("https://app.example/?theme=sepia&locale=xx"));
        assert_eq!(resolved.theme, Theme::Light);
        assert_eq!(resolved.locale, LocaleCode::En);
    }

    #[test]
    fn first_query_value_wins() {
        let resolved =
            BridgeOptions::default().resolve(&url("https://app.example/?id=first&id=second"));
        assert_eq!(resolved.app_id, "first");
    }
}
