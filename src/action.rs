//! Outbound actions the embedded app sends to the dashboard.
//!
//! Every action is stamped with a fresh [`ActionId`] when it is built. The
//! id travels inside the payload under `actionId` and is how the host's
//! `response` event is matched back to the request.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Correlation id attached to an outbound action.
///
/// Generated from a random UUID v4, so ids never collide across bridge
/// instances living in the same page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    /// Generate a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as sent on the wire under `actionId`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ActionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Discriminant of an outbound [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// `redirect`
    Redirect,
    /// `notification`
    Notification,
    /// `updateRouting`
    UpdateRouting,
    /// `notifyReady`
    NotifyReady,
}

impl ActionType {
    /// The wire discriminant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redirect => "redirect",
            Self::Notification => "notification",
            Self::UpdateRouting => "updateRouting",
            Self::NotifyReady => "notifyReady",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ask the dashboard to navigate somewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectPayload {
    /// Target route or absolute URL.
    pub to: String,
    /// Open the target in a new browser context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_context: Option<bool>,
    /// Correlation id; see [`ActionId`].
    pub action_id: ActionId,
}

/// Severity of a dashboard notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Neutral information.
    Info,
    /// An operation succeeded.
    Success,
    /// Something needs attention but nothing failed.
    Warning,
    /// An operation failed.
    Error,
}

/// Fields of a dashboard notification, before an id is attached.
///
/// # Examples
///
/// ```
/// use saleor_app_bridge::{Action, Notification, NotificationStatus};
///
/// let action = Action::notification(
///     Notification::default()
///         .with_status(NotificationStatus::Success)
///         .with_title("Saved"),
/// );
/// assert_eq!(action.action_type().as_str(), "notification");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    /// Severity; the dashboard picks its own default when `None`.
    pub status: Option<NotificationStatus>,
    /// Headline.
    pub title: Option<String>,
    /// Body text.
    pub text: Option<String>,
    /// Raw API error message shown in the details.
    pub api_message: Option<String>,
}

impl Notification {
    /// Set the severity.
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn with_status(mut self, status: NotificationStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the headline.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the body text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attach a raw API error message shown in the notification's details.
    pub fn with_api_message(mut self, message: impl Into<String>) -> Self {
        self.api_message = Some(message.into());
        self
    }
}

/// Show a notification in the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// See [`Notification::status`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NotificationStatus>,
    /// See [`Notification::title`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// See [`Notification::text`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// See [`Notification::api_message`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_message: Option<String>,
    /// Correlation id; see [`ActionId`].
    pub action_id: ActionId,
}

/// Tell the dashboard the app's own route changed, so its URL can follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoutingPayload {
    /// The app's new route, relative to the app root.
    pub new_route: String,
    /// Correlation id; see [`ActionId`].
    pub action_id: ActionId,
}

/// Tell the dashboard the app has loaded and is listening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyReadyPayload {
    /// Correlation id; see [`ActionId`].
    pub action_id: ActionId,
}

/// An outbound action, ready to dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Action {
    /// Navigate the dashboard.
    Redirect(RedirectPayload),
    /// Show a notification.
    Notification(NotificationPayload),
    /// Mirror the app's route in the dashboard URL.
    UpdateRouting(UpdateRoutingPayload),
    /// Announce the app is ready.
    NotifyReady(NotifyReadyPayload),
}

impl Action {
    /// Build a redirect action.
    ///
    /// # Arguments
    ///
    /// * `to` - Dashboard route, or an absolute URL.
    /// * `new_context` - `Some(true)` opens the target in a new browser
    ///   context; `None` leaves the choice to the dashboard.
    pub fn redirect(to: impl Into<String>, new_context: Option<bool>) -> Self {
        Self::Redirect(RedirectPayload {
            to: to.into(),
            new_context,
            action_id: ActionId::new(),
        })
    }

    /// Build a notification action.
    pub fn notification(notification: Notification) -> Self {
        let Notification {
            status,
            title,
            text,
            api_message,
        } = notification;
        Self::Notification(NotificationPayload {
            status,
            title,
            text,
            api_message,
            action_id: ActionId::new(),
        })
    }

    /// Build an update-routing action.
    pub fn update_routing(new_route: impl Into<String>) -> Self {
        Self::UpdateRouting(UpdateRoutingPayload {
            new_route: new_route.into(),
            action_id: ActionId::new(),
        })
    }

    /// Build a notify-ready action.
    pub fn notify_ready() -> Self {
        Self::NotifyReady(NotifyReadyPayload {
            action_id: ActionId::new(),
        })
    }

    /// The discriminant of this action.
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Redirect(_) => ActionType::Redirect,
            Self::Notification(_) => ActionType::Notification,
            Self::UpdateRouting(_) => ActionType::UpdateRouting,
            Self::NotifyReady(_) => ActionType::NotifyReady,
        }
    }

    /// The correlation id assigned at construction.
    pub fn action_id(&self) -> &ActionId {
        match self {
            Self::Redirect(p) => &p.action_id,
            Self::Notification(p) => &p.action_id,
            Self::UpdateRouting(p) => &p.action_id,
            Self::NotifyReady(p) => &p.action_id,
        }
    }

    /// Encode as the `{ type, payload }` wire object.
    pub fn to_wire(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
