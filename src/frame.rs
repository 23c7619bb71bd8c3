//! The embedding channel between the app frame and the dashboard page.
//!
//! [`FrameWindow`] is the boundary to the platform: a browser binding
//! implements it over `window.postMessage` / `message` events, while
//! [`MemoryFrame`] implements it in memory for tests and native hosts.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use url::Url;

use crate::action::ActionId;
use crate::error::ChannelError;

/// A raw message received from another browsing context.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// The structured message body.
    pub data: Value,
    /// Origin of the sender, as reported by the platform.
    pub origin: String,
}

/// Callback installed with [`FrameWindow::add_message_listener`].
pub type MessageListener = Box<dyn Fn(InboundMessage) + Send + Sync>;

/// Platform primitives the bridge needs from the page it runs in.
pub trait FrameWindow: Send + Sync + 'static {
    /// URL of the app page, or `None` outside a browser rendering context.
    fn location(&self) -> Option<Url>;

    /// The page's `document.referrer`, if any.
    fn referrer(&self) -> Option<String>;

    /// Post `message` to the parent frame.
    ///
    /// # Arguments
    ///
    /// * `message` - The `{ type, payload }` wire object.
    /// * `target_origin` - Origin the platform restricts delivery to, or
    ///   `"*"` for any.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] if there is no parent or the platform
    /// refuses the post.
    fn post_to_parent(&self, message: Value, target_origin: &str) -> Result<(), ChannelError>;

    /// Install a listener for messages sent to this page.
    fn add_message_listener(&self, listener: MessageListener);
}

/// A message recorded by [`MemoryFrame`] on its way to the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    /// The wire object as posted.
    pub message: Value,
    /// The target origin the post was restricted to.
    pub target_origin: String,
}

impl PostedMessage {
    /// The `type` discriminant of the posted message.
    pub fn message_type(&self) -> Option<&str> {
        self.message.get("type").and_then(Value::as_str)
    }

    /// The correlation id carried in the payload, if any.
    pub fn action_id(&self) -> Option<ActionId> {
        self.message
            .get("payload")
            .and_then(|p| p.get("actionId"))
            .and_then(Value::as_str)
            .map(ActionId::from)
    }
}

type SharedListener = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// In-memory [`FrameWindow`].
///
/// Records everything posted to the parent and lets the caller play the
/// dashboard by delivering messages with any origin.
///
/// # Examples
///
/// ```
/// use saleor_app_bridge::MemoryFrame;
///
/// let frame = MemoryFrame::new("https://app.example/?id=app-1".parse().unwrap())
///     .with_referrer("https://dashboard.example/apps/app-1");
/// assert_eq!(frame.listener_count(), 0);
/// ```
pub struct MemoryFrame {
    location: Option<Url>,
    referrer: Option<String>,
    has_parent: bool,
    listeners: Mutex<Vec<SharedListener>>,
    posted: Mutex<Vec<PostedMessage>>,
}

impl MemoryFrame {
    /// A frame rendered at `location` with a parent and no referrer.
    pub fn new(location: Url) -> Self {
        Self::at(Some(location), true)
    }

    /// A frame outside any rendering context: no location, no parent.
    pub fn detached() -> Self {
        Self::at(None, false)
    }

    fn at(location: Option<Url>, has_parent: bool) -> Self {
        Self {
            location,
            referrer: None,
            has_parent,
            listeners: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
        }
    }

    /// Set the page's referrer, which fixes the bridge's trusted origin.
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Make every post fail with [`ChannelError::NoParent`].
    pub fn without_parent(mut self) -> Self {
        self.has_parent = false;
        self
    }

    /// Deliver `data` to every installed listener as if sent from `origin`.
    ///
    /// Listeners are invoked outside the internal lock, so they may post or
    /// deliver re-entrantly.
    pub fn deliver(&self, data: Value, origin: &str) {
        let listeners: Vec<SharedListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(InboundMessage {
                data: data.clone(),
                origin: origin.to_owned(),
            });
        }
    }

    /// Everything posted so far, oldest first.
    pub fn posted(&self) -> Vec<PostedMessage> {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent post, if any.
    pub fn last_posted(&self) -> Option<PostedMessage> {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of listeners installed so far.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for MemoryFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryFrame")
            .field("location", &self.location)
            .field("referrer", &self.referrer)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl FrameWindow for MemoryFrame {
    fn location(&self) -> Option<Url> {
        self.location.clone()
    }

    fn referrer(&self) -> Option<String> {
        self.referrer.clone()
    }

    fn post_to_parent(&self, message: Value, target_origin: &str) -> Result<(), ChannelError> {
        if !self.has_parent {
            return Err(ChannelError::NoParent);
        }
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PostedMessage {
                message,
                target_origin: target_origin.to_owned(),
            });
        Ok(())
    }

    fn add_message_listener(&self, listener: MessageListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::from(listener));
    }
}
