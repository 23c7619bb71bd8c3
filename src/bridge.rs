//! The app-side bridge: trust check, state, subscriptions, and dispatch.
//!
//! [`AppBridge`] is the single entry point for messages arriving from the
//! dashboard and the single exit point for actions sent to it. It installs
//! exactly one message listener on its [`FrameWindow`] at construction and
//! owns everything else privately, so several bridges can coexist in one
//! process without sharing anything.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use url::Url;

use crate::action::{Action, ActionId};
use crate::claims::{ClaimsExtractor, JwtClaims};
use crate::dispatch::{DispatchCompletion, PendingDispatches};
use crate::error::{BridgeError, ChannelError, DispatchError};
use crate::event::{Event, EventPayload, EventType, InboundEvent};
use crate::frame::{FrameWindow, InboundMessage};
use crate::options::{BridgeOptions, ResolvedOptions};
use crate::reducer::reduce;
use crate::state::{AppState, StateContainer, StatePatch};
use crate::subscription::{Callback, Subscription, SubscriptionRegistry};

/// Outbound messages are posted to any origin; the dashboard checks the
/// sender on its side.
const OUTBOUND_TARGET_ORIGIN: &str = "*";

/// Where a bridge is in its (short) life.
///
/// [`AppBridge::with_claims`] only returns once the bridge is
/// [`Listening`](Lifecycle::Listening), so callers never observe
/// [`Initializing`](Lifecycle::Initializing). The state exists to guard the
/// construction sequence itself: a dispatch issued before the listener is
/// installed fails with [`DispatchError::NotListening`] instead of waiting
/// for a response that could never be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// State is seeded but the message listener is not installed yet.
    Initializing,
    /// The listener is installed. Terminal.
    Listening,
}

struct Inner {
    frame: Arc<dyn FrameWindow>,
    claims: Arc<dyn ClaimsExtractor>,
    options: ResolvedOptions,
    trusted_origin: Option<String>,
    listening: AtomicBool,
    state: Mutex<StateContainer>,
    subscriptions: Arc<Mutex<SubscriptionRegistry>>,
    pending: Mutex<PendingDispatches>,
    runtime: Handle,
}

/// Two-way, origin-checked channel between an embedded app and the dashboard.
///
/// `Clone` is cheap: clones share the same state, subscriptions, and
/// in-flight dispatches.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use saleor_app_bridge::{AppBridge, BridgeOptions, MemoryFrame, ThemePayload};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let frame = Arc::new(
///     MemoryFrame::new("https://app.example/?id=app-1&domain=shop.example".parse()?)
///         .with_referrer("https://dashboard.example/apps/app-1"),
/// );
/// let bridge = AppBridge::new(frame.clone(), BridgeOptions::default())?;
///
/// let theme_changes = bridge.subscribe(|payload: &ThemePayload| {
///     println!("theme is now {}", payload.theme.as_str());
/// });
///
/// frame.deliver(
///     serde_json::json!({"type": "theme", "payload": {"theme": "dark"}}),
///     "https://dashboard.example",
/// );
/// assert_eq!(bridge.get_state().theme.as_str(), "dark");
/// theme_changes.unsubscribe();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AppBridge {
    inner: Arc<Inner>,
}

impl AppBridge {
    /// Create a bridge that reads token claims with [`JwtClaims`].
    ///
    /// See [`with_claims`](AppBridge::with_claims).
    pub fn new<F: FrameWindow>(frame: Arc<F>, options: BridgeOptions) -> Result<Self, BridgeError> {
        Self::with_claims(frame, options, JwtClaims)
    }

    /// Create a bridge with a custom claims extractor.
    ///
    /// Seeds state from `options` and the page URL, fixes the trusted
    /// origin from the page referrer, installs the message listener, and,
    /// unless disabled, dispatches `notifyReady`.
    ///
    /// With no referrer the bridge still starts, but it trusts no origin and
    /// so accepts no inbound message.
    ///
    /// # Arguments
    ///
    /// * `frame` - The page the app runs in. Must report a location.
    /// * `options` - Explicit settings; unset fields come from the page URL.
    /// * `claims` - Reads user and app permissions from handshake tokens.
    ///
    /// # Returns
    ///
    /// A bridge that is already [`Listening`](Lifecycle::Listening).
    ///
    /// # Errors
    ///
    /// * [`BridgeError::NoBrowserContext`] -- the frame has no page location.
    /// * [`BridgeError::NoRuntime`] -- called outside a tokio runtime.
    pub fn with_claims<F: FrameWindow, C: ClaimsExtractor>(
        frame: Arc<F>,
        options: BridgeOptions,
        claims: C,
    ) -> Result<Self, BridgeError> {
        let location = frame.location().ok_or(BridgeError::NoBrowserContext)?;
        let runtime = Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
        let options = options.resolve(&location);

        let trusted_origin = frame.referrer().as_deref().and_then(origin_of);
        if trusted_origin.is_none() {
            tracing::warn!(
                "no usable referrer; no trusted origin established, inbound messages will be ignored"
            );
        }

        let mut state = StateContainer::seeded(options.locale, options.theme);
        state.set_state(StatePatch {
            domain: Some(options.target_domain.clone()),
            id: Some(options.app_id.clone()),
            path: Some(options.path.clone()),
            saleor_api_url: Some(options.saleor_api_url.clone()),
            ..StatePatch::default()
        });

        let inner = Arc::new(Inner {
            frame,
            claims: Arc::new(claims),
            options,
            trusted_origin,
            listening: AtomicBool::new(false),
            state: Mutex::new(state),
            subscriptions: Arc::new(Mutex::new(SubscriptionRegistry::default())),
            pending: Mutex::new(PendingDispatches::default()),
            runtime,
        });

        // The listener must not keep the bridge alive.
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner.frame.add_message_listener(Box::new(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_message(message);
            }
        }));
        inner.listening.store(true, Ordering::Release);

        tracing::info!(
            trusted_origin = inner.trusted_origin.as_deref().unwrap_or("<none>"),
            app_id = %inner.options.app_id,
            "app bridge listening"
        );

        let bridge = Self { inner };
        if bridge.inner.options.auto_notify_ready {
            bridge.send_notify_ready_action();
        }
        Ok(bridge)
    }

    /// Register `callback` for the event kind that carries payload `P`.
    ///
    /// Callbacks run synchronously, in registration order, after the event
    /// has been applied to state.
    ///
    /// # Returns
    ///
    /// A [`Subscription`] handle that removes exactly this registration.
    pub fn subscribe<P, F>(&self, callback: F) -> Subscription
    where
        P: EventPayload,
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.subscribe_to(P::EVENT_TYPE, move |event| {
            if let Some(payload) = P::from_event(event) {
                callback(payload);
            }
        })
    }

    /// Register `callback` for `event_type`, receiving the whole event.
    pub fn subscribe_to<F>(&self, event_type: EventType, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let id = lock(&self.inner.subscriptions).add(event_type, callback);
        Subscription::new(&self.inner.subscriptions, event_type, id)
    }

    /// Remove every registration for `event_type`, or for all types if `None`.
    ///
    /// Returns how many registrations were removed.
    pub fn unsubscribe_all(&self, event_type: Option<EventType>) -> usize {
        let mut registry = lock(&self.inner.subscriptions);
        match event_type {
            Some(kind) => registry.remove_type(kind),
            None => registry.clear(),
        }
    }

    /// Post `action` to the dashboard and return its completion.
    ///
    /// The action is posted before this returns. The completion resolves to
    /// the host's `result` when it replies `ok: true`, and otherwise fails
    /// with one of:
    ///
    /// * [`DispatchError::Rejected`] -- the host replied `ok: false`.
    /// * [`DispatchError::Timeout`] -- no reply within the dispatch window.
    /// * [`DispatchError::Channel`] -- the post itself failed.
    /// * [`DispatchError::NotListening`] -- the bridge is still initializing.
    pub fn dispatch(&self, action: Action) -> DispatchCompletion {
        let action_id = action.action_id().clone();
        if !self.inner.listening.load(Ordering::Acquire) {
            return DispatchCompletion::ready(action_id, Err(DispatchError::NotListening));
        }
        let message = match action.to_wire() {
            Ok(message) => message,
            Err(e) => {
                return DispatchCompletion::ready(action_id, Err(ChannelError::from(e).into()));
            }
        };

        // Track before posting: the host may answer before `post_to_parent` returns.
        let rx = lock(&self.inner.pending).register(action_id.clone());
        tracing::debug!(
            action_type = %action.action_type(),
            action_id = %action_id,
            "dispatching action"
        );

        if let Err(e) = self
            .inner
            .frame
            .post_to_parent(message, OUTBOUND_TARGET_ORIGIN)
        {
            lock(&self.inner.pending).forget(&action_id);
            return DispatchCompletion::ready(action_id, Err(e.into()));
        }

        let timer = self.spawn_timeout(action_id.clone());
        if !lock(&self.inner.pending).arm(&action_id, timer.abort_handle()) {
            timer.abort();
        }
        DispatchCompletion::waiting(action_id, rx)
    }

    /// Dispatch `notifyReady`, logging rather than returning any failure.
    pub fn send_notify_ready_action(&self) {
        let completion = self.dispatch(Action::notify_ready());
        self.inner.runtime.spawn(async move {
            let action_id = completion.action_id().clone();
            if let Err(e) = completion.await {
                tracing::warn!(action_id = %action_id, error = %e, "notifyReady was not acknowledged");
            }
        });
    }

    /// The current session state.
    pub fn get_state(&self) -> AppState {
        lock(&self.inner.state).get_state().clone()
    }

    /// Origin inbound messages must come from, if one was established.
    pub fn trusted_origin(&self) -> Option<&str> {
        self.inner.trusted_origin.as_deref()
    }

    /// Options after merging with the page URL.
    pub fn options(&self) -> &ResolvedOptions {
        &self.inner.options
    }

    /// Current lifecycle state. Always [`Lifecycle::Listening`] for a
    /// constructed bridge.
    pub fn lifecycle(&self) -> Lifecycle {
        if self.inner.listening.load(Ordering::Acquire) {
            Lifecycle::Listening
        } else {
            Lifecycle::Initializing
        }
    }

    /// Number of dispatched actions still waiting for a response.
    pub fn pending_dispatches(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    /// Number of registrations for one event type, or for all of them.
    pub fn subscription_count(&self, event_type: Option<EventType>) -> usize {
        lock(&self.inner.subscriptions).len(event_type)
    }

    fn spawn_timeout(&self, action_id: ActionId) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let after = self.inner.options.dispatch_timeout;
        self.inner.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if lock(&inner.pending).expire(&action_id, after) {
                tracing::warn!(action_id = %action_id, "action timed out waiting for response");
            }
        })
    }
}

impl Inner {
    /// Process one raw message from the page's message listener.
    ///
    /// Never panics outward: untrusted or malformed messages are dropped,
    /// and a panicking reducer or callback is logged and contained.
    fn handle_message(&self, message: InboundMessage) {
        let InboundMessage { data, origin } = message;
        if self.trusted_origin.as_deref() != Some(origin.as_str()) {
            tracing::debug!(origin = %origin, "dropping message from untrusted origin");
            return;
        }

        let event = match InboundEvent::decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed message");
                return;
            }
        };

        let event_type = match &event {
            InboundEvent::Known(event) => event.event_type().as_str(),
            InboundEvent::Unrecognized { .. } => "unrecognized",
        };
        let _span = tracing::debug_span!("inbound", event_type).entered();

        {
            let mut container = lock(&self.state);
            let current = container.get_state().clone();
            match catch_unwind(AssertUnwindSafe(|| reduce(current, &event, &*self.claims))) {
                Ok(next) => container.replace(next),
                Err(_) => tracing::error!("reducer panicked; state left unchanged"),
            }
        }

        let InboundEvent::Known(event) = event else {
            return;
        };

        let callbacks = lock(&self.subscriptions).callbacks(event.event_type());
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                tracing::error!("event callback panicked");
            }
        }

        if let Event::Response(response) = &event
            && !lock(&self.pending).resolve(response)
        {
            tracing::debug!(
                action_id = %response.action_id,
                "response does not match any pending action"
            );
        }
    }
}

impl fmt::Debug for AppBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBridge")
            .field("trusted_origin", &self.inner.trusted_origin)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

/// Serialized origin of `referrer`, or `None` if it has no tuple origin.
fn origin_of(referrer: &str) -> Option<String> {
    let origin = Url::parse(referrer).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
