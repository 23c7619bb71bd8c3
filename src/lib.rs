//! Origin-checked message bridge between an embedded app frame and the Saleor dashboard.

pub mod action;
pub use action::{Action, ActionId, ActionType, Notification, NotificationStatus};
mod bridge;
pub use bridge::{AppBridge, Lifecycle};
mod claims;
pub use claims::{ClaimsExtractor, JwtClaims};
mod dispatch;
pub use dispatch::{DispatchCompletion, DispatchResult};
mod error;
pub use error::{BridgeError, ChannelError, ClaimsError, DispatchError, EventError};
pub mod event;
pub use event::{
    Event, EventPayload, EventType, HandshakePayload, InboundEvent, LocaleChangedPayload,
    ResponsePayload, ThemePayload, TokenRefreshPayload,
};
mod frame;
pub use frame::{FrameWindow, InboundMessage, MemoryFrame, MessageListener, PostedMessage};
mod locale;
pub use locale::{LocaleCode, UnknownLocale};
mod options;
pub use options::{BridgeOptions, DEFAULT_DISPATCH_TIMEOUT, ResolvedOptions};
mod reducer;
pub use reducer::reduce;
mod state;
pub use state::{AppState, StateContainer, StatePatch, Theme, User};
mod subscription;
pub use subscription::{Subscription, SubscriptionId};
