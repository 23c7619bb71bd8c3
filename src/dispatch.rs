//! Bookkeeping for actions that are waiting on a host response.
//!
//! Each in-flight action has one entry keyed by its [`ActionId`], holding
//! the reply channel and the abort handle of its timeout task. Removing the
//! entry is the only way to settle an action, so whichever of response or
//! timeout gets there first wins and the other becomes a no-op.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::action::ActionId;
use crate::error::DispatchError;
use crate::event::ResponsePayload;

/// What a dispatch resolves to: the host's optional `result` on success.
pub type DispatchResult = Result<Option<Value>, DispatchError>;

struct PendingDispatch {
    reply: oneshot::Sender<DispatchResult>,
    timer: Option<AbortHandle>,
}

/// In-flight actions owned by one bridge.
#[derive(Default)]
pub(crate) struct PendingDispatches {
    entries: HashMap<ActionId, PendingDispatch>,
}

impl PendingDispatches {
    /// Start tracking `id`. The entry has no timer until [`arm`](Self::arm).
    pub(crate) fn register(&mut self, id: ActionId) -> oneshot::Receiver<DispatchResult> {
        let (tx, rx) = oneshot::channel();
        self.entries.insert(
            id,
            PendingDispatch {
                reply: tx,
                timer: None,
            },
        );
        rx
    }

    /// Attach the timeout task to a tracked action.
    ///
    /// Returns `false` if the action already settled (e.g. the host replied
    /// while the message was being posted); the caller must abort `timer`.
    pub(crate) fn arm(&mut self, id: &ActionId, timer: AbortHandle) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.timer = Some(timer);
                true
            }
            None => false,
        }
    }

    /// Settle `id` with `result`, cancelling its timer.
    ///
    /// Returns `false` if nothing was waiting on `id`.
    pub(crate) fn settle(&mut self, id: &ActionId, result: DispatchResult) -> bool {
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        if let Some(timer) = entry.timer {
            timer.abort();
        }
        // The caller may have dropped its completion future; that is fine.
        let _ = entry.reply.send(result);
        true
    }

    /// Settle the action a host `response` event answers.
    pub(crate) fn resolve(&mut self, response: &ResponsePayload) -> bool {
        let result = if response.ok {
            Ok(response.result.clone())
        } else {
            Err(DispatchError::Rejected {
                action_id: response.action_id.clone(),
                result: response.result.clone(),
            })
        };
        self.settle(&response.action_id, result)
    }

    /// Fail `id` with a timeout. Called from the timer task itself.
    pub(crate) fn expire(&mut self, id: &ActionId, after: Duration) -> bool {
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        let _ = entry.reply.send(Err(DispatchError::Timeout {
            action_id: id.clone(),
            after,
        }));
        true
    }

    /// Drop tracking for `id` without replying.
    pub(crate) fn forget(&mut self, id: &ActionId) {
        if let Some(PendingDispatch {
            timer: Some(timer), ..
        }) = self.entries.remove(id)
        {
            timer.abort();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

enum Completion {
    Waiting(oneshot::Receiver<DispatchResult>),
    Ready(Option<DispatchResult>),
}

/// Resolves when the host answers a dispatched action or its window elapses.
///
/// Returned by [`AppBridge::dispatch`](crate::AppBridge::dispatch). The
/// action has already been posted by the time this value exists; awaiting
/// it only waits for the outcome. Dropping it does not cancel anything:
/// the entry is still reclaimed by the response or the timeout.
#[must_use = "the dispatch outcome is only observable by awaiting the completion"]
pub struct DispatchCompletion {
    action_id: ActionId,
    state: Completion,
}

impl DispatchCompletion {
    pub(crate) fn waiting(action_id: ActionId, rx: oneshot::Receiver<DispatchResult>) -> Self {
        Self {
            action_id,
            state: Completion::Waiting(rx),
        }
    }

    pub(crate) fn ready(action_id: ActionId, result: DispatchResult) -> Self {
        Self {
            action_id,
            state: Completion::Ready(Some(result)),
        }
    }

    /// Correlation id of the dispatched action.
    pub fn action_id(&self) -> &ActionId {
        &self.action_id
    }
}

impl Future for DispatchCompletion {
    type Output = DispatchResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            Completion::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(DispatchError::BridgeGone)))
            }
            // A dropped sender means the bridge went away mid-flight.
            Completion::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(DispatchError::BridgeGone))),
        }
    }
}

impl std::fmt::Debug for DispatchCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCompletion")
            .field("action_id", &self.action_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(id: &ActionId, ok: bool, result: Option<Value>) -> ResponsePayload {
        ResponsePayload {
            action_id: id.clone(),
            ok,
            result,
        }
    }

    #[tokio::test]
    async fn ok_response_resolves_with_result() {
        let mut pending = PendingDispatches::default();
        let id = ActionId::new();
        let rx = pending.register(id.clone());

        assert!(pending.resolve(&response(&id, true, Some(json!({"saved": true})))));
        assert_eq!(pending.len(), 0);

        let result = DispatchCompletion::waiting(id, rx).await;
        assert_eq!(result.expect("ok response"), Some(json!({"saved": true})));
    }

    #[tokio::test]
    async fn not_ok_response_is_rejected() {
        let mut pending = PendingDispatches::default();
        let id = ActionId::new();
        let rx = pending.register(id.clone());

        pending.resolve(&response(&id, false, Some(json!("nope"))));
        let result = DispatchCompletion::waiting(id.clone(), rx).await;
        assert!(
            matches!(
                &result,
                Err(DispatchError::Rejected { action_id, result: Some(r) })
                    if *action_id == id && *r == json!("nope")
            ),
            "got {result:?}"
        );
    }

    #[tokio::test]
    async fn only_the_first_outcome_counts() {
        let mut pending = PendingDispatches::default();
        let id = ActionId::new();
        let rx = pending.register(id.clone());

        assert!(pending.expire(&id, Duration::from_millis(5)));
        assert!(!pending.resolve(&response(&id, true, None)));
        assert!(!pending.expire(&id, Duration::from_millis(5)));

        let result = DispatchCompletion::waiting(id, rx).await;
        assert!(matches!(result, Err(DispatchError::Timeout { .. })), "got {result:?}");
    }

    #[tokio::test]
    async fn settling_aborts_the_timer() {
        let mut pending = PendingDispatches::default();
        let id = ActionId::new();
        let _rx = pending.register(id.clone());

        let timer = tokio::spawn(std::future::pending::<()>());
        assert!(pending.arm(&id, timer.abort_handle()));
        pending.resolve(&response(&id, true, None));

        let joined = timer.await;
        assert!(joined.is_err_and(|e| e.is_cancelled()));
    }

    #[tokio::test]
    async fn arming_a_settled_action_reports_false() {
        let mut pending = PendingDispatches::default();
        let id = ActionId::new();
        let _rx = pending.register(id.clone());
        pending.resolve(&response(&id, true, None));

        let timer = tokio::spawn(std::future::pending::<()>());
        assert!(!pending.arm(&id, timer.abort_handle()));
        timer.abort();
    }

    #[tokio::test]
    async fn unknown_response_is_ignored() {
        let mut pending = PendingDispatches::default();
        let _rx = pending.register(ActionId::new());
        assert!(!pending.resolve(&response(&ActionId::new(), true, None)));
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn dropped_bookkeeping_surfaces_bridge_gone() {
        let mut pending = PendingDispatches::default();
        let id = ActionId::new();
        let rx = pending.register(id.clone());
        drop(pending);

        let result = DispatchCompletion::waiting(id, rx).await;
        assert!(matches!(result, Err(DispatchError::BridgeGone)), "got {result:?}");
    }

    #[tokio::test]
    async fn ready_completion_yields_its_result() {
        let id = ActionId::new();
        let completion = DispatchCompletion::ready(id.clone(), Err(DispatchError::NotListening));
        assert_eq!(completion.action_id(), &id);
        assert!(matches!(completion.await, Err(DispatchError::NotListening)));
    }
}
