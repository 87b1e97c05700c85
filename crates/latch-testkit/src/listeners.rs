use std::sync::{Arc, Mutex};

use anyhow::bail;
use latch_kernel::ConfirmationListener;
use latch_types::{ActionKind, ActorRef, DeferredAction, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Requested {
        token: Token,
        action_kind: ActionKind,
        requested_by: Option<ActorRef>,
    },
    Confirmed {
        token: Token,
        action_kind: ActionKind,
    },
}

/// Records every lifecycle event it observes.
#[derive(Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<ListenerEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ConfirmationListener for RecordingListener {
    fn confirmation_requested(
        &self,
        action: &DeferredAction,
        requested_by: Option<&ActorRef>,
    ) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(ListenerEvent::Requested {
            token: action.token.clone(),
            action_kind: action.action_kind.clone(),
            requested_by: requested_by.cloned(),
        });
        Ok(())
    }

    fn action_confirmed(&self, action: &DeferredAction) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(ListenerEvent::Confirmed {
            token: action.token.clone(),
            action_kind: action.action_kind.clone(),
        });
        Ok(())
    }
}

/// Pretend mail delivery: one formatted message per requested confirmation,
/// with the token in the body.
#[derive(Clone, Default)]
pub struct Mailbox {
    messages: Arc<Mutex<Vec<String>>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ConfirmationListener for Mailbox {
    fn confirmation_requested(
        &self,
        action: &DeferredAction,
        _requested_by: Option<&ActorRef>,
    ) -> anyhow::Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push(format!("please confirm your change with code {}", action.token));
        Ok(())
    }
}

/// Always fails. Deferrals and confirmations must survive it untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingListener;

impl ConfirmationListener for FailingListener {
    fn confirmation_requested(
        &self,
        _action: &DeferredAction,
        _requested_by: Option<&ActorRef>,
    ) -> anyhow::Result<()> {
        bail!("notification channel is down")
    }

    fn action_confirmed(&self, _action: &DeferredAction) -> anyhow::Result<()> {
        bail!("notification channel is down")
    }
}
