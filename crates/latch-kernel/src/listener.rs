use latch_types::{ActorRef, DeferredAction};

/// Observer hooks around the deferral lifecycle, registered explicitly on
/// the kernel builder. Scoped to the process; there is no ambient event bus.
///
/// Listener errors are logged and swallowed by the kernel: a delivery
/// problem must not roll back a deferral that is already persisted, and a
/// confirmation stands once the handler committed.
pub trait ConfirmationListener: Send + Sync {
    /// A deferral was created. This is where the token gets delivered to
    /// the user (mail, SMS, ...).
    fn confirmation_requested(
        &self,
        action: &DeferredAction,
        requested_by: Option<&ActorRef>,
    ) -> anyhow::Result<()>;

    /// A deferred action was confirmed and its effect committed.
    fn action_confirmed(&self, _action: &DeferredAction) -> anyhow::Result<()> {
        Ok(())
    }
}
