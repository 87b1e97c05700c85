use latch_cbor::to_canonical_cbor;
use latch_store::{DynStore, PendingUpdate, StoreError};
#[cfg(test)]
use latch_store::ActionStore;
use latch_types::{
    ActionKind, ActorRef, DeferredAction, RecordEncodeError, TargetRef, Timestamp, Token,
};
use serde::Serialize;

use crate::config::KernelConfig;
use crate::error::{ConfirmError, DeferError, Rejection};
use crate::listener::ConfirmationListener;
use crate::minter::{self, MAX_MINT_ATTEMPTS};
use crate::registry::{ActionHandler, HandlerRegistry, ReplayReceipt, ReplayRequest};

/// One deferral to be parked: the raw params plus the optional record
/// metadata. Consuming builder, mirrors how the record itself is built.
pub struct DeferralRequest<'a, P: ?Sized> {
    kind: ActionKind,
    params: &'a P,
    valid_until: Option<Timestamp>,
    target: Option<TargetRef>,
    payload_namespace: Option<String>,
    description: Option<String>,
    requested_by: Option<ActorRef>,
}

impl<'a, P: ?Sized> DeferralRequest<'a, P> {
    pub fn new(kind: impl Into<ActionKind>, params: &'a P) -> Self {
        Self {
            kind: kind.into(),
            params,
            valid_until: None,
            target: None,
            payload_namespace: None,
            description: None,
            requested_by: None,
        }
    }

    pub fn valid_until(mut self, valid_until: Timestamp) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    pub fn target(mut self, target: TargetRef) -> Self {
        self.target = Some(target);
        self
    }

    pub fn payload_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.payload_namespace = Some(namespace.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn requested_by(mut self, actor: ActorRef) -> Self {
        self.requested_by = Some(actor);
        self
    }
}

/// Ties the pieces together: the store holding the parked records, the
/// handler registry, the listeners, and the kernel configuration.
pub struct ConfirmationKernel {
    store: DynStore,
    registry: HandlerRegistry,
    listeners: Vec<Box<dyn ConfirmationListener>>,
    config: KernelConfig,
}

impl ConfirmationKernel {
    pub fn builder(store: DynStore) -> KernelBuilder {
        KernelBuilder::new(store)
    }

    /// Park `request` under a fresh token and return it.
    ///
    /// The handler's validation runs here once as the pre-check; the stored
    /// payload is the raw input, which is validated again at replay time.
    pub fn defer<P: Serialize + ?Sized>(
        &self,
        request: DeferralRequest<'_, P>,
    ) -> Result<Token, DeferError> {
        let DeferralRequest {
            kind,
            params,
            valid_until,
            target,
            payload_namespace,
            description,
            requested_by,
        } = request;

        let Some(handler) = self.registry.get(kind.as_str()) else {
            return Err(DeferError::UnknownHandler(kind));
        };

        let payload_cbor = to_canonical_cbor(params).map_err(RecordEncodeError::from)?;
        handler.validate(&ReplayRequest {
            kind: &kind,
            payload_cbor: &payload_cbor,
            payload_namespace: payload_namespace.as_deref(),
            target: target.as_ref(),
        })?;

        let format = handler
            .token_format()
            .unwrap_or_else(|| self.config.default_token_format.clone());
        let valid_until = valid_until.or_else(|| {
            self.config
                .default_ttl
                .map(|ttl| Timestamp::now().saturating_add(ttl))
        });

        // The mint probe is a read and the insert a later write, so a
        // concurrent deferral can still take the token in between; the
        // store's uniqueness check turns that into TokenExists and we
        // re-mint, bounded by the same attempt budget as the probe.
        let mut conflicts = 0;
        let record = loop {
            let token = minter::mint(self.store.as_ref(), &format)?;
            let mut builder = DeferredAction::builder(kind.clone(), token)
                .payload_cbor(payload_cbor.clone());
            if let Some(valid_until) = valid_until {
                builder = builder.valid_until(valid_until);
            }
            if let Some(target) = target.clone() {
                builder = builder.target(target);
            }
            if let Some(namespace) = payload_namespace.clone() {
                builder = builder.payload_namespace(namespace);
            }
            if let Some(description) = description.clone() {
                builder = builder.description(description);
            }
            if let Some(actor) = requested_by.clone() {
                builder = builder.requested_by(actor);
            }
            let record = builder.build();
            match self.store.insert(record.clone()) {
                Ok(()) => break record,
                Err(StoreError::TokenExists { .. }) => {
                    conflicts += 1;
                    if conflicts >= MAX_MINT_ATTEMPTS {
                        return Err(DeferError::TokenSpaceExhausted {
                            attempts: conflicts,
                        });
                    }
                    log::debug!(
                        "token collision on insert for '{}'; re-minting ({} so far)",
                        record.action_kind,
                        conflicts
                    );
                }
                Err(err) => return Err(err.into()),
            }
        };

        log::debug!("deferred action '{}' parked", record.action_kind);
        for listener in &self.listeners {
            if let Err(err) = listener.confirmation_requested(&record, record.requested_by.as_ref())
            {
                log::warn!("confirmation listener failed after deferral: {err:#}");
            }
        }
        Ok(record.token)
    }

    /// Resume the deferred action parked under `token`.
    ///
    /// The store's exclusive read-modify-write brackets the whole step, so
    /// replay runs at most once per record even under concurrent calls. The
    /// record is mutated exactly once on success and not at all on any
    /// rejection or failure.
    pub fn confirm(&self, token: &Token) -> Result<ReplayReceipt, ConfirmError> {
        let now = Timestamp::now();
        let mut outcome: Result<ReplayReceipt, ConfirmError> =
            Err(ConfirmError::Rejected(Rejection::NotFound));
        let updated = self.store.update_pending(token, &mut |record| {
            if record.is_expired(now) {
                outcome = Err(ConfirmError::Rejected(Rejection::Expired));
                return PendingUpdate::Keep;
            }
            let Some(handler) = self.registry.get(record.action_kind.as_str()) else {
                outcome = Err(ConfirmError::UnknownHandler(record.action_kind.clone()));
                return PendingUpdate::Keep;
            };
            let request = ReplayRequest::from_record(record);
            if let Err(err) = handler.validate(&request) {
                outcome = Err(ConfirmError::Validation(err));
                return PendingUpdate::Keep;
            }
            match handler.commit(&request) {
                Ok(receipt) => {
                    outcome = Ok(receipt);
                    PendingUpdate::Confirm
                }
                Err(err) => {
                    outcome = Err(ConfirmError::Commit(err));
                    PendingUpdate::Keep
                }
            }
        })?;

        if let (Some(record), Ok(_)) = (&updated, &outcome) {
            log::debug!("confirmed deferred action '{}'", record.action_kind);
            for listener in &self.listeners {
                if let Err(err) = listener.action_confirmed(record) {
                    log::warn!("confirmation listener failed after confirm: {err:#}");
                }
            }
        }
        outcome
    }

    /// Advisory count of pending deferrals referencing `target`.
    pub fn pending_for(&self, target: &TargetRef, now: Timestamp) -> Result<usize, StoreError> {
        self.store.count_pending(target, now)
    }
}

pub struct KernelBuilder {
    store: DynStore,
    registry: HandlerRegistry,
    listeners: Vec<Box<dyn ConfirmationListener>>,
    config: KernelConfig,
}

impl KernelBuilder {
    pub fn new(store: DynStore) -> Self {
        Self {
            store,
            registry: HandlerRegistry::new(),
            listeners: Vec::new(),
            config: KernelConfig::default(),
        }
    }

    pub fn config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn handler(mut self, handler: Box<dyn ActionHandler>) -> Self {
        self.registry.register(handler);
        self
    }

    pub fn listener(mut self, listener: Box<dyn ConfirmationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> ConfirmationKernel {
        ConfirmationKernel {
            store: self.store,
            registry: self.registry,
            listeners: self.listeners,
            config: self.config,
        }
    }
}
