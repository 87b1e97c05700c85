use std::collections::HashMap;

use latch_types::{ActionKind, DeferredAction, PayloadDecodeError, TargetRef, TokenFormat};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Borrowed view of one deferred call, handed to a handler both for the
/// pre-check at deferral time and for replay at confirmation time. Built
/// from the same fields in both places, so validation cannot diverge
/// between the two.
#[derive(Debug, Clone, Copy)]
pub struct ReplayRequest<'a> {
    pub kind: &'a ActionKind,
    pub payload_cbor: &'a [u8],
    pub payload_namespace: Option<&'a str>,
    pub target: Option<&'a TargetRef>,
}

impl<'a> ReplayRequest<'a> {
    pub fn from_record(record: &'a DeferredAction) -> Self {
        Self {
            kind: &record.action_kind,
            payload_cbor: &record.payload_cbor,
            payload_namespace: record.payload_namespace.as_deref(),
            target: record.target.as_ref(),
        }
    }

    /// Decode the raw payload into the handler's parameter type.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, PayloadDecodeError> {
        serde_cbor::from_slice(self.payload_cbor).map_err(PayloadDecodeError::Payload)
    }
}

/// Result of a replayed action: the domain value the handler produced,
/// carried as CBOR with a typed accessor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayReceipt {
    pub action_kind: ActionKind,
    #[serde(with = "serde_bytes")]
    pub payload_cbor: Vec<u8>,
}

impl ReplayReceipt {
    pub fn from_value<T: Serialize>(
        kind: impl Into<ActionKind>,
        value: &T,
    ) -> Result<Self, serde_cbor::Error> {
        Ok(Self {
            action_kind: kind.into(),
            payload_cbor: latch_cbor::to_canonical_cbor(value)?,
        })
    }

    pub fn value<T: DeserializeOwned>(&self) -> Result<T, PayloadDecodeError> {
        serde_cbor::from_slice(&self.payload_cbor).map_err(PayloadDecodeError::Payload)
    }
}

/// A resumable action bound to one action kind.
///
/// `validate` must be deterministic and side-effect-free: it runs once as the
/// pre-check before a deferral is created and again before replay, and the
/// deferral window in between can be arbitrarily long. Target references are
/// re-resolved fresh inside `validate`/`commit`, never cached.
pub trait ActionHandler: Send + Sync {
    fn kind(&self) -> &str;

    /// Per-kind token format; `None` falls back to the kernel default.
    fn token_format(&self) -> Option<TokenFormat> {
        None
    }

    fn validate(&self, request: &ReplayRequest<'_>) -> Result<(), ValidationError>;

    /// Commit the action's effect. Runs at most once per record; the kernel
    /// flips the record to confirmed only after this returns `Ok`.
    fn commit(&self, request: &ReplayRequest<'_>) -> anyhow::Result<ReplayReceipt>;
}

/// Typed handler registry, populated explicitly at process startup.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn ActionHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("HandlerRegistry").field("kinds", &kinds).finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own kind. A later registration for the
    /// same kind replaces the earlier one.
    pub fn register(&mut self, handler: Box<dyn ActionHandler>) {
        self.handlers.insert(handler.kind().to_string(), handler);
    }

    pub fn get(&self, kind: &str) -> Option<&dyn ActionHandler> {
        self.handlers.get(kind).map(|b| b.as_ref())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }
}

/// Why a payload failed (re-)validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The referenced domain object no longer exists. At replay time this
    /// means the world drifted during the deferral window.
    #[error("target {0} no longer exists")]
    TargetMissing(TargetRef),
    #[error(transparent)]
    Payload(#[from] PayloadDecodeError),
    #[error("{0}")]
    Invalid(String),
}

impl ValidationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct DummyOutcome {
        id: String,
    }

    #[test]
    fn receipt_value_round_trip() {
        let receipt = ReplayReceipt::from_value("directory.create_user", &DummyOutcome {
            id: "u7".into(),
        })
        .expect("encode");
        let decoded: DummyOutcome = receipt.value().expect("decode");
        assert_eq!(decoded, DummyOutcome { id: "u7".into() });
    }

    #[test]
    fn request_exposes_record_fields() {
        let record = DeferredAction::builder("directory.email_change", latch_types::Token::new("abc"))
            .payload(&serde_json::json!({"email": "a@b.example"}))
            .expect("encode")
            .payload_namespace("primary")
            .target(TargetRef::new("directory.user", "u1"))
            .build();
        let request = ReplayRequest::from_record(&record);
        assert_eq!(request.kind.as_str(), "directory.email_change");
        assert_eq!(request.payload_namespace, Some("primary"));
        assert_eq!(request.target, Some(&TargetRef::new("directory.user", "u1")));
        let value: serde_json::Value = request.payload().expect("decode");
        assert_eq!(value["email"], "a@b.example");
    }
}
