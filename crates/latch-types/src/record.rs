use latch_cbor::to_canonical_cbor;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{ActionKind, ActorRef, TargetRef, Timestamp, Token};

/// Durable record of one deferred call: the raw action payload parked under a
/// token until an out-of-band confirmation resumes it.
///
/// The payload is the *raw* input captured at deferral time, not a cleaned
/// form of it; cleaning is not guaranteed to replay safely, so the handler
/// re-validates the raw bytes when the record is resumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeferredAction {
    pub token: Token,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Timestamp>,
    pub confirmed: bool,
    pub action_kind: ActionKind,
    #[serde(with = "serde_bytes")]
    pub payload_cbor: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<ActorRef>,
}

impl DeferredAction {
    pub fn builder(kind: impl Into<ActionKind>, token: Token) -> RecordBuilder {
        RecordBuilder::new(kind.into(), token)
    }

    /// Decode the stored payload into the handler's parameter type.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, PayloadDecodeError> {
        serde_cbor::from_slice(&self.payload_cbor).map_err(PayloadDecodeError::Payload)
    }

    /// False while `valid_until` is absent, true once it lies behind `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.valid_until {
            None => false,
            Some(valid_until) => valid_until < now,
        }
    }

    /// Not yet confirmed and not expired: the record still accepts its token.
    pub fn is_pending(&self, now: Timestamp) -> bool {
        !self.confirmed && !self.is_expired(now)
    }
}

/// Builder for [`DeferredAction`]. The only default it assigns is
/// `confirmed = false`.
pub struct RecordBuilder {
    kind: ActionKind,
    token: Token,
    payload_cbor: Vec<u8>,
    valid_until: Option<Timestamp>,
    payload_namespace: Option<String>,
    target: Option<TargetRef>,
    description: Option<String>,
    requested_by: Option<ActorRef>,
}

impl RecordBuilder {
    pub fn new(kind: ActionKind, token: Token) -> Self {
        Self {
            kind,
            token,
            payload_cbor: Vec::new(),
            valid_until: None,
            payload_namespace: None,
            target: None,
            description: None,
            requested_by: None,
        }
    }

    /// Encode `value` as canonical CBOR and store it as the payload.
    pub fn payload<T: Serialize>(mut self, value: &T) -> Result<Self, RecordEncodeError> {
        self.payload_cbor = to_canonical_cbor(value)?;
        Ok(self)
    }

    /// Use pre-encoded payload bytes as-is.
    pub fn payload_cbor(mut self, bytes: Vec<u8>) -> Self {
        self.payload_cbor = bytes;
        self
    }

    pub fn valid_until(mut self, valid_until: Timestamp) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    pub fn payload_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.payload_namespace = Some(namespace.into());
        self
    }

    pub fn target(mut self, target: TargetRef) -> Self {
        self.target = Some(target);
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

    pub fn build(self) -> DeferredAction {
        DeferredAction {
            token: self.token,
            valid_until: self.valid_until,
            confirmed: false,
            action_kind: self.kind,
            payload_cbor: self.payload_cbor,
            payload_namespace: self.payload_namespace,
            target: self.target,
            description: self.description,
            requested_by: self.requested_by,
        }
    }
}

/// Error returned when the payload cannot be encoded at record-build time.
#[derive(Debug, Error)]
pub enum RecordEncodeError {
    #[error("failed to encode action payload: {0}")]
    Payload(#[from] serde_cbor::Error),
}

/// Error returned when the stored payload cannot be decoded.
#[derive(Debug, Error)]
pub enum PayloadDecodeError {
    #[error("failed to decode action payload: {0}")]
    Payload(#[from] serde_cbor::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DeferredAction {
        DeferredAction::builder("directory.email_change", Token::new("abc234"))
            .payload(&json!({"email": "new@example.com"}))
            .expect("encode")
            .target(TargetRef::new("directory.user", "u1"))
            .description("change of address")
            .requested_by(ActorRef::new("u1"))
            .build()
    }

    #[test]
    fn builder_assigns_only_confirmed_default() {
        let record = sample();
        assert!(!record.confirmed);
        assert_eq!(record.valid_until, None);
        assert_eq!(record.payload_namespace, None);
        assert_eq!(record.description.as_deref(), Some("change of address"));
        assert_eq!(record.requested_by, Some(ActorRef::new("u1")));
    }

    #[test]
    fn payload_round_trip() {
        let record = sample();
        let value: serde_json::Value = record.payload().expect("decode");
        assert_eq!(value, json!({"email": "new@example.com"}));
    }

    #[test]
    fn record_round_trips_through_cbor() {
        let record = sample();
        let bytes = to_canonical_cbor(&record).expect("encode");
        let decoded: DeferredAction = serde_cbor::from_slice(&bytes).expect("decode");
        assert_eq!(record, decoded);
    }

    #[test]
    fn expiry_is_a_pure_function_of_valid_until() {
        let now = Timestamp::from_unix_millis(10_000);
        let mut record = sample();
        assert!(!record.is_expired(now), "no valid_until means never expires");
        assert!(record.is_pending(now));

        record.valid_until = Some(Timestamp::from_unix_millis(9_999));
        assert!(record.is_expired(now));
        assert!(!record.is_pending(now));

        record.valid_until = Some(Timestamp::from_unix_millis(10_000));
        assert!(!record.is_expired(now), "expiry is strict less-than");

        record.valid_until = Some(Timestamp::from_unix_millis(10_001));
        record.confirmed = true;
        assert!(!record.is_pending(now), "confirmed records are not pending");
    }
}
