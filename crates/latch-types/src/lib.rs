//! Shared value types for the latch crates: tokens, action kinds, target
//! references, timestamps, and the durable `DeferredAction` record.

mod kind;
mod record;
mod refs;
mod time;
mod token;

pub use kind::ActionKind;
pub use record::{DeferredAction, PayloadDecodeError, RecordBuilder, RecordEncodeError};
pub use refs::{ActorRef, TargetRef};
pub use time::Timestamp;
pub use token::{SAFE_ALPHABET, SAFE_ALPHABET_UPPER, Token, TokenFormat};
