//! Deferred-action confirmation kernel: mint a token, park the validated
//! action, replay it exactly once when the token comes back.

pub mod config;
pub mod error;
pub mod kernel;
pub mod listener;
pub mod minter;
pub mod registry;

pub use config::KernelConfig;
pub use error::{ConfirmError, DeferError, Rejection};
pub use kernel::{ConfirmationKernel, DeferralRequest, KernelBuilder};
pub use listener::ConfirmationListener;
pub use minter::{MAX_MINT_ATTEMPTS, MintError, mint};
pub use registry::{ActionHandler, HandlerRegistry, ReplayReceipt, ReplayRequest, ValidationError};
