//! Deterministic fixtures for exercising the confirmation kernel: an
//! in-memory domain directory, sample action handlers over it, and
//! recording listeners. Scenario tests live in this crate's `tests/`.

pub mod directory;
pub mod handlers;
pub mod listeners;

pub use directory::{Directory, GROUP_TAG, Group, USER_TAG, User, group_ref, user_ref};
pub use handlers::{
    ASSIGN_GROUPS, AssignGroupsHandler, AssignGroupsParams, CREATE_USER, CreateUserHandler,
    CreateUserParams, EMAIL_CHANGE, EmailChangeHandler, EmailChangeParams, RENAME_GROUP,
    RenameGroupHandler, RenameGroupParams,
};
pub use listeners::{FailingListener, ListenerEvent, Mailbox, RecordingListener};

use latch_kernel::{ConfirmationKernel, KernelBuilder};
use latch_store::DynStore;

/// Builder pre-loaded with every directory handler; tests add listeners or
/// config and call `build()`.
pub fn kernel_builder(store: DynStore, directory: &Directory) -> KernelBuilder {
    ConfirmationKernel::builder(store)
        .handler(Box::new(EmailChangeHandler::new(directory.clone())))
        .handler(Box::new(CreateUserHandler::new(directory.clone())))
        .handler(Box::new(RenameGroupHandler::new(directory.clone())))
        .handler(Box::new(AssignGroupsHandler::new(directory.clone())))
}

/// Seed one user the way most scenarios start out.
pub fn seed_user(directory: &Directory, id: &str, email: &str) -> User {
    let user = User {
        id: id.to_string(),
        username: id.to_string(),
        email: email.to_string(),
        groups: Vec::new(),
    };
    directory.insert_user(user.clone());
    user
}
