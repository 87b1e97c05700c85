use std::sync::Arc;

use latch_kernel::{ConfirmError, ConfirmationKernel, DeferralRequest};
use latch_store::{ActionStore, DynStore, MemStore};
use latch_testkit::{Directory, EMAIL_CHANGE, EmailChangeParams, kernel_builder, seed_user, user_ref};

#[test]
fn replay_validation_failure_is_fatal_and_leaves_record_pending() {
    let mem = MemStore::new();
    let directory = Directory::new();
    seed_user(&directory, "user1", "user1@example.com");
    let kernel = kernel_builder(Arc::new(mem.clone()), &directory).build();

    let params = EmailChangeParams {
        email: "xxx@example.com".into(),
    };
    let token = kernel
        .defer(DeferralRequest::new(EMAIL_CHANGE, &params).target(user_ref("user1")))
        .expect("defer");

    // The world drifts during the deferral window: the target disappears.
    let removed = directory.remove_user("user1").expect("user existed");

    let err = kernel.confirm(&token).expect_err("validation must fail");
    assert!(matches!(err, ConfirmError::Validation(_)));
    assert_eq!(err.rejection(), None, "state drift is not a user-facing rejection");

    // The record was not consumed by the failed replay.
    let record = mem.get(&token).expect("get").expect("present");
    assert!(!record.confirmed);

    // Once the drift is repaired the same token still works.
    directory.insert_user(removed);
    kernel.confirm(&token).expect("confirm after repair");
    assert_eq!(
        directory.user("user1").expect("user").email,
        "xxx@example.com"
    );
}

#[test]
fn missing_handler_surfaces_deployment_drift() {
    let mem = MemStore::new();
    let directory = Directory::new();
    seed_user(&directory, "user1", "user1@example.com");
    let store: DynStore = Arc::new(mem.clone());
    let kernel = kernel_builder(store.clone(), &directory).build();

    let params = EmailChangeParams {
        email: "xxx@example.com".into(),
    };
    let token = kernel
        .defer(DeferralRequest::new(EMAIL_CHANGE, &params).target(user_ref("user1")))
        .expect("defer");

    // A kernel without the handler registered cannot replay the record,
    // and must not consume it either.
    let bare = ConfirmationKernel::builder(store).build();
    let err = bare.confirm(&token).expect_err("no handler");
    assert!(matches!(err, ConfirmError::UnknownHandler(kind) if kind.as_str() == EMAIL_CHANGE));
    assert!(!mem.get(&token).expect("get").expect("present").confirmed);

    // The fully wired kernel still can.
    kernel.confirm(&token).expect("confirm");
}
