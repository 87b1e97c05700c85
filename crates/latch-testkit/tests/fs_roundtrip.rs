use std::sync::Arc;

use latch_kernel::{DeferralRequest, Rejection};
use latch_store::{ActionStore, FsStore};
use latch_testkit::{Directory, EMAIL_CHANGE, EmailChangeParams, kernel_builder, seed_user, user_ref};
use tempfile::TempDir;

#[test]
fn confirmation_survives_a_process_restart() {
    let dir = TempDir::new().expect("tmp");
    let directory = Directory::new();
    seed_user(&directory, "user1", "user1@example.com");

    let params = EmailChangeParams {
        email: "xxx@example.com".into(),
    };
    let token = {
        let store = FsStore::open(dir.path()).expect("open");
        let kernel = kernel_builder(Arc::new(store), &directory).build();
        kernel
            .defer(DeferralRequest::new(EMAIL_CHANGE, &params).target(user_ref("user1")))
            .expect("defer")
    };

    // "Restart": a new store handle over the same directory.
    let store = FsStore::open(dir.path()).expect("reopen");
    let kernel = kernel_builder(Arc::new(store), &directory).build();
    kernel.confirm(&token).expect("confirm");
    assert_eq!(
        directory.user("user1").expect("user").email,
        "xxx@example.com"
    );

    // The confirmed flag is durable as well.
    let reopened = FsStore::open(dir.path()).expect("reopen again");
    assert!(reopened.get(&token).expect("get").expect("present").confirmed);
    let err = kernel.confirm(&token).expect_err("second confirm");
    assert_eq!(err.rejection(), Some(Rejection::NotFound));
}
