use std::sync::Arc;

use latch_kernel::{DeferError, DeferralRequest, KernelConfig, Rejection};
use latch_store::{ActionStore, MemStore};
use latch_testkit::{
    ASSIGN_GROUPS, AssignGroupsParams, CREATE_USER, CreateUserParams, Directory, EMAIL_CHANGE,
    EmailChangeParams, Group, RENAME_GROUP, RenameGroupParams, User, group_ref, kernel_builder,
    seed_user, user_ref,
};
use latch_types::{SAFE_ALPHABET_UPPER, Token, TokenFormat};

#[test]
fn email_change_commits_only_after_confirmation() {
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
    assert_eq!(token.len(), 24, "email changes use the long format");

    // ========================
    // in practice this is where execution is deferred
    // ========================

    // Nothing changed yet; the record holds the raw input.
    assert_eq!(
        directory.user("user1").expect("user").email,
        "user1@example.com"
    );
    let record = mem.get(&token).expect("get").expect("present");
    assert_eq!(record.payload::<EmailChangeParams>().expect("decode"), params);

    let receipt = kernel.confirm(&token).expect("confirm");
    let user: User = receipt.value().expect("decode");
    assert_eq!(user.email, "xxx@example.com");
    assert_eq!(
        directory.user("user1").expect("user").email,
        "xxx@example.com"
    );

    // A used token is indistinguishable from a bogus one.
    let err = kernel.confirm(&token).expect_err("second confirm");
    assert_eq!(err.rejection(), Some(Rejection::NotFound));
    let err = kernel
        .confirm(&Token::new("nosuchtoken"))
        .expect_err("bogus token");
    assert_eq!(err.rejection(), Some(Rejection::NotFound));
}

#[test]
fn user_creation_waits_for_short_upper_code() {
    let mem = MemStore::new();
    let directory = Directory::new();
    let kernel = kernel_builder(Arc::new(mem.clone()), &directory).build();

    let params = CreateUserParams {
        username: "user2".into(),
        email: "user2@example.com".into(),
        password: "123456".into(),
    };
    let token = kernel
        .defer(DeferralRequest::new(CREATE_USER, &params))
        .expect("defer");
    assert_eq!(token.len(), 6);
    assert!(
        token.as_str().chars().all(|c| SAFE_ALPHABET_UPPER.contains(c)),
        "token {token} must come from the uppercase alphabet"
    );

    // The account must not exist until the code comes back.
    assert_eq!(directory.user("user2"), None);

    let receipt = kernel.confirm(&token).expect("confirm");
    let created: User = receipt.value().expect("decode");
    assert_eq!(created.email, "user2@example.com");
    assert_eq!(directory.user("user2").expect("user").username, "user2");
}

#[test]
fn group_rename_uses_short_mixed_case_code() {
    let mem = MemStore::new();
    let directory = Directory::new();
    directory.insert_group(Group {
        id: "g1".into(),
        name: "first_test_group".into(),
    });
    let kernel = kernel_builder(Arc::new(mem), &directory).build();

    let params = RenameGroupParams {
        name: "new_name".into(),
    };
    let token = kernel
        .defer(DeferralRequest::new(RENAME_GROUP, &params).target(group_ref("g1")))
        .expect("defer");
    assert_eq!(token.len(), 6);

    kernel.confirm(&token).expect("confirm");
    assert_eq!(directory.group("g1").expect("group").name, "new_name");
}

#[test]
fn group_assignment_replays_multi_valued_payload() {
    let mem = MemStore::new();
    let directory = Directory::new();
    seed_user(&directory, "user3", "user3@example.com");
    directory.insert_group(Group {
        id: "g1".into(),
        name: "first_test_group".into(),
    });
    directory.insert_group(Group {
        id: "g2".into(),
        name: "second_test_group".into(),
    });
    let kernel = kernel_builder(Arc::new(mem), &directory).build();

    let params = AssignGroupsParams {
        groups: vec!["g1".into(), "g2".into()],
    };
    let token = kernel
        .defer(DeferralRequest::new(ASSIGN_GROUPS, &params).target(user_ref("user3")))
        .expect("defer");

    assert_eq!(directory.user("user3").expect("user").groups, Vec::<String>::new());

    kernel.confirm(&token).expect("confirm");
    assert_eq!(
        directory.user("user3").expect("user").groups,
        vec!["g1".to_string(), "g2".to_string()]
    );
}

#[test]
fn payload_namespace_and_description_are_stored() {
    let mem = MemStore::new();
    let directory = Directory::new();
    seed_user(&directory, "user1", "user1@example.com");
    let kernel = kernel_builder(Arc::new(mem.clone()), &directory).build();

    let params = EmailChangeParams {
        email: "xxx@example.com".into(),
    };
    let token = kernel
        .defer(
            DeferralRequest::new(EMAIL_CHANGE, &params)
                .target(user_ref("user1"))
                .payload_namespace("primary")
                .description("change of address"),
        )
        .expect("defer");

    let record = mem.get(&token).expect("get").expect("present");
    assert_eq!(record.payload_namespace.as_deref(), Some("primary"));
    assert_eq!(record.description.as_deref(), Some("change of address"));
}

#[test]
fn single_token_alphabet_exhausts_on_second_deferral() {
    let mem = MemStore::new();
    let directory = Directory::new();
    seed_user(&directory, "user1", "user1@example.com");
    let kernel = kernel_builder(Arc::new(mem), &directory)
        .config(KernelConfig {
            default_token_format: TokenFormat::custom("x", 1),
            ..KernelConfig::default()
        })
        .build();

    let params = EmailChangeParams {
        email: "xxx@example.com".into(),
    };
    let token = kernel
        .defer(DeferralRequest::new(EMAIL_CHANGE, &params).target(user_ref("user1")))
        .expect("first deferral");
    assert_eq!(token.as_str(), "x");

    let err = kernel
        .defer(DeferralRequest::new(EMAIL_CHANGE, &params).target(user_ref("user1")))
        .expect_err("token space exhausted");
    assert!(matches!(err, DeferError::TokenSpaceExhausted { .. }));
}
