use bujo_core::{check_operation, AuthorizationContext, ContentType, Operation};
use uuid::Uuid;

fn content_id() -> Uuid {
    Uuid::from_u128(0xA07)
}

fn note_in_carols_project() -> AuthorizationContext {
    AuthorizationContext::Note {
        project_owner: "carol".to_string(),
    }
}

#[test]
fn project_update_requires_ownership() {
    let err = check_operation(
        "alice",
        "bob",
        content_id(),
        Operation::Update,
        &AuthorizationContext::Project,
    )
    .unwrap_err();
    assert_eq!(err.content_type, ContentType::Project);
    assert_eq!(err.owner, "alice");
    assert_eq!(err.requester, "bob");
    assert_eq!(err.operation, Operation::Update);
    assert_eq!(err.auxiliary_owner, None);

    check_operation(
        "alice",
        "alice",
        content_id(),
        Operation::Update,
        &AuthorizationContext::Project,
    )
    .unwrap();
}

#[test]
fn project_delete_requires_ownership() {
    assert!(check_operation(
        "alice",
        "bob",
        content_id(),
        Operation::Delete,
        &AuthorizationContext::Project,
    )
    .is_err());
    assert!(check_operation(
        "alice",
        "alice",
        content_id(),
        Operation::Delete,
        &AuthorizationContext::Project,
    )
    .is_ok());
}

#[test]
fn group_update_and_delete_require_ownership() {
    for operation in [Operation::Update, Operation::Delete] {
        assert!(check_operation(
            "alice",
            "bob",
            content_id(),
            operation,
            &AuthorizationContext::Group,
        )
        .is_err());
        assert!(check_operation(
            "alice",
            "alice",
            content_id(),
            operation,
            &AuthorizationContext::Group,
        )
        .is_ok());
    }
}

#[test]
fn note_delete_allows_either_owner() {
    // The note owner and the containing project's owner may both delete.
    check_operation(
        "alice",
        "carol",
        content_id(),
        Operation::Delete,
        &note_in_carols_project(),
    )
    .unwrap();
    check_operation(
        "alice",
        "alice",
        content_id(),
        Operation::Delete,
        &note_in_carols_project(),
    )
    .unwrap();

    let err = check_operation(
        "alice",
        "bob",
        content_id(),
        Operation::Delete,
        &note_in_carols_project(),
    )
    .unwrap_err();
    assert_eq!(err.auxiliary_owner.as_deref(), Some("carol"));
}

#[test]
fn task_update_has_no_auxiliary_owner_exception() {
    // Unlike notes, a task is only updatable by its own owner.
    let err = check_operation(
        "alice",
        "bob",
        content_id(),
        Operation::Update,
        &AuthorizationContext::Task,
    )
    .unwrap_err();
    assert_eq!(err.content_type, ContentType::Task);

    check_operation(
        "alice",
        "alice",
        content_id(),
        Operation::Update,
        &AuthorizationContext::Task,
    )
    .unwrap();
}

#[test]
fn unlisted_type_operation_pairs_are_allowed() {
    // The rule table enumerates exceptions; everything else passes, even
    // for strangers.
    check_operation(
        "alice",
        "bob",
        content_id(),
        Operation::Delete,
        &AuthorizationContext::Task,
    )
    .unwrap();
    check_operation(
        "alice",
        "bob",
        content_id(),
        Operation::Create,
        &AuthorizationContext::Project,
    )
    .unwrap();
    check_operation(
        "alice",
        "bob",
        content_id(),
        Operation::Read,
        &note_in_carols_project(),
    )
    .unwrap();
    for operation in [Operation::Update, Operation::Delete] {
        check_operation(
            "alice",
            "bob",
            content_id(),
            operation,
            &AuthorizationContext::Transaction,
        )
        .unwrap();
    }
}

#[test]
fn denial_message_identifies_all_parties() {
    let err = check_operation(
        "alice",
        "bob",
        content_id(),
        Operation::Delete,
        &note_in_carols_project(),
    )
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("note"));
    assert!(message.contains("alice"));
    assert!(message.contains("carol"));
    assert!(message.contains("bob"));
    assert!(message.contains("delete"));
}
