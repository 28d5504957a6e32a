use bujo_core::db::open_db_in_memory;
use bujo_core::{
    Collection, CollectionStore, ContentItem, ContentType, CreateItemParams, EngineError,
    FieldUpdate, HierarchyEngine, ItemNode, SqliteCollectionStore, UpdateItemParams,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn store(conn: &Connection) -> SqliteCollectionStore<'_> {
    SqliteCollectionStore::try_new(conn).unwrap()
}

fn engine(conn: &Connection) -> HierarchyEngine<SqliteCollectionStore<'_>> {
    HierarchyEngine::new(store(conn))
}

fn new_collection(conn: &Connection, owner: &str) -> Uuid {
    let collection = Collection::new(Uuid::new_v4(), owner, "Bullet journal");
    store(conn).create_collection(&collection).unwrap();
    collection.uuid
}

fn create_task(
    engine: &HierarchyEngine<SqliteCollectionStore<'_>>,
    collection_uuid: Uuid,
    owner: &str,
    name: &str,
) -> ContentItem {
    engine
        .create_item(
            collection_uuid,
            owner,
            CreateItemParams::new(ContentType::Task, name),
        )
        .unwrap()
}

fn root_ids(nodes: &[ItemNode]) -> Vec<Uuid> {
    nodes.iter().map(|node| node.item.uuid).collect()
}

#[test]
fn create_appends_items_as_trailing_roots() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let first = create_task(&engine, collection_uuid, "alice", "first");
    let second = create_task(&engine, collection_uuid, "alice", "second");
    let third = create_task(&engine, collection_uuid, "alice", "third");

    let view = engine.list_items(collection_uuid).unwrap();
    assert_eq!(root_ids(&view), vec![first.uuid, second.uuid, third.uuid]);
    assert!(view.iter().all(|node| node.children.is_empty()));
}

#[test]
fn create_rejects_unknown_collection() {
    let conn = setup();
    let engine = engine(&conn);

    let err = engine
        .create_item(
            Uuid::new_v4(),
            "alice",
            CreateItemParams::new(ContentType::Task, "stray"),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::CollectionNotFound(_)));
}

#[test]
fn task_create_defaults_assignee_to_owner() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let task = create_task(&engine, collection_uuid, "alice", "chore");
    assert_eq!(task.assigned_to.as_deref(), Some("alice"));

    let note = engine
        .create_item(
            collection_uuid,
            "alice",
            CreateItemParams::new(ContentType::Note, "memo"),
        )
        .unwrap();
    assert_eq!(note.assigned_to, None);
}

#[test]
fn update_relations_replaces_forest_wholesale() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let a = create_task(&engine, collection_uuid, "alice", "a");
    let b = create_task(&engine, collection_uuid, "alice", "b");
    let c = create_task(&engine, collection_uuid, "alice", "c");

    let nested = vec![
        ItemNode::with_children(a.clone(), vec![ItemNode::leaf(b.clone())]),
        ItemNode::leaf(c.clone()),
    ];
    engine.update_relations(collection_uuid, &nested).unwrap();

    let view = engine.list_items(collection_uuid).unwrap();
    assert_eq!(root_ids(&view), vec![a.uuid, c.uuid]);
    assert_eq!(root_ids(&view[0].children), vec![b.uuid]);

    // Last writer wins: a later flat submission discards the nesting.
    let flat = vec![
        ItemNode::leaf(c.clone()),
        ItemNode::leaf(b.clone()),
        ItemNode::leaf(a.clone()),
    ];
    engine.update_relations(collection_uuid, &flat).unwrap();

    let view = engine.list_items(collection_uuid).unwrap();
    assert_eq!(root_ids(&view), vec![c.uuid, b.uuid, a.uuid]);
}

#[test]
fn delete_cascades_to_descendants() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let one = create_task(&engine, collection_uuid, "alice", "one");
    let two = create_task(&engine, collection_uuid, "alice", "two");
    let three = create_task(&engine, collection_uuid, "alice", "three");
    let four = create_task(&engine, collection_uuid, "alice", "four");

    engine
        .update_relations(
            collection_uuid,
            &[
                ItemNode::with_children(
                    one.clone(),
                    vec![ItemNode::leaf(two.clone()), ItemNode::leaf(three.clone())],
                ),
                ItemNode::leaf(four.clone()),
            ],
        )
        .unwrap();

    engine.delete_item("alice", one.uuid).unwrap();

    let view = engine.list_items(collection_uuid).unwrap();
    assert_eq!(root_ids(&view), vec![four.uuid]);

    for doomed in [one.uuid, two.uuid, three.uuid] {
        let err = engine
            .update_item("alice", doomed, UpdateItemParams::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::ItemNotFound(id) if id == doomed));
    }
}

#[test]
fn delete_is_scoped_to_the_target_subtree() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let one = create_task(&engine, collection_uuid, "alice", "one");
    let two = create_task(&engine, collection_uuid, "alice", "two");
    let three = create_task(&engine, collection_uuid, "alice", "three");
    let four = create_task(&engine, collection_uuid, "alice", "four");

    engine
        .update_relations(
            collection_uuid,
            &[
                ItemNode::with_children(
                    one.clone(),
                    vec![ItemNode::leaf(two.clone()), ItemNode::leaf(three.clone())],
                ),
                ItemNode::leaf(four.clone()),
            ],
        )
        .unwrap();

    engine.delete_item("alice", two.uuid).unwrap();

    let view = engine.list_items(collection_uuid).unwrap();
    assert_eq!(root_ids(&view), vec![one.uuid, four.uuid]);
    assert_eq!(root_ids(&view[0].children), vec![three.uuid]);
}

#[test]
fn delete_notifies_accepted_stakeholders_except_requester() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");
    let members = store(&conn);
    members.add_member(collection_uuid, "alice", true).unwrap();
    members.add_member(collection_uuid, "bob", true).unwrap();
    members.add_member(collection_uuid, "carol", false).unwrap();
    members.add_member(collection_uuid, "dave", true).unwrap();

    let task = create_task(&engine, collection_uuid, "alice", "shared work");
    let events = engine.delete_item("alice", task.uuid).unwrap();

    let recipients: Vec<_> = events
        .iter()
        .map(|event| event.recipient.as_str())
        .collect();
    assert_eq!(recipients, vec!["bob", "dave"]);
    for event in &events {
        assert_eq!(event.content_id, task.uuid);
        assert_eq!(event.content_name, "shared work");
    }
}

#[test]
fn delete_of_item_missing_from_forest_still_removes_entity() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let kept = create_task(&engine, collection_uuid, "alice", "kept");
    let stray = create_task(&engine, collection_uuid, "alice", "stray");

    // Submitted ordering never mentions the stray item.
    engine
        .update_relations(collection_uuid, &[ItemNode::leaf(kept.clone())])
        .unwrap();

    engine.delete_item("alice", stray.uuid).unwrap();

    let view = engine.list_items(collection_uuid).unwrap();
    assert_eq!(root_ids(&view), vec![kept.uuid]);
    let err = engine
        .update_item("alice", stray.uuid, UpdateItemParams::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::ItemNotFound(_)));
}

#[test]
fn unauthorized_delete_changes_nothing() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let project = engine
        .create_item(
            collection_uuid,
            "alice",
            CreateItemParams::new(ContentType::Project, "garden"),
        )
        .unwrap();

    let err = engine.delete_item("bob", project.uuid).unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    let view = engine.list_items(collection_uuid).unwrap();
    assert_eq!(root_ids(&view), vec![project.uuid]);
}

#[test]
fn update_applies_only_supplied_fields() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let task = engine
        .create_item(
            collection_uuid,
            "alice",
            CreateItemParams {
                kind: ContentType::Task,
                name: "water plants".to_string(),
                assigned_to: Some("bob".to_string()),
                due_at: Some(1_700_000_000_000),
            },
        )
        .unwrap();

    let (updated, events) = engine
        .update_item(
            "alice",
            task.uuid,
            UpdateItemParams {
                name: FieldUpdate::Set("water all plants".to_string()),
                ..UpdateItemParams::default()
            },
        )
        .unwrap();

    assert_eq!(updated.name, "water all plants");
    assert_eq!(updated.assigned_to.as_deref(), Some("bob"));
    assert_eq!(updated.due_at, Some(1_700_000_000_000));
    assert!(events.is_empty());
}

#[test]
fn explicit_reset_is_distinguishable_from_unset() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let task = engine
        .create_item(
            collection_uuid,
            "alice",
            CreateItemParams {
                kind: ContentType::Task,
                name: "buy seeds".to_string(),
                assigned_to: None,
                due_at: Some(1_700_000_000_000),
            },
        )
        .unwrap();

    let (updated, _) = engine
        .update_item(
            "alice",
            task.uuid,
            UpdateItemParams {
                due_at: FieldUpdate::Set(None),
                ..UpdateItemParams::default()
            },
        )
        .unwrap();

    assert_eq!(updated.due_at, None);
    assert_eq!(updated.name, "buy seeds");

    let (reloaded, _) = engine
        .update_item("alice", task.uuid, UpdateItemParams::default())
        .unwrap();
    assert_eq!(reloaded.due_at, None);
}

#[test]
fn assignee_reassignment_suppresses_requester_event() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "bob");

    let task = engine
        .create_item(
            collection_uuid,
            "bob",
            CreateItemParams {
                kind: ContentType::Task,
                name: "handover".to_string(),
                assigned_to: Some("bob".to_string()),
                due_at: None,
            },
        )
        .unwrap();

    let (updated, events) = engine
        .update_item(
            "bob",
            task.uuid,
            UpdateItemParams {
                assigned_to: FieldUpdate::Set(Some("carol".to_string())),
                ..UpdateItemParams::default()
            },
        )
        .unwrap();

    assert_eq!(updated.assigned_to.as_deref(), Some("carol"));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].recipient, "carol");
}

#[test]
fn assignee_reassignment_notifies_both_parties_for_uninvolved_requester() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "dave");

    let task = engine
        .create_item(
            collection_uuid,
            "dave",
            CreateItemParams {
                kind: ContentType::Task,
                name: "handover".to_string(),
                assigned_to: Some("bob".to_string()),
                due_at: None,
            },
        )
        .unwrap();

    let (_, events) = engine
        .update_item(
            "dave",
            task.uuid,
            UpdateItemParams {
                assigned_to: FieldUpdate::Set(Some("carol".to_string())),
                ..UpdateItemParams::default()
            },
        )
        .unwrap();

    let recipients: Vec<_> = events
        .iter()
        .map(|event| event.recipient.as_str())
        .collect();
    assert_eq!(recipients, vec!["carol", "bob"]);
}

#[test]
fn unchanged_assignee_emits_no_events() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let task = create_task(&engine, collection_uuid, "alice", "quiet");
    let (_, events) = engine
        .update_item(
            "alice",
            task.uuid,
            UpdateItemParams {
                assigned_to: FieldUpdate::Set(Some("alice".to_string())),
                ..UpdateItemParams::default()
            },
        )
        .unwrap();
    assert!(events.is_empty());
}

#[test]
fn note_update_allows_containing_project_owner() {
    let conn = setup();
    let engine = engine(&conn);
    // Collection (and thereby the containing project) is carol's; the note
    // itself belongs to alice.
    let collection_uuid = new_collection(&conn, "carol");

    let note = engine
        .create_item(
            collection_uuid,
            "alice",
            CreateItemParams::new(ContentType::Note, "meeting minutes"),
        )
        .unwrap();

    let (updated, _) = engine
        .update_item(
            "carol",
            note.uuid,
            UpdateItemParams {
                name: FieldUpdate::Set("amended minutes".to_string()),
                ..UpdateItemParams::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "amended minutes");

    let err = engine
        .update_item(
            "bob",
            note.uuid,
            UpdateItemParams {
                name: FieldUpdate::Set("defaced".to_string()),
                ..UpdateItemParams::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    engine.delete_item("carol", note.uuid).unwrap();
}

#[test]
fn task_update_denies_collection_owner_who_is_not_item_owner() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "carol");

    let task = create_task(&engine, collection_uuid, "alice", "private errand");

    let err = engine
        .update_item(
            "carol",
            task.uuid,
            UpdateItemParams {
                name: FieldUpdate::Set("hijacked".to_string()),
                ..UpdateItemParams::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
}

#[test]
fn corrupt_forest_blob_surfaces_server_fault() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");
    create_task(&engine, collection_uuid, "alice", "victim");

    store(&conn)
        .save_forest(collection_uuid, "definitely not a forest")
        .unwrap();

    let err = engine.list_items(collection_uuid).unwrap_err();
    assert!(matches!(err, EngineError::CorruptHierarchy(_)));
}

#[test]
fn failed_forest_save_rolls_back_entity_deletion() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let one = create_task(&engine, collection_uuid, "alice", "one");
    let two = create_task(&engine, collection_uuid, "alice", "two");

    conn.execute_batch(
        "CREATE TRIGGER forest_save_fails_test
         BEFORE UPDATE OF relations ON collection_forests
         BEGIN
             SELECT RAISE(ABORT, 'forced forest failure');
         END;",
    )
    .unwrap();

    assert!(engine.delete_item("alice", one.uuid).is_err());

    conn.execute_batch("DROP TRIGGER forest_save_fails_test;")
        .unwrap();
    let view = engine.list_items(collection_uuid).unwrap();
    assert_eq!(root_ids(&view), vec![one.uuid, two.uuid]);
}

#[test]
fn complete_archives_task_and_promotes_children() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let parent = create_task(&engine, collection_uuid, "alice", "parent");
    let child_a = create_task(&engine, collection_uuid, "alice", "child a");
    let child_b = create_task(&engine, collection_uuid, "alice", "child b");
    let sibling = create_task(&engine, collection_uuid, "alice", "sibling");

    engine
        .update_relations(
            collection_uuid,
            &[
                ItemNode::with_children(
                    parent.clone(),
                    vec![ItemNode::leaf(child_a.clone()), ItemNode::leaf(child_b.clone())],
                ),
                ItemNode::leaf(sibling.clone()),
            ],
        )
        .unwrap();

    let completed = engine.complete_item("alice", parent.uuid).unwrap();
    assert_eq!(completed.uuid, parent.uuid);

    // Children take the completed task's position; the sibling stays last.
    let view = engine.list_items(collection_uuid).unwrap();
    assert_eq!(
        root_ids(&view),
        vec![child_a.uuid, child_b.uuid, sibling.uuid]
    );

    let archive = engine.list_completed(collection_uuid).unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(archive[0].uuid, parent.uuid);
    assert_eq!(archive[0].name, "parent");

    let err = engine
        .update_item("alice", parent.uuid, UpdateItemParams::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::ItemNotFound(_)));
}

#[test]
fn complete_rejects_non_task_items() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let note = engine
        .create_item(
            collection_uuid,
            "alice",
            CreateItemParams::new(ContentType::Note, "memo"),
        )
        .unwrap();

    let err = engine.complete_item("alice", note.uuid).unwrap_err();
    assert!(matches!(err, EngineError::NotCompletable { .. }));
}

#[test]
fn complete_requires_task_ownership() {
    let conn = setup();
    let engine = engine(&conn);
    let collection_uuid = new_collection(&conn, "alice");

    let task = create_task(&engine, collection_uuid, "alice", "mine");
    let err = engine.complete_item("bob", task.uuid).unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
}

#[test]
fn update_unknown_item_reports_not_found() {
    let conn = setup();
    let engine = engine(&conn);

    let missing = Uuid::new_v4();
    let err = engine
        .update_item("alice", missing, UpdateItemParams::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::ItemNotFound(id) if id == missing));
}
