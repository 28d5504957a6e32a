//! Collection store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist content items, completed-item archives and per-collection
//!   forest blobs.
//! - Provide the atomic multi-statement operations the engine requires.
//!
//! # Invariants
//! - Listing order is deterministic: `created_at ASC, rowid ASC` for items
//!   (insertion sequence), `position ASC, username ASC` for stakeholders.
//! - Combined item/forest mutations run inside one immediate transaction.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::collection::{Collection, Stakeholder};
use crate::model::item::{CollectionId, CompletedItem, ContentItem, ContentType, ItemId};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    item_uuid,
    collection_uuid,
    type,
    name,
    owner,
    assigned_to,
    due_at
FROM items";

/// Result type used by collection store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from collection store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target item does not exist.
    ItemNotFound(ItemId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "content item not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "collection store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "collection store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "collection store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid collection data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence collaborator the hierarchy engine is built against.
///
/// # Preconditions
/// - Implementations must serialize concurrent mutations per collection;
///   the forest blob follows a read-modify-write cycle and interleaving two
///   writers would silently lose one update. The SQLite implementation
///   relies on immediate transactions plus SQLite's writer lock.
/// - The combined operations (`insert_item`, `remove_items`,
///   `archive_item`) must be atomic: either every entity change and the
///   forest save commit, or none do.
pub trait CollectionStore {
    /// Loads one collection by id.
    fn find_collection(&self, collection_uuid: CollectionId) -> StoreResult<Option<Collection>>;
    /// Loads one content item by id.
    fn find_item(&self, item_uuid: ItemId) -> StoreResult<Option<ContentItem>>;
    /// Lists a collection's live items in stable creation order.
    fn list_items(&self, collection_uuid: CollectionId) -> StoreResult<Vec<ContentItem>>;
    /// Loads a collection's serialized forest blob, if any was saved.
    fn load_forest(&self, collection_uuid: CollectionId) -> StoreResult<Option<String>>;
    /// Replaces a collection's serialized forest blob.
    fn save_forest(&self, collection_uuid: CollectionId, blob: &str) -> StoreResult<()>;
    /// Inserts one item and saves its collection's forest atomically.
    fn insert_item(&self, item: &ContentItem, blob: &str) -> StoreResult<()>;
    /// Updates one item's mutable fields.
    fn update_item(&self, item: &ContentItem) -> StoreResult<()>;
    /// Deletes the given items and saves the pruned forest atomically.
    fn remove_items(
        &self,
        collection_uuid: CollectionId,
        item_uuids: &HashSet<ItemId>,
        blob: &str,
    ) -> StoreResult<()>;
    /// Archives one item into completed storage, deletes the live row and
    /// saves the flattened forest atomically.
    fn archive_item(&self, item: &ContentItem, blob: &str) -> StoreResult<()>;
    /// Lists a collection's completed items, most recent first.
    fn list_completed(&self, collection_uuid: CollectionId) -> StoreResult<Vec<CompletedItem>>;
    /// Lists a collection's stakeholders in stable membership order.
    fn list_stakeholders(&self, collection_uuid: CollectionId) -> StoreResult<Vec<Stakeholder>>;
}

/// SQLite-backed collection store.
#[derive(Debug)]
pub struct SqliteCollectionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCollectionStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Creates one collection record.
    ///
    /// Setup API for callers that provision collections before handing them
    /// to the engine; the engine itself never creates collections.
    pub fn create_collection(&self, collection: &Collection) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO collections (collection_uuid, owner, name)
             VALUES (?1, ?2, ?3);",
            params![
                collection.uuid.to_string(),
                collection.owner.as_str(),
                collection.name.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Adds one member to a collection's stakeholder list.
    ///
    /// Members are ordered by insertion; `accepted` controls whether the
    /// engine fans notification events out to them.
    pub fn add_member(
        &self,
        collection_uuid: CollectionId,
        username: &str,
        accepted: bool,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO collection_members (collection_uuid, username, accepted, position)
             VALUES (
                ?1, ?2, ?3,
                COALESCE(
                    (SELECT MAX(position) + 1 FROM collection_members WHERE collection_uuid = ?1),
                    0
                )
             );",
            params![
                collection_uuid.to_string(),
                username,
                bool_to_int(accepted)
            ],
        )?;
        Ok(())
    }
}

impl CollectionStore for SqliteCollectionStore<'_> {
    fn find_collection(&self, collection_uuid: CollectionId) -> StoreResult<Option<Collection>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection_uuid, owner, name
             FROM collections
             WHERE collection_uuid = ?1;",
        )?;
        let mut rows = stmt.query([collection_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            let uuid_text: String = row.get("collection_uuid")?;
            return Ok(Some(Collection {
                uuid: parse_uuid(&uuid_text, "collections.collection_uuid")?,
                owner: row.get("owner")?,
                name: row.get("name")?,
            }));
        }
        Ok(None)
    }

    fn find_item(&self, item_uuid: ItemId) -> StoreResult<Option<ContentItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE item_uuid = ?1;"))?;
        let mut rows = stmt.query([item_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn list_items(&self, collection_uuid: CollectionId) -> StoreResult<Vec<ContentItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE collection_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([collection_uuid.to_string()])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn load_forest(&self, collection_uuid: CollectionId) -> StoreResult<Option<String>> {
        let blob = self
            .conn
            .query_row(
                "SELECT relations
                 FROM collection_forests
                 WHERE collection_uuid = ?1;",
                [collection_uuid.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(blob)
    }

    fn save_forest(&self, collection_uuid: CollectionId, blob: &str) -> StoreResult<()> {
        upsert_forest(self.conn, collection_uuid, blob)?;
        Ok(())
    }

    fn insert_item(&self, item: &ContentItem, blob: &str) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO items (
                item_uuid,
                collection_uuid,
                type,
                name,
                owner,
                assigned_to,
                due_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                item.uuid.to_string(),
                item.collection_uuid.to_string(),
                content_type_to_db(item.kind),
                item.name.as_str(),
                item.owner.as_str(),
                item.assigned_to.as_deref(),
                item.due_at,
            ],
        )?;
        upsert_forest(&tx, item.collection_uuid, blob)?;
        tx.commit()?;
        Ok(())
    }

    fn update_item(&self, item: &ContentItem) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE items
             SET name = ?2,
                 assigned_to = ?3,
                 due_at = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_uuid = ?1;",
            params![
                item.uuid.to_string(),
                item.name.as_str(),
                item.assigned_to.as_deref(),
                item.due_at,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::ItemNotFound(item.uuid));
        }
        Ok(())
    }

    fn remove_items(
        &self,
        collection_uuid: CollectionId,
        item_uuids: &HashSet<ItemId>,
        blob: &str,
    ) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        if !item_uuids.is_empty() {
            let placeholders = (0..item_uuids.len())
                .map(|index| format!("?{}", index + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let mut bind_values: Vec<Value> = vec![Value::Text(collection_uuid.to_string())];
            bind_values.extend(
                item_uuids
                    .iter()
                    .map(|item_uuid| Value::Text(item_uuid.to_string())),
            );

            tx.execute(
                &format!(
                    "DELETE FROM items
                     WHERE collection_uuid = ?1
                       AND item_uuid IN ({placeholders});"
                ),
                params_from_iter(bind_values),
            )?;
        }

        upsert_forest(&tx, collection_uuid, blob)?;
        tx.commit()?;
        Ok(())
    }

    fn archive_item(&self, item: &ContentItem, blob: &str) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO completed_items (
                item_uuid,
                collection_uuid,
                name,
                owner,
                assigned_to
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                item.uuid.to_string(),
                item.collection_uuid.to_string(),
                item.name.as_str(),
                item.owner.as_str(),
                item.assigned_to.as_deref(),
            ],
        )?;
        let changed = tx.execute(
            "DELETE FROM items WHERE item_uuid = ?1;",
            [item.uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::ItemNotFound(item.uuid));
        }
        upsert_forest(&tx, item.collection_uuid, blob)?;
        tx.commit()?;
        Ok(())
    }

    fn list_completed(&self, collection_uuid: CollectionId) -> StoreResult<Vec<CompletedItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                item_uuid,
                collection_uuid,
                name,
                owner,
                assigned_to,
                completed_at
             FROM completed_items
             WHERE collection_uuid = ?1
             ORDER BY completed_at DESC, item_uuid ASC;",
        )?;
        let mut rows = stmt.query([collection_uuid.to_string()])?;

        let mut completed = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("item_uuid")?;
            let collection_text: String = row.get("collection_uuid")?;
            completed.push(CompletedItem {
                uuid: parse_uuid(&uuid_text, "completed_items.item_uuid")?,
                collection_uuid: parse_uuid(&collection_text, "completed_items.collection_uuid")?,
                name: row.get("name")?,
                owner: row.get("owner")?,
                assigned_to: row.get("assigned_to")?,
                completed_at: row.get("completed_at")?,
            });
        }
        Ok(completed)
    }

    fn list_stakeholders(&self, collection_uuid: CollectionId) -> StoreResult<Vec<Stakeholder>> {
        let mut stmt = self.conn.prepare(
            "SELECT username, accepted
             FROM collection_members
             WHERE collection_uuid = ?1
             ORDER BY position ASC, username ASC;",
        )?;
        let mut rows = stmt.query([collection_uuid.to_string()])?;

        let mut stakeholders = Vec::new();
        while let Some(row) = rows.next()? {
            let accepted = match row.get::<_, i64>("accepted")? {
                0 => false,
                1 => true,
                other => {
                    return Err(StoreError::InvalidData(format!(
                        "invalid accepted value `{other}` in collection_members.accepted"
                    )));
                }
            };
            stakeholders.push(Stakeholder {
                username: row.get("username")?,
                accepted,
            });
        }
        Ok(stakeholders)
    }
}

fn upsert_forest(
    conn: &Connection,
    collection_uuid: CollectionId,
    blob: &str,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO collection_forests (collection_uuid, relations)
         VALUES (?1, ?2)
         ON CONFLICT(collection_uuid) DO UPDATE
         SET relations = excluded.relations,
             updated_at = (strftime('%s', 'now') * 1000);",
        params![collection_uuid.to_string(), blob],
    )?;
    Ok(())
}

fn parse_item_row(row: &Row<'_>) -> StoreResult<ContentItem> {
    let uuid_text: String = row.get("item_uuid")?;
    let collection_text: String = row.get("collection_uuid")?;
    let type_text: String = row.get("type")?;
    let kind = parse_content_type(&type_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid content type `{type_text}` in items.type"))
    })?;

    Ok(ContentItem {
        uuid: parse_uuid(&uuid_text, "items.item_uuid")?,
        collection_uuid: parse_uuid(&collection_text, "items.collection_uuid")?,
        kind,
        name: row.get("name")?,
        owner: row.get("owner")?,
        assigned_to: row.get("assigned_to")?,
        due_at: row.get("due_at")?,
    })
}

fn content_type_to_db(kind: ContentType) -> &'static str {
    match kind {
        ContentType::Project => "project",
        ContentType::Group => "group",
        ContentType::Task => "task",
        ContentType::Note => "note",
        ContentType::Transaction => "transaction",
    }
}

fn parse_content_type(value: &str) -> Option<ContentType> {
    match value {
        "project" => Some(ContentType::Project),
        "group" => Some(ContentType::Group),
        "task" => Some(ContentType::Task),
        "note" => Some(ContentType::Note),
        "transaction" => Some(ContentType::Transaction),
        _ => None,
    }
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in [
        "collections",
        "collection_members",
        "items",
        "collection_forests",
        "completed_items",
    ] {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }

    for column in [
        "item_uuid",
        "collection_uuid",
        "type",
        "name",
        "owner",
        "assigned_to",
        "due_at",
    ] {
        if !table_has_column(conn, "items", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "items",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
