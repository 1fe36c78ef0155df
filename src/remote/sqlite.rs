use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{
    stamp_insert, stamp_update, timestamp, DeleteMode, ListQuery, RemoteError, RemoteResult,
    RemoteService,
};
use crate::entity::{Actor, Record};

const RECORDS_DB: &str = "records.db";

/// SQLite-backed remote service.
///
/// Every collection shares one table; the record body is stored as JSON and
/// the columns carry what reads filter and order on.
pub struct SqliteRemote {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteRemote {
    /// Open or create the records database inside `dir`
    pub fn open(dir: &Path) -> RemoteResult<Self> {
        let path = dir.join(RECORDS_DB);
        let conn = Connection::open(&path)?;
        Self::init_schema(&conn)?;
        debug!(path = %path.display(), "opened records database");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
        })
    }

    pub fn open_in_memory() -> RemoteResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(conn: &Connection) -> RemoteResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                actor TEXT NOT NULL,
                parent_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT,
                body TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
            [],
        )?;

        // Listing order within an actor's collection
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_listing
             ON records(collection, actor, created_at)",
            [],
        )?;

        // Cascade lookups
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_parent ON records(parent_id)",
            [],
        )?;

        Ok(())
    }
}

fn load_live<R: Record>(conn: &Connection, actor: &Actor, id: Uuid) -> RemoteResult<Option<R>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM records
             WHERE collection = ?1 AND id = ?2 AND actor = ?3 AND deleted_at IS NULL",
            params![R::COLLECTION, id.to_string(), actor.id],
            |row| row.get(0),
        )
        .optional()?;

    match body {
        Some(body) => Ok(Some(serde_json::from_str(&body)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl<R: Record> RemoteService<R> for SqliteRemote {
    async fn list(&self, actor: &Actor, query: &ListQuery) -> RemoteResult<Vec<R>> {
        let conn = self.conn.lock().await;

        let mut stmt = conn.prepare(
            "SELECT body FROM records
             WHERE collection = ?1 AND actor = ?2 AND (?3 OR deleted_at IS NULL)
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?4",
        )?;
        let bodies = stmt
            .query_map(
                params![
                    R::COLLECTION,
                    actor.id,
                    query.include_deleted,
                    query.limit as i64
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(RemoteError::from))
            .collect()
    }

    async fn insert(&self, actor: &Actor, mut record: R) -> RemoteResult<R> {
        let conn = self.conn.lock().await;

        stamp_insert(&mut record, actor, Utc::now());
        let base = record.base();
        conn.execute(
            "INSERT INTO records
             (collection, id, actor, parent_id, created_at, updated_at, deleted_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
            params![
                R::COLLECTION,
                base.id.to_string(),
                actor.id,
                record.parent_id().map(|p| p.to_string()),
                timestamp(&base.created_at),
                timestamp(&base.updated_at),
                serde_json::to_string(&record)?,
            ],
        )?;

        debug!(collection = R::COLLECTION, id = %base.id, "inserted record");
        Ok(record)
    }

    async fn update(&self, actor: &Actor, mut record: R) -> RemoteResult<R> {
        let conn = self.conn.lock().await;

        let id = record.id();
        let stored: R = load_live(&conn, actor, id)?.ok_or(RemoteError::NotFound(id))?;
        stamp_update(&mut record, &stored, Utc::now());

        conn.execute(
            "UPDATE records SET parent_id = ?1, updated_at = ?2, body = ?3
             WHERE collection = ?4 AND id = ?5",
            params![
                record.parent_id().map(|p| p.to_string()),
                timestamp(&record.base().updated_at),
                serde_json::to_string(&record)?,
                R::COLLECTION,
                id.to_string(),
            ],
        )?;

        debug!(collection = R::COLLECTION, %id, "updated record");
        Ok(record)
    }

    async fn delete(&self, actor: &Actor, id: Uuid, mode: DeleteMode) -> RemoteResult<()> {
        let mut conn = self.conn.lock().await;

        if load_live::<R>(&conn, actor, id)?.is_none() {
            return Err(RemoteError::NotFound(id));
        }

        let tx = conn.transaction()?;
        let id_str = id.to_string();
        match mode {
            DeleteMode::Soft => {
                let now = timestamp(&Utc::now());
                tx.execute(
                    "UPDATE records SET deleted_at = ?1 WHERE collection = ?2 AND id = ?3",
                    params![now, R::COLLECTION, id_str],
                )?;
                for dependent in R::DEPENDENTS {
                    tx.execute(
                        "UPDATE records SET deleted_at = ?1
                         WHERE collection = ?2 AND parent_id = ?3 AND deleted_at IS NULL",
                        params![now, dependent, id_str],
                    )?;
                }
            }
            DeleteMode::Hard => {
                tx.execute(
                    "DELETE FROM records WHERE collection = ?1 AND id = ?2",
                    params![R::COLLECTION, id_str],
                )?;
                for dependent in R::DEPENDENTS {
                    tx.execute(
                        "DELETE FROM records WHERE collection = ?1 AND parent_id = ?2",
                        params![dependent, id_str],
                    )?;
                }
            }
        }
        tx.commit()?;

        debug!(collection = R::COLLECTION, %id, %mode, "deleted record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Flow, Survey, SurveyResponse};
    use tempfile::TempDir;

    fn actor() -> Actor {
        Actor::new("alice")
    }

    #[tokio::test]
    async fn test_round_trip_through_file() {
        let tmp = TempDir::new().unwrap();
        let saved = {
            let remote = SqliteRemote::open(tmp.path()).unwrap();
            remote
                .insert(&actor(), Flow::new("Welcome Tour".to_string()))
                .await
                .unwrap()
        };

        let remote = SqliteRemote::open(tmp.path()).unwrap();
        let flows: Vec<Flow> = remote.list(&actor(), &ListQuery::default()).await.unwrap();
        assert_eq!(flows, vec![saved]);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        for title in ["a", "b", "c"] {
            remote.insert(&actor(), Survey::new(title.to_string())).await.unwrap();
        }

        let listed: Vec<Survey> = remote.list(&actor(), &ListQuery::with_limit(2)).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_update_stamps_and_persists() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        let mut survey = remote
            .insert(&actor(), Survey::new("Pulse".to_string()))
            .await
            .unwrap();
        survey.title = "Pulse v2".to_string();

        let updated = remote.update(&actor(), survey.clone()).await.unwrap();
        assert_eq!(updated.title, "Pulse v2");
        assert!(updated.base.updated_at >= survey.base.updated_at);

        let listed: Vec<Survey> = remote.list(&actor(), &ListQuery::default()).await.unwrap();
        assert_eq!(listed[0].title, "Pulse v2");
    }

    #[tokio::test]
    async fn test_other_actor_cannot_update() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        let survey = remote
            .insert(&actor(), Survey::new("Pulse".to_string()))
            .await
            .unwrap();
        let err = remote.update(&Actor::new("bob"), survey).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_soft_delete_cascades() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        let survey = remote
            .insert(&actor(), Survey::new("Pulse".to_string()))
            .await
            .unwrap();
        remote
            .insert(&actor(), SurveyResponse::new(survey.base.id))
            .await
            .unwrap();

        RemoteService::<Survey>::delete(&remote, &actor(), survey.base.id, DeleteMode::Soft)
            .await
            .unwrap();

        let responses: Vec<SurveyResponse> =
            remote.list(&actor(), &ListQuery::default()).await.unwrap();
        assert!(responses.is_empty());

        let with_deleted = ListQuery {
            include_deleted: true,
            ..ListQuery::default()
        };
        let responses: Vec<SurveyResponse> = remote.list(&actor(), &with_deleted).await.unwrap();
        assert_eq!(responses.len(), 1);

        let again = RemoteService::<Survey>::delete(&remote, &actor(), survey.base.id, DeleteMode::Soft).await;
        assert!(matches!(again, Err(RemoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_hard_delete_cascades() {
        let remote = SqliteRemote::open_in_memory().unwrap();
        let survey = remote
            .insert(&actor(), Survey::new("Pulse".to_string()))
            .await
            .unwrap();
        remote
            .insert(&actor(), SurveyResponse::new(survey.base.id))
            .await
            .unwrap();

        RemoteService::<Survey>::delete(&remote, &actor(), survey.base.id, DeleteMode::Hard)
            .await
            .unwrap();

        let with_deleted = ListQuery {
            include_deleted: true,
            ..ListQuery::default()
        };
        let responses: Vec<SurveyResponse> = remote.list(&actor(), &with_deleted).await.unwrap();
        assert!(responses.is_empty());
    }
}
