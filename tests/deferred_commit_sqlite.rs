#![cfg(feature = "sqlite")]

use std::collections::BTreeMap;

use sql_repository::prelude::*;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

struct Event {
    kind: String,
    payload: serde_json::Value,
}

impl FromRow for Event {
    fn from_row(row: &CustomDbRow) -> Result<Self, SqlRepoError> {
        Ok(Event {
            kind: row.try_get("kind")?,
            payload: row.try_get("payload")?,
        })
    }
}

impl Model for Event {
    const TABLE: &'static str = "events";
    const ID_COLUMN: &'static str = "event_id";

    fn values(&self) -> Vec<(&'static str, RowValues)> {
        vec![
            ("kind", self.kind.as_str().into()),
            ("payload", self.payload.clone().into()),
        ]
    }
}

/// Inserts a row whose returned id is NULL.
struct Unkeyed;

impl FromRow for Unkeyed {
    fn from_row(_row: &CustomDbRow) -> Result<Self, SqlRepoError> {
        Ok(Unkeyed)
    }
}

impl Model for Unkeyed {
    const TABLE: &'static str = "loose";

    fn values(&self) -> Vec<(&'static str, RowValues)> {
        vec![("note", "orphan".into())]
    }
}

fn event(kind: &str) -> Event {
    Event {
        kind: kind.to_string(),
        payload: serde_json::json!({ "kind": kind }),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn setup(dir: &TempDir) -> Result<Repository<Event, i64>, SqlRepoError> {
    init_tracing();
    let path = dir.path().join("events.db");
    let pool = RepoConfig::from_json_str(
        &serde_json::json!({
            "backend": "sqlite",
            "path": path.to_string_lossy(),
            "max_size": 3,
        })
        .to_string(),
    )?
    .connect()
    .await?;
    let mut conn = pool.checkout().await?;
    conn.execute_batch(
        "CREATE TABLE events (
            event_id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            payload TEXT
        );
        CREATE TABLE loose (id TEXT, note TEXT);",
    )
    .await?;
    Ok(Repository::new(pool))
}

const COUNT: &str = "SELECT COUNT(*) FROM events";

#[test]
fn deferred_insert_is_invisible_until_commit() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let rt = Runtime::new()?;
    rt.block_on(async {
        let repo = setup(&dir).await?;

        let outcome = repo.insert_tx(&event("created"), CommitMode::Deferred).await?;
        assert!(outcome.is_pending());
        assert_eq!(*outcome.value(), 1);
        assert_eq!(repo.count(COUNT, &[]).await?, 0);

        assert_eq!(outcome.commit().await?, 1);
        assert_eq!(repo.count(COUNT, &[]).await?, 1);

        let stored = repo
            .select_by("SELECT kind, payload FROM events WHERE event_id = ?1", &[RowValues::Int(1)])
            .await?;
        assert_eq!(stored.kind, "created");
        assert_eq!(stored.payload["kind"], "created");

        Ok::<(), SqlRepoError>(())
    })?;
    Ok(())
}

#[test]
fn rolled_back_and_dropped_writes_never_appear() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let rt = Runtime::new()?;
    rt.block_on(async {
        let repo = setup(&dir).await?;

        let outcome = repo.insert_tx(&event("discarded"), CommitMode::Deferred).await?;
        let id = outcome.rollback().await?;
        assert_eq!(id, 1);
        assert_eq!(repo.count(COUNT, &[]).await?, 0);

        let outcome = repo.insert_tx(&event("abandoned"), CommitMode::Deferred).await?;
        drop(outcome);
        assert_eq!(repo.count(COUNT, &[]).await?, 0);

        // The connection behind the dropped transaction is usable again.
        for kind in ["a", "b", "c", "d"] {
            let _ = repo
                .insert_tx(&event(kind), CommitMode::Immediate)
                .await?
                .into_value();
        }
        assert_eq!(repo.count(COUNT, &[]).await?, 4);

        Ok::<(), SqlRepoError>(())
    })?;
    Ok(())
}

#[test]
fn deferred_transaction_runs_further_statements() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let rt = Runtime::new()?;
    rt.block_on(async {
        let repo = setup(&dir).await?;
        let id = repo
            .insert_tx(&event("draft"), CommitMode::Immediate)
            .await?
            .into_value();

        let mut values = BTreeMap::new();
        values.insert("kind".to_string(), RowValues::from("published"));
        let mut outcome = repo
            .update_tx(
                "events",
                &values,
                "event_id = ?1",
                &[RowValues::Int(id)],
                CommitMode::Deferred,
            )
            .await?;
        assert_eq!(*outcome.value(), 1);

        let tx = outcome.tx_mut().expect("deferred outcome keeps its transaction");
        let inserted = tx
            .query("INSERT INTO events (kind, payload) VALUES (?1, NULL)")
            .params(&[RowValues::from("audit")])
            .dml()
            .await?;
        assert_eq!(inserted, 1);

        assert_eq!(repo.count(COUNT, &[]).await?, 1);
        let (rows, tx) = outcome.into_parts();
        assert_eq!(rows, 1);
        tx.expect("still pending").commit().await?;
        assert_eq!(repo.count(COUNT, &[]).await?, 2);

        let published = repo
            .count("SELECT COUNT(*) FROM events WHERE kind = ?1", &[RowValues::from("published")])
            .await?;
        assert_eq!(published, 1);

        Ok::<(), SqlRepoError>(())
    })?;
    Ok(())
}

#[test]
fn failed_writes_roll_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let rt = Runtime::new()?;
    rt.block_on(async {
        let repo = setup(&dir).await?;

        let loose: Repository<Unkeyed, String> = Repository::new(repo.pool().clone());
        let err = loose
            .insert_tx(&Unkeyed, CommitMode::Immediate)
            .await
            .unwrap_err();
        assert!(matches!(err, SqlRepoError::MissingReturnedId(ref table) if table == "loose"));
        assert_eq!(loose.count("SELECT COUNT(*) FROM loose", &[]).await?, 0);

        let id = repo
            .insert_tx(
                &Event {
                    kind: "x".into(),
                    payload: serde_json::Value::Null,
                },
                CommitMode::Immediate,
            )
            .await?
            .into_value();

        let mut values = BTreeMap::new();
        values.insert("kind".to_string(), RowValues::Null);
        let err = repo
            .update_tx(
                "events",
                &values,
                "event_id = ?1",
                &[RowValues::Int(id)],
                CommitMode::Deferred,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SqlRepoError::SqliteError(_)));

        // Nothing is left open on any pooled connection.
        for kind in ["y", "z"] {
            let _ = repo
                .insert_tx(&event(kind), CommitMode::Immediate)
                .await?
                .into_value();
        }
        assert_eq!(repo.count(COUNT, &[]).await?, 3);

        Ok::<(), SqlRepoError>(())
    })?;
    Ok(())
}
