#![cfg(feature = "postgres")]

use std::collections::BTreeMap;
use std::env;

use chrono::NaiveDateTime;
use sql_repository::prelude::*;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq)]
struct Order {
    id: i32,
    customer: String,
    quantity: i32,
    placed_at: NaiveDateTime,
}

impl FromRow for Order {
    fn from_row(row: &CustomDbRow) -> Result<Self, SqlRepoError> {
        Ok(Order {
            id: row.try_get("id")?,
            customer: row.try_get("customer")?,
            quantity: row.try_get("quantity")?,
            placed_at: row.try_get("placed_at")?,
        })
    }
}

impl Model for Order {
    const TABLE: &'static str = "repo_test_orders";

    fn values(&self) -> Vec<(&'static str, RowValues)> {
        vec![
            ("customer", self.customer.as_str().into()),
            ("quantity", self.quantity.into()),
            ("placed_at", self.placed_at.into()),
        ]
    }
}

fn placed(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("valid timestamp")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Connects using `TESTING_PG_URL`; `None` skips the test.
async fn orders_pool(max_size: u32) -> Result<Option<ConfigAndPool>, SqlRepoError> {
    init_tracing();
    let Ok(url) = env::var("TESTING_PG_URL") else {
        eprintln!("TESTING_PG_URL not set; skipping postgres repository test");
        return Ok(None);
    };
    let config: tokio_postgres::Config = url
        .parse()
        .map_err(|e| SqlRepoError::ConfigError(format!("bad TESTING_PG_URL: {e}")))?;
    let pool = ConfigAndPool::postgres_builder(config)
        .max_size(max_size)
        .build()
        .await?;
    Ok(Some(pool))
}

async fn orders_repo() -> Result<Option<Repository<Order, i32>>, SqlRepoError> {
    let Some(pool) = orders_pool(3).await? else {
        return Ok(None);
    };
    let mut conn = pool.checkout().await?;
    conn.execute_batch(
        "DROP TABLE IF EXISTS repo_test_orders;
         CREATE TABLE repo_test_orders (
            id SERIAL PRIMARY KEY,
            customer TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            placed_at TIMESTAMP NOT NULL
         );",
    )
    .await?;
    Ok(Some(Repository::new(pool)))
}

#[test]
fn postgres_repository_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let Some(repo) = orders_repo().await? else {
            return Ok(());
        };
        let count = "SELECT COUNT(*) FROM repo_test_orders";

        let first = Order {
            id: 0,
            customer: "acme".into(),
            quantity: 3,
            placed_at: placed("2024-03-01 09:30:00"),
        };
        let id = repo
            .insert_tx(&first, CommitMode::Immediate)
            .await?
            .into_value();

        let stored = repo
            .select_by("SELECT * FROM repo_test_orders WHERE id = $1", &[RowValues::from(id)])
            .await?;
        assert_eq!(stored, Order { id, ..first });

        // Deferred writes stay invisible to other connections until committed.
        let pending = repo
            .insert_tx(
                &Order {
                    id: 0,
                    customer: "globex".into(),
                    quantity: 1,
                    placed_at: placed("2024-03-02 10:00:00"),
                },
                CommitMode::Deferred,
            )
            .await?;
        assert!(pending.is_pending());
        assert_eq!(repo.count(count, &[]).await?, 1);
        pending.commit().await?;
        assert_eq!(repo.count(count, &[]).await?, 2);

        let mut values = BTreeMap::new();
        values.insert("quantity".to_string(), RowValues::Int(10));
        let updated = repo
            .update_tx(
                "repo_test_orders",
                &values,
                "customer = ?1",
                &[RowValues::from("globex")],
                CommitMode::Immediate,
            )
            .await?;
        assert_eq!(updated.into_value(), 1);

        let big = repo
            .select_list(
                "SELECT * FROM repo_test_orders WHERE quantity > $1 ORDER BY id",
                &[RowValues::Int(5)],
            )
            .await?;
        assert_eq!(big.len(), 1);
        assert_eq!(big[0].customer, "globex");

        let rolled_back = repo
            .delete_tx(
                "repo_test_orders",
                "quantity > $1",
                &[RowValues::Int(0)],
                CommitMode::Deferred,
            )
            .await?;
        assert_eq!(rolled_back.rollback().await?, 2);
        assert_eq!(repo.count(count, &[]).await?, 2);

        let missing = repo
            .select_one("SELECT * FROM repo_test_orders WHERE id = $1", &[RowValues::Int(-1)])
            .await
            .unwrap_err();
        assert!(missing.is_not_found());

        // A pending transaction dropped off the runtime still rolls back before its only
        // client is checked out again.
        let Some(single_pool) = orders_pool(1).await? else {
            return Ok(());
        };
        let single: Repository<Order, i32> = Repository::new(single_pool);
        let pending = single
            .delete_tx(
                "repo_test_orders",
                "quantity > $1",
                &[RowValues::Int(0)],
                CommitMode::Deferred,
            )
            .await?;
        assert!(pending.is_pending());
        std::thread::spawn(move || drop(pending))
            .join()
            .map_err(|_| SqlRepoError::ExecutionError("drop thread panicked".into()))?;
        assert_eq!(single.count(count, &[]).await?, 2);

        let mut conn = repo.pool().checkout().await?;
        conn.execute_batch("DROP TABLE IF EXISTS repo_test_orders;")
            .await?;
        Ok::<(), SqlRepoError>(())
    })?;
    Ok(())
}
