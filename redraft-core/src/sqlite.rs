//! # SQLite executor
//!
//! Runner for the SQL variant. Queries run against a connection pool and come
//! back as a [`ResultTable`] with every cell rendered to text; malformed SQL
//! comes back as a structured failure carrying the database message. Also
//! owns schema introspection (the generation prompt's schema block is the
//! actual catalog DDL) and the demo seeder.

use crate::artifact::Artifact;
use crate::error::{self, Result};
use crate::outcome::{Evidence, ResultTable};
use crate::runner::ArtifactRunner;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::path::Path;

/// Rows of (product, color, price, quantity, sold_at) for the demo database
const DEMO_TRANSACTIONS: &[(&str, &str, f64, i64, &str)] = &[
    ("T-Shirt", "red", 99.0, 3, "2024-05-02"),
    ("T-Shirt", "blue", 99.0, 1, "2024-05-03"),
    ("Hoodie", "black", 299.0, 2, "2024-05-03"),
    ("Hoodie", "red", 299.0, 1, "2024-05-06"),
    ("Cap", "blue", 59.0, 4, "2024-05-08"),
    ("Cap", "green", 59.0, 2, "2024-05-09"),
    ("Sneakers", "white", 499.0, 1, "2024-05-11"),
    ("Sneakers", "red", 499.0, 2, "2024-05-12"),
    ("Backpack", "black", 199.0, 1, "2024-05-15"),
    ("Backpack", "green", 199.0, 3, "2024-05-16"),
    ("Scarf", "blue", 79.0, 2, "2024-05-18"),
    ("Scarf", "red", 79.0, 1, "2024-05-21"),
];

/// Executes SQL artifacts against a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Open (or create) a database file
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                error::io_error(format!("cannot open database {}: {}", path.display(), e))
                    .with_operation("sqlite::connect")
                    .set_source(e)
            })?;
        Ok(Self { pool })
    }

    /// Open an in-memory database.
    ///
    /// The pool is capped at one connection: every pooled connection would
    /// otherwise get its own private in-memory database and seeded tables
    /// would vanish between queries.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                error::io_error(format!("cannot open in-memory database: {}", e))
                    .with_operation("sqlite::in_memory")
                    .set_source(e)
            })?;
        Ok(Self { pool })
    }

    /// Dump the CREATE TABLE statements from the catalog.
    ///
    /// This text is the SQL variant's schema description; generation and
    /// reflection prompts embed it verbatim.
    pub async fn schema_text(&self) -> Result<String> {
        let rows = sqlx::query(
            "SELECT sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error::schema_unavailable(format!("cannot read catalog: {}", e))
                .with_operation("sqlite::schema_text")
                .set_source(e)
        })?;

        let mut statements = Vec::new();
        for row in &rows {
            if let Ok(Some(sql)) = row.try_get::<Option<String>, _>(0) {
                statements.push(sql);
            }
        }
        if statements.is_empty() {
            return Err(error::schema_unavailable("database has no tables")
                .with_operation("sqlite::schema_text"));
        }
        Ok(format!("{};", statements.join(";\n\n")))
    }

    /// Create and fill the demo `transactions` table if it is empty
    pub async fn seed_demo(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product TEXT NOT NULL,
                color TEXT NOT NULL,
                price REAL NOT NULL,
                quantity INTEGER NOT NULL,
                sold_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| seed_error(e, "create table"))?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| seed_error(e, "count rows"))?;
        if count > 0 {
            return Ok(());
        }

        for (product, color, price, quantity, sold_at) in DEMO_TRANSACTIONS {
            sqlx::query(
                "INSERT INTO transactions (product, color, price, quantity, sold_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(product)
            .bind(color)
            .bind(price)
            .bind(quantity)
            .bind(sold_at)
            .execute(&self.pool)
            .await
            .map_err(|e| seed_error(e, "insert row"))?;
        }
        Ok(())
    }
}

impl ArtifactRunner for SqliteExecutor {
    async fn execute(&self, artifact: &Artifact) -> Result<Evidence> {
        let rows = sqlx::query(&artifact.text)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error::execution_failed(e.to_string())
                    .with_operation("sqlite::execute")
                    .with_context("version", artifact.version.to_string())
                    .set_source(e)
            })?;
        Ok(Evidence::Table(rows_to_table(&rows)))
    }
}

fn seed_error(e: sqlx::Error, step: &'static str) -> redraft_error::Error {
    error::execution_failed(format!("demo seeding failed: {}", e))
        .with_operation("sqlite::seed_demo")
        .with_context("step", step)
        .set_source(e)
}

fn rows_to_table(rows: &[SqliteRow]) -> ResultTable {
    let Some(first) = rows.first() else {
        // zero rows means sqlx exposes no column metadata either
        return ResultTable::default();
    };
    let columns: Vec<String> = first
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();
    let mut table = ResultTable::new(columns);
    for row in rows {
        let cells = (0..row.columns().len())
            .map(|i| cell_text(row, i))
            .collect();
        table.push_row(cells);
    }
    table
}

/// Render one cell to text by its declared SQLite type
fn cell_text(row: &SqliteRow, index: usize) -> String {
    let Ok(value) = row.try_get_raw(index) else {
        return "?".to_string();
    };
    if value.is_null() {
        return "NULL".to_string();
    }
    let type_name = value.type_info().name().to_string();
    match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => row
            .try_get::<i64, _>(index)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| "?".to_string()),
        "REAL" | "NUMERIC" => row
            .try_get::<f64, _>(index)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| "?".to_string()),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| format!("<{} bytes>", bytes.len()))
            .unwrap_or_else(|_| "?".to_string()),
        _ => row
            .try_get::<String, _>(index)
            .unwrap_or_else(|_| "?".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    async fn seeded() -> SqliteExecutor {
        let executor = SqliteExecutor::in_memory().await.unwrap();
        executor.seed_demo().await.unwrap();
        executor
    }

    #[tokio::test]
    async fn test_schema_text_lists_tables() {
        let executor = seeded().await;
        let schema = executor.schema_text().await.unwrap();
        assert!(schema.contains("CREATE TABLE"));
        assert!(schema.contains("transactions"));
        assert!(schema.contains("color TEXT"));
    }

    #[tokio::test]
    async fn test_schema_text_empty_database() {
        let executor = SqliteExecutor::in_memory().await.unwrap();
        let err = executor.schema_text().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaUnavailable);
    }

    #[tokio::test]
    async fn test_execute_query() {
        let executor = seeded().await;
        let artifact = Artifact::draft(
            "SELECT color, SUM(price * quantity) AS total \
             FROM transactions GROUP BY color ORDER BY total DESC",
        );
        let evidence = executor.execute(&artifact).await.unwrap();
        let Evidence::Table(table) = evidence else {
            panic!("expected a table");
        };
        assert_eq!(table.columns, vec!["color", "total"]);
        assert_eq!(table.len(), 5);
        // red: 99*3 + 299*1 + 499*2 + 79*1 = 1673, the largest total
        assert_eq!(table.rows[0][0], "red");
        assert_eq!(table.rows[0][1], "1673");
    }

    #[tokio::test]
    async fn test_execute_malformed_sql() {
        let executor = seeded().await;
        let artifact = Artifact::draft("SELEC color FROM transactions");
        let err = executor.execute(&artifact).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionFailed);
        assert!(!err.message().is_empty());
    }

    #[tokio::test]
    async fn test_execute_null_cells() {
        let executor = seeded().await;
        let artifact = Artifact::draft("SELECT NULL AS missing, product FROM transactions LIMIT 1");
        let evidence = executor.execute(&artifact).await.unwrap();
        let Evidence::Table(table) = evidence else {
            panic!("expected a table");
        };
        assert_eq!(table.rows[0][0], "NULL");
    }

    #[tokio::test]
    async fn test_execute_no_rows() {
        let executor = seeded().await;
        let artifact = Artifact::draft("SELECT product FROM transactions WHERE quantity > 100");
        let evidence = executor.execute(&artifact).await.unwrap();
        let Evidence::Table(table) = evidence else {
            panic!("expected a table");
        };
        assert!(table.is_empty());
        assert_eq!(table.to_markdown(), "(empty result set)\n");
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let executor = seeded().await;
        executor.seed_demo().await.unwrap();
        let artifact = Artifact::draft("SELECT COUNT(*) AS n FROM transactions");
        let evidence = executor.execute(&artifact).await.unwrap();
        let Evidence::Table(table) = evidence else {
            panic!("expected a table");
        };
        assert_eq!(table.rows[0][0], DEMO_TRANSACTIONS.len().to_string());
    }
}
