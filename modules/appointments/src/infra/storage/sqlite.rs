//! SQLite-backed document collection.
//!
//! Documents are kept as JSON text in one table per collection. Filters are
//! compiled to `json_extract` predicates with every path and value bound as a
//! parameter; only the validated table name is interpolated.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::contract::model::{Document, INTERNAL_ID_FIELD};
use crate::domain::query::{CmpOp, Filter, FindOptions, Order};
use crate::domain::repo::AppointmentsRepository;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Pool settings for [`SqliteAppointmentsRepository::connect`].
#[derive(Debug, Clone, Default)]
pub struct SqliteOptions {
    pub max_conns: Option<u32>,
    pub busy_timeout_ms: Option<u64>,
    /// Create missing parent directories of a file database.
    pub create_dirs: bool,
}

pub struct SqliteAppointmentsRepository {
    pool: SqlitePool,
    table: String,
}

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

/// Collection names become table names, so only plain identifiers pass.
pub fn validate_collection_name(name: &str) -> anyhow::Result<()> {
    let pattern = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$")?;
    if !pattern.is_match(name) {
        bail!("invalid collection name '{name}': expected [A-Za-z_][A-Za-z0-9_]*, at most 63 chars");
    }
    Ok(())
}

impl SqliteAppointmentsRepository {
    /// Open (or create) the database behind `dsn` and make sure the
    /// collection table exists.
    pub async fn connect(dsn: &str, collection: &str, opts: SqliteOptions) -> anyhow::Result<Self> {
        validate_collection_name(collection)?;
        let memory = is_memory_dsn(dsn);

        let busy_timeout = Duration::from_millis(opts.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS));
        let mut connect_opts = SqliteConnectOptions::from_str(dsn)
            .with_context(|| format!("invalid sqlite dsn '{dsn}'"))?
            .create_if_missing(true)
            .busy_timeout(busy_timeout);
        connect_opts = if memory {
            connect_opts.journal_mode(SqliteJournalMode::Delete)
        } else {
            connect_opts
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        if !memory && opts.create_dirs {
            if let Some(parent) = connect_opts.get_filename().parent() {
                ensure_dir(parent)?;
            }
        }

        // A private in-memory database lives only as long as its connection.
        let pool_opts = if memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(opts.max_conns.unwrap_or(10))
        };

        let pool = pool_opts
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("failed to open sqlite database '{dsn}'"))?;
        info!(dsn, collection, "Connected to SQLite document store");
        Self::with_pool(pool, collection).await
    }

    /// Wrap an existing pool. Creates the collection table if missing.
    pub async fn with_pool(pool: SqlitePool, collection: &str) -> anyhow::Result<Self> {
        validate_collection_name(collection)?;
        let repo = Self {
            pool,
            table: collection.to_string(),
        };
        repo.ensure_table().await?;
        Ok(repo)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_table(&self) -> anyhow::Result<()> {
        let ddl = format!(
            r#"CREATE TABLE IF NOT EXISTS "{}" (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_id TEXT NOT NULL UNIQUE,
                body TEXT NOT NULL
            )"#,
            self.table
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to create collection table '{}'", self.table))?;
        Ok(())
    }

    /// Take the write lock up front so a concurrent commit cannot invalidate
    /// the lookup snapshot; lock waits go through the busy timeout.
    async fn begin_write(&self) -> anyhow::Result<sqlx::Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("begin immediate failed")
    }

    fn select_sql(&self, filter: &Compiled, order: &Compiled, limit_one: bool) -> String {
        let mut sql = format!(
            r#"SELECT seq, doc_id, body FROM "{}" WHERE {} ORDER BY {}seq ASC"#,
            self.table, filter.sql, order.sql
        );
        if limit_one {
            sql.push_str(" LIMIT 1");
        }
        sql
    }
}

fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create database directory {}", dir.display()))
}

// --- filter compilation ---

#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Text(String),
    Int(i64),
    Real(f64),
}

#[derive(Debug, Default)]
struct Compiled {
    sql: String,
    binds: Vec<Bind>,
}

fn json_path(path: &str) -> Bind {
    Bind::Text(format!("$.{path}"))
}

fn compile_filter(filter: &Filter) -> anyhow::Result<Compiled> {
    let mut out = Compiled::default();
    push_filter(filter, &mut out)?;
    Ok(out)
}

fn push_filter(filter: &Filter, out: &mut Compiled) -> anyhow::Result<()> {
    match filter {
        Filter::All => out.sql.push('1'),
        Filter::And(parts) if parts.is_empty() => out.sql.push('1'),
        Filter::And(parts) => {
            out.sql.push('(');
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.sql.push_str(" AND ");
                }
                push_filter(part, out)?;
            }
            out.sql.push(')');
        }
        Filter::Cmp { path, op, value } => {
            let sql_op = match op {
                CmpOp::Eq => "=",
                CmpOp::Gte => ">=",
                CmpOp::Lte => "<=",
            };
            // Guard on the JSON type so mixed kinds never compare.
            let (types, bound) = match value {
                Value::String(s) => ("'text'", Bind::Text(s.clone())),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => ("'integer', 'real'", Bind::Int(i)),
                    None => match n.as_f64() {
                        Some(f) => ("'integer', 'real'", Bind::Real(f)),
                        None => bail!("unsupported numeric filter value {n}"),
                    },
                },
                Value::Bool(b) => ("'true', 'false'", Bind::Int(i64::from(*b))),
                other => bail!("unsupported filter value {other} for '{path}'"),
            };
            out.sql.push_str(&format!(
                "(json_type(body, ?) IN ({types}) AND json_extract(body, ?) {sql_op} ?)"
            ));
            out.binds.push(json_path(path));
            out.binds.push(json_path(path));
            out.binds.push(bound);
        }
    }
    Ok(())
}

/// Sort keys rendered with a trailing comma, ready to be followed by `seq`.
/// SQLite orders NULL (missing) before any value in ascending order.
fn compile_order(options: &FindOptions) -> Compiled {
    let mut out = Compiled::default();
    for spec in &options.sort {
        let dir = match spec.order {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        };
        out.sql.push_str(&format!("json_extract(body, ?) {dir}, "));
        out.binds.push(json_path(&spec.field));
    }
    out
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    binds: &[Bind],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for bind in binds {
        query = match bind {
            Bind::Text(s) => query.bind(s.clone()),
            Bind::Int(i) => query.bind(*i),
            Bind::Real(f) => query.bind(*f),
        };
    }
    query
}

fn row_to_document(row: &SqliteRow) -> anyhow::Result<Document> {
    let doc_id: String = row.try_get("doc_id")?;
    let body: String = row.try_get("body")?;
    let mut doc: Document = serde_json::from_str(&body)
        .with_context(|| format!("stored document {doc_id} is not a JSON object"))?;
    doc.insert(INTERNAL_ID_FIELD.to_string(), Value::String(doc_id));
    Ok(doc)
}

/// Split a document into its identity and stored body.
fn split_identity(mut doc: Document) -> anyhow::Result<(Option<String>, String)> {
    let id = match doc.remove(INTERNAL_ID_FIELD) {
        Some(Value::String(id)) => Some(id),
        Some(other) => bail!("document identity must be a string, got {other}"),
        None => None,
    };
    Ok((id, serde_json::to_string(&doc)?))
}

#[async_trait]
impl AppointmentsRepository for SqliteAppointmentsRepository {
    async fn insert(&self, doc: Document) -> anyhow::Result<String> {
        let (id, body) = split_identity(doc)?;
        let id = id.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let sql = format!(r#"INSERT INTO "{}" (doc_id, body) VALUES (?, ?)"#, self.table);
        sqlx::query(&sql)
            .bind(&id)
            .bind(body)
            .execute(&self.pool)
            .await
            .context("insert failed")?;
        Ok(id)
    }

    async fn find_one(&self, filter: &Filter) -> anyhow::Result<Option<Document>> {
        let compiled = compile_filter(filter)?;
        let order = Compiled::default();
        let sql = self.select_sql(&compiled, &order, true);
        let row = bind_all(sqlx::query(&sql), &compiled.binds)
            .fetch_optional(&self.pool)
            .await
            .context("find_one failed")?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn find_many(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> anyhow::Result<Vec<Document>> {
        let compiled = compile_filter(filter)?;
        let order = compile_order(options);
        let sql = self.select_sql(&compiled, &order, false);
        debug!(%sql, "find_many");
        let query = bind_all(sqlx::query(&sql), &compiled.binds);
        let rows = bind_all(query, &order.binds)
            .fetch_all(&self.pool)
            .await
            .context("find_many failed")?;
        rows.iter().map(row_to_document).collect()
    }

    async fn find_one_and_replace(
        &self,
        filter: &Filter,
        doc: Document,
    ) -> anyhow::Result<Option<Document>> {
        let compiled = compile_filter(filter)?;
        let order = Compiled::default();
        let select = self.select_sql(&compiled, &order, true);
        let (_, body) = split_identity(doc)?;

        let mut tx = self.begin_write().await?;
        let row = bind_all(sqlx::query(&select), &compiled.binds)
            .fetch_optional(&mut *tx)
            .await
            .context("find_one_and_replace lookup failed")?;
        let Some(row) = row else {
            tx.rollback().await.context("rollback failed")?;
            return Ok(None);
        };
        let seq: i64 = row.try_get("seq")?;
        let previous = row_to_document(&row)?;

        let update = format!(r#"UPDATE "{}" SET body = ? WHERE seq = ?"#, self.table);
        sqlx::query(&update)
            .bind(body)
            .bind(seq)
            .execute(&mut *tx)
            .await
            .context("find_one_and_replace update failed")?;
        tx.commit().await.context("commit failed")?;
        Ok(Some(previous))
    }

    async fn find_one_and_delete(&self, filter: &Filter) -> anyhow::Result<Option<Document>> {
        let compiled = compile_filter(filter)?;
        let order = Compiled::default();
        let select = self.select_sql(&compiled, &order, true);

        let mut tx = self.begin_write().await?;
        let row = bind_all(sqlx::query(&select), &compiled.binds)
            .fetch_optional(&mut *tx)
            .await
            .context("find_one_and_delete lookup failed")?;
        let Some(row) = row else {
            tx.rollback().await.context("rollback failed")?;
            return Ok(None);
        };
        let seq: i64 = row.try_get("seq")?;
        let removed = row_to_document(&row)?;

        let delete = format!(r#"DELETE FROM "{}" WHERE seq = ?"#, self.table);
        sqlx::query(&delete)
            .bind(seq)
            .execute(&mut *tx)
            .await
            .context("find_one_and_delete delete failed")?;
        tx.commit().await.context("commit failed")?;
        Ok(Some(removed))
    }

    async fn delete_many(&self, filter: &Filter) -> anyhow::Result<u64> {
        let compiled = compile_filter(filter)?;
        let sql = format!(r#"DELETE FROM "{}" WHERE {}"#, self.table, compiled.sql);
        let result = bind_all(sqlx::query(&sql), &compiled.binds)
            .execute(&self.pool)
            .await
            .context("delete_many failed")?;
        Ok(result.rows_affected())
    }
}
