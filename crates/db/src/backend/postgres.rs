//! PostgreSQL backend: one JSONB row per document.
//!
//! Commits run in a `SERIALIZABLE` transaction. Preconditions are checked
//! with `SELECT ... FOR UPDATE`, and serialization failures, deadlocks and
//! duplicate inserts surface as [`DbError::Conflict`] so callers retry.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::batch::MAX_BATCH_WRITES;
use crate::document::{Direction, Document, Precondition, Query, Snapshot, Write};
use crate::error::DbError;
use crate::store::DocumentStore;

pub type DbPool = PgPool;

/// SQLSTATE codes that mean "another writer won, try again".
const RETRYABLE_CODES: [&str; 3] = [
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "23505", // unique_violation
];

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify connectivity.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the backing `documents` schema.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// A [`DocumentStore`] persisted in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_commit_error(err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(db) = &err {
        if let Some(code) = db.code() {
            if RETRYABLE_CODES.contains(&code.as_ref()) {
                return DbError::Conflict(db.message().to_string());
            }
        }
    }
    DbError::Database(err)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, DbError> {
        let row: Option<(Json<Document>, i64)> = sqlx::query_as(
            "SELECT data, version FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(Json(data), version)| Snapshot {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            version: version as u64,
        }))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Snapshot>, DbError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, data, version FROM documents WHERE collection = ");
        builder.push_bind(&query.collection);

        for filter in &query.filters {
            // Values of a different JSON type never match.
            builder.push(" AND jsonb_typeof(data -> ");
            builder.push_bind(&filter.field);
            builder.push(") = jsonb_typeof(");
            builder.push_bind(Json(filter.value.clone()));
            builder.push(") AND data -> ");
            builder.push_bind(&filter.field);
            builder.push(" ");
            builder.push(filter.op.sql());
            builder.push(" ");
            builder.push_bind(Json(filter.value.clone()));
        }

        match &query.order_by {
            Some((field, direction)) => {
                builder.push(" AND data -> ");
                builder.push_bind(field);
                builder.push(" IS NOT NULL ORDER BY data -> ");
                builder.push_bind(field);
                builder.push(match direction {
                    Direction::Asc => " ASC",
                    Direction::Desc => " DESC",
                });
                builder.push(", id ASC");
            }
            None => {
                builder.push(" ORDER BY id ASC");
            }
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }

        let rows: Vec<(String, Json<Document>, i64)> =
            builder.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(id, Json(data), version)| Snapshot {
                collection: query.collection.clone(),
                id,
                data,
                version: version as u64,
            })
            .collect())
    }

    async fn commit(
        &self,
        preconditions: Vec<Precondition>,
        writes: Vec<Write>,
    ) -> Result<(), DbError> {
        if writes.len() > MAX_BATCH_WRITES {
            return Err(DbError::BatchTooLarge(writes.len()));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_commit_error)?;

        for pre in &preconditions {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
            )
            .bind(&pre.collection)
            .bind(&pre.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_commit_error)?;

            if current.map(|v| v as u64) != pre.expected_version {
                return Err(DbError::Conflict(format!(
                    "{}/{} was modified concurrently",
                    pre.collection, pre.id
                )));
            }
        }

        for write in writes {
            match write {
                Write::Set {
                    collection,
                    id,
                    data,
                    merge,
                } => {
                    let sql = if merge {
                        "INSERT INTO documents (collection, id, data, version) \
                         VALUES ($1, $2, $3, nextval('document_versions')) \
                         ON CONFLICT (collection, id) DO UPDATE \
                         SET data = documents.data || EXCLUDED.data, \
                             version = EXCLUDED.version, updated_at = NOW()"
                    } else {
                        "INSERT INTO documents (collection, id, data, version) \
                         VALUES ($1, $2, $3, nextval('document_versions')) \
                         ON CONFLICT (collection, id) DO UPDATE \
                         SET data = EXCLUDED.data, \
                             version = EXCLUDED.version, updated_at = NOW()"
                    };
                    sqlx::query(sql)
                        .bind(&collection)
                        .bind(&id)
                        .bind(Json(Value::Object(data)))
                        .execute(&mut *tx)
                        .await
                        .map_err(map_commit_error)?;
                }
                Write::Update {
                    collection,
                    id,
                    fields,
                } => {
                    let result = sqlx::query(
                        "UPDATE documents \
                         SET data = data || $3, version = nextval('document_versions'), \
                             updated_at = NOW() \
                         WHERE collection = $1 AND id = $2",
                    )
                    .bind(&collection)
                    .bind(&id)
                    .bind(Json(Value::Object(fields)))
                    .execute(&mut *tx)
                    .await
                    .map_err(map_commit_error)?;

                    if result.rows_affected() == 0 {
                        return Err(DbError::NotFound { collection, id });
                    }
                }
                Write::Delete { collection, id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(&collection)
                        .bind(&id)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_commit_error)?;
                }
            }
        }

        tx.commit().await.map_err(map_commit_error)?;
        Ok(())
    }
}
