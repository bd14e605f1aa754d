//! PostgreSQL store over a bounded `PgPool`.

use super::{Record, RowChange, Store, UpdateOutcome, Values};
use crate::bootstrap::{Seed, SeedReport};
use crate::config::{ColumnInfo, ResolvedEntity, ResolvedModel, ResolvedRelation};
use crate::error::{AppError, ConfigError};
use crate::sql::{self, bind_all, QueryBuf};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{ConnectOptions, PgConnection, PgPool, Row};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

fn record_from_row(row: &PgRow, columns: &[ColumnInfo]) -> Result<Record, AppError> {
    let id: i64 = row.try_get("id")?;
    let mut fields = Values::new();
    for c in columns {
        let v: Option<String> = row.try_get(c.name.as_str())?;
        fields.insert(c.name.clone(), v);
    }
    Ok(Record { id, fields })
}

async fn execute(conn: &mut PgConnection, q: &QueryBuf) -> Result<u64, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let done = bind_all(sqlx::query(&q.sql), &q.params).execute(&mut *conn).await?;
    Ok(done.rows_affected())
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn reset(&self, model: &ResolvedModel, seed: &Seed) -> Result<SeedReport, AppError> {
        let mut tx = self.pool.begin().await?;
        for stmt in sql::drop_tables(model) {
            tracing::debug!(sql = %stmt, "ddl");
            sqlx::query(&stmt).execute(&mut *tx).await?;
        }
        for entity in &model.entities {
            let stmt = sql::create_entity_table(entity);
            tracing::debug!(sql = %stmt, "ddl");
            sqlx::query(&stmt).execute(&mut *tx).await?;
        }
        for link in &model.links {
            let stmt = sql::create_link_table(link);
            tracing::debug!(sql = %stmt, "ddl");
            sqlx::query(&stmt).execute(&mut *tx).await?;
        }

        let mut report = SeedReport::default();
        for entity in &model.entities {
            for values in seed.rows(&entity.table_name) {
                execute(&mut tx, &sql::insert(entity, values)).await?;
                report.rows += 1;
            }
        }
        for link in &model.links {
            for (left, right) in seed.pairs(link)? {
                execute(&mut tx, &sql::insert_link(link, left, right)).await?;
                report.links += 1;
            }
        }
        tx.commit().await?;
        Ok(report)
    }

    async fn insert(&self, entity: &ResolvedEntity, values: &Values) -> Result<i64, AppError> {
        let q = sql::insert(entity, values);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params).fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>("id")?)
    }

    async fn fetch_one(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Record>, AppError> {
        let q = sql::select_by_id(entity, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params).fetch_optional(&self.pool).await?;
        row.map(|r| record_from_row(&r, &entity.columns)).transpose()
    }

    async fn fetch_all(&self, entity: &ResolvedEntity) -> Result<Vec<Record>, AppError> {
        let q = sql::select_list(entity);
        tracing::debug!(sql = %q.sql, "query");
        let rows = sqlx::query(&q.sql).fetch_all(&self.pool).await?;
        rows.iter().map(|r| record_from_row(r, &entity.columns)).collect()
    }

    async fn update(&self, entity: &ResolvedEntity, id: i64, change: &RowChange) -> Result<UpdateOutcome, AppError> {
        let mut outcome = UpdateOutcome::default();
        let mut tx = self.pool.begin().await?;
        if let Some(q) = sql::update(entity, id, &change.values) {
            if execute(&mut tx, &q).await? == 0 {
                return Err(AppError::NotFound(format!("{} {}", entity.table_name, id)));
            }
            outcome.updated = true;
        }
        if let (Some(other_id), Some(relation)) = (change.link_to, entity.relation.as_ref()) {
            let inserted = execute(&mut tx, &sql::link_upsert(relation, id, other_id)).await?;
            outcome.linked = Some(inserted == 1);
        }
        tx.commit().await?;
        Ok(outcome)
    }

    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(execute(&mut conn, &sql::delete(entity, id)).await? > 0)
    }

    async fn link(&self, relation: &ResolvedRelation, self_id: i64, other_id: i64) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(execute(&mut conn, &sql::link_upsert(relation, self_id, other_id)).await? == 1)
    }

    async fn count_related(&self, relation: &ResolvedRelation, id: i64) -> Result<i64, AppError> {
        let q = sql::count_related(relation, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params).fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn list_related(&self, relation: &ResolvedRelation, id: i64) -> Result<Vec<Record>, AppError> {
        let q = sql::select_related(relation, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params).fetch_all(&self.pool).await?;
        rows.iter().map(|r| record_from_row(r, &relation.other_columns)).collect()
    }
}

/// Target database name from `database_url`, plus options for the `postgres` maintenance
/// database on the same server. The name is None when the URL names no database.
fn admin_options(database_url: &str) -> Result<(PgConnectOptions, Option<String>), ConfigError> {
    let opts = PgConnectOptions::from_str(database_url)
        .map_err(|e| ConfigError::Validation(format!("invalid DATABASE_URL: {}", e)))?;
    let db_name = opts.get_database().map(str::to_string);
    Ok((opts.database("postgres"), db_name))
}

/// Create the database named in `database_url` when it does not exist yet. Call before
/// creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin, db_name) = admin_options(database_url)?;
    let Some(db_name) = db_name.filter(|n| n != "postgres") else {
        return Ok(());
    };
    let mut conn: PgConnection = admin.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_survives_slashes_in_query() {
        let (admin, name) =
            admin_options("postgres://u:p@db:5432/bookstore?sslmode=prefer&sslrootcert=/etc/ssl/ca.pem").unwrap();
        assert_eq!(name.as_deref(), Some("bookstore"));
        assert_eq!(admin.get_database(), Some("postgres"));
        assert_eq!(admin.get_host(), "db");
        assert_eq!(admin.get_port(), 5432);
        assert_eq!(admin.get_username(), "u");
    }

    #[test]
    fn url_without_database_targets_maintenance_db() {
        let (admin, name) = admin_options("postgres://u@db:5432").unwrap();
        assert_ne!(name.as_deref(), Some("u@db:5432"));
        assert_eq!(admin.get_database(), Some("postgres"));
        assert_eq!(admin.get_host(), "db");
    }

    #[test]
    fn malformed_url_is_a_config_error() {
        let err = admin_options("not a url").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(matches!(AppError::from(err), AppError::Config(_)));
    }
}
