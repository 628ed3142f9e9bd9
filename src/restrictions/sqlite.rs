//! Local SQLite restriction backend

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use uuid::Uuid;

use super::backend::RestrictionBackend;
use super::error::{RestrictionError, RestrictionResult};
use super::types::PersistedRestriction;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS restrictions (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    field TEXT,
    reason TEXT NOT NULL,
    user_id TEXT,
    user_role TEXT,
    restricted_type TEXT NOT NULL DEFAULT 'field',
    xaxis REAL NOT NULL,
    yaxis REAL NOT NULL,
    width REAL NOT NULL,
    height REAL NOT NULL,
    page_number INTEGER NOT NULL DEFAULT 1,
    created_by TEXT,
    created_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_restrictions_document ON restrictions(document_id);
"#;

#[derive(Debug, sqlx::FromRow)]
struct RestrictionRow {
    id: String,
    document_id: String,
    field: Option<String>,
    reason: String,
    user_id: Option<String>,
    user_role: Option<String>,
    restricted_type: String,
    xaxis: f64,
    yaxis: f64,
    width: f64,
    height: f64,
    page_number: i64,
    created_by: Option<String>,
    created_date: String,
}

impl From<RestrictionRow> for PersistedRestriction {
    fn from(row: RestrictionRow) -> Self {
        PersistedRestriction {
            id: Some(row.id),
            document_id: Some(row.document_id),
            field: row.field,
            reason: Some(row.reason),
            user_id: row.user_id,
            user_role: row.user_role,
            restricted_type: Some(row.restricted_type),
            xaxis: Some(row.xaxis),
            yaxis: Some(row.yaxis),
            width: Some(row.width),
            height: Some(row.height),
            page_number: Some(row.page_number as f64),
            created_by: row.created_by,
            created_date: Some(row.created_date),
        }
    }
}

/// Create a pool and make sure the schema exists
pub async fn create_pool(database_url: &str) -> RestrictionResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;
    Ok(pool)
}

pub async fn initialize_schema(pool: &SqlitePool) -> RestrictionResult<()> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

/// Restrictions stored in a local SQLite database
#[derive(Clone)]
pub struct SqliteRestrictionBackend {
    pool: SqlitePool,
}

impl SqliteRestrictionBackend {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> RestrictionResult<Self> {
        Ok(Self::new(create_pool(database_url).await?))
    }
}

#[async_trait]
impl RestrictionBackend for SqliteRestrictionBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn list(&self, document_id: &str) -> RestrictionResult<Vec<PersistedRestriction>> {
        let rows = sqlx::query_as::<_, RestrictionRow>(
            r#"
            SELECT id, document_id, field, reason, user_id, user_role, restricted_type,
                   xaxis, yaxis, width, height, page_number, created_by, created_date
            FROM restrictions
            WHERE document_id = ?
            ORDER BY page_number ASC, created_date ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PersistedRestriction::from).collect())
    }

    async fn create(
        &self,
        document_id: &str,
        record: PersistedRestriction,
    ) -> RestrictionResult<PersistedRestriction> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let page_number = record.page_number.unwrap_or(1.0).max(1.0) as i64;
        let restricted_type = record.restricted_type.clone().unwrap_or_else(|| "field".to_string());

        sqlx::query(
            r#"
            INSERT INTO restrictions (id, document_id, field, reason, user_id, user_role, restricted_type,
                                      xaxis, yaxis, width, height, page_number, created_by, created_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(document_id)
        .bind(&record.field)
        .bind(record.reason.as_deref().unwrap_or_default())
        .bind(&record.user_id)
        .bind(&record.user_role)
        .bind(&restricted_type)
        .bind(record.xaxis.unwrap_or(0.0))
        .bind(record.yaxis.unwrap_or(0.0))
        .bind(record.width.unwrap_or(0.0))
        .bind(record.height.unwrap_or(0.0))
        .bind(page_number)
        .bind(&record.created_by)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(PersistedRestriction {
            id: Some(id),
            document_id: Some(document_id.to_string()),
            restricted_type: Some(restricted_type),
            page_number: Some(page_number as f64),
            created_date: Some(now),
            ..record
        })
    }

    async fn delete(&self, document_id: &str, restriction_id: &str) -> RestrictionResult<()> {
        let result = sqlx::query("DELETE FROM restrictions WHERE id = ? AND document_id = ?")
            .bind(restriction_id)
            .bind(document_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RestrictionError::NotFound(restriction_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_backend() -> SqliteRestrictionBackend {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        initialize_schema(&pool).await.unwrap();
        SqliteRestrictionBackend::new(pool)
    }

    fn area_record() -> PersistedRestriction {
        PersistedRestriction {
            reason: Some("privacy".into()),
            user_role: Some("clerk".into()),
            restricted_type: Some("open".into()),
            xaxis: Some(150.0),
            yaxis: Some(150.0),
            width: Some(150.0),
            height: Some(30.0),
            page_number: Some(2.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_date() {
        let backend = memory_backend().await;
        let created = backend.create("doc", area_record()).await.unwrap();

        let id = created.id.clone().unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        let date = created.created_date.clone().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&date).is_ok());

        let listed = backend.list("doc").await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_document() {
        let backend = memory_backend().await;
        backend.create("a", area_record()).await.unwrap();
        backend.create("b", area_record()).await.unwrap();

        assert_eq!(backend.list("a").await.unwrap().len(), 1);
        assert!(backend.list("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = memory_backend().await;
        let created = backend.create("doc", area_record()).await.unwrap();
        let id = created.id.unwrap();

        assert!(matches!(
            backend.delete("other-doc", &id).await,
            Err(RestrictionError::NotFound(_))
        ));
        backend.delete("doc", &id).await.unwrap();
        assert!(backend.list("doc").await.unwrap().is_empty());
    }
}
