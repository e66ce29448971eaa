use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};

use crate::application::ports::{
    ActivityStat, AuditQueryFilter, AuditRecordRepository, AuditRepositoryError,
};
use crate::domain::entities::{AuditRecord, AuditRecordDbData};
use crate::domain::value_objects::{AuditAction, Snapshot};

const COLUMNS: &str = "id, action, entity_type, entity_id, entity_name, user_id, user_email, \
     description, old_data, new_data, ip_address, user_agent, created_at";

pub struct PostgresAuditRecordRepository {
    pool: PgPool,
}

impl PostgresAuditRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the WHERE clauses shared by `query` and `count`
fn push_filters(query_builder: &mut QueryBuilder<'_, Postgres>, filter: &AuditQueryFilter) {
    if let Some(action) = &filter.action {
        query_builder.push(" AND action = ");
        query_builder.push_bind(action.as_str().to_string());
    }

    if let Some(entity_type) = &filter.entity_type {
        query_builder.push(" AND entity_type = ");
        query_builder.push_bind(entity_type.clone());
    }

    if let Some(entity_id) = filter.entity_id {
        query_builder.push(" AND entity_id = ");
        query_builder.push_bind(entity_id);
    }

    if let Some(user_id) = filter.user_id {
        query_builder.push(" AND user_id = ");
        query_builder.push_bind(user_id);
    }

    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", escape_like(term));
        query_builder.push(" AND (action ILIKE ");
        query_builder.push_bind(pattern.clone());
        query_builder.push(" OR entity_type ILIKE ");
        query_builder.push_bind(pattern.clone());
        query_builder.push(" OR description ILIKE ");
        query_builder.push_bind(pattern.clone());
        query_builder.push(" OR entity_name ILIKE ");
        query_builder.push_bind(pattern.clone());
        query_builder.push(" OR user_email ILIKE ");
        query_builder.push_bind(pattern);
        query_builder.push(")");
    }
}

/// Treat LIKE wildcards in user input literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn snapshot_column(row: &PgRow, column: &str) -> Result<Option<Snapshot>, AuditRepositoryError> {
    Ok(row
        .try_get::<Option<serde_json::Value>, _>(column)?
        .map(Snapshot::from_value))
}

fn record_from_row(row: &PgRow) -> Result<AuditRecord, AuditRepositoryError> {
    let action: String = row.try_get("action")?;
    Ok(AuditRecord::from_db(AuditRecordDbData {
        id: row.try_get("id")?,
        action: AuditAction::from(action),
        entity_type: row.try_get("entity_type")?,
        entity_id: row.try_get("entity_id")?,
        entity_name: row.try_get("entity_name")?,
        user_id: row.try_get("user_id")?,
        user_email: row.try_get("user_email")?,
        description: row.try_get("description")?,
        old_data: snapshot_column(row, "old_data")?,
        new_data: snapshot_column(row, "new_data")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        created_at: row.try_get("created_at")?,
    }))
}

#[async_trait]
impl AuditRecordRepository for PostgresAuditRecordRepository {
    async fn store(&self, record: AuditRecord) -> Result<AuditRecord, AuditRepositoryError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO activity_logs (
                action, entity_type, entity_id, entity_name, user_id, user_email,
                description, old_data, new_data, ip_address, user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(record.action().as_str())
        .bind(record.entity_type())
        .bind(record.entity_id())
        .bind(record.entity_name())
        .bind(record.user_id())
        .bind(record.user_email())
        .bind(record.description())
        .bind(record.old_data().map(Snapshot::to_value))
        .bind(record.new_data().map(Snapshot::to_value))
        .bind(record.ip_address())
        .bind(record.user_agent())
        .bind(record.created_at())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.persisted(id))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AuditRecord>, AuditRepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM activity_logs WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn query(
        &self,
        filter: &AuditQueryFilter,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<AuditRecord>, AuditRepositoryError> {
        let mut query_builder =
            QueryBuilder::new(format!("SELECT {} FROM activity_logs WHERE 1=1", COLUMNS));
        push_filters(&mut query_builder, filter);

        // Newest first; id breaks ties within one timestamp
        query_builder.push(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = limit {
            query_builder.push(" LIMIT ");
            query_builder.push_bind(limit);
        }
        if offset > 0 {
            query_builder.push(" OFFSET ");
            query_builder.push_bind(offset);
        }

        let rows = query_builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self, filter: &AuditQueryFilter) -> Result<i64, AuditRepositoryError> {
        let mut query_builder =
            QueryBuilder::new("SELECT COUNT(*) AS count FROM activity_logs WHERE 1=1");
        push_filters(&mut query_builder, filter);

        let row = query_builder.build().fetch_one(&self.pool).await?;
        Ok(row.try_get("count")?)
    }

    async fn stats(&self) -> Result<Vec<ActivityStat>, AuditRepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT action, entity_type, COUNT(*) AS count
            FROM activity_logs
            GROUP BY action, entity_type
            ORDER BY count DESC, action ASC, entity_type ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ActivityStat, AuditRepositoryError> {
                let action: String = row.try_get("action")?;
                Ok(ActivityStat {
                    action: AuditAction::from(action),
                    entity_type: row.try_get("entity_type")?,
                    count: row.try_get("count")?,
                })
            })
            .collect()
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditRepositoryError> {
        let result = sqlx::query("DELETE FROM activity_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_filters_render_expected_sql() {
        let filter = AuditQueryFilter {
            action: Some(AuditAction::Login),
            entity_type: Some("User".to_string()),
            entity_id: Some(3),
            user_id: None,
            search: Some("alice".to_string()),
        };
        let mut query_builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT 1 FROM activity_logs WHERE 1=1");
        push_filters(&mut query_builder, &filter);

        let sql = query_builder.sql();
        assert!(sql.contains("AND action = $1"));
        assert!(sql.contains("AND entity_type = $2"));
        assert!(sql.contains("AND entity_id = $3"));
        assert!(!sql.contains("user_id"));
        assert!(sql.contains("user_email ILIKE $8"));
    }
}
