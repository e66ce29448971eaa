use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tracing::info;

use crate::application::{
    dto::{ActivityLogPage, ActivityLogQuery, DEFAULT_PER_PAGE},
    errors::QueryError,
    ports::{ActivityStat, AuditQueryFilter, AuditRecordRepository},
};
use crate::domain::{entities::AuditRecord, value_objects::AuditAction};

/// Upper bound for any single read
pub const MAX_LIMIT: i64 = 500;

/// Read side of the activity log, plus retention pruning
pub struct AuditQueryService {
    repository: Arc<dyn AuditRecordRepository>,
}

impl AuditQueryService {
    pub fn new(repository: Arc<dyn AuditRecordRepository>) -> Self {
        Self { repository }
    }

    /// Newest records, optionally narrowed to one user and/or entity type
    pub async fn recent_activity(
        &self,
        limit: i64,
        user_id: Option<i64>,
        entity_type: Option<&str>,
    ) -> Result<Vec<AuditRecord>, QueryError> {
        let filter = AuditQueryFilter {
            user_id,
            entity_type: non_blank(entity_type),
            ..Default::default()
        };
        Ok(self
            .repository
            .query(&filter, Some(clamp_limit(limit)), 0)
            .await?)
    }

    /// Full history of one entity, newest first
    pub async fn entity_activity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<AuditRecord>, QueryError> {
        let filter = AuditQueryFilter {
            entity_type: Some(entity_type.to_string()),
            entity_id: Some(entity_id),
            ..Default::default()
        };
        Ok(self.repository.query(&filter, None, 0).await?)
    }

    pub async fn user_activity(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<AuditRecord>, QueryError> {
        let filter = AuditQueryFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        Ok(self
            .repository
            .query(&filter, Some(clamp_limit(limit)), 0)
            .await?)
    }

    pub async fn activity_stats(&self) -> Result<Vec<ActivityStat>, QueryError> {
        Ok(self.repository.stats().await?)
    }

    /// Delete records created strictly more than `days_to_keep` days ago
    pub async fn clean_old_logs(&self, days_to_keep: i64) -> Result<u64, QueryError> {
        if days_to_keep < 1 {
            return Err(QueryError::InvalidRequest(format!(
                "days_to_keep must be at least 1, got {}",
                days_to_keep
            )));
        }
        let cutoff = TimeDelta::try_days(days_to_keep)
            .and_then(|keep| Utc::now().checked_sub_signed(keep))
            .ok_or_else(|| {
                QueryError::InvalidRequest(format!("days_to_keep out of range: {}", days_to_keep))
            })?;

        let deleted = self.repository.delete_older_than(cutoff).await?;
        info!(
            "Pruned {} activity records older than {} days",
            deleted, days_to_keep
        );
        Ok(deleted)
    }

    /// Case-insensitive substring search; a blank term matches everything
    pub async fn search_logs(&self, term: &str, limit: i64) -> Result<Vec<AuditRecord>, QueryError> {
        let filter = AuditQueryFilter {
            search: non_blank(Some(term)),
            ..Default::default()
        };
        Ok(self
            .repository
            .query(&filter, Some(clamp_limit(limit)), 0)
            .await?)
    }

    /// Paged, filtered listing for the admin activity screen
    pub async fn browse(&self, query: ActivityLogQuery) -> Result<ActivityLogPage, QueryError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_LIMIT as u32);
        let filter = AuditQueryFilter {
            action: non_blank(query.action.as_deref()).map(AuditAction::from),
            entity_type: non_blank(query.entity_type.as_deref()),
            search: non_blank(query.search.as_deref()),
            ..Default::default()
        };

        let offset = i64::from(page - 1) * i64::from(per_page);
        let records = self
            .repository
            .query(&filter, Some(i64::from(per_page)), offset)
            .await?;
        let total = self.repository.count(&filter).await?;
        let total_pages = u32::try_from((total + i64::from(per_page) - 1) / i64::from(per_page))
            .unwrap_or(u32::MAX);

        Ok(ActivityLogPage {
            records: records.into_iter().map(Into::into).collect(),
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn find(&self, id: i64) -> Result<Option<AuditRecord>, QueryError> {
        Ok(self.repository.find_by_id(id).await?)
    }
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LIMIT)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{AuditRepositoryError, MockAuditRecordRepository};
    use mockall::predicate::*;

    fn record(action: AuditAction, entity_type: &str, id: i64) -> AuditRecord {
        AuditRecord::builder(action, entity_type).build().persisted(id)
    }

    mod read_tests {
        use super::*;

        #[tokio::test]
        async fn test_recent_activity_clamps_limit() {
            let mut mock_repo = MockAuditRecordRepository::new();
            mock_repo
                .expect_query()
                .with(
                    function(|f: &AuditQueryFilter| {
                        f.user_id == Some(3) && f.entity_type.as_deref() == Some("Hotel")
                    }),
                    eq(Some(MAX_LIMIT)),
                    eq(0),
                )
                .times(1)
                .returning(|_, _, _| Ok(vec![]));

            let service = AuditQueryService::new(Arc::new(mock_repo));
            let result = service.recent_activity(10_000, Some(3), Some("Hotel")).await;

            assert!(result.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_zero_limit_becomes_one() {
            let mut mock_repo = MockAuditRecordRepository::new();
            mock_repo
                .expect_query()
                .with(always(), eq(Some(1)), eq(0))
                .times(1)
                .returning(|_, _, _| Ok(vec![]));

            let service = AuditQueryService::new(Arc::new(mock_repo));
            assert!(service.user_activity(5, 0).await.is_ok());
        }

        #[tokio::test]
        async fn test_entity_activity_is_unbounded() {
            let mut mock_repo = MockAuditRecordRepository::new();
            mock_repo
                .expect_query()
                .with(
                    function(|f: &AuditQueryFilter| {
                        f.entity_type.as_deref() == Some("Destination") && f.entity_id == Some(12)
                    }),
                    eq(None),
                    eq(0),
                )
                .times(1)
                .returning(|_, _, _| {
                    Ok(vec![
                        record(AuditAction::Delete, "Destination", 3),
                        record(AuditAction::Create, "Destination", 1),
                    ])
                });

            let service = AuditQueryService::new(Arc::new(mock_repo));
            let history = service.entity_activity("Destination", 12).await.unwrap();

            assert_eq!(history.len(), 2);
        }

        #[tokio::test]
        async fn test_blank_search_term_is_no_filter() {
            let mut mock_repo = MockAuditRecordRepository::new();
            mock_repo
                .expect_query()
                .with(
                    function(|f: &AuditQueryFilter| f.search.is_none()),
                    eq(Some(50)),
                    eq(0),
                )
                .times(1)
                .returning(|_, _, _| Ok(vec![]));

            let service = AuditQueryService::new(Arc::new(mock_repo));
            assert!(service.search_logs("   ", 50).await.is_ok());
        }

        #[tokio::test]
        async fn test_repository_error_propagates() {
            let mut mock_repo = MockAuditRecordRepository::new();
            mock_repo
                .expect_stats()
                .times(1)
                .returning(|| Err(AuditRepositoryError::Database(sqlx::Error::PoolTimedOut)));

            let service = AuditQueryService::new(Arc::new(mock_repo));
            let result = service.activity_stats().await;

            assert!(matches!(result, Err(QueryError::Repository(_))));
        }
    }

    mod browse_tests {
        use super::*;

        #[tokio::test]
        async fn test_browse_pages_with_real_total() {
            let mut mock_repo = MockAuditRecordRepository::new();
            mock_repo
                .expect_query()
                .with(
                    function(|f: &AuditQueryFilter| {
                        f.action == Some(AuditAction::Login) && f.entity_type.is_none()
                    }),
                    eq(Some(50)),
                    eq(50),
                )
                .times(1)
                .returning(|_, _, _| Ok(vec![record(AuditAction::Login, "User", 60)]));
            mock_repo
                .expect_count()
                .times(1)
                .returning(|_| Ok(101));

            let service = AuditQueryService::new(Arc::new(mock_repo));
            let page = service
                .browse(ActivityLogQuery {
                    page: Some(2),
                    per_page: None,
                    search: Some(String::new()),
                    action: Some("LOGIN".to_string()),
                    entity_type: Some(" ".to_string()),
                })
                .await
                .unwrap();

            assert_eq!(page.page, 2);
            assert_eq!(page.per_page, 50);
            assert_eq!(page.total, 101);
            assert_eq!(page.total_pages, 3);
            assert_eq!(page.records.len(), 1);
        }

        #[tokio::test]
        async fn test_browse_page_zero_is_first_page() {
            let mut mock_repo = MockAuditRecordRepository::new();
            mock_repo
                .expect_query()
                .with(always(), eq(Some(10)), eq(0))
                .returning(|_, _, _| Ok(vec![]));
            mock_repo.expect_count().returning(|_| Ok(0));

            let service = AuditQueryService::new(Arc::new(mock_repo));
            let page = service
                .browse(ActivityLogQuery {
                    page: Some(0),
                    per_page: Some(10),
                    ..Default::default()
                })
                .await
                .unwrap();

            assert_eq!(page.page, 1);
            assert_eq!(page.total_pages, 0);
        }
    }

    mod retention_tests {
        use super::*;

        #[tokio::test]
        async fn test_clean_old_logs_uses_cutoff() {
            let before = Utc::now();
            let mut mock_repo = MockAuditRecordRepository::new();
            mock_repo
                .expect_delete_older_than()
                .withf(move |cutoff| {
                    let expected = before - TimeDelta::days(30);
                    (*cutoff - expected).num_seconds().abs() < 5
                })
                .times(1)
                .returning(|_| Ok(7));

            let service = AuditQueryService::new(Arc::new(mock_repo));
            assert_eq!(service.clean_old_logs(30).await.unwrap(), 7);
        }

        #[tokio::test]
        async fn test_clean_old_logs_rejects_non_positive_days() {
            let mut mock_repo = MockAuditRecordRepository::new();
            mock_repo.expect_delete_older_than().never();

            let service = AuditQueryService::new(Arc::new(mock_repo));

            assert!(matches!(
                service.clean_old_logs(0).await,
                Err(QueryError::InvalidRequest(_))
            ));
            assert!(matches!(
                service.clean_old_logs(-5).await,
                Err(QueryError::InvalidRequest(_))
            ));
        }

        #[tokio::test]
        async fn test_clean_old_logs_rejects_overflowing_days() {
            let mut mock_repo = MockAuditRecordRepository::new();
            mock_repo.expect_delete_older_than().never();

            let service = AuditQueryService::new(Arc::new(mock_repo));
            assert!(service.clean_old_logs(i64::MAX).await.is_err());
        }
    }
}
