use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::application::ports::{
    ActivityStat, AuditQueryFilter, AuditRecordRepository, AuditRepositoryError,
};
use crate::domain::entities::AuditRecord;

/// Activity log kept in process memory.
///
/// Used by the CLI's dry runs, local development without Postgres, and the
/// scenario tests. Ordering and filtering match the Postgres adapter.
#[derive(Debug, Default)]
pub struct InMemoryAuditRecordRepository {
    records: RwLock<Vec<AuditRecord>>,
    next_id: AtomicI64,
}

impl InMemoryAuditRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record in insertion order
    pub fn all(&self) -> Vec<AuditRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn matching(&self, filter: &AuditQueryFilter) -> Vec<AuditRecord> {
        let mut matching: Vec<AuditRecord> = self
            .records
            .read()
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matching.sort_by_key(|record| Reverse((*record.created_at(), record.id())));
        matching
    }
}

#[async_trait]
impl AuditRecordRepository for InMemoryAuditRecordRepository {
    async fn store(&self, record: AuditRecord) -> Result<AuditRecord, AuditRepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = record.persisted(id);
        self.records.write().push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AuditRecord>, AuditRepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|record| record.id() == Some(id))
            .cloned())
    }

    async fn query(
        &self,
        filter: &AuditQueryFilter,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<AuditRecord>, AuditRepositoryError> {
        if limit.is_some_and(|l| l < 0) || offset < 0 {
            return Err(AuditRepositoryError::InvalidFilter(
                "limit and offset must not be negative".to_string(),
            ));
        }
        let matching = self.matching(filter).into_iter().skip(offset as usize);
        Ok(match limit {
            Some(limit) => matching.take(limit as usize).collect(),
            None => matching.collect(),
        })
    }

    async fn count(&self, filter: &AuditQueryFilter) -> Result<i64, AuditRepositoryError> {
        let count = self
            .records
            .read()
            .iter()
            .filter(|record| filter.matches(record))
            .count();
        Ok(count as i64)
    }

    async fn stats(&self) -> Result<Vec<ActivityStat>, AuditRepositoryError> {
        let mut counts: HashMap<(String, String), i64> = HashMap::new();
        for record in self.records.read().iter() {
            *counts
                .entry((
                    record.action().as_str().to_string(),
                    record.entity_type().to_string(),
                ))
                .or_default() += 1;
        }

        let mut stats: Vec<ActivityStat> = counts
            .into_iter()
            .map(|((action, entity_type), count)| ActivityStat {
                action: action.into(),
                entity_type,
                count,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.action.as_str().cmp(b.action.as_str()))
                .then_with(|| a.entity_type.cmp(&b.entity_type))
        });
        Ok(stats)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditRepositoryError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|record| *record.created_at() >= cutoff);
        Ok((before - records.len()) as u64)
    }
}
