use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{persist, CaptureOutcome};
use crate::application::ports::AuditRecordRepository;
use crate::domain::entities::{AuditRecord, AuditRecordBuilder};
use crate::domain::tracking::{EntityRef, KindDescriptor, KindRegistry, Transition};
use crate::domain::value_objects::{ActorContext, ChangeSet, Snapshot};

type PendingKey = (String, i64);

/// Turns entity lifecycle notifications into CREATE/UPDATE/DELETE records.
///
/// One instance serves one write scope (request or batch). Old values
/// stashed by [`pre_update`](Self::pre_update) are consumed by the matching
/// [`post_update`](Self::post_update) and must not outlive the scope; call
/// [`finish_scope`](Self::finish_scope) when it ends.
pub struct EntityChangeCapture {
    repository: Arc<dyn AuditRecordRepository>,
    kinds: Arc<KindRegistry>,
    pending: Mutex<HashMap<PendingKey, Snapshot>>,
}

impl EntityChangeCapture {
    pub fn new(repository: Arc<dyn AuditRecordRepository>, kinds: Arc<KindRegistry>) -> Self {
        Self {
            repository,
            kinds,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Entity was inserted
    pub async fn post_create(&self, entity: &EntityRef, ctx: &ActorContext) -> CaptureOutcome {
        let Some(kind) = self.kinds.get(entity.entity_type()) else {
            return CaptureOutcome::Skipped;
        };
        let record = Self::base_record(kind, Transition::Create, entity, ctx)
            .new_data(Some(kind.snapshot(entity)))
            .build();
        persist(self.repository.as_ref(), record).await
    }

    /// Entity is about to be updated; stash the old values of changed fields.
    ///
    /// Returns whether anything was stashed. Untracked kinds and entities
    /// without an id are ignored.
    pub fn pre_update(&self, entity: &EntityRef, changes: &ChangeSet) -> bool {
        if !self.kinds.is_tracked(entity.entity_type()) {
            return false;
        }
        let Some(id) = entity.entity_id() else {
            return false;
        };
        let key = (entity.entity_type().to_string(), id);
        if self.pending.lock().insert(key, changes.old_values()).is_some() {
            debug!(
                "Replaced pending update for {} {}",
                entity.entity_type(),
                id
            );
        }
        true
    }

    /// Entity was updated; consume the stash and record old and new state
    pub async fn post_update(&self, entity: &EntityRef, ctx: &ActorContext) -> CaptureOutcome {
        let Some(kind) = self.kinds.get(entity.entity_type()) else {
            return CaptureOutcome::Skipped;
        };
        let old_data = entity.entity_id().and_then(|id| {
            self.pending
                .lock()
                .remove(&(entity.entity_type().to_string(), id))
        });
        let record = Self::base_record(kind, Transition::Update, entity, ctx)
            .old_data(old_data)
            .new_data(Some(kind.snapshot(entity)))
            .build();
        persist(self.repository.as_ref(), record).await
    }

    /// Entity is being removed; `entity` must still carry its full state
    pub async fn post_delete(&self, entity: &EntityRef, ctx: &ActorContext) -> CaptureOutcome {
        let Some(kind) = self.kinds.get(entity.entity_type()) else {
            return CaptureOutcome::Skipped;
        };
        let record = Self::base_record(kind, Transition::Delete, entity, ctx)
            .old_data(Some(kind.snapshot(entity)))
            .build();
        persist(self.repository.as_ref(), record).await
    }

    /// Number of stashed updates still waiting for their post-update
    pub fn pending_updates(&self) -> usize {
        self.pending.lock().len()
    }

    /// End of the write scope: drop leftover stash entries, warning for each.
    ///
    /// Returns how many entries leaked.
    pub fn finish_scope(&self) -> usize {
        let leaked: Vec<PendingKey> = self.pending.lock().drain().map(|(key, _)| key).collect();
        for (entity_type, id) in &leaked {
            warn!(
                "Pending update for {} {} was never completed; discarding stashed values",
                entity_type, id
            );
        }
        leaked.len()
    }

    fn base_record(
        kind: &KindDescriptor,
        transition: Transition,
        entity: &EntityRef,
        ctx: &ActorContext,
    ) -> AuditRecordBuilder {
        AuditRecord::builder(transition.action(), entity.entity_type())
            .entity_id(entity.entity_id())
            .entity_name(kind.label(entity))
            .description(kind.describe(transition, entity))
            .context(ctx)
    }
}

/// Opens a fresh [`EntityChangeCapture`] per write scope.
///
/// Shared application state holds this factory, never a capture: stashed
/// old values belong to the request or batch that produced them.
#[derive(Clone)]
pub struct EntityChangeScopes {
    repository: Arc<dyn AuditRecordRepository>,
    kinds: Arc<KindRegistry>,
}

impl EntityChangeScopes {
    pub fn new(repository: Arc<dyn AuditRecordRepository>, kinds: Arc<KindRegistry>) -> Self {
        Self { repository, kinds }
    }

    /// Start a scope with an empty stash; the caller ends it with
    /// [`EntityChangeCapture::finish_scope`]
    pub fn begin(&self) -> Arc<EntityChangeCapture> {
        Arc::new(EntityChangeCapture::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.kinds),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::AuditFailure;
    use crate::application::ports::{AuditRepositoryError, MockAuditRecordRepository};
    use crate::domain::entities::{Destination, Hotel, User};
    use crate::domain::value_objects::{Actor, AuditAction, RequestMetadata};
    use serde_json::{json, Map};

    fn storing_repository() -> MockAuditRecordRepository {
        let mut repo = MockAuditRecordRepository::new();
        repo.expect_store().returning(|record| Ok(record.persisted(1)));
        repo
    }

    fn capture(repo: MockAuditRecordRepository) -> EntityChangeCapture {
        EntityChangeCapture::new(Arc::new(repo), Arc::new(KindRegistry::default()))
    }

    fn admin_ctx() -> ActorContext {
        ActorContext::for_actor(Actor::new(7, "admin@example.com")).with_request(
            RequestMetadata::new(Some("198.51.100.4".into()), Some("test-agent".into())),
        )
    }

    mod create_tests {
        use super::*;

        #[tokio::test]
        async fn test_post_create_records_snapshot() {
            let capture = capture(storing_repository());
            let entity = EntityRef::of(&Destination::new("Demo", "Paris").with_id(12)).unwrap();

            let outcome = capture.post_create(&entity, &admin_ctx()).await;
            let record = outcome.record().unwrap();

            assert_eq!(record.action(), &AuditAction::Create);
            assert_eq!(record.entity_type(), "Destination");
            assert_eq!(record.entity_id(), Some(12));
            assert_eq!(record.entity_name(), Some("Demo"));
            assert_eq!(
                record.description(),
                Some("Created destination: Demo in Paris")
            );
            assert!(record.old_data().is_none());
            assert_eq!(record.new_data().unwrap().get_str("location"), Some("Paris"));
            assert_eq!(record.user_email(), Some("admin@example.com"));
            assert_eq!(record.ip_address(), Some("198.51.100.4"));
        }

        #[tokio::test]
        async fn test_untracked_kind_is_skipped_without_storing() {
            let mut repo = MockAuditRecordRepository::new();
            repo.expect_store().never();
            let capture = capture(repo);

            let mut fields = Map::new();
            fields.insert("reference".into(), json!("BK-1"));
            let booking = EntityRef::new("Booking", Some(1), fields);

            assert_eq!(
                capture.post_create(&booking, &admin_ctx()).await,
                CaptureOutcome::Skipped
            );
            assert!(!capture.pre_update(&booking, &ChangeSet::new()));
            assert_eq!(
                capture.post_update(&booking, &admin_ctx()).await,
                CaptureOutcome::Skipped
            );
            assert_eq!(
                capture.post_delete(&booking, &admin_ctx()).await,
                CaptureOutcome::Skipped
            );
        }

        #[tokio::test]
        async fn test_storage_failure_is_reported_not_raised() {
            let mut repo = MockAuditRecordRepository::new();
            repo.expect_store()
                .returning(|_| Err(AuditRepositoryError::Unavailable("pool closed".into())));
            let capture = capture(repo);
            let entity = EntityRef::of(&Hotel::new("Seaside", "Nice").with_id(2)).unwrap();

            let outcome = capture.post_create(&entity, &admin_ctx()).await;

            assert!(matches!(
                outcome.failure(),
                Some(AuditFailure::Storage(reason)) if reason.contains("pool closed")
            ));
        }
    }

    mod update_tests {
        use super::*;

        #[tokio::test]
        async fn test_update_records_only_changed_old_values() {
            let capture = capture(storing_repository());
            let before = Destination::new("Demo", "Paris")
                .with_id(12)
                .with_description("old text");
            let after = before.clone().with_description("new text");
            let changes = ChangeSet::between(
                EntityRef::of(&before).unwrap().fields(),
                EntityRef::of(&after).unwrap().fields(),
            );
            let entity = EntityRef::of(&after).unwrap();

            assert!(capture.pre_update(&entity, &changes));
            assert_eq!(capture.pending_updates(), 1);

            let outcome = capture.post_update(&entity, &admin_ctx()).await;
            let record = outcome.record().unwrap();

            assert_eq!(record.action(), &AuditAction::Update);
            let old = record.old_data().unwrap();
            assert_eq!(old.len(), 1);
            assert_eq!(old.get_str("description"), Some("old text"));
            assert_eq!(
                record.new_data().unwrap().get_str("description"),
                Some("new text")
            );
            assert_eq!(capture.pending_updates(), 0);
        }

        #[tokio::test]
        async fn test_post_update_without_stash_has_no_old_data() {
            let capture = capture(storing_repository());
            let entity = EntityRef::of(&User::new("Ada", "Lovelace", "ada@example.com").with_id(3))
                .unwrap();

            let outcome = capture.post_update(&entity, &admin_ctx()).await;
            let record = outcome.record().unwrap();

            assert!(record.old_data().is_none());
            assert_eq!(record.description(), Some("Updated user: Ada Lovelace"));
        }

        #[tokio::test]
        async fn test_stash_is_keyed_by_kind_and_id() {
            let capture = capture(storing_repository());
            let hotel = EntityRef::of(&Hotel::new("Same", "Rome").with_id(5)).unwrap();
            let destination = EntityRef::of(&Destination::new("Same", "Rome").with_id(5)).unwrap();
            let changes = ChangeSet::new().with("name", json!("Old"), json!("Same"));

            capture.pre_update(&hotel, &changes);
            capture.pre_update(&destination, &changes);
            assert_eq!(capture.pending_updates(), 2);

            capture.post_update(&hotel, &admin_ctx()).await;
            assert_eq!(capture.pending_updates(), 1);
        }

        #[test]
        fn test_entity_without_id_is_not_stashed() {
            let capture = capture(MockAuditRecordRepository::new());
            let entity = EntityRef::of(&Hotel::new("New", "Oslo")).unwrap();
            let changes = ChangeSet::new().with("name", json!("A"), json!("New"));

            assert!(!capture.pre_update(&entity, &changes));
            assert_eq!(capture.pending_updates(), 0);
        }

        #[test]
        fn test_finish_scope_discards_leaked_entries() {
            let capture = capture(MockAuditRecordRepository::new());
            let entity = EntityRef::of(&Hotel::new("Leaky", "Oslo").with_id(9)).unwrap();
            capture.pre_update(&entity, &ChangeSet::new().with("price", json!(1), json!(2)));

            assert_eq!(capture.finish_scope(), 1);
            assert_eq!(capture.pending_updates(), 0);
            assert_eq!(capture.finish_scope(), 0);
        }
    }

    mod delete_tests {
        use super::*;

        #[tokio::test]
        async fn test_delete_keeps_pre_removal_snapshot() {
            let capture = capture(storing_repository());
            let entity = EntityRef::of(&Destination::new("Demo", "Paris").with_id(12)).unwrap();

            let outcome = capture.post_delete(&entity, &ActorContext::system()).await;
            let record = outcome.record().unwrap();

            assert_eq!(record.action(), &AuditAction::Delete);
            assert_eq!(record.old_data().unwrap().get_str("name"), Some("Demo"));
            assert!(record.new_data().is_none());
            assert!(record.user_id().is_none());
            assert!(record.ip_address().is_none());
            assert_eq!(record.description(), Some("Deleted destination: Demo"));
        }
    }

    mod scope_tests {
        use super::*;

        fn scopes() -> EntityChangeScopes {
            EntityChangeScopes::new(
                Arc::new(MockAuditRecordRepository::new()),
                Arc::new(KindRegistry::default()),
            )
        }

        #[test]
        fn test_scopes_do_not_share_stash() {
            let scopes = scopes();
            let entity = EntityRef::of(&Hotel::new("Leaky", "Oslo").with_id(9)).unwrap();
            let changes = ChangeSet::new().with("price", json!(1), json!(2));

            let first = scopes.begin();
            assert!(first.pre_update(&entity, &changes));
            let second = scopes.begin();

            assert_eq!(second.pending_updates(), 0);
            assert_eq!(first.finish_scope(), 1);
            assert_eq!(scopes.begin().pending_updates(), 0);
        }
    }
}
