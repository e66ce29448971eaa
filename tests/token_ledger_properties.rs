//! Property-based tests for the anti-forgery token ledger
//!
//! Random token ids and candidates check the properties every admin form
//! relies on: a token validates only for its own id and session.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;

use travel_audit::infrastructure::session::InMemorySession;
use travel_audit::ports::SessionStore;
use travel_audit::use_cases::{CsrfTokenLedger, TokenScope, METADATA_PREFIX};
use travel_audit::value_objects::{RequestMetadata, TokenMetadata};

/// Form purposes such as `clean_activity_logs` or `submit`
fn token_id_strategy() -> impl Strategy<Value = String> {
    "[a-k][a-z0-9_]{0,15}"
}

fn scope_for(session_id: &str) -> TokenScope {
    let session: Arc<dyn SessionStore> = Arc::new(InMemorySession::new(session_id));
    TokenScope::new(
        Some(session),
        Some(RequestMetadata::new(
            Some("198.51.100.4".to_string()),
            Some("proptest".to_string()),
        )),
    )
}

proptest! {
    #[test]
    fn issued_token_validates_for_its_own_id(token_id in token_id_strategy()) {
        let ledger = CsrfTokenLedger::default();
        let scope = scope_for("s1");

        let token = ledger.generate_token(&scope, &token_id);

        prop_assert!(ledger.check_token_validity(&scope, &token_id, Some(token.as_str())));
    }

    #[test]
    fn token_never_validates_for_another_id(
        token_id in token_id_strategy(),
        other_id in token_id_strategy(),
    ) {
        prop_assume!(token_id != other_id);
        let ledger = CsrfTokenLedger::default();
        let scope = scope_for("s1");

        let token = ledger.generate_token(&scope, &token_id);

        prop_assert!(!ledger.check_token_validity(&scope, &other_id, Some(token.as_str())));
    }

    #[test]
    fn arbitrary_candidates_are_rejected(
        token_id in token_id_strategy(),
        candidate in ".{0,64}",
    ) {
        let ledger = CsrfTokenLedger::default();
        let scope = scope_for("s1");

        let token = ledger.generate_token(&scope, &token_id);
        prop_assume!(candidate != token.as_str());

        prop_assert!(!ledger.check_token_validity(&scope, &token_id, Some(&candidate)));
    }

    #[test]
    fn token_does_not_cross_sessions(token_id in token_id_strategy()) {
        let ledger = CsrfTokenLedger::default();
        let first = scope_for("s1");
        let second = scope_for("s2");

        let token = ledger.generate_token(&first, &token_id);

        prop_assert!(!ledger.check_token_validity(&second, &token_id, Some(token.as_str())));
        prop_assert!(!ledger.check_token_validity(
            &TokenScope::detached(),
            &token_id,
            Some(token.as_str()),
        ));
    }

    #[test]
    fn active_tokens_list_each_id_once(ids in prop::collection::vec(token_id_strategy(), 1..8)) {
        let ledger = CsrfTokenLedger::default();
        let scope = scope_for("s1");
        for id in &ids {
            ledger.generate_token(&scope, id);
        }

        let distinct: HashSet<&String> = ids.iter().collect();
        let active = ledger.get_active_tokens(&scope);

        prop_assert_eq!(active.len(), distinct.len());
        prop_assert!(active.values().all(|entry| entry.metadata.is_some()));
        prop_assert_eq!(ledger.cleanup_expired_tokens(&scope), 0);
    }

    #[test]
    fn removed_token_no_longer_validates(token_id in token_id_strategy()) {
        let ledger = CsrfTokenLedger::default();
        let scope = scope_for("s1");

        let token = ledger.generate_token(&scope, &token_id);
        ledger.remove_token(&scope, &token_id);

        prop_assert!(!ledger.check_token_validity(&scope, &token_id, Some(token.as_str())));
        prop_assert!(ledger.get_active_tokens(&scope).is_empty());
    }

    #[test]
    fn refresh_returns_the_live_token(token_id in token_id_strategy()) {
        let ledger = CsrfTokenLedger::default();
        let scope = scope_for("s1");

        let issued = ledger.generate_token(&scope, &token_id);
        let refreshed = ledger.refresh_token_if_needed(&scope, &token_id);

        prop_assert_eq!(issued, refreshed);
    }

    #[test]
    fn cleanup_removes_aged_tokens_exactly_once(
        ids in prop::collection::hash_set(token_id_strategy(), 1..8),
    ) {
        let ledger = CsrfTokenLedger::default();
        let session = Arc::new(InMemorySession::new("s1"));
        let store: Arc<dyn SessionStore> = session.clone();
        let scope = TokenScope::new(Some(store), None);
        let aged = TokenMetadata::new(Utc::now().timestamp() - 7200, None, None);

        for id in &ids {
            ledger.generate_token(&scope, id);
            session
                .insert(
                    &format!("{}{}", METADATA_PREFIX, id),
                    serde_json::to_value(&aged).unwrap(),
                )
                .unwrap();
        }

        prop_assert_eq!(ledger.cleanup_expired_tokens(&scope), ids.len());
        prop_assert_eq!(ledger.cleanup_expired_tokens(&scope), 0);
        prop_assert!(session.keys().unwrap().is_empty());
    }
}
