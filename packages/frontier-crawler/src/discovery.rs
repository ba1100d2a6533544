//! Discovery of new accounts from fetched posts.

use indexmap::IndexMap;

use crate::store::ScoreStore;
use crate::types::account::{AccountId, AccountRecord};
use crate::types::post::Post;

/// Candidates found during one cycle, deduplicated within the cycle and
/// against the store.
#[derive(Debug, Default)]
pub struct DiscoveryQueue {
    queued: IndexMap<AccountId, AccountRecord>,
}

impl DiscoveryQueue {
    /// Create an empty queue for one cycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of candidates queued so far.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Queue the reply target and the repost source of `post` when they are
    /// unknown. Returns how many candidates were added.
    pub fn observe(&mut self, store: &ScoreStore, post: &Post) -> usize {
        let mut added = 0;
        for account in post.referenced_accounts() {
            if store.contains(account.id) || self.queued.contains_key(&account.id) {
                continue;
            }
            tracing::debug!(
                account_id = %account.id,
                screen_name = ?account.screen_name,
                via_post = post.id,
                "Discovered account"
            );
            self.queued
                .insert(account.id, AccountRecord::discovered(account));
            added += 1;
        }
        added
    }

    /// Drain the candidates in discovery order.
    pub fn into_records(self) -> impl Iterator<Item = AccountRecord> {
        self.queued.into_values()
    }
}
