//! In-memory subscription state, backed by the external repository.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{error, info};

use crate::{
    domain::{Subscription, UserId},
    ports::SubscriptionRepository,
    Result,
};

/// Mapping of subscriber identity to subscription record.
///
/// The map is the authoritative view for the process lifetime. Every
/// mutation is applied to the map unconditionally and then propagated to
/// the repository; a failed propagation is logged and reported to the
/// caller but never rolled back, so the two views may diverge until the
/// next process restart.
pub struct SubscriptionStore {
    repo: Arc<dyn SubscriptionRepository>,
    subscriptions: RwLock<HashMap<UserId, Subscription>>,
}

impl SubscriptionStore {
    pub fn new(repo: Arc<dyn SubscriptionRepository>) -> Self {
        Self {
            repo,
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild the in-memory map from the repository. A read failure is
    /// non-fatal: the store starts empty and the process keeps running.
    pub async fn load(&self) {
        match self.repo.list().await {
            Ok(subscriptions) => {
                let mut map = self.subscriptions.write().await;
                map.clear();
                for subscription in subscriptions {
                    map.insert(subscription.user_id, subscription);
                }
                info!(count = map.len(), "subscriptions loaded");
            }
            Err(e) => {
                error!(error = %e, "getting subscriptions");
            }
        }
    }

    /// Snapshot of all current subscriptions.
    pub async fn list(&self) -> Vec<Subscription> {
        self.subscriptions.read().await.values().cloned().collect()
    }

    pub async fn get(&self, user_id: UserId) -> Option<Subscription> {
        self.subscriptions.read().await.get(&user_id).cloned()
    }

    /// Insert or replace the record for the subscription's user id, then
    /// propagate to the repository. The in-memory insert always happens;
    /// the returned error only reflects the propagation.
    pub async fn upsert(&self, subscription: Subscription) -> Result<()> {
        let user_id = subscription.user_id;
        self.subscriptions
            .write()
            .await
            .insert(user_id, subscription.clone());

        if let Err(e) = self.repo.add(&subscription).await {
            error!(user_id = user_id.0, error = %e, "adding subscription");
            return Err(e);
        }
        Ok(())
    }

    /// Remove the record for `user_id`. The repository delete is issued
    /// unconditionally, even when no in-memory record existed.
    pub async fn remove(&self, user_id: UserId) -> Result<()> {
        self.subscriptions.write().await.remove(&user_id);

        if let Err(e) = self.repo.delete(user_id).await {
            error!(user_id = user_id.0, error = %e, "deleting subscription");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::{
        domain::{SubscriptionType, User},
        Error,
    };

    /// Repository test double recording every mutation.
    pub(crate) struct RecordingRepo {
        pub initial: Vec<Subscription>,
        pub fail_list: bool,
        pub fail_add: bool,
        pub fail_delete: bool,
        pub added: Mutex<Vec<Subscription>>,
        pub deleted: Mutex<Vec<UserId>>,
        pub users: Vec<User>,
    }

    impl RecordingRepo {
        pub fn empty() -> Self {
            Self {
                initial: Vec::new(),
                fail_list: false,
                fail_add: false,
                fail_delete: false,
                added: Mutex::new(Vec::new()),
                deleted: Mutex::new(Vec::new()),
                users: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl SubscriptionRepository for RecordingRepo {
        async fn list(&self) -> Result<Vec<Subscription>> {
            if self.fail_list {
                return Err(Error::Repository("list failed".to_string()));
            }
            Ok(self.initial.clone())
        }

        async fn add(&self, subscription: &Subscription) -> Result<()> {
            self.added.lock().await.push(subscription.clone());
            if self.fail_add {
                return Err(Error::Repository("add failed".to_string()));
            }
            Ok(())
        }

        async fn delete(&self, user_id: UserId) -> Result<()> {
            self.deleted.lock().await.push(user_id);
            if self.fail_delete {
                return Err(Error::Repository("delete failed".to_string()));
            }
            Ok(())
        }

        async fn get_user(&self, token: &str) -> Result<Option<User>> {
            Ok(self.users.iter().find(|u| u.token == token).cloned())
        }
    }

    pub(crate) fn subscription(user_id: i64, user: &str) -> Subscription {
        Subscription {
            user_id: UserId(user_id),
            user: user.to_string(),
            subscription_type: SubscriptionType::Status,
        }
    }

    #[tokio::test]
    async fn load_failure_yields_empty_store() {
        let repo = Arc::new(RecordingRepo {
            fail_list: true,
            initial: vec![subscription(1, "alice")],
            ..RecordingRepo::empty()
        });
        let store = SubscriptionStore::new(repo);
        store.load().await;
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn load_rebuilds_from_repository() {
        let repo = Arc::new(RecordingRepo {
            initial: vec![subscription(1, "alice"), subscription(2, "bob")],
            ..RecordingRepo::empty()
        });
        let store = SubscriptionStore::new(repo);
        store.load().await;
        assert_eq!(store.list().await.len(), 2);
        assert_eq!(store.get(UserId(1)).await.unwrap().user, "alice");
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_key() {
        let repo = Arc::new(RecordingRepo::empty());
        let store = SubscriptionStore::new(repo.clone());

        store.upsert(subscription(1, "alice")).await.unwrap();
        store.upsert(subscription(1, "alice")).await.unwrap();

        assert_eq!(store.list().await.len(), 1);
        // Both mutations were still propagated.
        assert_eq!(repo.added.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn upsert_keeps_memory_on_propagation_failure() {
        let repo = Arc::new(RecordingRepo {
            fail_add: true,
            ..RecordingRepo::empty()
        });
        let store = SubscriptionStore::new(repo);

        let result = store.upsert(subscription(1, "alice")).await;
        assert!(result.is_err());
        // Divergence: in-memory record survives the failed write.
        assert!(store.get(UserId(1)).await.is_some());
    }

    #[tokio::test]
    async fn remove_deletes_unconditionally() {
        let repo = Arc::new(RecordingRepo::empty());
        let store = SubscriptionStore::new(repo.clone());

        // No record for user 7 exists; the repository delete still happens.
        store.remove(UserId(7)).await.unwrap();
        assert_eq!(repo.deleted.lock().await.as_slice(), &[UserId(7)]);
    }
}
