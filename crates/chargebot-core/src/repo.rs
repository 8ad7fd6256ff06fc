//! JSON-file implementation of the repository port.
//!
//! The persistence backend is deliberately opaque to the rest of the core;
//! this implementation keeps the whole state in one serde_json document so
//! a deployment without a database still survives restarts.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};

use crate::{
    domain::{Subscription, User, UserId},
    ports::SubscriptionRepository,
    Result,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    #[serde(default)]
    subscriptions: Vec<Subscription>,
    #[serde(default)]
    users: Vec<User>,
}

pub struct JsonRepository {
    path: PathBuf,
    // Serializes read-modify-write cycles on the state file.
    lock: Mutex<()>,
}

impl JsonRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// A missing state file reads as empty state.
    async fn read_state(&self) -> Result<State> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(State::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_state(&self, state: &State) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for JsonRepository {
    async fn list(&self) -> Result<Vec<Subscription>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_state().await?.subscriptions)
    }

    async fn add(&self, subscription: &Subscription) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut state = self.read_state().await?;
        state
            .subscriptions
            .retain(|s| s.user_id != subscription.user_id);
        state.subscriptions.push(subscription.clone());
        self.write_state(&state).await
    }

    async fn delete(&self, user_id: UserId) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut state = self.read_state().await?;
        state.subscriptions.retain(|s| s.user_id != user_id);
        self.write_state(&state).await
    }

    async fn get_user(&self, token: &str) -> Result<Option<User>> {
        let _guard = self.lock.lock().await;
        let state = self.read_state().await?;
        Ok(state.users.into_iter().find(|u| u.token == token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::SubscriptionType;

    fn temp_repo(tag: &str) -> (JsonRepository, PathBuf) {
        let dir = std::env::temp_dir().join(format!("chargebot-repo-{tag}-{}", std::process::id()));
        let path = dir.join("state.json");
        (JsonRepository::new(path.clone()), dir)
    }

    fn subscription(user_id: i64, user: &str) -> Subscription {
        Subscription {
            user_id: UserId(user_id),
            user: user.to_string(),
            subscription_type: SubscriptionType::Status,
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let (repo, dir) = temp_repo("missing");
        assert!(repo.list().await.unwrap().is_empty());
        assert!(repo.get_user("tok").await.unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn add_replaces_by_user_id() {
        let (repo, dir) = temp_repo("add");
        repo.add(&subscription(1, "alice")).await.unwrap();
        repo.add(&subscription(1, "alice_renamed")).await.unwrap();
        repo.add(&subscription(2, "bob")).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        let alice = listed.iter().find(|s| s.user_id == UserId(1)).unwrap();
        assert_eq!(alice.user, "alice_renamed");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn delete_removes_matching_record() {
        let (repo, dir) = temp_repo("delete");
        repo.add(&subscription(1, "alice")).await.unwrap();
        repo.delete(UserId(1)).await.unwrap();
        // Deleting an absent record is not an error.
        repo.delete(UserId(1)).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn get_user_finds_by_token() {
        let (repo, dir) = temp_repo("user");
        let state = State {
            subscriptions: Vec::new(),
            users: vec![User {
                name: "operator".to_string(),
                token: "secret".to_string(),
            }],
        };
        repo.write_state(&state).await.unwrap();

        let user = repo.get_user("secret").await.unwrap().unwrap();
        assert_eq!(user.name, "operator");
        assert!(repo.get_user("other").await.unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
