use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat-platform user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Chat-platform chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// What a subscriber is subscribed to. Only status updates exist today.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionType {
    #[default]
    Status,
}

/// A subscriber registration, keyed uniquely by `user_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub user: String,
    pub subscription_type: SubscriptionType,
}

/// One message queued for delivery to a single chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub text: String,
}

/// A status change reported by the external event source.
///
/// Read-only to this core; never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub username: String,
    pub status: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// An API user looked up by token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub token: String,
}

/// A command parsed from an inbound chat update.
#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: String,
    pub name: String,
}
