//! Response shapes returned by the REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Greeting returned by `GET /api/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub message: String,
}

/// Context of the change that produced a state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateContext {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// An entity's state as reported by `GET /api/states[/{entity_id}]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Kept as the server sent it; never validated client-side
    pub entity_id: String,

    /// The state value (e.g., "on", "off", "23.5", "unavailable")
    pub state: String,

    #[serde(default)]
    pub attributes: Map<String, Value>,

    pub last_changed: DateTime<Utc>,

    pub last_updated: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reported: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<StateContext>,
}

impl EntityState {
    /// Domain part of the entity id (text before the first `.`)
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or(self.entity_id.as_str(), |(domain, _)| domain)
    }

    /// Check if the state value represents an unavailable entity
    pub fn is_unavailable(&self) -> bool {
        self.state == "unavailable"
    }

    /// Get an attribute value by key
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Services registered under one domain, from `GET /api/services`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDomain {
    pub domain: String,
    #[serde(default)]
    pub services: Map<String, Value>,
}

/// Event type and its listener count, from `GET /api/events`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventListener {
    pub event: String,
    pub listener_count: u64,
}

/// A calendar entity, from `GET /api/calendars`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub entity_id: String,
    pub name: String,
}

/// Result of `POST /api/config/core/check_config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigCheck {
    pub result: String,
    #[serde(default)]
    pub errors: Option<String>,
}

impl ConfigCheck {
    pub fn is_valid(&self) -> bool {
        self.result == "valid"
    }
}
