//! Session seeding through browser storage.
//!
//! The web client restores its login from two localStorage keys:
//! `persist:auth` (redux-persist state of the auth slice) and
//! `mezon_session` (realtime endpoint). Writing both before the app boots
//! skips the interactive login.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::engine::AutomationEngine;
use crate::result::{E2eError, E2eResult};

/// Storage key of the persisted auth slice
pub const PERSIST_AUTH_KEY: &str = "persist:auth";

/// Storage key of the realtime endpoint
pub const SESSION_ENDPOINT_KEY: &str = "mezon_session";

const AUTH_KEYS: [&str; 8] = [
    "loadingStatus",
    "session",
    "isLogin",
    "isRegistering",
    "loadingStatusEmail",
    "redirectUrl",
    "activeAccount",
    "_persist",
];

/// redux-persist bookkeeping stored under `_persist`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistMeta {
    /// Persisted state version
    pub version: i64,
    /// Set once the store rehydrated
    pub rehydrated: bool,
}

impl Default for PersistMeta {
    fn default() -> Self {
        Self {
            version: -1,
            rehydrated: true,
        }
    }
}

/// Auth slice as the client persists it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistAuth {
    /// Slice loading status
    pub loading_status: String,
    /// Session object issued by the server; opaque to the suite
    pub session: Value,
    /// Logged-in flag
    pub is_login: bool,
    /// Registration status
    pub is_registering: String,
    /// Email login status
    pub loading_status_email: String,
    /// Post-login redirect
    pub redirect_url: Option<String>,
    /// Account the session belongs to
    pub active_account: Option<String>,
    /// redux-persist metadata
    #[serde(rename = "_persist")]
    pub persist: PersistMeta,
}

impl PersistAuth {
    /// Logged-in state around `session`
    #[must_use]
    pub fn logged_in(session: Value) -> Self {
        Self {
            loading_status: "loaded".to_string(),
            session,
            is_login: true,
            is_registering: "not loaded".to_string(),
            loading_status_email: "not loaded".to_string(),
            redirect_url: None,
            active_account: None,
            persist: PersistMeta::default(),
        }
    }

    /// Set the active account
    #[must_use]
    pub fn with_active_account(mut self, account: impl Into<String>) -> Self {
        self.active_account = Some(account.into());
        self
    }

    /// redux-persist encoding: an object whose values are JSON strings
    pub fn to_storage_value(&self) -> E2eResult<String> {
        let Value::Object(fields) = serde_json::to_value(self)? else {
            return Err(E2eError::fixture("auth state did not serialize to an object"));
        };
        let mut outer = Map::new();
        for key in AUTH_KEYS {
            let value = fields.get(key).cloned().unwrap_or(Value::Null);
            let _ = outer.insert(key.to_string(), Value::String(serde_json::to_string(&value)?));
        }
        Ok(serde_json::to_string(&Value::Object(outer))?)
    }

    /// Decode a `persist:auth` storage value
    ///
    /// # Errors
    ///
    /// `Fixture` when keys are missing or unexpected, or a value is not a
    /// JSON-encoded string.
    pub fn from_storage_value(raw: &str) -> E2eResult<Self> {
        let outer: Map<String, Value> = serde_json::from_str(raw)?;
        if let Some(extra) = outer.keys().find(|k| !AUTH_KEYS.contains(&k.as_str())) {
            return Err(E2eError::fixture(format!(
                "unexpected key '{extra}' in {PERSIST_AUTH_KEY}"
            )));
        }
        let mut inner = Map::new();
        for key in AUTH_KEYS {
            let encoded = outer
                .get(key)
                .ok_or_else(|| {
                    E2eError::fixture(format!("missing key '{key}' in {PERSIST_AUTH_KEY}"))
                })?;
            let Value::String(encoded) = encoded else {
                return Err(E2eError::fixture(format!(
                    "key '{key}' in {PERSIST_AUTH_KEY} is not a JSON-encoded string"
                )));
            };
            let _ = inner.insert(key.to_string(), serde_json::from_str(encoded)?);
        }
        Ok(serde_json::from_value(Value::Object(inner))?)
    }
}

/// Realtime endpoint stored under `mezon_session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MezonSessionEndpoint {
    /// Socket host
    pub host: String,
    /// Socket port
    pub port: u16,
    /// TLS
    pub ssl: bool,
}

impl Default for MezonSessionEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7350,
            ssl: false,
        }
    }
}

impl MezonSessionEndpoint {
    /// Storage encoding; the client reads the port as a string
    pub fn to_storage_value(&self) -> E2eResult<String> {
        Ok(serde_json::to_string(&json!({
            "host": self.host,
            "port": self.port.to_string(),
            "ssl": self.ssl,
        }))?)
    }
}

/// Everything written to storage to start a scenario logged in
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSeed {
    /// Auth slice
    pub auth: PersistAuth,
    /// Realtime endpoint
    pub endpoint: MezonSessionEndpoint,
}

impl SessionSeed {
    /// Seed for `auth` against `endpoint`
    #[must_use]
    pub const fn new(auth: PersistAuth, endpoint: MezonSessionEndpoint) -> Self {
        Self { auth, endpoint }
    }

    /// Storage key/value pairs, in write order
    pub fn storage_entries(&self) -> E2eResult<Vec<(&'static str, String)>> {
        Ok(vec![
            (PERSIST_AUTH_KEY, self.auth.to_storage_value()?),
            (SESSION_ENDPOINT_KEY, self.endpoint.to_storage_value()?),
        ])
    }

    /// Open `base_url`, write the storage keys and reload so the app boots
    /// logged in
    pub async fn apply(&self, engine: &dyn AutomationEngine, base_url: &str) -> E2eResult<()> {
        let entries = self.storage_entries()?;
        engine.navigate(base_url).await?;
        for (key, value) in &entries {
            engine.set_local_storage(key, value).await?;
        }
        engine.reload().await?;
        for (key, value) in &entries {
            let stored = engine.get_local_storage(key).await?;
            if stored.as_deref() != Some(value.as_str()) {
                return Err(E2eError::fixture(format!(
                    "storage key '{key}' did not survive the reload"
                )));
            }
        }
        info!(
            account = self.auth.active_account.as_deref().unwrap_or("-"),
            "session seeded"
        );
        Ok(())
    }
}
