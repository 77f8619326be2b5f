//! Pool of pre-provisioned test accounts.
//!
//! Parallel scenarios lease accounts explicitly so no two of them drive the
//! same account at once. A lease goes back to the pool on
//! [`AccountLease::release`] or when dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::auth::{MezonSessionEndpoint, PersistAuth, SessionSeed};
use crate::deadline::Deadline;
use crate::result::{E2eError, E2eResult};

/// One provisioned account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Login name
    pub username: String,
    /// Name shown in the UI
    #[serde(default)]
    pub display_name: Option<String>,
    /// Session object issued by the server
    pub session: Value,
}

impl Account {
    /// Name the UI shows for this account
    #[must_use]
    pub fn shown_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    /// Storage seed that logs this account in
    #[must_use]
    pub fn session_seed(&self, endpoint: MezonSessionEndpoint) -> SessionSeed {
        SessionSeed::new(
            PersistAuth::logged_in(self.session.clone()).with_active_account(&self.username),
            endpoint,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountFile {
    Wrapped { accounts: Vec<Account> },
    List(Vec<Account>),
}

impl AccountFile {
    fn into_accounts(self) -> Vec<Account> {
        match self {
            Self::Wrapped { accounts } | Self::List(accounts) => accounts,
        }
    }
}

#[derive(Debug)]
struct PoolInner {
    accounts: Vec<Account>,
    leased: Mutex<Vec<bool>>,
    released: Notify,
}

impl PoolInner {
    fn give_back(&self, index: usize) {
        let mut leased = self.leased.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = leased.get_mut(index) {
            *slot = false;
        }
        drop(leased);
        self.released.notify_one();
    }
}

/// Shared account pool; clones share the same leases
#[derive(Debug, Clone)]
pub struct AccountPool {
    inner: Arc<PoolInner>,
}

impl AccountPool {
    /// Pool over `accounts`
    ///
    /// # Errors
    ///
    /// `Config` when two accounts share a username.
    pub fn new(accounts: Vec<Account>) -> E2eResult<Self> {
        for (i, account) in accounts.iter().enumerate() {
            if accounts[..i].iter().any(|a| a.username == account.username) {
                return Err(E2eError::config(format!(
                    "duplicate account '{}' in account pool",
                    account.username
                )));
            }
        }
        let leased = Mutex::new(vec![false; accounts.len()]);
        Ok(Self {
            inner: Arc::new(PoolInner {
                accounts,
                leased,
                released: Notify::new(),
            }),
        })
    }

    /// Parse a JSON document: a list of accounts or `{"accounts": [...]}`
    pub fn from_json(raw: &str) -> E2eResult<Self> {
        let file: AccountFile = serde_json::from_str(raw)?;
        Self::new(file.into_accounts())
    }

    /// Parse a YAML document with the same shapes as [`AccountPool::from_json`]
    pub fn from_yaml(raw: &str) -> E2eResult<Self> {
        let file: AccountFile = serde_yaml_ng::from_str(raw)?;
        Self::new(file.into_accounts())
    }

    /// Load a `.json`, `.yaml` or `.yml` file
    pub async fn load(path: &Path) -> E2eResult<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let pool = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&raw)?,
            Some("json") => Self::from_json(&raw)?,
            other => {
                return Err(E2eError::config(format!(
                    "account file {} has unsupported extension {other:?} \
                     (expected json, yaml, yml)",
                    path.display()
                )))
            }
        };
        info!(path = %path.display(), accounts = pool.len(), "account pool loaded");
        Ok(pool)
    }

    /// Number of accounts
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.accounts.len()
    }

    /// Pool has no accounts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.accounts.is_empty()
    }

    /// Accounts not currently leased
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner
            .leased
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| !**l)
            .count()
    }

    /// Account by username, leased or not
    #[must_use]
    pub fn get(&self, username: &str) -> Option<&Account> {
        self.inner.accounts.iter().find(|a| a.username == username)
    }

    /// Every account, in file order
    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.inner.accounts
    }

    /// Lease a free account without waiting
    #[must_use]
    pub fn try_checkout(&self) -> Option<AccountLease> {
        let mut leased = self
            .inner
            .leased
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let index = leased.iter().position(|l| !*l)?;
        leased[index] = true;
        drop(leased);
        debug!(account = %self.inner.accounts[index].username, "account leased");
        Some(AccountLease {
            pool: Arc::clone(&self.inner),
            index,
            released: false,
        })
    }

    /// Lease a free account, waiting for a release if all are taken
    ///
    /// # Errors
    ///
    /// - `AccountPoolExhausted` when the pool is empty or the deadline passes
    ///   before an account frees up
    /// - `Cancelled` when the deadline is cancelled
    pub async fn checkout(&self, deadline: &Deadline) -> E2eResult<AccountLease> {
        if self.is_empty() {
            return Err(E2eError::AccountPoolExhausted {
                message: "the pool has no accounts".to_string(),
            });
        }
        loop {
            let released = self.inner.released.notified();
            if let Some(lease) = self.try_checkout() {
                return Ok(lease);
            }
            let waited = deadline
                .run("a free test account", async {
                    released.await;
                    Ok(())
                })
                .await;
            match waited {
                Ok(()) => {}
                Err(E2eError::DeadlineExceeded { .. }) => {
                    return Err(E2eError::AccountPoolExhausted {
                        message: format!(
                            "all {} accounts stayed leased until the deadline",
                            self.len()
                        ),
                    })
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exclusive use of one account
pub struct AccountLease {
    pool: Arc<PoolInner>,
    index: usize,
    released: bool,
}

impl fmt::Debug for AccountLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountLease")
            .field("account", &self.account().username)
            .field("released", &self.released)
            .finish()
    }
}

impl AccountLease {
    /// Leased account
    #[must_use]
    pub fn account(&self) -> &Account {
        &self.pool.accounts[self.index]
    }

    /// Return the account to the pool
    pub fn release(mut self) {
        self.give_back();
    }

    fn give_back(&mut self) {
        if !self.released {
            self.released = true;
            debug!(account = %self.account().username, "account released");
            self.pool.give_back(self.index);
        }
    }
}

impl Drop for AccountLease {
    fn drop(&mut self) {
        self.give_back();
    }
}
