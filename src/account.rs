use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derive the identifier of an offline player from its username.
///
/// Name-based (version 3) UUID in the OID namespace, so the same username
/// always maps to the same player.
pub fn offline_uuid(username: &str) -> Uuid {
    Uuid::new_v3(&Uuid::NAMESPACE_OID, username.as_bytes())
}

/// Offline player identity
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct OfflineAccount {
    /// Player name shown in game
    pub username: String,
    /// Hyphenated player UUID
    pub uuid: String,
}

impl OfflineAccount {
    /// Create an account with the derived UUID
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        let uuid = offline_uuid(&username).hyphenated().to_string();
        Self { username, uuid }
    }
}

/// Result of adding an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Account appended to the list
    Added,
    /// Input was blank after trimming
    Empty,
    /// Username already present
    Duplicate,
}

/// Ordered list of offline accounts plus the selected username
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountBook {
    accounts: Vec<OfflineAccount>,
    selected: Option<String>,
}

impl AccountBook {
    /// Build a book from already-migrated accounts
    pub fn new(accounts: Vec<OfflineAccount>, selected: Option<String>) -> Self {
        Self { accounts, selected }
    }

    pub fn accounts(&self) -> &[OfflineAccount] {
        &self.accounts
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.accounts.iter().any(|a| a.username == username)
    }

    /// Add an account from raw user input
    pub fn add(&mut self, raw: &str) -> AddOutcome {
        let username = raw.trim();
        if username.is_empty() {
            return AddOutcome::Empty;
        }
        if self.contains(username) {
            return AddOutcome::Duplicate;
        }

        info!("Adding offline account: {}", username);
        self.accounts.push(OfflineAccount::new(username));
        AddOutcome::Added
    }

    /// Select an account that is in the list
    pub fn select(&mut self, username: &str) -> bool {
        if !self.contains(username) {
            return false;
        }
        self.selected = Some(username.to_string());
        info!("Selected account: {}", username);
        true
    }

    /// Remove an account, clearing the selection if it pointed at it
    pub fn remove(&mut self, username: &str) -> bool {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.username != username);
        if self.accounts.len() == before {
            return false;
        }

        if self.selected.as_deref() == Some(username) {
            self.selected = None;
        }
        info!("Deleted account: {}", username);
        true
    }

    /// UUID to launch `username` with
    pub fn uuid_for(&self, username: &str) -> String {
        self.accounts
            .iter()
            .find(|a| a.username == username && !a.uuid.is_empty())
            .map(|a| a.uuid.clone())
            .unwrap_or_else(|| offline_uuid(username).hyphenated().to_string())
    }

    /// Accounts with empty identifiers filled in
    pub(crate) fn normalized_accounts(&self) -> Vec<OfflineAccount> {
        self.accounts
            .iter()
            .map(|a| OfflineAccount {
                username: a.username.clone(),
                uuid: self.uuid_for(&a.username),
            })
            .collect()
    }
}
