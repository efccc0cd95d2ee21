use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::account::{AccountBook, AddOutcome, OfflineAccount};

/// Directory name used under the user's config directory
pub const APP_DIR_NAME: &str = "hackerman-launcher";

const KEY_ACCOUNTS: &str = "accounts";
const KEY_SELECTED_ACCOUNT: &str = "selected_account";
const KEY_SELECTED_VERSION: &str = "selected_version_id";
/// Written by older releases, dropped on save
const KEY_RETIRED_ACCOUNT_UUID: &str = "selected_account_uuid";

/// Filesystem locations used by the launcher
#[derive(Debug, Clone, PartialEq)]
pub struct LauncherPaths {
    /// Launcher data directory, also used as the game directory
    pub data_dir: PathBuf,
    /// Persisted configuration
    pub config_file: PathBuf,
    /// Log output
    pub log_file: PathBuf,
    /// Config location used before the move to the XDG directory
    pub legacy_config_file: Option<PathBuf>,
}

impl LauncherPaths {
    /// Resolve the default locations for the current user
    pub fn new() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_home = dirs::config_dir().unwrap_or_else(|| home_dir.join(".config"));

        Self::from_data_dir(
            config_home.join(APP_DIR_NAME),
            Some(home_dir.join(format!(".{}", APP_DIR_NAME)).join("config.json")),
        )
    }

    pub fn from_data_dir(data_dir: PathBuf, legacy_config_file: Option<PathBuf>) -> Self {
        Self {
            config_file: data_dir.join("config.json"),
            log_file: data_dir.join("launcher.log"),
            data_dir,
            legacy_config_file,
        }
    }

    /// Minecraft directory (versions, libraries, assets)
    pub fn game_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Create the data directory if it doesn't exist
    pub fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("Failed to create data directory: {}", self.data_dir.display())
        })
    }
}

impl Default for LauncherPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy the legacy config into the data directory if only the old one exists.
///
/// Returns `true` when a copy was made.
pub fn migrate_legacy_config(paths: &LauncherPaths) -> Result<bool> {
    let Some(legacy) = &paths.legacy_config_file else {
        return Ok(false);
    };

    if !legacy.exists() || paths.config_file.exists() {
        return Ok(false);
    }

    paths.ensure_data_dir()?;
    let content = fs::read(legacy)
        .with_context(|| format!("Failed to read legacy config: {}", legacy.display()))?;
    fs::write(&paths.config_file, content)
        .with_context(|| format!("Failed to write config: {}", paths.config_file.display()))?;

    info!(
        "Migrated configuration from {} to {}",
        legacy.display(),
        paths.config_file.display()
    );
    Ok(true)
}

/// Account entry as found on disk; old releases stored bare usernames
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredAccount {
    Name(String),
    Record {
        username: String,
        #[serde(default)]
        uuid: Option<String>,
    },
}

/// On-disk layout written by `save`
#[derive(Serialize)]
struct StoredConfig<'a> {
    accounts: Vec<OfflineAccount>,
    selected_account: Option<&'a str>,
    selected_version_id: Option<&'a str>,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

/// Loaded launcher configuration bound to its file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    book: AccountBook,
    selected_version_id: Option<String>,
    /// Keys this launcher doesn't know about, kept as-is
    extra: Map<String, Value>,
}

impl ConfigStore {
    /// Load the configuration, falling back to defaults on any problem.
    ///
    /// Legacy account entries are migrated and written back, unless the
    /// file existed but was empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut file_was_empty = false;

        let mut root = Map::new();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) if content.trim().is_empty() => {
                    file_was_empty = true;
                    warn!("Config file is empty, starting with defaults.");
                }
                Ok(content) => match serde_json::from_str::<Value>(content.trim()) {
                    Ok(Value::Object(map)) => root = map,
                    Ok(_) => {
                        error!("Config file is not a JSON object. Starting with default config.")
                    }
                    Err(e) => error!(
                        "Could not decode {}: {}. Starting with default config.",
                        path.display(),
                        e
                    ),
                },
                Err(e) => error!("Could not read {}: {}", path.display(), e),
            }
        }

        let (accounts, migration_needed) = match root.remove(KEY_ACCOUNTS) {
            Some(Value::Array(entries)) => migrate_accounts(entries),
            Some(Value::Null) | None => (Vec::new(), false),
            Some(other) => {
                warn!("Ignoring malformed accounts entry: {}", other);
                (Vec::new(), true)
            }
        };

        let selected_account = take_string(&mut root, KEY_SELECTED_ACCOUNT);
        let selected_version_id = take_string(&mut root, KEY_SELECTED_VERSION);
        root.remove(KEY_RETIRED_ACCOUNT_UUID);

        let store = Self {
            path,
            book: AccountBook::new(accounts, selected_account),
            selected_version_id,
            extra: root,
        };

        if migration_needed && !file_was_empty {
            info!("Writing migrated account list");
            if let Err(e) = store.save() {
                error!("Failed to save migrated config: {:#}", e);
            }
        }

        store
    }

    /// Write the configuration back to its file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let stored = StoredConfig {
            accounts: self.book.normalized_accounts(),
            selected_account: self.book.selected(),
            selected_version_id: self.selected_version_id.as_deref(),
            extra: &self.extra,
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        stored
            .serialize(&mut serializer)
            .context("Failed to serialize config")?;

        fs::write(&self.path, buf)
            .with_context(|| format!("Failed to write config file: {}", self.path.display()))?;

        info!("Configuration saved to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn accounts(&self) -> &[OfflineAccount] {
        self.book.accounts()
    }

    pub fn account_book(&self) -> &AccountBook {
        &self.book
    }

    pub fn selected_account(&self) -> Option<&str> {
        self.book.selected()
    }

    pub fn selected_version_id(&self) -> Option<&str> {
        self.selected_version_id.as_deref()
    }

    pub fn add_account(&mut self, raw: &str) -> AddOutcome {
        self.book.add(raw)
    }

    pub fn select_account(&mut self, username: &str) -> bool {
        self.book.select(username)
    }

    pub fn remove_account(&mut self, username: &str) -> bool {
        self.book.remove(username)
    }

    pub fn set_selected_version(&mut self, version_id: Option<String>) {
        self.selected_version_id = version_id;
    }
}

fn take_string(root: &mut Map<String, Value>, key: &str) -> Option<String> {
    match root.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Turn stored entries into accounts, reporting whether anything changed
fn migrate_accounts(entries: Vec<Value>) -> (Vec<OfflineAccount>, bool) {
    let mut accounts: Vec<OfflineAccount> = Vec::with_capacity(entries.len());
    let mut migrated = false;

    for entry in entries {
        let account = match serde_json::from_value::<StoredAccount>(entry) {
            Ok(StoredAccount::Name(username)) => {
                migrated = true;
                OfflineAccount::new(username)
            }
            Ok(StoredAccount::Record { username, uuid }) => match uuid {
                Some(uuid) if !uuid.is_empty() => OfflineAccount { username, uuid },
                _ => {
                    migrated = true;
                    OfflineAccount::new(username)
                }
            },
            Err(e) => {
                warn!("Dropping unreadable account entry: {}", e);
                migrated = true;
                continue;
            }
        };

        if account.username.trim().is_empty() {
            warn!("Dropping account entry without a username");
            migrated = true;
            continue;
        }
        if accounts.iter().any(|a| a.username == account.username) {
            warn!("Dropping duplicate account: {}", account.username);
            migrated = true;
            continue;
        }
        accounts.push(account);
    }

    (accounts, migrated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::offline_uuid;
    use tempfile::TempDir;

    fn config_path(dir: &TempDir) -> PathBuf {
        dir.path().join("config.json")
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::load(config_path(&dir));
        assert!(store.accounts().is_empty());
        assert_eq!(store.selected_account(), None);
        assert_eq!(store.selected_version_id(), None);
        assert!(!config_path(&dir).exists());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::load(config_path(&dir));
        store.add_account("Steve");
        store.add_account("Alex");
        store.select_account("Alex");
        store.set_selected_version(Some("1.20.4".to_string()));
        store.save().unwrap();

        let loaded = ConfigStore::load(config_path(&dir));
        assert_eq!(loaded.accounts(), store.accounts());
        assert_eq!(loaded.selected_account(), Some("Alex"));
        assert_eq!(loaded.selected_version_id(), Some("1.20.4"));
    }

    #[test]
    fn saved_file_uses_four_space_indent() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::load(config_path(&dir));
        store.add_account("Steve");
        store.save().unwrap();

        let content = fs::read_to_string(config_path(&dir)).unwrap();
        assert!(content.contains("\n    \"accounts\": ["));
        assert!(content.contains("\"selected_account\": null"));
    }

    #[test]
    fn legacy_string_accounts_are_migrated_and_saved() {
        let dir = TempDir::new().unwrap();
        fs::write(
            config_path(&dir),
            r#"{"accounts": ["Steve", {"username": "Alex"}], "selected_account": "Steve"}"#,
        )
        .unwrap();

        let store = ConfigStore::load(config_path(&dir));
        assert_eq!(store.accounts().len(), 2);
        assert_eq!(store.accounts()[0].uuid, offline_uuid("Steve").to_string());
        assert_eq!(store.accounts()[1].uuid, offline_uuid("Alex").to_string());
        assert_eq!(store.selected_account(), Some("Steve"));

        let written = read_json(&config_path(&dir));
        assert_eq!(written["accounts"][0]["username"], "Steve");
        assert_eq!(
            written["accounts"][0]["uuid"],
            offline_uuid("Steve").to_string()
        );
        assert_eq!(written["selected_version_id"], Value::Null);
    }

    #[test]
    fn existing_uuid_is_kept() {
        let dir = TempDir::new().unwrap();
        fs::write(
            config_path(&dir),
            r#"{"accounts": [{"username": "Steve", "uuid": "custom-id"}]}"#,
        )
        .unwrap();

        let store = ConfigStore::load(config_path(&dir));
        assert_eq!(store.accounts()[0].uuid, "custom-id");
        store.save().unwrap();
        assert_eq!(read_json(&config_path(&dir))["accounts"][0]["uuid"], "custom-id");
    }

    #[test]
    fn malformed_json_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(config_path(&dir), "{ not json").unwrap();

        let store = ConfigStore::load(config_path(&dir));
        assert!(store.accounts().is_empty());
        assert_eq!(store.selected_version_id(), None);
        assert_eq!(fs::read_to_string(config_path(&dir)).unwrap(), "{ not json");
    }

    #[test]
    fn empty_file_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        fs::write(config_path(&dir), "   \n").unwrap();

        let store = ConfigStore::load(config_path(&dir));
        assert!(store.accounts().is_empty());
        assert_eq!(fs::read_to_string(config_path(&dir)).unwrap(), "   \n");
    }

    #[test]
    fn unknown_keys_survive_and_retired_key_is_dropped() {
        let dir = TempDir::new().unwrap();
        fs::write(
            config_path(&dir),
            r#"{"accounts": [], "theme": "dark", "selected_account_uuid": "abc"}"#,
        )
        .unwrap();

        let store = ConfigStore::load(config_path(&dir));
        store.save().unwrap();

        let written = read_json(&config_path(&dir));
        assert_eq!(written["theme"], "dark");
        assert!(written.get("selected_account_uuid").is_none());
        assert!(written.get("selected_version_id").is_some());
    }

    #[test]
    fn unreadable_and_duplicate_entries_are_dropped() {
        let dir = TempDir::new().unwrap();
        fs::write(
            config_path(&dir),
            r#"{"accounts": ["Steve", 42, {"uuid": "x"}, {"username": "Steve", "uuid": "y"}]}"#,
        )
        .unwrap();

        let store = ConfigStore::load(config_path(&dir));
        assert_eq!(store.accounts().len(), 1);
        assert_eq!(store.accounts()[0].username, "Steve");
    }

    #[test]
    fn blank_usernames_are_dropped_and_written_back() {
        let dir = TempDir::new().unwrap();
        fs::write(
            config_path(&dir),
            r#"{"accounts": [{"username": "", "uuid": ""}, "", "  ", "Alex"]}"#,
        )
        .unwrap();

        let store = ConfigStore::load(config_path(&dir));
        let names: Vec<_> = store.accounts().iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, ["Alex"]);

        let written = read_json(&config_path(&dir));
        assert_eq!(written["accounts"].as_array().unwrap().len(), 1);
        assert_eq!(written["accounts"][0]["username"], "Alex");
    }

    #[test]
    fn legacy_config_is_copied_once() {
        let dir = TempDir::new().unwrap();
        let legacy = dir.path().join("old").join("config.json");
        fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        fs::write(&legacy, r#"{"accounts": ["Steve"]}"#).unwrap();

        let paths = LauncherPaths::from_data_dir(dir.path().join("new"), Some(legacy.clone()));
        assert!(migrate_legacy_config(&paths).unwrap());
        assert_eq!(
            fs::read_to_string(&paths.config_file).unwrap(),
            r#"{"accounts": ["Steve"]}"#
        );

        fs::write(&legacy, r#"{"accounts": ["Alex"]}"#).unwrap();
        assert!(!migrate_legacy_config(&paths).unwrap());
        assert!(fs::read_to_string(&paths.config_file).unwrap().contains("Steve"));
    }

    #[test]
    fn paths_live_under_data_dir() {
        let paths = LauncherPaths::from_data_dir(PathBuf::from("/tmp/launcher"), None);
        assert_eq!(paths.config_file, PathBuf::from("/tmp/launcher/config.json"));
        assert_eq!(paths.log_file, PathBuf::from("/tmp/launcher/launcher.log"));
        assert_eq!(paths.game_dir(), Path::new("/tmp/launcher"));
    }
}
