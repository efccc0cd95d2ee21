use anyhow::{Context, Result};
use log::{error, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use uuid::Uuid;

use crate::account::AccountBook;
use crate::minecraft::{self, ChannelProgress, Endpoints, InstallStatus, LaunchOptions};

pub const NO_VERSION_MESSAGE: &str = "Please select a Minecraft version first.";
pub const NO_ACCOUNT_MESSAGE: &str = "Please select an offline account first.";
pub const JAVA_MISSING_MESSAGE: &str =
    "Java executable not found or not correctly configured. Please ensure Java is installed and in your PATH.";

/// Update from a running launch job
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchStatus {
    /// Message for a modal notification
    Notice { title: String, message: String },
    /// Installation progress
    Install(InstallStatus),
    /// Job ended; `launched` is true once the game process started
    Finished { launched: bool },
}

impl LaunchStatus {
    fn notice(title: &str, message: impl Into<String>) -> Self {
        LaunchStatus::Notice {
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// Validated launch target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub version_id: String,
    pub username: String,
    pub uuid: String,
}

/// Check that a version and an account are selected
pub fn plan_launch(
    version_id: Option<&str>,
    book: &AccountBook,
) -> std::result::Result<LaunchPlan, &'static str> {
    let version_id = version_id
        .filter(|v| !v.is_empty())
        .ok_or(NO_VERSION_MESSAGE)?;
    let username = book.selected().ok_or(NO_ACCOUNT_MESSAGE)?;

    Ok(LaunchPlan {
        version_id: version_id.to_string(),
        username: username.to_string(),
        uuid: book.uuid_for(username),
    })
}

/// Options for an offline session with a fresh random token
pub fn offline_options(plan: &LaunchPlan, java: PathBuf) -> LaunchOptions {
    let session_token = Uuid::new_v4().to_string();
    LaunchOptions {
        username: plan.username.clone(),
        uuid: plan.uuid.clone(),
        token: session_token.clone(),
        session_id: session_token,
        user_type: "legacy".to_string(),
        executable_path: Some(java),
        ..LaunchOptions::default()
    }
}

/// Start the game without waiting for it
pub fn spawn_game(command: &[String], game_dir: &Path) -> io::Result<Child> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
    Command::new(program).args(args).current_dir(game_dir).spawn()
}

/// Wait for the game on a detached thread so it is reaped once it exits
pub fn watch_game(mut child: Child) -> JoinHandle<Option<ExitStatus>> {
    let pid = child.id();
    thread::spawn(move || match child.wait() {
        Ok(status) => {
            info!("Minecraft (pid {}) exited with {}", pid, status);
            Some(status)
        }
        Err(e) => {
            warn!("Could not wait for Minecraft (pid {}): {}", pid, e);
            None
        }
    })
}

/// User-facing text for a failed spawn
pub fn spawn_error_message(e: &io::Error) -> String {
    if e.kind() == io::ErrorKind::NotFound {
        JAVA_MISSING_MESSAGE.to_string()
    } else {
        format!("Failed to launch Minecraft: {}", e)
    }
}

/// Install the version, build the command and start the game.
///
/// Every user-visible outcome is sent on `tx`; the last message is always
/// `Finished`.
pub async fn run_launch(
    client: reqwest::Client,
    endpoints: Endpoints,
    game_dir: PathBuf,
    plan: LaunchPlan,
    tx: Sender<LaunchStatus>,
) {
    let launched = match launch(&client, &endpoints, &game_dir, &plan, &tx).await {
        Ok(launched) => launched,
        Err(e) => {
            error!("Error launching Minecraft: {:#}", e);
            let _ = tx.send(LaunchStatus::notice(
                "Error",
                format!("Failed to launch Minecraft: {:#}", e),
            ));
            false
        }
    };
    let _ = tx.send(LaunchStatus::Finished { launched });
}

async fn launch(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    game_dir: &Path,
    plan: &LaunchPlan,
    tx: &Sender<LaunchStatus>,
) -> Result<bool> {
    let version_id = &plan.version_id;

    let _ = tx.send(LaunchStatus::notice(
        "Info",
        format!("Downloading Minecraft version {}...", version_id),
    ));
    info!("Downloading Minecraft version {}...", version_id);

    let progress = ChannelProgress::new(tx.clone(), LaunchStatus::Install);
    if let Err(e) = minecraft::install_version(client, endpoints, game_dir, version_id, &progress).await {
        error!("Error downloading Minecraft {}: {}", version_id, e);
        let _ = tx.send(LaunchStatus::notice(
            "Error",
            format!("Failed to download Minecraft {}: {}", version_id, e),
        ));
        return Ok(false);
    }
    let _ = tx.send(LaunchStatus::notice(
        "Success",
        format!("Minecraft version {} downloaded successfully.", version_id),
    ));
    info!("Successfully downloaded Minecraft {}.", version_id);

    let Some(java) = minecraft::find_java() else {
        let _ = tx.send(LaunchStatus::notice("Error", JAVA_MISSING_MESSAGE));
        return Ok(false);
    };
    info!("Using Java executable: {}", java.display());

    let options = offline_options(plan, java);
    let command = minecraft::build_command(game_dir, version_id, &options)
        .with_context(|| format!("Could not build the launch command for {}", version_id))?;

    info!("Launching command: {}", command.join(" "));
    let _ = tx.send(LaunchStatus::notice(
        "Launching Game",
        format!(
            "Launching Minecraft {} with account {}...",
            version_id, plan.username
        ),
    ));

    match spawn_game(&command, game_dir) {
        Ok(child) => {
            info!("Minecraft started with pid {}", child.id());
            watch_game(child);
            Ok(true)
        }
        Err(e) => {
            error!("Failed to start Minecraft: {}", e);
            let _ = tx.send(LaunchStatus::notice("Error", spawn_error_message(&e)));
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::offline_uuid;
    use tempfile::TempDir;

    #[test]
    fn version_is_checked_before_account() {
        let book = AccountBook::default();
        assert_eq!(plan_launch(None, &book), Err(NO_VERSION_MESSAGE));
        assert_eq!(plan_launch(Some(""), &book), Err(NO_VERSION_MESSAGE));
        assert_eq!(plan_launch(Some("1.20.4"), &book), Err(NO_ACCOUNT_MESSAGE));
    }

    #[test]
    fn plan_uses_selected_account_uuid() {
        let mut book = AccountBook::default();
        book.add("Steve");
        book.select("Steve");

        let plan = plan_launch(Some("1.20.4"), &book).unwrap();
        assert_eq!(plan.username, "Steve");
        assert_eq!(plan.uuid, offline_uuid("Steve").to_string());
    }

    #[test]
    fn offline_options_share_one_random_token() {
        let plan = LaunchPlan {
            version_id: "1.20.4".to_string(),
            username: "Steve".to_string(),
            uuid: "uuid-1".to_string(),
        };
        let a = offline_options(&plan, PathBuf::from("/usr/bin/java"));
        let b = offline_options(&plan, PathBuf::from("/usr/bin/java"));

        assert_eq!(a.token, a.session_id);
        assert_ne!(a.token, b.token);
        assert_eq!(Uuid::parse_str(&a.token).unwrap().get_version_num(), 4);
        assert_eq!(a.user_type, "legacy");
        assert_eq!(a.executable_path, Some(PathBuf::from("/usr/bin/java")));
    }

    #[test]
    fn missing_binary_maps_to_java_message() {
        let dir = TempDir::new().unwrap();
        let command = vec![dir
            .path()
            .join("no-such-java")
            .display()
            .to_string()];

        let err = spawn_game(&command, dir.path()).unwrap_err();
        assert_eq!(spawn_error_message(&err), JAVA_MISSING_MESSAGE);
    }

    #[test]
    fn other_spawn_errors_are_reported_verbatim() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(spawn_error_message(&err), "Failed to launch Minecraft: denied");
        assert_eq!(
            spawn_game(&[], Path::new(".")).unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }

    #[cfg(unix)]
    #[test]
    fn spawn_runs_in_game_dir() {
        let dir = TempDir::new().unwrap();
        let command = vec!["sh".to_string(), "-c".to_string(), "pwd > where.txt".to_string()];

        let child = spawn_game(&command, dir.path()).unwrap();
        assert!(watch_game(child).join().unwrap().unwrap().success());
        let written = std::fs::read_to_string(dir.path().join("where.txt")).unwrap();
        assert_eq!(
            std::fs::canonicalize(written.trim()).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn exited_game_is_reaped_with_its_status() {
        let dir = TempDir::new().unwrap();
        let command = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];

        let child = spawn_game(&command, dir.path()).unwrap();
        let status = watch_game(child).join().unwrap().unwrap();
        assert_eq!(status.code(), Some(3));
    }
}
