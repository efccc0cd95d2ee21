use eframe::egui;
use log::{error, info};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::time::Duration;
use tokio::runtime::Runtime;

use crate::account::AddOutcome;
use crate::config::{ConfigStore, LauncherPaths};
use crate::launch::{self, LaunchStatus};
use crate::minecraft::{self, Endpoints, VersionSummary};
use crate::ui::account_page::{AccountAction, AccountPage};
use crate::ui::game_page::{GameAction, GamePage, InstallProgress};
use crate::ui::notification::NotificationQueue;

/// Page shown below the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Accounts,
    Game,
}

type VersionsResult = Result<Vec<VersionSummary>, String>;

/// Minecraft launcher window
pub struct LauncherApp {
    /// Current page
    page: Page,
    paths: LauncherPaths,
    /// Persisted accounts and selections
    config: ConfigStore,

    // Tokio runtime for version loading and launches
    rt: Runtime,
    client: reqwest::Client,
    endpoints: Endpoints,

    account_page: AccountPage,
    game_page: GamePage,
    notifications: NotificationQueue,

    // Channel for the version list being loaded
    versions_receiver: Option<Receiver<VersionsResult>>,

    // Channel for the running launch job
    launch_receiver: Option<Receiver<LaunchStatus>>,
    install_progress: Option<InstallProgress>,
}

impl LauncherApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        paths: LauncherPaths,
        config: ConfigStore,
        rt: Runtime,
        client: reqwest::Client,
    ) -> Self {
        let account_page = AccountPage::new(config.selected_account());

        let mut app = Self {
            page: Page::Accounts,
            paths,
            config,
            rt,
            client,
            endpoints: Endpoints::default(),
            account_page,
            game_page: GamePage::new(),
            notifications: NotificationQueue::new(),
            versions_receiver: None,
            launch_receiver: None,
            install_progress: None,
        };

        app.load_versions();
        app
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            error!("Failed to save configuration: {:#}", e);
        }
    }

    /// Start loading the version list in the background
    fn load_versions(&mut self) {
        if self.versions_receiver.is_some() {
            return;
        }

        self.game_page.set_loading();

        let (tx, rx) = channel();
        self.versions_receiver = Some(rx);

        let client = self.client.clone();
        let endpoints = self.endpoints.clone();
        let game_dir = self.paths.game_dir().to_path_buf();

        self.rt.spawn(async move {
            let result = minecraft::available_versions(&client, &endpoints, &game_dir)
                .await
                .map_err(|e| e.to_string());
            if tx.send(result).is_err() {
                error!("Failed to send version list to main thread");
            }
        });
    }

    /// Check for a finished version load
    fn check_versions(&mut self) {
        let Some(receiver) = &self.versions_receiver else {
            return;
        };

        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err("version loading stopped unexpectedly".to_string()),
        };
        self.versions_receiver = None;

        match result {
            Ok(versions) => {
                if versions.is_empty() {
                    info!("No versions found to display.");
                }
                self.game_page.set_versions(versions);
            }
            Err(e) => {
                error!("Error loading versions: {}", e);
                self.notifications
                    .push("Error", format!("Failed to load Minecraft versions: {}", e));
                self.game_page.set_failed(e);
            }
        }
        self.sync_selection();
    }

    /// Bring the saved version in line with the freshly loaded list
    fn sync_selection(&mut self) {
        let saved = self.config.selected_version_id().map(str::to_string);

        match self.game_page.replacement_selection(saved.as_deref()) {
            Some(newest) => {
                info!("No config selection, setting active version to: {}", newest);
                self.config.set_selected_version(Some(newest));
                self.save_config();
            }
            None => {
                if let Some(id) = self.game_page.active_version(saved.as_deref()) {
                    info!("Pre-selected version from config: {}", id);
                }
            }
        }
    }

    /// Drain status updates from the launch job
    fn check_launch(&mut self) {
        let mut finished = false;
        let mut collected = Vec::new();

        if let Some(receiver) = &self.launch_receiver {
            loop {
                match receiver.try_recv() {
                    Ok(status) => collected.push(status),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        finished = true;
                        break;
                    }
                }
            }
        }

        for status in collected {
            match status {
                LaunchStatus::Notice { title, message } => self.notifications.push(title, message),
                LaunchStatus::Install(update) => {
                    if let Some(progress) = &mut self.install_progress {
                        progress.apply(update);
                    }
                }
                LaunchStatus::Finished { launched } => {
                    info!("Launch job finished (game started: {})", launched);
                    finished = true;
                }
            }
        }

        if finished {
            self.launch_receiver = None;
            self.install_progress = None;
        }
    }

    fn start_launch(&mut self) {
        if self.launch_receiver.is_some() {
            return;
        }

        let version_id = self
            .game_page
            .active_version(self.config.selected_version_id())
            .map(str::to_string);

        let plan = match launch::plan_launch(version_id.as_deref(), self.config.account_book()) {
            Ok(plan) => plan,
            Err(message) => {
                self.notifications.push("Error", message);
                return;
            }
        };
        self.save_config();

        info!("Launching {} as {}", plan.version_id, plan.username);

        let (tx, rx) = channel();
        self.launch_receiver = Some(rx);
        self.install_progress = Some(InstallProgress::default());

        let client = self.client.clone();
        let endpoints = self.endpoints.clone();
        let game_dir = self.paths.game_dir().to_path_buf();
        self.rt.spawn(launch::run_launch(client, endpoints, game_dir, plan, tx));
    }

    fn handle_account_action(&mut self, action: AccountAction) {
        match action {
            AccountAction::Add(raw) => match self.config.add_account(&raw) {
                AddOutcome::Added => {
                    info!("Added offline account: {}", raw.trim());
                    self.save_config();
                }
                AddOutcome::Duplicate => info!("Account {} already exists", raw.trim()),
                AddOutcome::Empty => {}
            },
            AccountAction::Select(username) => {
                if self.config.select_account(&username) {
                    info!("Selected account: {}", username);
                    self.save_config();
                }
            }
            AccountAction::Delete(username) => {
                if self.config.remove_account(&username) {
                    info!("Deleted account: {}", username);
                    self.save_config();
                }
            }
        }
    }

    fn handle_game_action(&mut self, action: GameAction) {
        match action {
            GameAction::SelectVersion(version_id) => {
                let previous = self.config.selected_version_id().map(str::to_string);
                info!(
                    "Version selected in UI: {} (previously {})",
                    version_id,
                    previous.as_deref().unwrap_or("none")
                );
                self.config.set_selected_version(Some(version_id));
                self.save_config();
            }
            GameAction::Refresh => self.load_versions(),
            GameAction::Launch => self.start_launch(),
        }
    }
}

impl eframe::App for LauncherApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_versions();
        self.check_launch();

        // A visible notification blocks everything else
        let enabled = !self.notifications.is_open();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.set_enabled(enabled);
            ui.horizontal(|ui| {
                ui.heading("Minecraft Launcher");
                ui.separator();
                ui.selectable_value(&mut self.page, Page::Accounts, "Accounts");
                ui.selectable_value(&mut self.page, Page::Game, "Game");
            });
        });

        let mut account_action = None;
        let mut game_action = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.set_enabled(enabled);
            match self.page {
                Page::Accounts => {
                    self.account_page
                        .show(ui, self.config.account_book(), |a| account_action = Some(a));
                }
                Page::Game => {
                    self.game_page.show(
                        ui,
                        self.config.selected_version_id(),
                        self.install_progress.as_ref(),
                        |a| game_action = Some(a),
                    );
                }
            }
        });

        // Handle actions after the UI code, outside the panel borrows
        if let Some(action) = account_action {
            self.handle_account_action(action);
        }
        if let Some(action) = game_action {
            self.handle_game_action(action);
        }

        self.notifications.show(ctx);

        if self.versions_receiver.is_some() || self.launch_receiver.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn on_close_event(&mut self) -> bool {
        info!("Window closing, saving configuration");
        self.save_config();
        true
    }
}
