use eframe::egui;
use egui::{RichText, Ui};

use crate::minecraft::{preselect, InstallStatus, VersionSummary};

/// Game page action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameAction {
    /// A different version was picked in the dropdown
    SelectVersion(String),
    /// Reload the version list
    Refresh,
    /// Start the launch flow
    Launch,
}

/// State of the version dropdown
#[derive(Debug, Clone, PartialEq)]
pub enum VersionList {
    Loading,
    Failed(String),
    Loaded(Vec<VersionSummary>),
}

/// Progress of the running installation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallProgress {
    pub status: String,
    pub max: u64,
    pub current: u64,
}

impl InstallProgress {
    pub fn apply(&mut self, update: InstallStatus) {
        match update {
            InstallStatus::Status(status) => {
                self.status = status;
                self.max = 0;
                self.current = 0;
            }
            InstallStatus::Max(max) => self.max = max,
            InstallStatus::Progress(current) => self.current = current,
        }
    }

    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            (self.current.min(self.max) as f64 / self.max as f64) as f32
        }
    }
}

/// Version picker and launch page
pub struct GamePage {
    versions: VersionList,
}

impl GamePage {
    pub fn new() -> Self {
        Self {
            versions: VersionList::Loading,
        }
    }

    pub fn set_loading(&mut self) {
        self.versions = VersionList::Loading;
    }

    pub fn set_failed(&mut self, error: String) {
        self.versions = VersionList::Failed(error);
    }

    pub fn set_versions(&mut self, versions: Vec<VersionSummary>) {
        self.versions = VersionList::Loaded(versions);
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.versions, VersionList::Loading)
    }

    pub fn versions(&self) -> &[VersionSummary] {
        match &self.versions {
            VersionList::Loaded(versions) => versions,
            _ => &[],
        }
    }

    /// Text shown instead of a version
    pub fn placeholder(&self) -> Option<&'static str> {
        match &self.versions {
            VersionList::Loading => Some("Loading versions..."),
            VersionList::Failed(_) => Some("Error loading versions"),
            VersionList::Loaded(versions) if versions.is_empty() => Some("No versions found"),
            VersionList::Loaded(_) => None,
        }
    }

    /// The selected version, if it is one the dropdown offers
    pub fn active_version<'a>(&self, selected: Option<&'a str>) -> Option<&'a str> {
        selected.filter(|id| self.versions().iter().any(|v| v.id == *id))
    }

    /// Version to store once a load finished, when the saved one has to change.
    ///
    /// A failed or empty load keeps the saved selection. A saved version
    /// missing from the list gives way to the newest one.
    pub fn replacement_selection(&self, saved: Option<&str>) -> Option<String> {
        let versions = self.versions();
        let index = preselect(versions, saved)?;
        let candidate = versions[index].id.as_str();
        (saved != Some(candidate)).then(|| candidate.to_string())
    }

    pub fn show<F>(
        &mut self,
        ui: &mut Ui,
        selected: Option<&str>,
        progress: Option<&InstallProgress>,
        mut on_action: F,
    ) where
        F: FnMut(GameAction),
    {
        ui.add_space(10.0);

        let launching = progress.is_some();
        let current_text = match self.placeholder() {
            Some(text) => text.to_string(),
            None => self
                .active_version(selected)
                .unwrap_or("Select a version")
                .to_string(),
        };

        ui.horizontal(|ui| {
            ui.label("Minecraft Version:");

            let refresh = ui.add_enabled(
                !self.is_loading(),
                egui::Button::new("Refresh"),
            );

            egui::ComboBox::from_id_source("version_combo")
                .selected_text(current_text)
                .width((ui.available_width() - 8.0).max(120.0))
                .show_ui(ui, |ui| {
                    for version in self.versions() {
                        let is_selected = selected == Some(version.id.as_str());
                        let date = version
                            .release_date()
                            .map(|d| d.format("%Y-%m-%d").to_string())
                            .unwrap_or_default();
                        let label = format!("{}  ({} {})", version.id, version.version_type, date);
                        if ui.selectable_label(is_selected, label).clicked() && !is_selected {
                            on_action(GameAction::SelectVersion(version.id.clone()));
                        }
                    }
                });

            if refresh.clicked() {
                on_action(GameAction::Refresh);
            }
        });

        if let VersionList::Failed(error) = &self.versions {
            ui.label(RichText::new(error).color(ui.visuals().error_fg_color));
        }

        ui.add_space(10.0);

        let launch = ui.add_enabled(
            !launching,
            egui::Button::new(RichText::new("Launch Game").heading())
                .min_size(egui::vec2(ui.available_width(), 40.0)),
        );
        if launch.clicked() {
            on_action(GameAction::Launch);
        }

        if let Some(progress) = progress {
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(if progress.status.is_empty() {
                    "Preparing..."
                } else {
                    progress.status.as_str()
                });
            });
            let bar = egui::ProgressBar::new(progress.fraction()).show_percentage();
            let bar = if progress.max > 0 {
                bar.text(format!("{}/{}", progress.current, progress.max))
            } else {
                bar
            };
            ui.add(bar);
        }
    }
}
