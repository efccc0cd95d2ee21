use eframe::egui;
use egui::{Layout, RichText, Ui};

use crate::account::AccountBook;

/// Account page action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountAction {
    /// Add the typed username (untrimmed)
    Add(String),
    /// Make the highlighted account the active one
    Select(String),
    /// Delete the highlighted account
    Delete(String),
}

/// Offline account management page
pub struct AccountPage {
    /// Username entry contents
    username_input: String,
    /// Row highlighted in the list
    highlighted: Option<String>,
}

impl AccountPage {
    /// Create the page with the active account highlighted
    pub fn new(selected: Option<&str>) -> Self {
        Self {
            username_input: String::new(),
            highlighted: selected.map(str::to_string),
        }
    }

    pub fn show<F>(&mut self, ui: &mut Ui, book: &AccountBook, mut on_action: F)
    where
        F: FnMut(AccountAction),
    {
        ui.add_space(10.0);

        let mut submit = false;
        ui.horizontal(|ui| {
            ui.label("Username:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.username_input)
                    .hint_text("Enter username")
                    .desired_width(f32::INFINITY),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
            }
        });

        if ui
            .add_sized([ui.available_width(), 24.0], egui::Button::new("Add Account"))
            .clicked()
        {
            submit = true;
        }

        if submit && !self.username_input.trim().is_empty() {
            on_action(AccountAction::Add(std::mem::take(&mut self.username_input)));
        }

        ui.separator();

        match book.selected() {
            Some(name) if book.contains(name) => {
                ui.label(format!("Active account: {}", name));
            }
            Some(name) => {
                ui.label(RichText::new(format!("Active account: {} (not in list)", name)).weak());
            }
            None => {
                ui.label(RichText::new("No active account").weak());
            }
        }

        ui.strong("Offline Accounts");

        let list_height = (ui.available_height() - 40.0).max(80.0);
        egui::ScrollArea::vertical()
            .max_height(list_height)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if book.accounts().is_empty() {
                    ui.label(RichText::new("No accounts yet").weak());
                }
                for account in book.accounts() {
                    let is_highlighted = self.highlighted.as_deref() == Some(account.username.as_str());
                    let label = ui.add_sized(
                        [ui.available_width(), 20.0],
                        egui::SelectableLabel::new(is_highlighted, account.username.as_str()),
                    );
                    if label.clicked() {
                        self.highlighted = Some(account.username.clone());
                    }
                    label.on_hover_text(format!("UUID: {}", account.uuid));
                }
            });

        // Highlight goes away with its account
        if let Some(name) = &self.highlighted {
            if !book.contains(name) {
                self.highlighted = None;
            }
        }

        ui.with_layout(Layout::bottom_up(egui::Align::Min), |ui| {
            ui.columns(2, |columns| {
                let target = self.highlighted.clone();
                let has_target = target.is_some();

                let select = columns[0].add_enabled(has_target, egui::Button::new("Select Account"));
                let delete = columns[1].add_enabled(has_target, egui::Button::new("Delete Account"));

                if let Some(name) = target {
                    if select.clicked() {
                        on_action(AccountAction::Select(name));
                    } else if delete.clicked() {
                        on_action(AccountAction::Delete(name));
                    }
                }
            });
        });
    }
}
