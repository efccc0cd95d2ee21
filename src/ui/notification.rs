use eframe::egui;
use std::collections::VecDeque;

/// A message waiting for the user's OK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Modal notifications, shown one at a time in arrival order
#[derive(Debug, Default)]
pub struct NotificationQueue {
    pending: VecDeque<Notification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.pending.push_back(Notification {
            title: title.into(),
            message: message.into(),
        });
    }

    /// Notification currently on screen
    pub fn current(&self) -> Option<&Notification> {
        self.pending.front()
    }

    pub fn is_open(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Close the visible notification and move to the next one
    pub fn dismiss(&mut self) -> Option<Notification> {
        self.pending.pop_front()
    }

    /// Draw the front notification as a centered window
    pub fn show(&mut self, ctx: &egui::Context) {
        let Some(notification) = self.current() else {
            return;
        };

        let mut dismissed = false;
        egui::Window::new(notification.title.as_str())
            .id(egui::Id::new("notification"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.set_min_width(280.0);
                ui.label(notification.message.as_str());
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });

        if dismissed || ctx.input(|i| i.key_pressed(egui::Key::Enter)) {
            self.dismiss();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_are_shown_in_arrival_order() {
        let mut queue = NotificationQueue::new();
        assert!(!queue.is_open());

        queue.push("Info", "Downloading Minecraft version 1.20.4...");
        queue.push("Error", "Failed to download Minecraft 1.20.4: offline");

        assert!(queue.is_open());
        assert_eq!(queue.pending.len(), 2);
        assert_eq!(queue.current().unwrap().title, "Info");

        let first = queue.dismiss().unwrap();
        assert_eq!(first.message, "Downloading Minecraft version 1.20.4...");
        assert_eq!(queue.current().unwrap().title, "Error");

        queue.dismiss();
        assert!(queue.current().is_none());
        assert!(queue.dismiss().is_none());
    }
}
