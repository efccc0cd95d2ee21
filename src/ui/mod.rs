pub mod account_page;
pub mod app;
pub mod game_page;
pub mod notification;
