//! Telegram bot that broadcasts daily airing listings to subscribed channels
//! and answers on-demand lookup, search, and subscription commands.

pub mod broadcast;
pub mod config;
pub mod db;
pub mod format;
pub mod handlers;
pub mod model;
pub mod outbound;
pub mod upstream;
