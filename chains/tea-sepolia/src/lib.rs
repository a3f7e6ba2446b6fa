pub mod client;
pub mod config;
pub mod contracts;
pub mod deploy;
pub mod health;
pub mod menu;
pub mod spammer;
pub mod submitter;
pub mod utils;
