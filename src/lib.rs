pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod output;
pub mod poller;
pub mod services;
