pub mod accounts;
pub mod api;
pub mod commands;
pub mod config;
pub mod eth;
pub mod pipeline;
pub mod util;
