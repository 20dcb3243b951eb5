pub mod app;
pub mod attributes;
pub mod command;
pub mod config;
pub mod error;
pub mod export;
pub mod fpl_api;
pub mod http_client;
pub mod loaders;
pub mod logging;
pub mod picks;
pub mod report;
pub mod repository;
pub mod schema;
pub mod snapshot_source;
