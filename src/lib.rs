pub mod api;
pub mod broadcaster;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
