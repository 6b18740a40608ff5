pub mod api;
pub mod assistant;
pub mod client;
pub mod config;
pub mod db;
pub mod models;
pub mod render;
