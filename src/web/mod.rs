pub mod auth;
pub mod handlers;
pub mod models;
pub mod server;
