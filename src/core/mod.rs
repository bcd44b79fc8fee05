pub mod chapters;
pub mod database;
pub mod error;
pub mod ids;
pub mod metrics;
pub mod models;
pub mod seed;
