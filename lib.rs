pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod ids;
pub mod jobs;
pub mod models;
pub mod persistence;
pub mod recognition;
pub mod schema;
pub mod seed;
pub mod store;
pub mod views;

pub use crate::error::{Error, Result};
pub use crate::store::InventoryStore;
pub use crate::views::InventoryView;
