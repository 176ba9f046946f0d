pub mod chat;
pub mod connection;
pub mod error;
pub mod presentation;
pub mod settings;
pub mod shell;
pub mod wallet;

pub use error::{AppError, AppResult};
