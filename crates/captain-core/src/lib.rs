pub mod action;
pub mod card;
pub mod card_id;
pub mod catalog;
pub mod client;
pub mod codec;
pub mod config;
pub mod db;
pub mod editor;
pub mod error;
pub mod history;
pub mod io;
pub mod session;

pub use error::{CaptainError, Result};
