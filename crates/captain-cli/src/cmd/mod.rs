pub mod card;
pub mod catalog;
pub mod config;
pub mod edit;
pub mod robot;
pub mod serve;
