#![forbid(unsafe_code)]

pub mod api;
pub mod cli;
pub mod config;
pub mod formats;
pub mod inspect;
pub mod layout;
pub mod logging;
pub mod paginate;
pub mod reader;
pub mod render;
pub mod segment;
pub mod session;
pub mod settings_store;
pub mod tokenize;
