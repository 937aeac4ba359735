pub mod controller;
pub mod debounce;
pub mod state;
pub mod translation;

pub use controller::{ReadingSession, SessionOptions, SessionUpdate};
