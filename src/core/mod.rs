pub mod browser;
pub mod cache;
pub mod cancel;
pub mod cleaner;
pub mod error;
pub mod events;
pub mod limiter;
pub mod scanner;
pub mod walker;
