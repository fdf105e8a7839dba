pub mod api;
pub mod config;
pub mod error;
pub mod stream;
pub mod tail;
pub mod util;
