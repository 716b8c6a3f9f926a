pub mod config;
pub mod logging;

pub mod artifact;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod platform;
pub mod validate;
