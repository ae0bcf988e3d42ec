//! Bearer credential model and redacted token secrets.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
