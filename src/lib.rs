pub mod config;
pub mod history;
pub mod logging;
pub mod patch;
pub mod reconcile;
pub mod replay;
pub mod server;

#[cfg(test)]
pub mod test_utils;

pub use config::{ReconcilerConfig, ValidationPolicy};
pub use history::{HandHistory, HandSettings};
