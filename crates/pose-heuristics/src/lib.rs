//! Pose Heuristics
//!
//! Independent geometric checks applied on top of the remote classifier.
//! Wink and Surprise are scored out of 100 and re-labelled on a pass;
//! Close up and V sign can only be vetoed.

mod config;
mod validator;

pub use config::HeuristicConfig;
pub use validator::{HeuristicValidator, Verdict};
