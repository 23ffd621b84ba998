mod config;
mod constants;
mod error;
mod schedule;
mod stats;
mod threshold;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use schedule::*;
pub use stats::*;
pub use threshold::*;
