#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod check;
pub mod executor;
pub mod scenario;
#[doc(hidden)]
pub mod transaction;

mod error;
mod recorder;
mod timer;

pub use surge_core as core;
pub use surge_macros::transaction;

pub use check::check;
pub use error::RunError;
pub use load_test::{LoadTest, RunReport};
pub use scenario::{Scenario, Vu};

pub mod prelude {
    pub use crate::check::check;
    pub use crate::error::RunError;
    pub use crate::load_test::{LoadTest, RunReport};
    pub use crate::scenario::{Scenario, Vu};
    pub use surge_macros::transaction;

    pub use surge_core::{RunStatistics, ScenarioConfig, Stage, Threshold};
}
