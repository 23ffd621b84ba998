//! Read-heavy and like-heavy load against a forum API.
//!
//! A single account, a hotspot post and a handful of like targets are provisioned once. Then a
//! constant pool of readers hammers the hotspot post while a ramping arrival rate of writers
//! likes the targets, and the run is judged against latency and failure-rate thresholds.

pub mod client;
pub mod constants;
pub mod credentials;
pub mod fixture;
pub mod form;
pub mod options;
pub mod provision;
pub mod workflows;

mod workload;

pub use client::{ApiClient, ApiError, ApiResponse, PostId};
pub use credentials::Credentials;
pub use fixture::{select_target, AuthPolicy, Fixture};
pub use form::FormBody;
pub use options::{OptionsError, ScenarioOptions, Workflow, WorkloadOptions};
pub use provision::{provision, Registration, SetupError};
pub use workload::load_test;
