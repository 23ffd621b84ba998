use std::time::Duration;

/// How often the arrival-rate controller re-reads the ramp schedule.
pub const CONTROL_INTERVAL: Duration = Duration::from_millis(100);

/// The default time unit for arrival rates (`rate` iterations per `time_unit`).
pub const DEFAULT_TIME_UNIT: Duration = Duration::from_secs(1);

/// Tag applied to requests issued during the one-time setup phase.
pub const SETUP_TAG: &str = "setup";

/// Tag applied to requests issued during the one-time teardown phase.
pub const TEARDOWN_TAG: &str = "teardown";

/// The only tag key understood by metric selectors, e.g. `http_req_duration{scenario:read}`.
pub const SCENARIO_TAG_KEY: &str = "scenario";

pub const HTTP_REQ_DURATION: &str = "http_req_duration";
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
pub const HTTP_REQS: &str = "http_reqs";
pub const CHECKS: &str = "checks";
