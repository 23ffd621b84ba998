use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://app:8080/api/v1";
pub const DEFAULT_USER_SUFFIX: &str = "perf";
pub const USER_SUFFIX_ENV: &str = "USER_SUFFIX";
pub const PASSWORD: &str = "P@ssw0rd!";

pub const COMMUNITY_ID: u64 = 1;
pub const HOTSPOT_TITLE: &str = "Hot Post";
pub const HOTSPOT_CONTENT: &str = "This is a hot post for cache.";
pub const TARGET_CONTENT: &str = "for like set pressure";
pub const TARGET_POST_COUNT: usize = 5;
pub const PRELOAD_COUNT: usize = 5;

pub const READ_LATENCY_CEILING: Duration = Duration::from_millis(80);
pub const READ_THINK_TIME: Duration = Duration::from_millis(200);
pub const WRITE_THINK_TIME: Duration = Duration::from_millis(100);

pub const READ_SCENARIO: &str = "read_detail_heavy";
pub const WRITE_SCENARIO: &str = "write_like_heavy";
pub const READ_TAG: &str = "read";
pub const WRITE_TAG: &str = "write";

// Check names
pub const LOGIN_200: &str = "login 200";
pub const CREATE_POST_OK: &str = "create post ok";
pub const PRELOAD_200: &str = "preload 200";
pub const DETAIL_200: &str = "detail 200";
pub const DETAIL_FAST: &str = "detail fast";
pub const LIKE_200: &str = "like 200";
pub const FINAL_READ_OK: &str = "final read ok";

/// Exit status when the run completed but at least one threshold failed.
pub const EXIT_THRESHOLDS_FAILED: u8 = 99;
/// Exit status when provisioning failed and no scenario ran.
pub const EXIT_SETUP_FAILED: u8 = 2;
