pub const DEFAULT_MAX_PAPERS: usize = 50;
pub const DEFAULT_PER_SOURCE_LIMIT: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_FACT_CHECK_THRESHOLD: f64 = 0.8;
pub const DEFAULT_SUPPORT_THRESHOLD: f64 = 0.3;
pub const DEFAULT_OUTPUT_DIR: &str = "./output";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const CONFIG_FILE: &str = ".litreview/config";
