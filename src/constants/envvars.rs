pub const LOG_LEVEL: &str = "LOG_LEVEL";

pub const AUTH_CONFIG_PATH: &str = "PVPIPE_AUTH_CONFIG";
pub const DATA_DIR: &str = "PVPIPE_DATA_DIR";
