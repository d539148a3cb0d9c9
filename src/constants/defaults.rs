use std::time::Duration;

use chrono_tz::Tz;

pub const API_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const LOG_LEVEL: &str = "info";

/// Wall-clock timezone of the monitored site. Vendor date/time parameters
/// and responses are expressed in this zone.
pub const TZ_LOCAL: Tz = chrono_tz::America::Boise;

pub const SOLCAST_BASE_URL: &str = "https://api.solcast.com.au";
pub const SOLAREDGE_BASE_URL: &str = "https://monitoringapi.solaredge.com";

pub const AUTH_CONFIG_FILE: &str = "auth.json";

pub const ARCHIVE_PATH_SOLCAST: &str = "res_pv/data/solcast";
pub const ARCHIVE_PATH_SITE_POWER: &str = "res_pv/data/solaredge/site_power";
pub const ARCHIVE_PATH_SITE_ENERGY: &str = "res_pv/data/solaredge/site_energy";
pub const ARCHIVE_PATH_INVERTER_TELEMETRY: &str = "res_pv/data/solaredge/inverter_technical_data";
