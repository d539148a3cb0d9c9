use anyhow::Result;
use chrono::Duration;

use crate::config::AuthConfig;
use crate::data_mgmt::normalize::normalize;
use crate::data_mgmt::store::SensorStore;
use crate::helpers::{ceil_15min, now_local};
use crate::vendors::{self, solaredge, Window};

/// Trailing-window run for a tighter external timer: site power over the
/// last 90 minutes, upserted into the store only. The daily run takes
/// care of the archive.
pub fn upload_recent() -> Result<()> {
    let auth = AuthConfig::load()?;
    let agent = vendors::agent()?;

    let end = ceil_15min(now_local().naive_local());
    let window = Window {
        start: end - Duration::minutes(90),
        end,
    };

    let power_table = solaredge::get_site_power(&agent, &auth, Some(&window))?;

    let mut store = SensorStore::open(&auth.db_path)?;
    let registry = store.sensor_registry()?;
    store.upsert(&normalize(&power_table, &registry)?)?;

    log::info!("Recent power upload complete");
    Ok(())
}
