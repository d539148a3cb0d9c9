use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;

use crate::argsets::UploadArgs;
use crate::config::AuthConfig;
use crate::constants::defaults;
use crate::data_mgmt::normalize::normalize;
use crate::data_mgmt::store::SensorStore;
use crate::data_mgmt::{archive, models::TimeSeriesTable};
use crate::helpers::TIMESTAMP_FORMAT;
use crate::interfaces::notify;
use crate::vendors::{self, solaredge, solcast, Window};

/// Full batch run: fetch all datasets, upsert them into the store, then
/// merge them into the day-partitioned archive. Any failure aborts the
/// remaining steps; the caller owns reporting.
pub fn upload(args: UploadArgs) -> Result<()> {
    let auth = AuthConfig::load()?;
    let agent = vendors::agent()?;
    let window = parse_window(&args)?;

    let solcast_table = solcast::get_pv_estimate(&agent, &auth)?;
    let power_table = solaredge::get_site_power(&agent, &auth, window.as_ref())?;
    let energy_table = solaredge::get_site_energy(&agent, &auth, window.as_ref())?;
    let mut telemetry_table = solaredge::get_inverter_telemetry(&agent, &auth, window.as_ref())?;

    let mut store = SensorStore::open(&auth.db_path)?;
    let registry = store.sensor_registry()?;

    store.upsert(&normalize(&solcast_table, &registry)?)?;
    store.upsert(&normalize(&power_table, &registry)?)?;
    store.upsert(&normalize(&energy_table, &registry)?)?;

    let mut archive_store = archive::open(&auth.archive_url)?;
    archive_to(&mut *archive_store, &solcast_table, defaults::ARCHIVE_PATH_SOLCAST)?;
    archive_to(&mut *archive_store, &power_table, defaults::ARCHIVE_PATH_SITE_POWER)?;
    archive_to(&mut *archive_store, &energy_table, defaults::ARCHIVE_PATH_SITE_ENERGY)?;

    telemetry_table.round_index_to_minute(&solaredge::TELEMETRY_SECOND_VALUES)?;
    store.upsert(&normalize(&telemetry_table, &registry)?)?;
    archive_to(
        &mut *archive_store,
        &telemetry_table,
        defaults::ARCHIVE_PATH_INVERTER_TELEMETRY,
    )?;

    log::info!("Upload run complete");
    Ok(())
}

fn archive_to(
    store: &mut dyn archive::ArchiveStore,
    table: &TimeSeriesTable,
    dataset_path: &str,
) -> Result<()> {
    archive::upload_table(store, table, dataset_path)
        .with_context(|| format!("archiving {dataset_path}"))
}

fn parse_window(args: &UploadArgs) -> Result<Option<Window>> {
    match (&args.start, &args.end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => Ok(Some(Window {
            start: parse_local(start)?,
            end: parse_local(end)?,
        })),
        _ => bail!("--start and --end must be given together"),
    }
}

fn parse_local(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .with_context(|| format!("invalid local timestamp {raw:?}, expected {TIMESTAMP_FORMAT}"))
}

/// Report a failed run: log the full error chain, then fall back through
/// the configured notification channels.
pub fn report_failure(subject: &str, error: &anyhow::Error) {
    let auth = match AuthConfig::load() {
        Ok(auth) => auth,
        Err(e) => {
            log::error!("Cannot load config for failure notification: {e}");
            return;
        }
    };
    let notifiers = notify::notifiers_from_config(&auth);
    notify::alert_failure(&notifiers, subject, &format!("{error:?}"));
}
