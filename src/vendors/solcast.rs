use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::data_mgmt::models::TimeSeriesTable;
use crate::helpers::utc_cutoff_now;
use crate::vendors::{get_json, FetchError};

const COL_PV_ESTIMATE: &str = "pv_estimate";
const TRAILING_HOURS: &str = "168";

#[derive(Debug, Deserialize)]
struct EstimatedActualsResponse {
    estimated_actuals: Vec<PvEstimate>,
}

#[derive(Debug, Deserialize)]
struct PvEstimate {
    pv_estimate: f64,
    period_end: String,
}

/// Irradiance-based PV production estimate for the trailing 168 hours.
///
/// The vendor timestamps each half-hour interval by its end; indices are
/// shifted back 30 minutes so rows are keyed by interval start, like every
/// other dataset. This correction is specific to this vendor.
pub fn get_pv_estimate(
    agent: &ureq::Agent,
    auth: &AuthConfig,
) -> Result<TimeSeriesTable, FetchError> {
    let url = format!(
        "{}/rooftop_sites/{}/estimated_actuals",
        auth.solcast_base_url, auth.site_id_solcast
    );
    let response: EstimatedActualsResponse = get_json(
        agent,
        &url,
        &[
            ("format", "json"),
            ("api_key", &auth.api_key_solcast),
            ("hours", TRAILING_HOURS),
        ],
    )?;

    let mut table = TimeSeriesTable::new(vec![COL_PV_ESTIMATE.to_string()]);
    for row in response.estimated_actuals {
        let period_end = DateTime::parse_from_rfc3339(&row.period_end)?.with_timezone(&Utc);
        table.push_row(period_end.naive_utc(), vec![Some(row.pv_estimate)]);
    }
    table.shift_index(Duration::minutes(-30));
    table.discard_at_or_after(utc_cutoff_now());
    table.expect_single_column()?;

    log::debug!("Fetched {} PV estimate rows", table.len());
    Ok(table)
}
