use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::AuthConfig;
use crate::constants::defaults;
use crate::data_mgmt::models::TimeSeriesTable;
use crate::errors::DataShapeError;
use crate::helpers::{localize_to_naive_utc, now_local, utc_cutoff_now, DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::vendors::{get_json, FetchError, Window};

const COL_POWER: &str = "power";
const COL_ENERGY: &str = "energy";

const UNIT_POWER: &str = "W";
const UNIT_ENERGY: &str = "Wh";
const UNIT_GAS_EMISSION: &str = "kg";

/// Second-of-minute values observed across inverter telemetry. Anything
/// else means the vendor's timestamp granularity changed.
pub const TELEMETRY_SECOND_VALUES: [u32; 2] = [0, 59];

static INVERTER_MODE_MAP: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    HashMap::from([
        ("OFF", 0),
        ("SLEEPING", 1),
        ("STARTING", 2),
        ("MPPT", 3),
        ("THROTTLED", 4),
        ("SHUTTING_DOWN", 5),
        ("FAULT", 6),
        ("STANDBY", 7),
        ("LOCKED_STDBY", 8),
        ("LOCKED_FIRE_FIGHTERS", 9),
        ("LOCKED_FORCE_SHUTDOWN", 10),
        ("LOCKED_COMM_TIMEOUT", 11),
        ("LOCKED_INV_TRIP", 12),
        ("LOCKED_INV_ARC_DETECTED", 13),
        ("LOCKED_DG", 14),
        ("LOCKED_PHASE_BALANCER", 15),
        ("LOCKED_PRE_COMMISSIONING", 16),
        ("LOCKED_INTERNAL", 17),
    ])
});

#[derive(Debug, Deserialize)]
struct SitePowerResponse {
    power: MetricSeries,
}

#[derive(Debug, Deserialize)]
struct SiteEnergyResponse {
    energy: MetricSeries,
}

#[derive(Debug, Deserialize)]
struct MetricSeries {
    unit: String,
    values: Vec<MetricValue>,
}

#[derive(Debug, Deserialize)]
struct MetricValue {
    date: String,
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TelemetryResponse {
    data: TelemetryData,
}

#[derive(Debug, Deserialize)]
struct TelemetryData {
    telemetries: Vec<Telemetry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Telemetry {
    date: String,
    total_active_power: Option<f64>,
    dc_voltage: Option<f64>,
    ground_fault_resistance_r: Option<f64>,
    power_limit: Option<f64>,
    total_energy: Option<f64>,
    temperature: Option<f64>,
    inverter_mode: Option<String>,
    operation_mode: Option<f64>,
    #[serde(rename = "L1Data")]
    l1_data: L1Data,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct L1Data {
    ac_current: Option<f64>,
    ac_voltage: Option<f64>,
    ac_frequency: Option<f64>,
    apparent_power: Option<f64>,
    active_power: Option<f64>,
    reactive_power: Option<f64>,
    cos_phi: Option<f64>,
}

const TELEMETRY_COLUMNS: [&str; 15] = [
    "totalActivePower",
    "dcVoltage",
    "groundFaultResistanceR",
    "powerLimit",
    "totalEnergy",
    "temperature",
    "inverterMode",
    "operationMode",
    "acCurrent",
    "acVoltage",
    "acFrequency",
    "apparentPower",
    "activePower",
    "reactivePower",
    "cosPhi",
];

fn local_midnight_today() -> NaiveDateTime {
    now_local().date_naive().and_time(NaiveTime::MIN)
}

fn check_unit(expected: &'static str, actual: &str) -> Result<(), DataShapeError> {
    if actual == expected {
        Ok(())
    } else {
        Err(DataShapeError::UnexpectedUnit {
            expected,
            actual: actual.to_string(),
        })
    }
}

fn metric_series_to_table(
    series: MetricSeries,
    column: &str,
    expected_unit: &'static str,
) -> Result<TimeSeriesTable, FetchError> {
    check_unit(expected_unit, &series.unit)?;

    let mut table = TimeSeriesTable::new(vec![column.to_string()]);
    for row in series.values {
        let local = NaiveDateTime::parse_from_str(&row.date, TIMESTAMP_FORMAT)?;
        let timestamp = localize_to_naive_utc(local, defaults::TZ_LOCAL)?;
        table.push_row(timestamp, vec![row.value]);
    }
    table.discard_at_or_after(utc_cutoff_now());
    table.expect_single_column()?;
    Ok(table)
}

/// Site production power in W at 15-minute resolution. Defaults to the
/// last 7 complete local days.
pub fn get_site_power(
    agent: &ureq::Agent,
    auth: &AuthConfig,
    window: Option<&Window>,
) -> Result<TimeSeriesTable, FetchError> {
    let (start, end) = match window {
        Some(w) => (w.start, w.end),
        None => {
            let end = local_midnight_today();
            (end - Duration::days(7), end)
        }
    };

    let url = format!("{}/site/{}/power", auth.solaredge_base_url, auth.site_id_solaredge);
    let response: SitePowerResponse = get_json(
        agent,
        &url,
        &[
            ("api_key", &auth.api_key_solaredge),
            ("startTime", &start.format(TIMESTAMP_FORMAT).to_string()),
            ("endTime", &end.format(TIMESTAMP_FORMAT).to_string()),
        ],
    )?;

    let table = metric_series_to_table(response.power, COL_POWER, UNIT_POWER)?;
    log::debug!("Fetched {} site power rows", table.len());
    Ok(table)
}

/// Site energy production in Wh per quarter hour. The vendor takes
/// inclusive local dates; the default range is the 7 complete days ending
/// yesterday.
pub fn get_site_energy(
    agent: &ureq::Agent,
    auth: &AuthConfig,
    window: Option<&Window>,
) -> Result<TimeSeriesTable, FetchError> {
    let (start_date, end_date) = match window {
        Some(w) => (w.start.date(), w.end.date()),
        None => {
            let end = local_midnight_today().date() - Duration::days(1);
            (end - Duration::days(6), end)
        }
    };

    let url = format!("{}/site/{}/energy", auth.solaredge_base_url, auth.site_id_solaredge);
    let response: SiteEnergyResponse = get_json(
        agent,
        &url,
        &[
            ("api_key", &auth.api_key_solaredge),
            ("startDate", &start_date.format(DATE_FORMAT).to_string()),
            ("endDate", &end_date.format(DATE_FORMAT).to_string()),
            ("timeUnit", "QUARTER_OF_AN_HOUR"),
        ],
    )?;

    let table = metric_series_to_table(response.energy, COL_ENERGY, UNIT_ENERGY)?;
    log::debug!("Fetched {} site energy rows", table.len());
    Ok(table)
}

/// Technical telemetry for the configured inverter: multi-metric, with the
/// per-phase `L1Data` record flattened into top-level columns. Operating
/// mode strings map to small integers; unknown modes become missing values
/// rather than errors. Defaults to the last 3 complete local days.
pub fn get_inverter_telemetry(
    agent: &ureq::Agent,
    auth: &AuthConfig,
    window: Option<&Window>,
) -> Result<TimeSeriesTable, FetchError> {
    let (start, end) = match window {
        Some(w) => (w.start, w.end),
        None => {
            let end = local_midnight_today();
            (end - Duration::days(3), end)
        }
    };

    let url = format!(
        "{}/equipment/{}/{}/data",
        auth.solaredge_base_url, auth.site_id_solaredge, auth.inverter_serial
    );
    let response: TelemetryResponse = get_json(
        agent,
        &url,
        &[
            ("api_key", &auth.api_key_solaredge),
            ("startTime", &start.format(TIMESTAMP_FORMAT).to_string()),
            ("endTime", &end.format(TIMESTAMP_FORMAT).to_string()),
        ],
    )?;

    let mut table =
        TimeSeriesTable::new(TELEMETRY_COLUMNS.iter().map(|c| c.to_string()).collect());
    for record in response.data.telemetries {
        let local = NaiveDateTime::parse_from_str(&record.date, TIMESTAMP_FORMAT)?;
        let timestamp = localize_to_naive_utc(local, defaults::TZ_LOCAL)?;
        table.push_row(timestamp, telemetry_cells(&record));
    }
    table.discard_at_or_after(utc_cutoff_now());

    log::debug!("Fetched {} inverter telemetry rows", table.len());
    Ok(table)
}

fn telemetry_cells(record: &Telemetry) -> Vec<Option<f64>> {
    vec![
        record.total_active_power,
        record.dc_voltage,
        record.ground_fault_resistance_r,
        record.power_limit,
        record.total_energy,
        record.temperature,
        inverter_mode_code(record.inverter_mode.as_deref()),
        record.operation_mode,
        record.l1_data.ac_current,
        record.l1_data.ac_voltage,
        record.l1_data.ac_frequency,
        record.l1_data.apparent_power,
        record.l1_data.active_power,
        record.l1_data.reactive_power,
        record.l1_data.cos_phi,
    ]
}

fn inverter_mode_code(mode: Option<&str>) -> Option<f64> {
    mode.and_then(|m| INVERTER_MODE_MAP.get(m).map(|code| *code as f64))
}

const SITE_DETAIL_KEYS_TO_DROP: [&str; 10] = [
    "id",
    "name",
    "accountId",
    "status",
    "lastUpdateTime",
    "ptoDate",
    "notes",
    "location",
    "uris",
    "publicSettings",
];

fn object_at<'a>(value: &'a Value, key: &str) -> Result<&'a Map<String, Value>, FetchError> {
    value
        .get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| DataShapeError::UnexpectedPayload(format!("missing {key} object")).into())
}

/// Static site metadata, with bookkeeping fields dropped and the
/// `primaryModule` record flattened.
pub fn get_site_details(
    agent: &ureq::Agent,
    auth: &AuthConfig,
) -> Result<Map<String, Value>, FetchError> {
    let url = format!("{}/site/{}/details", auth.solaredge_base_url, auth.site_id_solaredge);
    let response: Value = get_json(agent, &url, &[("api_key", &auth.api_key_solaredge)])?;

    let mut details: Map<String, Value> = object_at(&response, "details")?
        .iter()
        .filter(|(k, _)| !SITE_DETAIL_KEYS_TO_DROP.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if let Some(Value::Object(primary_module)) = details.remove("primaryModule") {
        for (key, value) in primary_module {
            details.insert(format!("primaryModule_{key}"), value);
        }
    }
    Ok(details)
}

/// First and last dates for which the site has any data.
pub fn get_site_data_period(agent: &ureq::Agent, auth: &AuthConfig) -> Result<Value, FetchError> {
    let url = format!(
        "{}/site/{}/dataPeriod",
        auth.solaredge_base_url, auth.site_id_solaredge
    );
    let response: Value = get_json(agent, &url, &[("api_key", &auth.api_key_solaredge)])?;
    Ok(Value::Object(object_at(&response, "dataPeriod")?.clone()))
}

pub fn get_site_overview(agent: &ureq::Agent, auth: &AuthConfig) -> Result<Value, FetchError> {
    let url = format!(
        "{}/site/{}/overview",
        auth.solaredge_base_url, auth.site_id_solaredge
    );
    let response: Value = get_json(agent, &url, &[("api_key", &auth.api_key_solaredge)])?;
    Ok(Value::Object(object_at(&response, "overview")?.clone()))
}

/// Lifetime environmental benefit figures, with the `gasEmissionSaved`
/// record flattened. The vendor reports gas savings in kg; any other unit
/// is a contract violation.
pub fn get_environmental_benefits(
    agent: &ureq::Agent,
    auth: &AuthConfig,
) -> Result<Map<String, Value>, FetchError> {
    let url = format!(
        "{}/site/{}/envBenefits",
        auth.solaredge_base_url, auth.site_id_solaredge
    );
    let response: Value = get_json(
        agent,
        &url,
        &[
            ("api_key", &auth.api_key_solaredge),
            ("systemUnits", "Metrics"),
        ],
    )?;

    let mut benefits = object_at(&response, "envBenefits")?.clone();
    if let Some(Value::Object(gas_emission_saved)) = benefits.remove("gasEmissionSaved") {
        let units = gas_emission_saved
            .get("units")
            .and_then(Value::as_str)
            .unwrap_or_default();
        check_unit(UNIT_GAS_EMISSION, units)?;
        for (key, value) in gas_emission_saved {
            if key != "units" {
                benefits.insert(format!("gasEmissionSaved_{key}"), value);
            }
        }
    }
    Ok(benefits)
}
