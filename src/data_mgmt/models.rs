use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::errors::{DataShapeError, PersistenceError};
use crate::helpers::TIMESTAMP_FORMAT;

/// One (timestamp, sensor, value) fact, ready for the persistent store.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub sensor_id: i64,
    pub value: f64,
}

/// In-memory table of one or more named value columns over an ordered
/// timestamp index. Timestamps are naive UTC-equivalent instants; missing
/// cells are `None`, never zero.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeriesTable {
    columns: Vec<String>,
    rows: BTreeMap<NaiveDateTime, Vec<Option<f64>>>,
}

impl TimeSeriesTable {
    pub fn new(columns: Vec<String>) -> Self {
        TimeSeriesTable {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a row of cells, one per column. A row already present at the
    /// same timestamp is replaced.
    pub fn push_row(&mut self, timestamp: NaiveDateTime, cells: Vec<Option<f64>>) {
        assert_eq!(cells.len(), self.columns.len(), "row/column count mismatch");
        self.rows.insert(timestamp, cells);
    }

    pub fn rows(&self) -> impl Iterator<Item = (&NaiveDateTime, &[Option<f64>])> + '_ {
        self.rows.iter().map(|(ts, cells)| (ts, cells.as_slice()))
    }

    pub fn cell(&self, timestamp: &NaiveDateTime, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(timestamp).and_then(|cells| cells[idx])
    }

    /// Single-metric vendor responses must carry exactly one data column.
    pub fn expect_single_column(&self) -> Result<(), DataShapeError> {
        if self.columns.len() == 1 {
            Ok(())
        } else {
            Err(DataShapeError::MultipleColumns(self.columns.len()))
        }
    }

    /// Drop all rows timestamped at or after `cutoff`.
    pub fn discard_at_or_after(&mut self, cutoff: NaiveDateTime) {
        self.rows.split_off(&cutoff);
    }

    pub fn shift_index(&mut self, offset: Duration) {
        self.rows = std::mem::take(&mut self.rows)
            .into_iter()
            .map(|(ts, cells)| (ts + offset, cells))
            .collect();
    }

    /// Sorted distinct second-of-minute values across the index.
    pub fn second_values(&self) -> Vec<u32> {
        let mut seconds: Vec<u32> = self.rows.keys().map(|ts| ts.second()).collect();
        seconds.sort_unstable();
        seconds.dedup();
        seconds
    }

    /// Round all index timestamps to the nearest whole minute, after checking
    /// that every second-of-minute value is within `expected_seconds`. A
    /// value outside that set means the vendor's timestamp granularity has
    /// changed and the data must not be persisted.
    pub fn round_index_to_minute(
        &mut self,
        expected_seconds: &[u32],
    ) -> Result<(), DataShapeError> {
        let seconds = self.second_values();
        if seconds.iter().any(|s| !expected_seconds.contains(s)) {
            return Err(DataShapeError::TimestampGranularity(seconds));
        }
        self.rows = std::mem::take(&mut self.rows)
            .into_iter()
            .map(|(ts, cells)| {
                let floored = ts - Duration::seconds(ts.second() as i64)
                    - Duration::nanoseconds(ts.nanosecond() as i64);
                let rounded = if ts.second() >= 30 {
                    floored + Duration::minutes(1)
                } else {
                    floored
                };
                (rounded, cells)
            })
            .collect();
        Ok(())
    }

    /// Split into per-calendar-day tables, preserving column layout.
    pub fn group_by_day(&self) -> BTreeMap<NaiveDate, TimeSeriesTable> {
        let mut days: BTreeMap<NaiveDate, TimeSeriesTable> = BTreeMap::new();
        for (ts, cells) in &self.rows {
            days.entry(ts.date())
                .or_insert_with(|| TimeSeriesTable::new(self.columns.clone()))
                .push_row(*ts, cells.clone());
        }
        days
    }

    /// Cell-wise merge keyed by timestamp: cells present in `self` win,
    /// cells only present in `fallback` fill the gaps. Columns of `fallback`
    /// not known to `self` are appended.
    pub fn combine_first(&self, fallback: &TimeSeriesTable) -> TimeSeriesTable {
        let mut columns = self.columns.clone();
        for col in &fallback.columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }

        let mut merged = TimeSeriesTable::new(columns.clone());
        let timestamps: std::collections::BTreeSet<NaiveDateTime> = self
            .rows
            .keys()
            .chain(fallback.rows.keys())
            .copied()
            .collect();
        for ts in timestamps {
            let cells = columns
                .iter()
                .map(|col| self.cell(&ts, col).or_else(|| fallback.cell(&ts, col)))
                .collect();
            merged.rows.insert(ts, cells);
        }
        merged
    }

    pub fn to_csv(&self) -> Result<String, PersistenceError> {
        let mut writer = csv::Writer::from_writer(vec![]);
        let mut header = vec!["timestamp".to_string()];
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;

        for (ts, cells) in &self.rows {
            let mut record = vec![ts.format(TIMESTAMP_FORMAT).to_string()];
            record.extend(
                cells
                    .iter()
                    .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| PersistenceError::Archive(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| PersistenceError::Archive(e.to_string()))
    }

    pub fn from_csv(data: &str) -> Result<TimeSeriesTable, PersistenceError> {
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .skip(1)
            .map(str::to_string)
            .collect();

        let mut table = TimeSeriesTable::new(columns);
        for record in reader.records() {
            let record = record?;
            let raw_ts = record.get(0).unwrap_or_default();
            let ts = NaiveDateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT)
                .map_err(|e| PersistenceError::Archive(format!("bad timestamp {raw_ts:?}: {e}")))?;
            let cells = record
                .iter()
                .skip(1)
                .map(|field| {
                    if field.is_empty() {
                        Ok(None)
                    } else {
                        field.parse::<f64>().map(Some).map_err(|e| {
                            PersistenceError::Archive(format!("bad value {field:?}: {e}"))
                        })
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            table.push_row(ts, cells);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    fn ts(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn single_column(values: &[(NaiveDateTime, Option<f64>)]) -> TimeSeriesTable {
        let mut table = TimeSeriesTable::new(vec!["power".to_string()]);
        for (t, v) in values {
            table.push_row(*t, vec![*v]);
        }
        table
    }

    #[test]
    fn discard_drops_rows_at_and_after_cutoff() {
        let mut table = single_column(&[
            (ts(1, 9, 45, 0), Some(1.0)),
            (ts(1, 10, 0, 0), Some(2.0)),
            (ts(1, 10, 15, 0), Some(3.0)),
        ]);
        // fetched at 10:07, so the cutoff is 10:00
        table.discard_at_or_after(ts(1, 10, 0, 0));
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(&ts(1, 9, 45, 0), "power"), Some(1.0));
    }

    #[test]
    fn combine_first_prefers_new_cells_and_fills_gaps() {
        let new = single_column(&[(ts(1, 0, 0, 0), Some(10.0)), (ts(1, 0, 15, 0), None)]);
        let mut old = TimeSeriesTable::new(vec!["power".to_string()]);
        old.push_row(ts(1, 0, 0, 0), vec![Some(5.0)]);
        old.push_row(ts(1, 0, 15, 0), vec![Some(7.0)]);

        let merged = new.combine_first(&old);
        assert_eq!(merged.cell(&ts(1, 0, 0, 0), "power"), Some(10.0));
        assert_eq!(merged.cell(&ts(1, 0, 15, 0), "power"), Some(7.0));
    }

    #[test]
    fn combine_first_keeps_rows_only_in_old_data() {
        let new = single_column(&[(ts(1, 0, 15, 0), Some(2.0))]);
        let old = single_column(&[(ts(1, 0, 0, 0), Some(1.0))]);

        let merged = new.combine_first(&old);
        let timestamps: Vec<_> = merged.rows().map(|(t, _)| *t).collect();
        assert_eq!(timestamps, vec![ts(1, 0, 0, 0), ts(1, 0, 15, 0)]);
    }

    #[test]
    fn group_by_day_splits_on_calendar_boundaries() {
        let table = single_column(&[
            (ts(1, 23, 45, 0), Some(1.0)),
            (ts(2, 0, 0, 0), Some(2.0)),
            (ts(2, 0, 15, 0), Some(3.0)),
        ]);
        let days = table.group_by_day();
        assert_eq!(days.len(), 2);
        assert_eq!(days[&NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()].len(), 1);
        assert_eq!(days[&NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()].len(), 2);
    }

    #[test]
    fn round_index_accepts_expected_seconds() {
        let mut table = single_column(&[
            (ts(1, 10, 0, 0), Some(1.0)),
            (ts(1, 10, 4, 59), Some(2.0)),
        ]);
        table.round_index_to_minute(&[0, 59]).unwrap();
        let timestamps: Vec<_> = table.rows().map(|(t, _)| *t).collect();
        assert_eq!(timestamps, vec![ts(1, 10, 0, 0), ts(1, 10, 5, 0)]);
    }

    #[test]
    fn round_index_rejects_unexpected_seconds() {
        let mut table = single_column(&[(ts(1, 10, 0, 30), Some(1.0))]);
        assert!(matches!(
            table.round_index_to_minute(&[0, 59]),
            Err(DataShapeError::TimestampGranularity(seconds)) if seconds == vec![30]
        ));
    }

    #[test]
    fn shift_index_moves_interval_end_to_interval_start() {
        let mut table = single_column(&[(ts(1, 6, 30, 0), Some(1.0))]);
        table.shift_index(Duration::minutes(-30));
        assert_eq!(table.cell(&ts(1, 6, 0, 0), "power"), Some(1.0));
    }

    #[test]
    fn csv_round_trip_preserves_missing_cells() {
        let mut table = TimeSeriesTable::new(vec!["a".to_string(), "b".to_string()]);
        table.push_row(ts(1, 0, 0, 0), vec![Some(1.125), None]);
        table.push_row(ts(1, 0, 15, 0), vec![None, Some(2.0)]);

        let csv = table.to_csv().unwrap();
        assert!(csv.starts_with("timestamp,a,b\n"));
        let parsed = TimeSeriesTable::from_csv(&csv).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn expect_single_column_rejects_multi_metric_table() {
        let table = TimeSeriesTable::new(vec!["a".to_string(), "b".to_string()]);
        assert!(matches!(
            table.expect_single_column(),
            Err(DataShapeError::MultipleColumns(2))
        ));
    }
}
