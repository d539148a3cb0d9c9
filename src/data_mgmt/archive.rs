use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use tempfile::NamedTempFile;

use crate::data_mgmt::models::TimeSeriesTable;
use crate::errors::PersistenceError;
use crate::helpers::DATE_FORMAT;
use crate::interfaces::ftp::FtpConnection;

/// Day-partitioned durable file copy of the observations, independent of
/// the relational store. Backed by FTP or by a local directory.
pub trait ArchiveStore {
    fn exists(&mut self, path: &str) -> Result<bool, PersistenceError>;
    fn download(&mut self, path: &str) -> Result<String, PersistenceError>;
    fn upload(&mut self, path: &str, local: &Path) -> Result<(), PersistenceError>;
}

pub fn open(archive_url: &str) -> Result<Box<dyn ArchiveStore>, PersistenceError> {
    if archive_url.starts_with("ftp://") || archive_url.starts_with("ftps://") {
        Ok(Box::new(FtpArchive::connect(archive_url)?))
    } else {
        Ok(Box::new(LocalDirArchive::new(archive_url)))
    }
}

/// Merge the run's table into the archive, one file per calendar day at
/// `dataset_path/{year}/{month}/{date}.csv`. Cells from this run win over
/// previously archived cells; archived cells absent from this run are
/// preserved. The merged file replaces the remote file wholesale, so
/// overlapping runs never duplicate rows.
pub fn upload_table(
    store: &mut dyn ArchiveStore,
    table: &TimeSeriesTable,
    dataset_path: &str,
) -> Result<(), PersistenceError> {
    for (day, day_table) in table.group_by_day() {
        let remote_path = format!(
            "{}/{}/{:02}/{}.csv",
            dataset_path,
            day.year(),
            day.month(),
            day.format(DATE_FORMAT),
        );

        let merged = if store.exists(&remote_path)? {
            let existing = TimeSeriesTable::from_csv(&store.download(&remote_path)?)?;
            day_table.combine_first(&existing)
        } else {
            day_table
        };

        // Scratch file is removed on drop, whether or not the upload succeeds
        let mut scratch = NamedTempFile::new()?;
        scratch.write_all(merged.to_csv()?.as_bytes())?;
        scratch.flush()?;
        store.upload(&remote_path, scratch.path())?;
        log::info!("Archived {} rows to {}", merged.len(), remote_path);
    }
    Ok(())
}

pub struct FtpArchive {
    conn: FtpConnection,
}

impl FtpArchive {
    pub fn connect(url: &str) -> Result<Self, PersistenceError> {
        let mut conn = FtpConnection::new(url)?;
        conn.connect()?;
        Ok(FtpArchive { conn })
    }
}

impl ArchiveStore for FtpArchive {
    fn exists(&mut self, path: &str) -> Result<bool, PersistenceError> {
        self.conn.file_exists(path).map_err(Into::into)
    }

    fn download(&mut self, path: &str) -> Result<String, PersistenceError> {
        let buffer = self.conn.download_file(path)?;
        String::from_utf8(buffer.into_inner())
            .map_err(|e| PersistenceError::Archive(format!("{path} is not valid UTF-8: {e}")))
    }

    fn upload(&mut self, path: &str, local: &Path) -> Result<(), PersistenceError> {
        let mut file = File::open(local)?;
        self.conn.upload_file(path, &mut file).map_err(Into::into)
    }
}

pub struct LocalDirArchive {
    root: PathBuf,
}

impl LocalDirArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalDirArchive { root: root.into() }
    }
}

impl ArchiveStore for LocalDirArchive {
    fn exists(&mut self, path: &str) -> Result<bool, PersistenceError> {
        Ok(self.root.join(path).exists())
    }

    fn download(&mut self, path: &str) -> Result<String, PersistenceError> {
        fs::read_to_string(self.root.join(path)).map_err(Into::into)
    }

    fn upload(&mut self, path: &str, local: &Path) -> Result<(), PersistenceError> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(local, &target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn power_table(values: &[(NaiveDateTime, Option<f64>)]) -> TimeSeriesTable {
        let mut table = TimeSeriesTable::new(vec!["power".to_string()]);
        for (t, v) in values {
            table.push_row(*t, vec![*v]);
        }
        table
    }

    #[test]
    fn first_upload_writes_day_files() {
        let tempdir = tempfile::tempdir().unwrap();
        let mut archive = LocalDirArchive::new(tempdir.path());

        let table = power_table(&[
            (ts(1, 23, 45), Some(1.0)),
            (ts(2, 0, 0), Some(2.0)),
        ]);
        upload_table(&mut archive, &table, "solcast").unwrap();

        let day1 = tempdir.path().join("solcast/2024/05/2024-05-01.csv");
        let day2 = tempdir.path().join("solcast/2024/05/2024-05-02.csv");
        assert_eq!(
            fs::read_to_string(day1).unwrap(),
            "timestamp,power\n2024-05-01 23:45:00,1\n"
        );
        assert!(day2.exists());
    }

    #[test]
    fn reupload_merges_with_new_data_winning() {
        let tempdir = tempfile::tempdir().unwrap();
        let mut archive = LocalDirArchive::new(tempdir.path());

        let first = power_table(&[(ts(1, 0, 0), Some(5.0)), (ts(1, 0, 15), Some(7.0))]);
        upload_table(&mut archive, &first, "solcast").unwrap();

        // Overlapping rerun: 00:00 is re-estimated, 00:15 comes back missing
        let second = power_table(&[(ts(1, 0, 0), Some(10.0)), (ts(1, 0, 15), None)]);
        upload_table(&mut archive, &second, "solcast").unwrap();

        let merged = TimeSeriesTable::from_csv(
            &fs::read_to_string(tempdir.path().join("solcast/2024/05/2024-05-01.csv")).unwrap(),
        )
        .unwrap();
        assert_eq!(merged.cell(&ts(1, 0, 0), "power"), Some(10.0));
        assert_eq!(merged.cell(&ts(1, 0, 15), "power"), Some(7.0));
    }

    #[test]
    fn merged_output_is_sorted_by_timestamp() {
        let tempdir = tempfile::tempdir().unwrap();
        let mut archive = LocalDirArchive::new(tempdir.path());

        upload_table(
            &mut archive,
            &power_table(&[(ts(1, 12, 0), Some(2.0))]),
            "solcast",
        )
        .unwrap();
        upload_table(
            &mut archive,
            &power_table(&[(ts(1, 0, 0), Some(1.0))]),
            "solcast",
        )
        .unwrap();

        let contents =
            fs::read_to_string(tempdir.path().join("solcast/2024/05/2024-05-01.csv")).unwrap();
        assert_eq!(
            contents,
            "timestamp,power\n2024-05-01 00:00:00,1\n2024-05-01 12:00:00,2\n"
        );
    }
}
