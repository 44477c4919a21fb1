//! Header-addressed CSV tables.
//!
//! All tabular inputs (evaluation results, classification manifests, SFT
//! manifests) are CSV with a header row. Columns are looked up by name, and a
//! missing column reports every available header so the caller can fix the
//! configuration.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::DatasetError;

/// An in-memory CSV table addressed by column name.
#[derive(Debug, Clone)]
pub struct Table {
    path: PathBuf,
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

impl Table {
    /// Read a CSV file with a header row.
    pub fn read(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, path)
    }

    /// Read CSV from any reader; `path` is only used in error messages.
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, DatasetError> {
        let csv_err = |source| DatasetError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let records = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_err)?;

        tracing::debug!("Read {} rows from {:?}", records.len(), path);

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a column with this exact name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Index of a required column.
    pub fn column(&self, name: &str) -> Result<usize, DatasetError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DatasetError::MissingColumn {
                column: name.to_string(),
                available: self.headers.clone(),
            })
    }

    /// Iterate over rows; a cell absent from a short row reads as "".
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().map(|record| Row { record })
    }
}

/// One row of a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    record: &'a csv::StringRecord,
}

impl<'a> Row<'a> {
    /// Cell at `index`, or "" when the row is shorter than the header.
    pub fn get(&self, index: usize) -> &'a str {
        self.record.get(index).unwrap_or("")
    }
}
