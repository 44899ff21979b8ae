use crate::error::LookupError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::Path;

/// Header names of the dataset columns the loader reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupColumns {
    pub partner: String,
    pub code: String,
    pub description: String,
}

impl Default for LookupColumns {
    fn default() -> Self {
        LookupColumns {
            partner: "BP Name".to_string(),
            code: "Item Code".to_string(),
            description: "Item Description".to_string(),
        }
    }
}

/// Reference data behind the order form dropdowns.
///
/// Built once when the process starts and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    partners: BTreeSet<String>,
    products_by_description: HashMap<String, String>,
}

impl LookupTable {
    /// Build a table directly from `(partner, code, description)` rows.
    ///
    /// Rows are applied in order, so a repeated description keeps the code
    /// of its last occurrence.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, S, S)>,
        S: AsRef<str>,
    {
        let mut table = LookupTable::default();
        for (partner, code, description) in rows {
            table.insert_row(partner.as_ref(), code.as_ref(), description.as_ref());
        }
        table
    }

    fn insert_row(&mut self, partner: &str, code: &str, description: &str) {
        let partner = partner.trim();
        if !partner.is_empty() {
            self.partners.insert(partner.to_string());
        }

        // An empty description means "unset" on a line item, so it never maps to a code
        let description = description.trim();
        if !description.is_empty() {
            self.products_by_description
                .insert(description.to_string(), code.trim().to_string());
        }
    }

    /// Load the lookup dataset from a CSV file with a header row.
    ///
    /// # Errors
    /// * `LookupError::NotFound` if the file is absent
    /// * `LookupError::Decode` if a record is not valid UTF-8
    /// * `LookupError::MissingColumn` if a configured header is missing
    /// * `LookupError::Csv` for any other read failure
    pub fn load(path: impl AsRef<Path>, columns: &LookupColumns) -> Result<Self, LookupError> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| classify(path, e))?;

        let headers = reader.headers().map_err(|e| classify(path, e))?.clone();
        let column_index = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name.trim())
                .ok_or_else(|| LookupError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };
        let partner_idx = column_index(&columns.partner)?;
        let code_idx = column_index(&columns.code)?;
        let description_idx = column_index(&columns.description)?;

        let mut table = LookupTable::default();
        for record in reader.records() {
            let record = record.map_err(|e| classify(path, e))?;
            table.insert_row(
                record.get(partner_idx).unwrap_or_default(),
                record.get(code_idx).unwrap_or_default(),
                record.get(description_idx).unwrap_or_default(),
            );
        }

        info!(
            "loaded lookup table from {}: {} partners, {} products",
            path.display(),
            table.partners.len(),
            table.products_by_description.len()
        );
        Ok(table)
    }

    /// Load the dataset, degrading to empty vocabularies on any failure.
    ///
    /// The second element carries a user-facing warning when the load failed.
    pub fn load_or_empty(
        path: impl AsRef<Path>,
        columns: &LookupColumns,
    ) -> (Self, Option<String>) {
        match Self::load(path, columns) {
            Ok(table) => (table, None),
            Err(e) => {
                warn!("{e}; continuing with empty vocabularies");
                (LookupTable::default(), Some(e.to_string()))
            }
        }
    }

    pub fn partners(&self) -> &BTreeSet<String> {
        &self.partners
    }

    pub fn products_by_description(&self) -> &HashMap<String, String> {
        &self.products_by_description
    }

    /// Product descriptions in sorted order, for the dropdown.
    pub fn descriptions(&self) -> Vec<&str> {
        let mut descriptions: Vec<&str> = self
            .products_by_description
            .keys()
            .map(String::as_str)
            .collect();
        descriptions.sort_unstable();
        descriptions
    }

    /// Code for a description, if the description is known.
    pub fn product_code(&self, description: &str) -> Option<&str> {
        self.products_by_description
            .get(description)
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty() && self.products_by_description.is_empty()
    }
}

fn classify(path: &Path, error: csv::Error) -> LookupError {
    match error.kind() {
        csv::ErrorKind::Io(e) if e.kind() == io::ErrorKind::NotFound => LookupError::NotFound {
            path: path.to_path_buf(),
        },
        csv::ErrorKind::Utf8 { pos, .. } => LookupError::Decode {
            path: path.to_path_buf(),
            record: pos.as_ref().map(|p| p.record()).unwrap_or_default(),
        },
        _ => LookupError::Csv {
            path: path.to_path_buf(),
            source: error,
        },
    }
}
