use crate::error::ExportError;
use crate::order::{Column, OrderTable};
use chrono::NaiveDateTime;
use log::info;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Base name of every export file.
pub const EXPORT_STEM: &str = "order_data";

/// Convert the order table to CSV
///
/// Writes the fixed column header followed by one record per order row.
/// Fields containing commas, quotes or newlines are quoted, with embedded
/// quotes doubled.
///
/// # Examples
/// ```
/// use orderdesk::export::to_csv;
/// use orderdesk::order::OrderTable;
///
/// let csv = to_csv(&OrderTable::new()).unwrap();
/// assert!(csv.starts_with(b"Order Date,Business Partner"));
/// ```
pub fn to_csv(table: &OrderTable) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(Column::headers())?;
    for row in table.rows() {
        writer.write_record(row.values())?;
    }

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Convert the order table to XLSX format
///
/// Same columns as the CSV export. Quantities are written as numbers so
/// they stay summable in a spreadsheet.
#[cfg(feature = "web")]
pub fn to_xlsx(table: &OrderTable) -> Result<Vec<u8>, ExportError> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (c, column) in Column::ALL.iter().enumerate() {
        worksheet.write_string(0, c as u16, column.header())?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, &column) in Column::ALL.iter().enumerate() {
            let c = c as u16;
            if column == Column::Quantity {
                worksheet.write_number(r, c, f64::from(row.quantity))?;
            } else {
                worksheet.write_string(r, c, &row.value(column))?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// File name for an export produced at `now`.
///
/// `order_data.csv`, or `order_data_YYYYMMDD_HHMMSS.csv` when timestamped.
pub fn export_file_name(timestamped: bool, now: NaiveDateTime) -> String {
    if timestamped {
        format!("{}_{}.csv", EXPORT_STEM, now.format("%Y%m%d_%H%M%S"))
    } else {
        format!("{}.csv", EXPORT_STEM)
    }
}

/// Write export bytes to `path`, replacing any previous file.
///
/// The file is flushed and synced before returning; it is closed on every
/// exit path when the writer drops.
pub fn write_file(path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), ExportError> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Write an export into `dir` (created if needed) and return its path.
pub fn save_export(
    dir: impl AsRef<Path>,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, ExportError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    write_file(&path, bytes)?;
    info!("saved export {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupTable;
    use crate::order::OrderDefaults;
    use crate::session::OrderSession;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn widget_session() -> OrderSession {
        let lookup = LookupTable::from_rows([("Acme", "W1", "Widget A")]);
        let mut session = OrderSession::new(Arc::new(lookup), OrderDefaults::default());
        let i = session.add_blank_line_item();
        session.set_line_item_description(i, "Widget A").unwrap();
        session.set_line_item_quantity(i, 2).unwrap();
        session
            .submit("Acme", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        session
    }

    #[test]
    fn empty_table_has_header_only() {
        let csv = String::from_utf8(to_csv(&OrderTable::new()).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], Column::headers().join(","));
    }

    #[test]
    fn second_line_is_the_submitted_row() {
        let session = widget_session();
        let csv = String::from_utf8(session.export_csv().unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        let expected = format!("2024-01-01,Acme,,,W1,Widget A,2{}", ",".repeat(14));
        assert_eq!(lines[1], expected);
    }

    #[test]
    fn parses_back_to_the_same_rows() {
        let lookup = LookupTable::from_rows([
            ("Acme, Inc.", "Q1", "Quoted \"special\" widget"),
            ("Acme, Inc.", "N1", "Multi\nline"),
        ]);
        let mut session = OrderSession::new(Arc::new(lookup), OrderDefaults::default());
        for description in ["Quoted \"special\" widget", "Multi\nline", "plain"] {
            let i = session.add_blank_line_item();
            session.set_line_item_description(i, description).unwrap();
        }
        session
            .submit("Acme, Inc.", NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())
            .unwrap();

        let bytes = session.export_csv().unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, Column::headers());

        let parsed: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        let expected: Vec<Vec<String>> =
            session.orders().rows().iter().map(|r| r.values()).collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn file_names() {
        let now = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        assert_eq!(export_file_name(false, now), "order_data.csv");
        assert_eq!(export_file_name(true, now), "order_data_20240506_070809.csv");
    }

    #[test]
    fn save_export_creates_directory() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("out");

        let path = save_export(&target, "order_data.csv", b"a,b\n").unwrap();

        assert_eq!(path, target.join("order_data.csv"));
        assert_eq!(fs::read(&path).unwrap(), b"a,b\n");
    }

    #[test]
    fn write_into_missing_parent_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();

        let err = write_file(blocker.join("order_data.csv"), b"data").unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_export_is_a_zip_container() {
        let session = widget_session();
        let bytes = to_xlsx(session.orders()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
