use calamine::{Data, Range, Reader, Xls, Xlsx};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use crate::error::IngestError;
use crate::report::{ReportRow, RowId, RowStatus};

/// One data row of an uploaded sheet, keyed by its column header
pub type SheetRecord = BTreeMap<String, String>;

/// Spreadsheet formats accepted by the upload widget
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetKind {
    Xlsx,
    Xls,
    Csv,
}

/// Value for the file input's `accept` attribute
pub const ACCEPTED_EXTENSIONS: &str = ".xlsx,.xls,.csv";

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";
const CSV_MIME: &str = "text/csv";

lazy_static! {
    static ref HEADER_NOISE: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

// Normalised header spellings mapped onto row fields
const ID_HEADERS: &[&str] = &["id", "rowid", "no", "srno"];
const NAME_HEADERS: &[&str] = &["name", "fullname"];
const EMAIL_HEADERS: &[&str] = &["email", "emailaddress", "mail"];
const COMPANY_HEADERS: &[&str] = &["company", "companyname"];
const STATUS_HEADERS: &[&str] = &["status"];
const TIME_HEADERS: &[&str] = &["time"];

impl SheetKind {
    /// Decide the format of an upload from its file name and declared MIME type
    ///
    /// The file name suffix wins when it is one of the accepted extensions,
    /// since browsers on some platforms declare `.csv` files as
    /// `application/vnd.ms-excel`. Otherwise the declared MIME type decides.
    ///
    /// # Errors
    /// * `IngestError::UnsupportedType` when neither names an accepted format
    pub fn detect(file_name: &str, mime: Option<&str>) -> Result<SheetKind, IngestError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("xlsx") => return Ok(SheetKind::Xlsx),
            Some("xls") => return Ok(SheetKind::Xls),
            Some("csv") => return Ok(SheetKind::Csv),
            _ => {}
        }

        let mime = mime
            .map(|m| m.split(';').next().unwrap_or(m).trim().to_lowercase())
            .unwrap_or_default();
        match mime.as_str() {
            XLSX_MIME => Ok(SheetKind::Xlsx),
            XLS_MIME => Ok(SheetKind::Xls),
            CSV_MIME => Ok(SheetKind::Csv),
            _ => Err(IngestError::UnsupportedType(file_name.to_string())),
        }
    }
}

/// Parse the first sheet of an upload into records
///
/// # Arguments
/// * `file_name` - Name the browser reported for the file
/// * `mime` - Declared content type, if any
/// * `bytes` - Whole file content
///
/// # Returns
/// * `Result<Vec<SheetRecord>, IngestError>` - Data rows in sheet order
///
/// # Examples
/// ```
/// use rpa_dashboard::loader::load_records;
///
/// let records = load_records("people.csv", None, b"Name,Email\nAda,ada@example.com\n").unwrap();
/// assert_eq!(records[0]["Name"], "Ada");
/// assert!(load_records("notes.txt", Some("text/plain"), b"hello").is_err());
/// ```
pub fn load_records(
    file_name: &str,
    mime: Option<&str>,
    bytes: &[u8],
) -> Result<Vec<SheetRecord>, IngestError> {
    let kind = SheetKind::detect(file_name, mime)?;
    if bytes.is_empty() {
        return Err(IngestError::Empty);
    }

    let records = match kind {
        SheetKind::Csv => from_csv(bytes)?,
        SheetKind::Xlsx => {
            let mut workbook: Xlsx<_> =
                Xlsx::new(Cursor::new(bytes)).map_err(|e| IngestError::Workbook(e.to_string()))?;
            from_range(&first_sheet(&mut workbook)?)
        }
        SheetKind::Xls => {
            let mut workbook: Xls<_> =
                Xls::new(Cursor::new(bytes)).map_err(|e| IngestError::Workbook(e.to_string()))?;
            from_range(&first_sheet(&mut workbook)?)
        }
    };

    if records.is_empty() {
        return Err(IngestError::Empty);
    }
    log::debug!("Parsed {} records from {} ({:?})", records.len(), file_name, kind);
    Ok(records)
}

/// An accepted upload: every parsed column plus the report rows built from it
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedSheet {
    pub records: Vec<SheetRecord>,
    pub rows: Vec<ReportRow>,
}

/// Parse an upload into report rows, keeping the raw records alongside
pub fn ingest_sheet(
    file_name: &str,
    mime: Option<&str>,
    bytes: &[u8],
) -> Result<ParsedSheet, IngestError> {
    let records = load_records(file_name, mime, bytes)?;
    let rows = rows_from_records(&records)?;
    Ok(ParsedSheet { records, rows })
}

/// Parse an upload straight into report rows
pub fn ingest(
    file_name: &str,
    mime: Option<&str>,
    bytes: &[u8],
) -> Result<Vec<ReportRow>, IngestError> {
    ingest_sheet(file_name, mime, bytes).map(|sheet| sheet.rows)
}

/// Parse CSV bytes; the first line is the header
pub fn from_csv(bytes: &[u8]) -> Result<Vec<SheetRecord>, IngestError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = header_names(reader.headers()?.iter());
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        records.push(
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string).chain(std::iter::repeat(String::new())))
                .collect(),
        );
    }
    Ok(records)
}

fn first_sheet<RS, R>(workbook: &mut R) -> Result<Range<Data>, IngestError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::Empty)?
        .map_err(|e| IngestError::Workbook(e.to_string()))
}

fn from_range(range: &Range<Data>) -> Vec<SheetRecord> {
    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_names(header_row.iter().map(cell_text)),
        None => return Vec::new(),
    };

    rows.map(|row| row.iter().map(cell_text).collect::<Vec<String>>())
        .filter(|values| values.iter().any(|value| !value.is_empty()))
        .map(|values| {
            headers
                .iter()
                .cloned()
                .zip(values.into_iter().chain(std::iter::repeat(String::new())))
                .collect()
        })
        .collect()
}

// Render a cell the way the sheet shows it; whole floats lose their ".0"
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        other => other.to_string(),
    }
}

fn header_names<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .enumerate()
        .map(|(i, header)| {
            let header = header.as_ref().trim();
            if header.is_empty() {
                format!("column_{}", i + 1)
            } else {
                header.to_string()
            }
        })
        .collect()
}

fn lookup<'a>(fields: &HashMap<String, &'a str>, aliases: &[&str]) -> &'a str {
    aliases
        .iter()
        .find_map(|alias| fields.get(*alias).copied())
        .unwrap_or("")
}

fn normalize_header(header: &str) -> String {
    HEADER_NOISE
        .replace_all(&header.to_lowercase(), "")
        .into_owned()
}

/// Convert sheet records into report rows
///
/// Columns are matched by header, ignoring case, spacing and punctuation
/// (`E-mail Address` matches `email`). Rows without an `id` column take their
/// 1-based position. A `status` cell of `Completed` or `Error` is kept;
/// anything else, `Processing` included, starts the row as `Pending` so the
/// processor picks it up.
///
/// # Errors
/// * `IngestError::InvalidId` when an id cell is not a non-negative integer
/// * `IngestError::DuplicateId` when two rows share an id
pub fn rows_from_records(records: &[SheetRecord]) -> Result<Vec<ReportRow>, IngestError> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut rows = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let fields: HashMap<String, &str> = record
            .iter()
            .map(|(header, value)| (normalize_header(header), value.as_str()))
            .collect();
        let field = |aliases: &[&str]| lookup(&fields, aliases);

        let id = match field(ID_HEADERS).trim() {
            "" => (i + 1) as RowId,
            value => value.parse::<RowId>().map_err(|_| IngestError::InvalidId {
                row: i + 1,
                value: value.to_string(),
            })?,
        };
        if !seen.insert(id) {
            return Err(IngestError::DuplicateId(id));
        }

        let status = match field(STATUS_HEADERS).parse::<RowStatus>() {
            Ok(status) if status.is_resolved() => status,
            _ => RowStatus::Pending,
        };

        rows.push(ReportRow {
            id,
            status,
            name: field(NAME_HEADERS).to_string(),
            email: field(EMAIL_HEADERS).to_string(),
            company: field(COMPANY_HEADERS).to_string(),
            time: field(TIME_HEADERS).to_string(),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kind_from_extension_then_mime() {
        assert_eq!(SheetKind::detect("a.XLSX", None).unwrap(), SheetKind::Xlsx);
        assert_eq!(SheetKind::detect("a.xls", None).unwrap(), SheetKind::Xls);
        assert_eq!(
            SheetKind::detect("export.csv", Some("application/vnd.ms-excel")).unwrap(),
            SheetKind::Csv
        );
        assert_eq!(
            SheetKind::detect("blob", Some("text/csv; charset=utf-8")).unwrap(),
            SheetKind::Csv
        );
        assert_eq!(SheetKind::detect("upload", Some(XLSX_MIME)).unwrap(), SheetKind::Xlsx);
    }

    #[test]
    fn rejects_text_files() {
        let err = SheetKind::detect("notes.txt", Some("text/plain")).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedType(name) if name == "notes.txt"));
        assert!(SheetKind::detect("noextension", None).is_err());
    }

    #[test]
    fn parses_csv_with_bom_and_blank_rows() {
        let data = "\u{FEFF}ID,Name,Email\n1,Ada,ada@example.com\n,,\n2,\"Lovelace, A\",\n";
        let records = from_csv(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["ID"], "1");
        assert_eq!(records[1]["Name"], "Lovelace, A");
        assert_eq!(records[1]["Email"], "");
    }

    #[test]
    fn short_csv_rows_are_padded_and_blank_headers_named() {
        let records = from_csv(b"Name,,Company\nAda\n").unwrap();
        assert_eq!(records[0]["Name"], "Ada");
        assert_eq!(records[0]["column_2"], "");
        assert_eq!(records[0]["Company"], "");
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = load_records("a.csv", None, b"Name,Email\n").unwrap_err();
        assert!(matches!(err, IngestError::Empty));
        assert!(matches!(load_records("a.csv", None, b"").unwrap_err(), IngestError::Empty));
    }

    #[test]
    fn garbage_workbook_is_reported() {
        let err = load_records("a.xlsx", None, b"definitely not a zip").unwrap_err();
        assert!(matches!(err, IngestError::Workbook(_)));
    }

    #[test]
    fn rows_take_position_when_id_column_missing() {
        let records = from_csv(b"Full Name,E-mail Address,Company Name\nAda,a@x.io,Acme\nBob,b@x.io,Initech\n").unwrap();
        let rows = rows_from_records(&records).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[1].id, 2);
        assert_eq!(rows[0].name, "Ada");
        assert_eq!(rows[0].email, "a@x.io");
        assert_eq!(rows[1].company, "Initech");
        assert!(rows.iter().all(|row| row.status == RowStatus::Pending));
    }

    #[test]
    fn rows_keep_known_status_from_sheet() {
        let records = from_csv(b"id,status\n10,Completed\n11,queued\n12,\n").unwrap();
        let rows = rows_from_records(&records).unwrap();
        assert_eq!(rows[0].status, RowStatus::Completed);
        assert_eq!(rows[1].status, RowStatus::Pending);
        assert_eq!(rows[2].status, RowStatus::Pending);
        assert_eq!(rows[2].id, 12);
    }

    #[test]
    fn processing_in_sheet_starts_as_pending() {
        let records = from_csv(b"id,status\n1,Processing\n2,processing\n3,Pending\n4,Error\n").unwrap();
        let rows = rows_from_records(&records).unwrap();
        let statuses: Vec<RowStatus> = rows.iter().map(|row| row.status).collect();
        assert_eq!(
            statuses,
            vec![
                RowStatus::Pending,
                RowStatus::Pending,
                RowStatus::Pending,
                RowStatus::Error
            ]
        );
    }

    #[test]
    fn ingest_sheet_keeps_every_column() {
        let csv = "DELIVERY_ID,ARTICLE_NUMBER,Name\n1,A-100,Ada\n2,B-200,Bob\n";
        let sheet = ingest_sheet("deliveries.csv", None, csv.as_bytes()).unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].name, "Bob");
        assert_eq!(sheet.records.len(), 2);
        assert_eq!(sheet.records[0]["ARTICLE_NUMBER"], "A-100");
        assert_eq!(sheet.records[1]["DELIVERY_ID"], "2");
    }

    #[test]
    fn duplicate_and_invalid_ids_are_refused() {
        let records = from_csv(b"id,name\n1,a\n1,b\n").unwrap();
        assert!(matches!(
            rows_from_records(&records).unwrap_err(),
            IngestError::DuplicateId(1)
        ));

        let records = from_csv(b"id,name\n1,a\nx7,b\n").unwrap();
        assert!(matches!(
            rows_from_records(&records).unwrap_err(),
            IngestError::InvalidId { row: 2, .. }
        ));
    }

    #[cfg(feature = "web")]
    #[test]
    fn reads_first_sheet_of_xlsx() {
        use rust_xlsxwriter::Workbook;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "ID").unwrap();
        sheet.write_string(0, 1, "Name").unwrap();
        sheet.write_string(0, 2, "Company").unwrap();
        sheet.write_number(1, 0, 1.0).unwrap();
        sheet.write_string(1, 1, "Ada").unwrap();
        sheet.write_string(1, 2, "Acme").unwrap();
        sheet.write_number(2, 0, 2.0).unwrap();
        sheet.write_string(2, 1, "Bob").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = ingest("batch.xlsx", None, &bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].name, "Ada");
        assert_eq!(rows[0].company, "Acme");
        assert_eq!(rows[1].id, 2);
        assert_eq!(rows[1].company, "");
    }
}
