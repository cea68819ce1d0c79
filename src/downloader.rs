use crate::report::ReportRow;
use std::error::Error;

const HEADERS: [&str; 6] = ["ID", "Name", "Email", "Company", "Status", "Time"];

/// Convert a status table to CSV format
///
/// This function exports the rows of a workflow page to CSV (Comma-Separated Values).
/// The first line holds the column headers; rows follow in table order.
///
/// # Arguments
/// * `rows` - Rows to export, in display order
///
/// # Returns
/// * `Result<String, Box<dyn Error>>` - CSV content as a string or an error
///
/// # Examples
/// ```
/// use rpa_dashboard::downloader::to_csv;
/// use rpa_dashboard::report::ReportRow;
///
/// let rows = vec![ReportRow::pending(1, "Ada", "ada@example.com", "Acme, Inc.")];
/// let csv = to_csv(&rows).unwrap();
/// assert!(csv.starts_with("ID,Name,Email,Company,Status,Time\n"));
/// assert!(csv.contains("\"Acme, Inc.\""));
/// ```
pub fn to_csv(rows: &[ReportRow]) -> Result<String, Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    for row in rows {
        writer.write_record([
            row.id.to_string().as_str(),
            row.name.as_str(),
            row.email.as_str(),
            row.company.as_str(),
            row.status.as_str(),
            row.time.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    Ok(String::from_utf8(bytes)?)
}

/// Convert a status table to XLSX format
///
/// Uses rust_xlsxwriter to build a single-sheet workbook with a bold header row,
/// so the report opens directly in Excel.
///
/// # Arguments
/// * `rows` - Rows to export, in display order
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
#[cfg(feature = "web")]
pub fn to_xlsx(rows: &[ReportRow]) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Format, Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Report")?;

    let bold = Format::new().set_bold();
    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_number(r, 0, row.id as f64)?;
        worksheet.write_string(r, 1, &row.name)?;
        worksheet.write_string(r, 2, &row.email)?;
        worksheet.write_string(r, 3, &row.company)?;
        worksheet.write_string(r, 4, row.status.as_str())?;
        worksheet.write_string(r, 5, &row.time)?;
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}
