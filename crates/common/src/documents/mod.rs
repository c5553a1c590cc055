//! Uploaded document readers
//!
//! Text extraction from PDF files using lopdf and row lookup in CSV files.
//! Both are blocking; the async wrappers move the work onto the blocking pool.

use crate::errors::{AppError, Result};
use crate::importer::{normalize_header, parse_integer};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extract the text of every readable page of a PDF
pub fn extract_pdf_text(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path).map_err(|e| AppError::Document {
        path: path.display().to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut text = String::new();
    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    Ok(text)
}

/// Whether extracted text mentions a student: case-insensitive on the name,
/// exact on the roll number
pub fn mentions_student(text: &str, name: &str, roll_no: &str) -> bool {
    let name = name.trim();
    let roll_no = roll_no.trim();

    let by_name = !name.is_empty() && text.to_lowercase().contains(&name.to_lowercase());
    let by_roll = !roll_no.is_empty() && text.contains(roll_no);

    by_name || by_roll
}

/// First row whose serial number or roll number matches, as header/value pairs
pub fn find_student_row(
    path: &Path,
    serial_no: i32,
    roll_no: &str,
) -> Result<Option<Vec<(String, String)>>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let serial_idx = normalized.iter().position(|h| h == "serial_no");
    let roll_idx = normalized.iter().position(|h| h == "roll_no");

    if serial_idx.is_none() && roll_idx.is_none() {
        return Ok(None);
    }

    for record in reader.records() {
        let record = record?;

        let serial_match = serial_idx
            .and_then(|i| record.get(i))
            .and_then(parse_integer)
            .is_some_and(|serial| serial == serial_no);
        let roll_match = roll_idx
            .and_then(|i| record.get(i))
            .is_some_and(|roll| !roll.is_empty() && roll == roll_no);

        if serial_match || roll_match {
            let fields = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect();
            return Ok(Some(fields));
        }
    }

    Ok(None)
}

/// Run `extract_pdf_text` on the blocking pool
pub async fn read_pdf_text(path: PathBuf) -> Result<String> {
    tokio::task::spawn_blocking(move || extract_pdf_text(&path))
        .await
        .map_err(|e| AppError::Internal {
            message: format!("PDF extraction task failed: {}", e),
        })?
}

/// Run `find_student_row` on the blocking pool
pub async fn read_student_row(
    path: PathBuf,
    serial_no: i32,
    roll_no: String,
) -> Result<Option<Vec<(String, String)>>> {
    tokio::task::spawn_blocking(move || find_student_row(&path, serial_no, &roll_no))
        .await
        .map_err(|e| AppError::Internal {
            message: format!("CSV lookup task failed: {}", e),
        })?
}
