//! Tabular student import
//!
//! Reads a CSV with a header row, maps recognised headers onto student
//! fields and upserts every usable row by natural key in one transaction.

mod upload;

pub use upload::{sanitize_filename, StoredUpload, UploadStore};

use crate::db::models::StudentPatch;
use crate::db::Repository;
use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Columns a file must carry to be importable
pub const REQUIRED_COLUMNS: &[&str] = &["serial_no", "roll_no", "name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    SerialNo,
    RollNo,
    Name,
    Street,
    City,
    State,
    PinCode,
    FatherName,
    MotherName,
    PhoneNumber,
    TotalDays,
    DaysPresent,
    DaysAbsent,
    Major,
    CurrentGpa,
    Courses,
    DateOfBirth,
    Gender,
    Hobbies,
    Semester(usize),
}

const HEADER_TABLE: &[(&str, Field)] = &[
    ("serial_no", Field::SerialNo),
    ("roll_no", Field::RollNo),
    ("name", Field::Name),
    ("street", Field::Street),
    ("city", Field::City),
    ("state", Field::State),
    ("pin_code", Field::PinCode),
    ("father_name", Field::FatherName),
    ("mother_name", Field::MotherName),
    ("phone_number", Field::PhoneNumber),
    ("total_days", Field::TotalDays),
    ("days_present", Field::DaysPresent),
    ("days_absent", Field::DaysAbsent),
    ("major", Field::Major),
    ("current_gpa", Field::CurrentGpa),
    ("courses", Field::Courses),
    ("date_of_birth", Field::DateOfBirth),
    ("gender", Field::Gender),
    ("hobbies", Field::Hobbies),
    ("sem1", Field::Semester(0)),
    ("sem2", Field::Semester(1)),
    ("sem3", Field::Semester(2)),
    ("sem4", Field::Semester(3)),
    ("sem5", Field::Semester(4)),
    ("sem6", Field::Semester(5)),
    ("semester_1", Field::Semester(0)),
    ("semester_2", Field::Semester(1)),
    ("semester_3", Field::Semester(2)),
    ("semester_4", Field::Semester(3)),
    ("semester_5", Field::Semester(4)),
    ("semester_6", Field::Semester(5)),
];

/// Outcome of importing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportResult {
    Imported {
        created: usize,
        updated: usize,
        skipped: usize,
    },
    MissingColumns {
        columns: Vec<String>,
    },
}

impl ImportResult {
    /// One-line summary for flash messages
    pub fn summary(&self) -> String {
        match self {
            ImportResult::Imported {
                created,
                updated,
                skipped,
            } => format!(
                "Imported {} new and updated {} existing student records ({} rows skipped)",
                created, updated, skipped
            ),
            ImportResult::MissingColumns { columns } => {
                format!("CSV is missing required columns: {}", columns.join(", "))
            }
        }
    }
}

/// Trim, case-fold and replace spaces with underscores
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Integer cell, accepting a whole-valued decimal such as "8.0"
pub fn parse_integer(cell: &str) -> Option<i32> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if let Ok(value) = cell.parse::<i32>() {
        return Some(value);
    }
    cell.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() <= i32::MAX as f64)
        .map(|v| v as i32)
}

fn parse_float(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_text(cell: &str) -> Option<String> {
    let cell = cell.trim();
    (!cell.is_empty()).then(|| cell.to_string())
}

fn parse_date(cell: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(cell.trim(), "%Y-%m-%d").ok()
}

/// Rows parsed from one file
#[derive(Debug, Default)]
struct ParsedFile {
    patches: Vec<StudentPatch>,
    skipped: usize,
}

fn resolve_headers(headers: &csv::StringRecord) -> (Vec<Option<Field>>, Vec<String>) {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();

    let mapping = normalized
        .iter()
        .map(|h| {
            HEADER_TABLE
                .iter()
                .find(|(name, _)| *name == h.as_str())
                .map(|(_, field)| *field)
        })
        .collect::<Vec<_>>();

    let missing = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !normalized.iter().any(|h| h == *required))
        .map(|c| c.to_string())
        .collect();

    (mapping, missing)
}

fn row_to_patch(mapping: &[Option<Field>], record: &csv::StringRecord) -> Option<StudentPatch> {
    let mut patch = StudentPatch::default();
    let mut serial_no = None;

    for (field, cell) in mapping.iter().zip(record.iter()) {
        let Some(field) = field else { continue };

        match field {
            Field::SerialNo => serial_no = parse_integer(cell),
            Field::RollNo => patch.roll_no = cell.trim().to_string(),
            Field::Name => patch.name = cell.trim().to_string(),
            Field::Street => patch.street = parse_text(cell),
            Field::City => patch.city = parse_text(cell),
            Field::State => patch.state = parse_text(cell),
            Field::PinCode => patch.pin_code = parse_text(cell),
            Field::FatherName => patch.father_name = parse_text(cell),
            Field::MotherName => patch.mother_name = parse_text(cell),
            Field::PhoneNumber => patch.phone_number = parse_text(cell),
            Field::TotalDays => patch.total_days = parse_integer(cell),
            Field::DaysPresent => patch.days_present = parse_integer(cell),
            Field::DaysAbsent => patch.days_absent = parse_integer(cell),
            Field::Major => patch.major = parse_text(cell),
            Field::CurrentGpa => patch.current_gpa = parse_float(cell),
            Field::Courses => patch.courses = parse_text(cell),
            Field::DateOfBirth => patch.date_of_birth = parse_date(cell),
            Field::Gender => patch.gender = parse_text(cell),
            Field::Hobbies => patch.hobbies = parse_text(cell),
            Field::Semester(i) => patch.semesters[*i] = parse_float(cell),
        }
    }

    patch.serial_no = serial_no?;
    if patch.roll_no.is_empty() || patch.name.is_empty() {
        return None;
    }
    Some(patch)
}

fn parse_file(path: &Path) -> Result<std::result::Result<ParsedFile, Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;

    let (mapping, missing) = resolve_headers(reader.headers()?);
    if !missing.is_empty() {
        return Ok(Err(missing));
    }

    let mut parsed = ParsedFile::default();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        match row_to_patch(&mapping, &record) {
            Some(patch) => parsed.patches.push(patch),
            None => {
                debug!(row = line + 1, "Skipping row without a usable natural key");
                parsed.skipped += 1;
            }
        }
    }

    Ok(Ok(parsed))
}

/// Imports tabular uploads into the record store
#[derive(Clone)]
pub struct Importer {
    repo: Repository,
}

impl Importer {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Import one CSV file. Any failure leaves the store untouched.
    pub async fn import_tabular(&self, path: &Path) -> Result<ImportResult> {
        let owned: PathBuf = path.to_path_buf();
        let parsed = tokio::task::spawn_blocking(move || parse_file(&owned))
            .await
            .map_err(|e| AppError::Internal {
                message: format!("CSV parse task failed: {}", e),
            })??;

        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(columns) => {
                // Reported to the caller as an outcome, logged with the error tag
                let err = AppError::MissingColumns {
                    columns: columns.clone(),
                };
                err.log();
                crate::metrics::record_error(&err);
                warn!(path = %path.display(), "CSV not imported");

                return Ok(ImportResult::MissingColumns { columns });
            }
        };

        let outcome = self.repo.upsert_students(&parsed.patches).await?;
        crate::metrics::record_import(outcome.created, outcome.updated, parsed.skipped);

        info!(
            path = %path.display(),
            created = outcome.created,
            updated = outcome.updated,
            skipped = parsed.skipped,
            "Student import complete"
        );

        Ok(ImportResult::Imported {
            created: outcome.created,
            updated: outcome.updated,
            skipped: parsed.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use std::io::Write;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        csv_bytes(contents.as_bytes())
    }

    fn csv_bytes(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    async fn importer() -> (Importer, Repository) {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        (Importer::new(repo.clone()), repo)
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Serial No "), "serial_no");
        assert_eq!(normalize_header("Semester 3"), "semester_3");
        assert_eq!(normalize_header("current_gpa"), "current_gpa");
    }

    #[test]
    fn test_parse_integer_lenient() {
        assert_eq!(parse_integer("8"), Some(8));
        assert_eq!(parse_integer("8.0"), Some(8));
        assert_eq!(parse_integer("8.5"), None);
        assert_eq!(parse_integer(""), None);
        assert_eq!(parse_integer("abc"), None);
    }

    #[tokio::test]
    async fn test_semester_header_import() {
        let (importer, repo) = importer().await;
        let file = csv_file("serial_no,roll_no,name,Semester 1\n101,R1,Asha,8.5\n");

        let result = importer.import_tabular(file.path()).await.unwrap();
        assert_eq!(
            result,
            ImportResult::Imported {
                created: 1,
                updated: 0,
                skipped: 0
            }
        );

        let students = repo.list_students().await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].sem1, Some(8.5));
    }

    #[tokio::test]
    async fn test_reimport_updates_in_place() {
        let (importer, repo) = importer().await;
        let first = csv_file("Serial No,Roll No,Name,Major\n1,A,Asha,Math\n2,B,Ravi,Art\n");
        importer.import_tabular(first.path()).await.unwrap();

        let second = csv_file("serial_no,roll_no,name,major,city\n1,A,Asha,Physics,Pune\n3,C,Meena,\n");
        let result = importer.import_tabular(second.path()).await.unwrap();
        assert_eq!(
            result,
            ImportResult::Imported {
                created: 1,
                updated: 1,
                skipped: 0
            }
        );

        let students = repo.list_students().await.unwrap();
        assert_eq!(students.len(), 3);
        let asha = repo.find_student_by_natural_key(1, "A").await.unwrap().unwrap();
        assert_eq!(asha.major.as_deref(), Some("Physics"));
        assert_eq!(asha.city.as_deref(), Some("Pune"));
    }

    #[tokio::test]
    async fn test_missing_columns() {
        let (importer, repo) = importer().await;
        let file = csv_file("serial_no,name\n1,Asha\n");

        let result = importer.import_tabular(file.path()).await.unwrap();
        assert_eq!(
            result,
            ImportResult::MissingColumns {
                columns: vec!["roll_no".to_string()]
            }
        );
        assert!(repo.list_students().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_rows_skipped_and_attendance_derived() {
        let (importer, repo) = importer().await;
        let file = csv_file(
            "serial_no,roll_no,name,total_days,days_absent,date_of_birth,unknown\n\
             x,R0,Bad,10,1,2001-01-01,?\n\
             5.0,R5,Good,100,10,2002-03-04,?\n\
             6,,NoRoll,,,,\n",
        );

        let result = importer.import_tabular(file.path()).await.unwrap();
        assert_eq!(
            result,
            ImportResult::Imported {
                created: 1,
                updated: 0,
                skipped: 2
            }
        );

        let good = repo.find_student_by_natural_key(5, "R5").await.unwrap().unwrap();
        assert_eq!(good.days_present, Some(90));
        assert_eq!(good.days_absent(), Some(10));
        assert_eq!(good.date_of_birth, NaiveDate::from_ymd_opt(2002, 3, 4));
    }

    #[tokio::test]
    async fn test_extreme_attendance_values() {
        let (importer, repo) = importer().await;
        let file = csv_file(
            "serial_no,roll_no,name,total_days,days_absent\n\
             1,R1,Asha,-2147483648,1\n\
             2,R2,Ravi,2147483647,-2147483648\n",
        );

        let result = importer.import_tabular(file.path()).await.unwrap();
        assert_eq!(
            result,
            ImportResult::Imported {
                created: 2,
                updated: 0,
                skipped: 0
            }
        );

        let asha = repo.find_student_by_natural_key(1, "R1").await.unwrap().unwrap();
        assert_eq!(asha.days_present, Some(0));
        let ravi = repo.find_student_by_natural_key(2, "R2").await.unwrap().unwrap();
        assert_eq!(ravi.days_present, Some(i32::MAX));
    }

    #[tokio::test]
    async fn test_unreadable_row_rolls_back_whole_file() {
        let (importer, repo) = importer().await;
        let mut contents = b"serial_no,roll_no,name\n1,R1,Asha\n2,R2,Ravi\n3,R3,".to_vec();
        contents.extend_from_slice(&[0xff, 0xfe, b'\n']);
        let file = csv_bytes(&contents);

        let err = importer.import_tabular(file.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Import(_)));
        assert!(repo.list_students().await.unwrap().is_empty());
    }
}
