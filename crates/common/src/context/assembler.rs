//! Context Assembler - Gathers the structured data spliced into a prompt
//!
//! Provides:
//! - The student's own record, plus policy text and uploaded-file findings
//!   when the query asks for them
//! - Portal-wide counts for administrators, plus the student listing on request

use super::classifier::{KeywordSet, FILE_TRIGGERS, LISTING_TRIGGERS, POLICY_TRIGGERS};
use crate::auth::{Role, Session};
use crate::db::models::{FileKind, Student};
use crate::db::{AggregateStats, Repository, StudentSummary};
use crate::documents;
use crate::errors::{AppError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Used when the configured code of conduct file cannot be read
pub const DEFAULT_POLICY_TEXT: &str = "\
Students are expected to follow the college code of conduct which includes:
- Regular attendance in classes
- Maintaining proper dress code
- No use of mobile phones in classrooms
- Academic honesty
- Respectful behavior towards faculty and peers
For more details, please refer to the full Code of Conduct document.";

/// What one uploaded file says about a student
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileFinding {
    /// First CSV row matching the student's serial or roll number
    TabularRow {
        filename: String,
        fields: Vec<(String, String)>,
    },
    /// Whether a PDF's text names the student
    DocumentMention { filename: String, mentioned: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentContext {
    pub query: String,
    pub keywords: KeywordSet,
    pub student: Student,
    pub policy_text: Option<String>,

    /// `None` when the query did not ask about files
    pub file_findings: Option<Vec<FileFinding>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminContext {
    pub query: String,
    pub keywords: KeywordSet,
    pub stats: AggregateStats,

    /// Empty unless the query asked for a listing
    pub listing: Vec<StudentSummary>,
}

/// Role-tagged context handed to the prompt compiler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum AssembledContext {
    Student(StudentContext),
    Admin(AdminContext),
}

impl AssembledContext {
    pub fn role(&self) -> Role {
        match self {
            AssembledContext::Student(_) => Role::Student,
            AssembledContext::Admin(_) => Role::Admin,
        }
    }
}

/// Context assembler
#[derive(Clone)]
pub struct ContextAssembler {
    repo: Repository,
    policy_path: PathBuf,
}

impl ContextAssembler {
    pub fn new(repo: Repository, policy_path: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            policy_path: policy_path.into(),
        }
    }

    /// Build the context matching the session's role
    pub async fn assemble(
        &self,
        session: &Session,
        query: &str,
        keywords: KeywordSet,
    ) -> Result<AssembledContext> {
        match session.role {
            Role::Student => self
                .assemble_student_context(query, keywords, session.user_id)
                .await
                .map(AssembledContext::Student),
            Role::Admin => self
                .assemble_admin_context(query, keywords)
                .await
                .map(AssembledContext::Admin),
        }
    }

    pub async fn assemble_student_context(
        &self,
        query: &str,
        keywords: KeywordSet,
        student_id: i32,
    ) -> Result<StudentContext> {
        let student = self
            .repo
            .find_student_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::RecordNotFound {
                resource_type: "Student".to_string(),
                id: student_id.to_string(),
            })?;

        let policy_text = if keywords.any_of(POLICY_TRIGGERS) {
            Some(self.policy_text().await)
        } else {
            None
        };

        let file_findings = if keywords.any_of(FILE_TRIGGERS) {
            Some(self.scan_uploads(&student).await?)
        } else {
            None
        };

        Ok(StudentContext {
            query: query.to_string(),
            keywords,
            student,
            policy_text,
            file_findings,
        })
    }

    pub async fn assemble_admin_context(
        &self,
        query: &str,
        keywords: KeywordSet,
    ) -> Result<AdminContext> {
        let stats = self.repo.aggregate_stats().await?;

        let listing = if keywords.any_of(LISTING_TRIGGERS) {
            self.repo
                .list_students()
                .await?
                .iter()
                .map(StudentSummary::from)
                .collect()
        } else {
            Vec::new()
        };

        Ok(AdminContext {
            query: query.to_string(),
            keywords,
            stats,
            listing,
        })
    }

    async fn policy_text(&self) -> String {
        match tokio::fs::read_to_string(&self.policy_path).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => DEFAULT_POLICY_TEXT.to_string(),
            Err(e) => {
                debug!(path = %self.policy_path.display(), error = %e, "Using default code of conduct");
                DEFAULT_POLICY_TEXT.to_string()
            }
        }
    }

    /// Look for the student in every uploaded file; unreadable files are skipped
    async fn scan_uploads(&self, student: &Student) -> Result<Vec<FileFinding>> {
        let files = self.repo.list_uploaded_files().await?;
        let mut findings = Vec::new();

        for file in files {
            let path = Path::new(&file.file_path).to_path_buf();

            match file.kind() {
                Some(FileKind::Csv) => {
                    match documents::read_student_row(path, student.serial_no, student.roll_no.clone())
                        .await
                    {
                        Ok(Some(fields)) => findings.push(FileFinding::TabularRow {
                            filename: file.filename,
                            fields,
                        }),
                        Ok(None) => {}
                        Err(e) => {
                            warn!(file = %file.filename, error = %e, "Failed to read CSV upload, skipping")
                        }
                    }
                }
                Some(FileKind::Pdf) => match documents::read_pdf_text(path).await {
                    Ok(text) => findings.push(FileFinding::DocumentMention {
                        mentioned: documents::mentions_student(&text, &student.name, &student.roll_no),
                        filename: file.filename,
                    }),
                    Err(e) => {
                        warn!(file = %file.filename, error = %e, "Failed to read PDF upload, skipping")
                    }
                },
                None => {
                    warn!(file = %file.filename, file_type = %file.file_type, "Unknown upload type, skipping")
                }
            }
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::QueryClassifier;
    use crate::db::models::StudentPatch;
    use crate::db::DbPool;
    use std::io::Write;

    async fn setup() -> (ContextAssembler, Repository, tempfile::TempDir) {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let mut asha = StudentPatch::new(101, "R1", "Asha");
        asha.total_days = Some(100);
        asha.days_present = Some(60);
        asha.current_gpa = Some(8.1);
        repo.upsert_students(&[asha, StudentPatch::new(102, "R2", "Ravi")])
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let assembler = ContextAssembler::new(repo.clone(), dir.path().join("missing.txt"));
        (assembler, repo, dir)
    }

    fn keywords(query: &str) -> KeywordSet {
        QueryClassifier::new().classify(query)
    }

    async fn student_id(repo: &Repository, serial_no: i32, roll_no: &str) -> i32 {
        repo.find_student_by_natural_key(serial_no, roll_no)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_policy_question_includes_default_policy() {
        let (assembler, repo, _dir) = setup().await;
        let id = student_id(&repo, 101, "R1").await;

        let query = "What is my attendance policy?";
        let ctx = assembler
            .assemble_student_context(query, keywords(query), id)
            .await
            .unwrap();

        assert_eq!(ctx.student.name, "Asha");
        assert_eq!(ctx.policy_text.as_deref(), Some(DEFAULT_POLICY_TEXT));
        assert!(ctx.file_findings.is_none());
    }

    #[tokio::test]
    async fn test_policy_file_is_read() {
        let (_, repo, dir) = setup().await;
        let path = dir.path().join("conduct.txt");
        std::fs::write(&path, "Be kind.").unwrap();
        let assembler = ContextAssembler::new(repo.clone(), path);
        let id = student_id(&repo, 101, "R1").await;

        let ctx = assembler
            .assemble_student_context("rules", keywords("rules?"), id)
            .await
            .unwrap();
        assert!(ctx.policy_text.is_none());

        let ctx = assembler
            .assemble_student_context("rule", keywords("any rule?"), id)
            .await
            .unwrap();
        assert_eq!(ctx.policy_text.as_deref(), Some("Be kind."));
    }

    #[tokio::test]
    async fn test_unknown_student() {
        let (assembler, _, _dir) = setup().await;
        let err = assembler
            .assemble_student_context("hi", KeywordSet::default(), 9999)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_report_scans_uploads() {
        let (assembler, repo, dir) = setup().await;
        let id = student_id(&repo, 101, "R1").await;

        let csv_path = dir.path().join("marks.csv");
        let mut csv = std::fs::File::create(&csv_path).unwrap();
        csv.write_all(b"serial_no,roll_no,grade\n102,R2,B\n101,R1,A\n").unwrap();
        repo.create_uploaded_file("marks.csv", csv_path.to_str().unwrap(), FileKind::Csv, None)
            .await
            .unwrap();

        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"not a pdf").unwrap();
        repo.create_uploaded_file("broken.pdf", broken.to_str().unwrap(), FileKind::Pdf, None)
            .await
            .unwrap();

        let query = "Show my performance report";
        let ctx = assembler
            .assemble_student_context(query, keywords(query), id)
            .await
            .unwrap();

        let findings = ctx.file_findings.unwrap();
        assert_eq!(findings.len(), 1);
        match &findings[0] {
            FileFinding::TabularRow { filename, fields } => {
                assert_eq!(filename, "marks.csv");
                assert_eq!(fields[2], ("grade".to_string(), "A".to_string()));
            }
            other => panic!("unexpected finding: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_admin_listing_only_when_asked() {
        let (assembler, _, _dir) = setup().await;

        let ctx = assembler
            .assemble_admin_context("list students", keywords("list students"))
            .await
            .unwrap();
        assert_eq!(ctx.listing.len(), 2);
        assert_eq!(ctx.listing[0].attendance, "60/100");
        assert_eq!(ctx.listing[0].attendance_percentage, 60.0);

        let ctx = assembler
            .assemble_admin_context("how many uploads?", keywords("how many uploads?"))
            .await
            .unwrap();
        assert!(ctx.listing.is_empty());
        assert_eq!(ctx.stats.total_students, 2);
        assert_eq!(ctx.stats.low_attendance_students, 1);
        assert_eq!(ctx.stats.high_gpa_students, 1);
    }
}
