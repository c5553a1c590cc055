//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attendance ratio below which a student is flagged
pub const LOW_ATTENDANCE_RATIO: f64 = 0.7;

/// GPA above which a student counts as high-performing
pub const HIGH_GPA_THRESHOLD: f64 = 7.0;

/// Counts produced by one tabular import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub created: usize,
    pub updated: usize,
}

/// Portal-wide statistics for administrators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_students: u64,
    pub total_files: u64,
    pub csv_files: u64,
    pub pdf_files: u64,
    pub total_chats: u64,
    pub student_chats: u64,
    pub admin_chats: u64,
    pub low_attendance_students: u64,
    pub high_gpa_students: u64,
}

/// One row of the administrator student listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: i32,
    pub serial_no: i32,
    pub roll_no: String,
    pub name: String,
    pub major: Option<String>,
    pub current_gpa: Option<f64>,
    pub attendance: String,
    pub attendance_percentage: f64,
}

impl From<&Student> for StudentSummary {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            serial_no: student.serial_no,
            roll_no: student.roll_no.clone(),
            name: student.name.clone(),
            major: student.major.clone(),
            current_gpa: student.current_gpa,
            attendance: student.attendance_label(),
            attendance_percentage: student.attendance_percentage(),
        }
    }
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Account Operations
    // ========================================================================

    /// Find account by email
    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        AccountEntity::find()
            .filter(AccountColumn::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Create a new account from an already hashed password
    pub async fn create_account(
        &self,
        email: &str,
        password_hash: String,
        is_admin: bool,
    ) -> Result<Account> {
        let account = AccountActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            is_admin: Set(is_admin),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        account.insert(self.conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Student Operations
    // ========================================================================

    /// Find student by ID
    pub async fn find_student_by_id(&self, id: i32) -> Result<Option<Student>> {
        StudentEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find student by the `(serial_no, roll_no)` natural key
    pub async fn find_student_by_natural_key(
        &self,
        serial_no: i32,
        roll_no: &str,
    ) -> Result<Option<Student>> {
        StudentEntity::find()
            .filter(StudentColumn::SerialNo.eq(serial_no))
            .filter(StudentColumn::RollNo.eq(roll_no))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// All students in insertion order
    pub async fn list_students(&self) -> Result<Vec<Student>> {
        StudentEntity::find()
            .order_by_asc(StudentColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Delete a student, returning the removed record if it existed
    pub async fn delete_student(&self, id: i32) -> Result<Option<Student>> {
        let txn = self.conn().begin().await?;

        let Some(student) = StudentEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        StudentEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        Ok(Some(student))
    }

    /// Insert new students and overwrite existing ones, all-or-nothing.
    ///
    /// Patches are applied in order, so a key repeated within one batch
    /// is created once and then updated.
    pub async fn upsert_students(&self, patches: &[StudentPatch]) -> Result<ImportOutcome> {
        let txn = self.conn().begin().await?;
        let mut outcome = ImportOutcome::default();

        for patch in patches {
            let existing = StudentEntity::find()
                .filter(StudentColumn::SerialNo.eq(patch.serial_no))
                .filter(StudentColumn::RollNo.eq(patch.roll_no.as_str()))
                .one(&txn)
                .await?;

            match existing {
                Some(student) => {
                    let mut active: StudentActiveModel = student.into();
                    patch.apply_to(&mut active);
                    active.update(&txn).await?;
                    outcome.updated += 1;
                }
                None => {
                    let mut active = StudentActiveModel {
                        serial_no: Set(patch.serial_no),
                        roll_no: Set(patch.roll_no.clone()),
                        created_at: Set(Utc::now().into()),
                        ..Default::default()
                    };
                    patch.apply_to(&mut active);
                    active.insert(&txn).await?;
                    outcome.created += 1;
                }
            }
        }

        // Dropping the transaction on any early return above rolls it back
        txn.commit().await?;
        Ok(outcome)
    }

    // ========================================================================
    // Uploaded File Operations
    // ========================================================================

    /// Record an accepted upload
    pub async fn create_uploaded_file(
        &self,
        filename: &str,
        file_path: &str,
        kind: FileKind,
        uploaded_by: Option<i32>,
    ) -> Result<UploadedFile> {
        let file = UploadedFileActiveModel {
            filename: Set(filename.to_string()),
            file_path: Set(file_path.to_string()),
            file_type: Set(kind.as_str().to_string()),
            uploaded_by: Set(uploaded_by),
            uploaded_at: Set(Utc::now().into()),
            ..Default::default()
        };

        file.insert(self.conn()).await.map_err(Into::into)
    }

    /// All uploads, newest first
    pub async fn list_uploaded_files(&self) -> Result<Vec<UploadedFile>> {
        UploadedFileEntity::find()
            .order_by_desc(UploadedFileColumn::UploadedAt)
            .order_by_desc(UploadedFileColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Chat Log Operations
    // ========================================================================

    /// Append a chat log entry
    pub async fn create_chat_log(
        &self,
        user_type: &str,
        user_id: i32,
        query: &str,
        response: &str,
    ) -> Result<ChatLog> {
        let entry = ChatLogActiveModel {
            user_type: Set(user_type.to_string()),
            user_id: Set(user_id),
            query: Set(query.to_string()),
            response: Set(response.to_string()),
            timestamp: Set(Utc::now().into()),
            ..Default::default()
        };

        entry.insert(self.conn()).await.map_err(Into::into)
    }

    /// All chat logs, newest first
    pub async fn list_chat_logs(&self) -> Result<Vec<ChatLog>> {
        ChatLogEntity::find()
            .order_by_desc(ChatLogColumn::Timestamp)
            .order_by_desc(ChatLogColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Number of chats per UTC day over the last `days` days, oldest day first
    pub async fn chat_activity(&self, days: i64) -> Result<Vec<(String, u64)>> {
        let since: DateTime<Utc> = Utc::now() - Duration::days(days);

        let logs = ChatLogEntity::find()
            .filter(ChatLogColumn::Timestamp.gte(since.fixed_offset()))
            .all(self.conn())
            .await?;

        let mut per_day: BTreeMap<String, u64> = BTreeMap::new();
        for log in logs {
            let day = log.timestamp.with_timezone(&Utc).format("%Y-%m-%d").to_string();
            *per_day.entry(day).or_default() += 1;
        }

        Ok(per_day.into_iter().collect())
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Aggregate counts used by the admin assistant and dashboard
    pub async fn aggregate_stats(&self) -> Result<AggregateStats> {
        let conn = self.conn();

        let students = StudentEntity::find().all(conn).await?;
        let low_attendance_students = students
            .iter()
            .filter(|s| matches!(s.attendance_ratio(), Some(r) if r < LOW_ATTENDANCE_RATIO))
            .count() as u64;

        let high_gpa_students = StudentEntity::find()
            .filter(StudentColumn::CurrentGpa.gt(HIGH_GPA_THRESHOLD))
            .count(conn)
            .await?;

        let total_files = UploadedFileEntity::find().count(conn).await?;
        let csv_files = UploadedFileEntity::find()
            .filter(UploadedFileColumn::FileType.eq(FileKind::Csv.as_str()))
            .count(conn)
            .await?;
        let pdf_files = UploadedFileEntity::find()
            .filter(UploadedFileColumn::FileType.eq(FileKind::Pdf.as_str()))
            .count(conn)
            .await?;

        let total_chats = ChatLogEntity::find().count(conn).await?;
        let student_chats = ChatLogEntity::find()
            .filter(ChatLogColumn::UserType.eq("student"))
            .count(conn)
            .await?;
        let admin_chats = ChatLogEntity::find()
            .filter(ChatLogColumn::UserType.eq("admin"))
            .count(conn)
            .await?;

        Ok(AggregateStats {
            total_students: students.len() as u64,
            total_files,
            csv_files,
            pdf_files,
            total_chats,
            student_chats,
            admin_chats,
            low_attendance_students,
            high_gpa_students,
        })
    }

    // ========================================================================
    // Session Operations
    // ========================================================================

    /// Store a new login session
    pub async fn create_session(
        &self,
        session_id: &str,
        state: serde_json::Value,
        ttl: Duration,
    ) -> Result<SessionRecord> {
        let now = Utc::now();

        let session = SessionActiveModel {
            id: Set(session_id.to_string()),
            state: Set(state),
            created_at: Set(now.into()),
            last_active_at: Set(now.into()),
            expires_at: Set((now + ttl).into()),
        };

        session.insert(self.conn()).await.map_err(Into::into)
    }

    /// Find session by ID
    pub async fn find_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        SessionEntity::find_by_id(session_id.to_string())
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Push the expiry of a live session forward
    pub async fn renew_session(&self, session: SessionRecord, ttl: Duration) -> Result<SessionRecord> {
        let now = Utc::now();
        let mut active: SessionActiveModel = session.into();
        active.last_active_at = Set(now.into());
        active.expires_at = Set((now + ttl).into());

        active.update(self.conn()).await.map_err(Into::into)
    }

    /// Remove a session; missing sessions are not an error
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        SessionEntity::delete_by_id(session_id.to_string())
            .exec(self.conn())
            .await?;
        Ok(())
    }

    /// Remove every session past its expiry, returning how many went
    pub async fn delete_expired_sessions(&self) -> Result<u64> {
        let result = SessionEntity::delete_many()
            .filter(SessionColumn::ExpiresAt.lt(Utc::now().fixed_offset()))
            .exec(self.conn())
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> Repository {
        Repository::new(DbPool::in_memory().await.unwrap())
    }

    fn patch(serial_no: i32, roll_no: &str, name: &str) -> StudentPatch {
        StudentPatch::new(serial_no, roll_no, name)
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let repo = repo().await;

        let first = repo.upsert_students(&[patch(101, "R1", "Asha")]).await.unwrap();
        assert_eq!(first, ImportOutcome { created: 1, updated: 0 });

        let mut renamed = patch(101, "R1", "Asha K");
        renamed.major = Some("Physics".into());
        let second = repo.upsert_students(&[renamed]).await.unwrap();
        assert_eq!(second, ImportOutcome { created: 0, updated: 1 });

        let students = repo.list_students().await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].name, "Asha K");
        assert_eq!(students[0].major.as_deref(), Some("Physics"));
    }

    #[tokio::test]
    async fn test_upsert_repeated_key_in_one_batch() {
        let repo = repo().await;

        let outcome = repo
            .upsert_students(&[patch(1, "A", "First"), patch(1, "A", "Second"), patch(2, "B", "Other")])
            .await
            .unwrap();

        assert_eq!(outcome, ImportOutcome { created: 2, updated: 1 });
        let student = repo.find_student_by_natural_key(1, "A").await.unwrap().unwrap();
        assert_eq!(student.name, "Second");
    }

    #[tokio::test]
    async fn test_delete_student() {
        let repo = repo().await;
        repo.upsert_students(&[patch(5, "R5", "Ravi")]).await.unwrap();
        let id = repo.list_students().await.unwrap()[0].id;

        let deleted = repo.delete_student(id).await.unwrap();
        assert_eq!(deleted.map(|s| s.name), Some("Ravi".to_string()));
        assert!(repo.delete_student(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_aggregate_stats() {
        let repo = repo().await;

        let mut low = patch(1, "A", "Low");
        low.total_days = Some(100);
        low.days_present = Some(50);
        low.current_gpa = Some(8.2);
        let mut fine = patch(2, "B", "Fine");
        fine.total_days = Some(100);
        fine.days_present = Some(90);
        fine.current_gpa = Some(6.5);
        repo.upsert_students(&[low, fine]).await.unwrap();

        let admin = repo.create_account("a@x.io", "hash".into(), true).await.unwrap();
        repo.create_uploaded_file("s.csv", "/tmp/s.csv", FileKind::Csv, Some(admin.id))
            .await
            .unwrap();
        repo.create_chat_log("student", 1, "hi", "hello").await.unwrap();
        repo.create_chat_log("admin", admin.id, "stats", "ok").await.unwrap();

        let stats = repo.aggregate_stats().await.unwrap();
        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.low_attendance_students, 1);
        assert_eq!(stats.high_gpa_students, 1);
        assert_eq!((stats.total_files, stats.csv_files, stats.pdf_files), (1, 1, 0));
        assert_eq!((stats.total_chats, stats.student_chats, stats.admin_chats), (2, 1, 1));
    }

    #[tokio::test]
    async fn test_chat_activity_groups_by_day() {
        let repo = repo().await;
        repo.create_chat_log("student", 1, "a", "b").await.unwrap();
        repo.create_chat_log("student", 1, "c", "d").await.unwrap();

        let activity = repo.chat_activity(7).await.unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].1, 2);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let repo = repo().await;
        let state = serde_json::json!({"role": "admin"});

        let created = repo.create_session("abc", state.clone(), Duration::hours(1)).await.unwrap();
        assert!(!created.is_expired());

        let found = repo.find_session("abc").await.unwrap().unwrap();
        assert_eq!(found.state, state);

        let renewed = repo.renew_session(found, Duration::days(1)).await.unwrap();
        assert!(renewed.expires_at > created.expires_at);

        repo.delete_session("abc").await.unwrap();
        repo.delete_session("abc").await.unwrap();
        assert!(repo.find_session("abc").await.unwrap().is_none());
    }
}
