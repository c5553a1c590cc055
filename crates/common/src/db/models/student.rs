//! Student record entity
//!
//! `(serial_no, roll_no)` is the natural key; the unique index is created by
//! the schema bootstrap. Absent days are derived from the two stored counters.

use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub serial_no: i32,

    #[sea_orm(column_type = "Text")]
    pub roll_no: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub phone_number: Option<String>,

    pub total_days: Option<i32>,
    pub days_present: Option<i32>,

    pub major: Option<String>,
    pub current_gpa: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub courses: Option<String>,

    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub hobbies: Option<String>,

    pub sem1: Option<f64>,
    pub sem2: Option<f64>,
    pub sem3: Option<f64>,
    pub sem4: Option<f64>,
    pub sem5: Option<f64>,
    pub sem6: Option<f64>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Days absent, derived from the stored counters
    pub fn days_absent(&self) -> Option<i32> {
        match (self.total_days, self.days_present) {
            (Some(total), Some(present)) => Some(total.saturating_sub(present).max(0)),
            _ => None,
        }
    }

    /// Fraction of days attended; `None` when no days have been recorded
    pub fn attendance_ratio(&self) -> Option<f64> {
        match (self.total_days, self.days_present) {
            (Some(total), Some(present)) if total > 0 => Some(present as f64 / total as f64),
            _ => None,
        }
    }

    /// Attendance percentage rounded to two decimals, 0 when unknown
    pub fn attendance_percentage(&self) -> f64 {
        self.attendance_ratio()
            .map(|ratio| (ratio * 10_000.0).round() / 100.0)
            .unwrap_or(0.0)
    }

    /// Attendance as "present/total"
    pub fn attendance_label(&self) -> String {
        format!(
            "{}/{}",
            display_opt(&self.days_present),
            display_opt(&self.total_days)
        )
    }

    /// Semester results in order, semester 1 first
    pub fn semester_results(&self) -> [Option<f64>; 6] {
        [self.sem1, self.sem2, self.sem3, self.sem4, self.sem5, self.sem6]
    }
}

/// One imported row, keyed by `(serial_no, roll_no)`.
///
/// Fields left as `None` were absent or empty in the source and keep
/// whatever the stored record already holds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StudentPatch {
    pub serial_no: i32,
    pub roll_no: String,
    pub name: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub phone_number: Option<String>,
    pub total_days: Option<i32>,
    pub days_present: Option<i32>,
    pub days_absent: Option<i32>,
    pub major: Option<String>,
    pub current_gpa: Option<f64>,
    pub courses: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub hobbies: Option<String>,
    pub semesters: [Option<f64>; 6],
}

macro_rules! overwrite {
    ($model:ident, $patch:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$patch.$field {
                $model.$field = Set(Some(value.clone()));
            }
        )+
    };
}

impl StudentPatch {
    pub fn new(serial_no: i32, roll_no: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            serial_no,
            roll_no: roll_no.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Days present as imported, or derived from total and absent days
    pub fn effective_days_present(&self) -> Option<i32> {
        match (self.days_present, self.total_days, self.days_absent) {
            (Some(present), _, _) => Some(present),
            (None, Some(total), Some(absent)) => Some(total.saturating_sub(absent).max(0)),
            _ => None,
        }
    }

    /// Copy every present field onto the active model
    pub fn apply_to(&self, model: &mut ActiveModel) {
        model.name = Set(self.name.clone());

        overwrite!(
            model, self, street, city, state, pin_code, father_name, mother_name,
            phone_number, total_days, major, current_gpa, courses, date_of_birth,
            gender, hobbies,
        );

        if let Some(present) = self.effective_days_present() {
            model.days_present = Set(Some(present));
        }

        let [s1, s2, s3, s4, s5, s6] = self.semesters;
        for (slot, value) in [
            (&mut model.sem1, s1),
            (&mut model.sem2, s2),
            (&mut model.sem3, s3),
            (&mut model.sem4, s4),
            (&mut model.sem5, s5),
            (&mut model.sem6, s6),
        ] {
            if let Some(value) = value {
                *slot = Set(Some(value));
            }
        }
    }
}

/// Render an optional value the way prompts and listings show it
pub fn display_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total_days: Option<i32>, days_present: Option<i32>) -> Model {
        Model {
            id: 1,
            serial_no: 1,
            roll_no: "R1".into(),
            name: "Asha".into(),
            street: None,
            city: None,
            state: None,
            pin_code: None,
            father_name: None,
            mother_name: None,
            phone_number: None,
            total_days,
            days_present,
            major: None,
            current_gpa: None,
            courses: None,
            date_of_birth: None,
            gender: None,
            hobbies: None,
            sem1: None,
            sem2: None,
            sem3: None,
            sem4: None,
            sem5: None,
            sem6: None,
            created_at: chrono::Utc::now().into(),
        }
    }

    #[test]
    fn test_attendance_derivation() {
        let student = record(Some(120), Some(90));
        assert_eq!(student.days_absent(), Some(30));
        assert_eq!(student.attendance_percentage(), 75.0);
        assert_eq!(student.attendance_label(), "90/120");
    }

    #[test]
    fn test_attendance_unknown() {
        let student = record(Some(0), Some(0));
        assert_eq!(student.attendance_ratio(), None);
        assert_eq!(student.attendance_percentage(), 0.0);
        assert_eq!(record(None, None).attendance_label(), "None/None");
    }

    #[test]
    fn test_patch_derives_days_present() {
        let mut patch = StudentPatch::new(1, "R1", "Asha");
        patch.total_days = Some(100);
        patch.days_absent = Some(12);
        assert_eq!(patch.effective_days_present(), Some(88));

        patch.days_present = Some(80);
        assert_eq!(patch.effective_days_present(), Some(80));
    }

    #[test]
    fn test_attendance_extremes_saturate() {
        let mut patch = StudentPatch::new(1, "R1", "Asha");
        patch.total_days = Some(i32::MIN);
        patch.days_absent = Some(1);
        assert_eq!(patch.effective_days_present(), Some(0));

        patch.total_days = Some(i32::MAX);
        patch.days_absent = Some(i32::MIN);
        assert_eq!(patch.effective_days_present(), Some(i32::MAX));

        assert_eq!(record(Some(i32::MIN), Some(i32::MAX)).days_absent(), Some(0));
        assert_eq!(record(Some(i32::MAX), Some(i32::MIN)).days_absent(), Some(i32::MAX));
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let mut active: ActiveModel = record(Some(10), Some(9)).into();
        let mut patch = StudentPatch::new(1, "R1", "Asha K");
        patch.city = Some("Pune".into());
        patch.semesters[2] = Some(8.5);
        patch.apply_to(&mut active);

        assert_eq!(active.name, Set("Asha K".to_string()));
        assert_eq!(active.city, Set(Some("Pune".to_string())));
        assert_eq!(active.sem3, Set(Some(8.5)));
        assert!(!active.total_days.is_set());
    }
}
