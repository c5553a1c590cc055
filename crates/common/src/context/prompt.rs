//! Prompt Compiler - One fixed template per role

use super::assembler::{AdminContext, AssembledContext, FileFinding, StudentContext};
use crate::db::models::display_opt;

const NO_FILE_DATA: &str = "No additional data found in uploaded files.";
const NO_LISTING: &str = "No specific student data requested.";

/// Renders assembled context into the text sent to the language model
#[derive(Debug, Clone)]
pub struct PromptCompiler {
    institution: String,
}

impl PromptCompiler {
    pub fn new(institution: impl Into<String>) -> Self {
        Self {
            institution: institution.into(),
        }
    }

    pub fn render_prompt(&self, context: &AssembledContext) -> String {
        match context {
            AssembledContext::Student(ctx) => self.render_student(ctx),
            AssembledContext::Admin(ctx) => self.render_admin(ctx),
        }
    }

    fn render_student(&self, ctx: &StudentContext) -> String {
        let s = &ctx.student;
        let semesters = s
            .semester_results()
            .iter()
            .enumerate()
            .map(|(i, result)| format!("Semester {}: {}", i + 1, display_opt(result)))
            .collect::<Vec<_>>()
            .join("\n");

        let mut other = Vec::new();
        if let Some(policy) = &ctx.policy_text {
            other.push(policy.trim().to_string());
        }
        if let Some(findings) = &ctx.file_findings {
            other.push(render_findings(findings));
        }

        format!(
            "You are an educational assistant for {institution}.
You need to answer a student's query based on their academic information.

Student Information:
Name: {name}
Roll Number: {roll_no}
Serial Number: {serial_no}
Major: {major}
Current GPA: {gpa}
Attendance: {present} days present out of {total} total days
Courses: {courses}

Semester Results:
{semesters}

Personal Information:
Date of Birth: {dob}
Gender: {gender}
Father's Name: {father}
Mother's Name: {mother}
Phone: {phone}
Address: {street}, {city}, {state}, {pin}
Hobbies: {hobbies}

Other Context:
{other}

The student's query is: \"{query}\"

Please provide a helpful, accurate, and friendly response based ONLY on the information provided.
Be concise but thorough. If you don't have enough information to answer the query,
politely state that you don't have that information.",
            institution = self.institution,
            name = s.name,
            roll_no = s.roll_no,
            serial_no = s.serial_no,
            major = display_opt(&s.major),
            gpa = display_opt(&s.current_gpa),
            present = display_opt(&s.days_present),
            total = display_opt(&s.total_days),
            courses = display_opt(&s.courses),
            semesters = semesters,
            dob = display_opt(&s.date_of_birth),
            gender = display_opt(&s.gender),
            father = display_opt(&s.father_name),
            mother = display_opt(&s.mother_name),
            phone = display_opt(&s.phone_number),
            street = display_opt(&s.street),
            city = display_opt(&s.city),
            state = display_opt(&s.state),
            pin = display_opt(&s.pin_code),
            hobbies = display_opt(&s.hobbies),
            other = other.join("\n"),
            query = ctx.query,
        )
    }

    fn render_admin(&self, ctx: &AdminContext) -> String {
        let stats = &ctx.stats;

        let listing = if ctx.listing.is_empty() {
            NO_LISTING.to_string()
        } else {
            let rows = ctx
                .listing
                .iter()
                .map(|s| {
                    format!(
                        "| {} | {} | {} | {} | {} | {} | {}% |",
                        s.name,
                        s.roll_no,
                        s.serial_no,
                        display_opt(&s.major),
                        display_opt(&s.current_gpa),
                        s.attendance,
                        s.attendance_percentage
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "| Name | Roll No | Serial No | Major | GPA | Attendance | Attendance % |\n{}",
                rows
            )
        };

        format!(
            "You are an administrative assistant for {institution}.
An administrator has asked: \"{query}\"

Based on the available data, here is what I know:

Student data summary:
- Total students: {total_students}
- Students with attendance below 70%: {low_attendance}
- Students with GPA above 7: {high_gpa}

Uploaded files:
- Total files: {total_files}
- CSV files: {csv_files}
- PDF files: {pdf_files}

Chat logs:
- Total queries: {total_chats}
- Student queries: {student_chats}
- Admin queries: {admin_chats}

Student Information (if requested):
{listing}

Please provide a helpful, accurate, and professional response based ONLY on the information provided.
Format data as needed to make it readable, and if you're displaying a list of students,
organize it in a clear tabular format using markdown.

If you don't have enough information to answer the query, politely state that you don't have that information.",
            institution = self.institution,
            query = ctx.query,
            total_students = stats.total_students,
            low_attendance = stats.low_attendance_students,
            high_gpa = stats.high_gpa_students,
            total_files = stats.total_files,
            csv_files = stats.csv_files,
            pdf_files = stats.pdf_files,
            total_chats = stats.total_chats,
            student_chats = stats.student_chats,
            admin_chats = stats.admin_chats,
            listing = listing,
        )
    }
}

fn render_findings(findings: &[FileFinding]) -> String {
    let lines: Vec<String> = findings
        .iter()
        .filter_map(|finding| match finding {
            FileFinding::TabularRow { filename, fields } => {
                let fields = fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("Data from {}:\n{}", filename, fields))
            }
            FileFinding::DocumentMention {
                filename,
                mentioned: true,
            } => Some(format!("The student is mentioned in {}.", filename)),
            FileFinding::DocumentMention { .. } => None,
        })
        .collect();

    if lines.is_empty() {
        NO_FILE_DATA.to_string()
    } else {
        lines.join("\n")
    }
}
