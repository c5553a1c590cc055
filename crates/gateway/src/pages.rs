//! Server-rendered HTML pages
//!
//! Pages are small and static apart from a few interpolated values, so they
//! are built with `format!` rather than a template engine. Every interpolated
//! value passes through `escape_html`.

use campusdesk_common::db::{models::UploadedFile, AggregateStats};
use std::fmt::Write;

/// Notice shown above a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    fn render(&self) -> String {
        let class = match self.level {
            FlashLevel::Success => "flash success",
            FlashLevel::Warning => "flash warning",
            FlashLevel::Error => "flash error",
        };
        format!(r#"<div class="{}">{}</div>"#, class, escape_html(&self.message))
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f5f6f8; color: #222; }
header { background: #1f3a5f; color: #fff; padding: 0.8rem 1.5rem; display: flex; gap: 1rem; align-items: center; }
header a { color: #fff; text-decoration: none; }
header .spacer { flex: 1; }
main { max-width: 960px; margin: 1.5rem auto; padding: 0 1rem; }
.card { background: #fff; border-radius: 6px; padding: 1rem 1.5rem; margin-bottom: 1rem; box-shadow: 0 1px 2px rgba(0,0,0,0.08); }
.flash { padding: 0.6rem 1rem; border-radius: 4px; margin-bottom: 1rem; }
.flash.success { background: #e3f6e8; }
.flash.warning { background: #fff4d6; }
.flash.error { background: #fde2e1; }
.stats { display: flex; gap: 1rem; }
.stats .card { flex: 1; text-align: center; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 0.4rem; border-bottom: 1px solid #e5e5e5; }
#chat-messages { height: 420px; overflow-y: auto; }
.message { margin: 0.4rem 0; white-space: pre-wrap; }
.message.user { text-align: right; }
"#;

const CHAT_SCRIPT: &str = r#"
document.getElementById('chat-form').addEventListener('submit', async function (e) {
    e.preventDefault();
    const input = document.getElementById('message-input');
    const messages = document.getElementById('chat-messages');
    const query = input.value.trim();
    if (!query) return;

    const add = (who, text) => {
        const div = document.createElement('div');
        div.className = 'message ' + who;
        div.textContent = text;
        messages.appendChild(div);
        messages.scrollTop = messages.scrollHeight;
    };

    add('user', query);
    input.value = '';

    try {
        const res = await fetch('/api/chat', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ query })
        });
        const body = await res.json();
        add('bot', body.response || body.error || 'Something went wrong.');
    } catch (err) {
        add('bot', 'Sorry, there was an error processing your request.');
    }
});
"#;

fn layout(title: &str, nav: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | CampusDesk</title>
<style>{STYLE}</style>
</head>
<body>
<header><strong>CampusDesk</strong>{nav}</header>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape_html(title),
    )
}

fn admin_nav(email: &str) -> String {
    format!(
        r#"<a href="/admin/dashboard">Dashboard</a><a href="/admin/upload">Upload</a><a href="/admin/chat">Assistant</a><span class="spacer"></span><span>{}</span><a href="/logout">Logout</a>"#,
        escape_html(email)
    )
}

fn chat_panel(greeting: &str) -> String {
    format!(
        r#"<div class="card">
<div id="chat-messages"><div class="message bot">{}</div></div>
<form id="chat-form">
<input id="message-input" name="query" maxlength="2000" autocomplete="off" placeholder="Ask a question..." style="width:80%">
<button type="submit">Send</button>
</form>
</div>
<script>{CHAT_SCRIPT}</script>"#,
        escape_html(greeting)
    )
}

pub fn login_page(flash: Option<&Flash>) -> String {
    let notice = flash.map(Flash::render).unwrap_or_default();
    let body = format!(
        r#"{notice}
<div class="card">
<h2>Student login</h2>
<form method="post" action="/login">
<input type="hidden" name="login_type" value="student">
<p><label>Serial number <input name="serial_no" inputmode="numeric" required></label></p>
<p><label>Roll number <input name="roll_no" required></label></p>
<button type="submit">Log in</button>
</form>
</div>
<div class="card">
<h2>Administrator login</h2>
<form method="post" action="/login">
<input type="hidden" name="login_type" value="admin">
<p><label>Email <input type="email" name="email" required></label></p>
<p><label>Password <input type="password" name="password" required></label></p>
<button type="submit">Log in</button>
</form>
</div>"#
    );
    layout("Login", "", &body)
}

pub fn chat_page(student_name: &str) -> String {
    let nav = format!(
        r#"<span class="spacer"></span><span>{}</span><a href="/logout">Logout</a>"#,
        escape_html(student_name)
    );
    let greeting = format!(
        "Hello {}! Ask me about your grades, attendance or the code of conduct.",
        student_name
    );
    layout("Assistant", &nav, &chat_panel(&greeting))
}

pub fn admin_chat_page(email: &str) -> String {
    layout(
        "Admin assistant",
        &admin_nav(email),
        &chat_panel("Ask about students, uploads or chat activity. Try \"list students\"."),
    )
}

pub fn dashboard_page(email: &str, stats: &AggregateStats, activity: &[(String, u64)]) -> String {
    let mut rows = String::new();
    for (day, count) in activity {
        let _ = write!(rows, "<tr><td>{}</td><td>{}</td></tr>", escape_html(day), count);
    }
    if rows.is_empty() {
        rows.push_str(r#"<tr><td colspan="2">No chats in the last 7 days.</td></tr>"#);
    }

    let body = format!(
        r#"<div id="admin-dashboard" class="stats">
<div class="card"><h3>Students</h3><p>{students}</p></div>
<div class="card"><h3>Uploads</h3><p>{uploads}</p></div>
<div class="card"><h3>Chats</h3><p>{chats}</p></div>
</div>
<div class="card">
<h3>Chats per day (last 7 days)</h3>
<table><thead><tr><th>Day</th><th>Chats</th></tr></thead><tbody>{rows}</tbody></table>
</div>"#,
        students = stats.total_students,
        uploads = stats.total_files,
        chats = stats.total_chats,
    );
    layout("Dashboard", &admin_nav(email), &body)
}

pub fn upload_page(email: &str, files: &[UploadedFile], flash: Option<&Flash>) -> String {
    let notice = flash.map(Flash::render).unwrap_or_default();

    let mut rows = String::new();
    for file in files {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&file.filename),
            escape_html(&file.file_type),
            file.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    if rows.is_empty() {
        rows.push_str(r#"<tr><td colspan="3">No files uploaded yet.</td></tr>"#);
    }

    let body = format!(
        r#"{notice}
<div class="card">
<h2>Upload student data</h2>
<p>CSV files are imported into student records. PDF files are searched when students ask about reports.</p>
<form method="post" action="/admin/upload" enctype="multipart/form-data">
<input type="file" name="file" accept=".csv,.pdf" required>
<button type="submit">Upload</button>
</form>
</div>
<div class="card">
<h3>Uploaded files</h3>
<table><thead><tr><th>File</th><th>Type</th><th>Uploaded</th></tr></thead><tbody>{rows}</tbody></table>
</div>"#
    );
    layout("Upload", &admin_nav(email), &body)
}
