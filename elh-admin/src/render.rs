//! Plain-text output for command results.

use std::fmt::Write as _;

use elh_admin_core::admin::{ArticleQuestions, WriteReport};

pub const SERVER_TIMESTAMP_NOTE: &str = "Server Timestamp (will be set by Firestore)";

/// `  key: value` lines for every written field, server timestamps last.
pub fn written_fields(report: &WriteReport) -> String {
    let mut out = String::new();
    for (name, value) in &report.fields {
        let _ = writeln!(out, "  {name}: {value}");
    }
    for name in &report.server_timestamps {
        let _ = writeln!(out, "  {name}: {SERVER_TIMESTAMP_NOTE}");
    }
    out
}

pub fn article_written(title: &str, report: &WriteReport) -> String {
    format!(
        "Article '{title}' (ID: '{}') added/updated successfully.\nData written:\n{}",
        report.id,
        written_fields(report)
    )
}

pub fn question_listing(listing: &ArticleQuestions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Article: {}", listing.title);
    let _ = writeln!(out, "{}", "-".repeat(40));
    for (i, q) in listing.questions.iter().enumerate() {
        let _ = writeln!(out, "Q{}: {}", i + 1, q.text_english);
        for choice in &q.choices {
            let marker = if q.is_correct(choice) { " ✓" } else { "" };
            let _ = writeln!(out, "  {}: {}{}", choice.id, choice.text_english, marker);
        }
        let _ = writeln!(out);
    }
    let _ = write!(out, "Total: {} questions", listing.questions.len());
    out
}
