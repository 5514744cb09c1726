//! CSV export of a school's spotted threads.

use crate::core::forum::Thread;
use chrono::{DateTime, Utc};
use std::borrow::Cow;

pub const CSV_HEADER: [&str; 5] = ["thread_id", "title", "content", "author", "created"];

/// `<school name with underscores>_export_<UTC timestamp>.csv`
pub fn export_filename(school_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_export_{}.csv",
        school_name.replace(' ', "_"),
        at.format("%Y%m%dT%H%M%SZ")
    )
}

/// One row per thread in the given order, CRLF line endings.
pub fn threads_to_csv(threads: &[Thread]) -> String {
    let mut out = String::new();
    push_row(&mut out, &CSV_HEADER);

    for thread in threads {
        let id = thread.id.to_string();
        let created = thread.created.format("%Y-%m-%d %H:%M:%S").to_string();
        push_row(
            &mut out,
            &[
                id.as_str(),
                thread.title.as_str(),
                thread.content.as_str(),
                thread.author.as_deref().unwrap_or(""),
                created.as_str(),
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote_field(field));
    }
    out.push_str("\r\n");
}

/// Quote only when needed; embedded quotes are doubled.
fn quote_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
