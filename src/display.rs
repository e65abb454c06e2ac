//! Output formatting for fetched WordPress resources
//!
//! Every resource can be printed either as pretty JSON or as one line of text
//! per record. Media files are filtered by extension before printing.

use std::io::{self, Write};

use serde_json::Value;

use crate::data::Resource;

/// How records are written to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Pretty-printed JSON array
    #[default]
    Json,
    /// One line of text per record
    Human,
}

/// Writes `records` of the given resource to `out`
///
/// `excluded_extensions` only applies to [`Resource::Files`].
pub fn display<W: Write>(
    out: &mut W,
    resource: Resource,
    records: &[Value],
    excluded_extensions: &[String],
    mode: OutputMode,
) -> io::Result<()> {
    match resource {
        Resource::Users => display_users(out, records, mode),
        Resource::Files => display_files(out, records, excluded_extensions, mode),
        Resource::Posts => display_posts(out, records, mode),
    }
}

/// Prints users as `User ID: <id>, Username: <name>` lines or JSON
pub fn display_users<W: Write>(out: &mut W, users: &[Value], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Human => {
            for user in users {
                writeln!(
                    out,
                    "User ID: {}, Username: {}",
                    text(&user["id"]),
                    text(&user["name"])
                )?;
            }
            Ok(())
        }
        OutputMode::Json => write_json(out, users),
    }
}

/// Prints posts as `Post ID`, `Title` and `Content` lines or JSON
pub fn display_posts<W: Write>(out: &mut W, posts: &[Value], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Human => {
            for post in posts {
                writeln!(
                    out,
                    "Post ID: {}, Title: {}, Content: {}",
                    text(&post["id"]),
                    text(&post["title"]["rendered"]),
                    text(&post["content"]["rendered"])
                )?;
            }
            Ok(())
        }
        OutputMode::Json => write_json(out, posts),
    }
}

/// Prints media files that survive the extension filter
///
/// Entries that are not JSON objects are skipped. Human mode prints
/// `"id": .., "title": .., "url": ..` with JSON-encoded values.
pub fn display_files<W: Write>(
    out: &mut W,
    files: &[Value],
    excluded_extensions: &[String],
    mode: OutputMode,
) -> io::Result<()> {
    let kept: Vec<&Value> = files
        .iter()
        .filter(|file| file.is_object())
        .filter(|file| !should_exclude(file, excluded_extensions))
        .collect();

    match mode {
        OutputMode::Human => {
            for file in kept {
                writeln!(
                    out,
                    "\"id\": {}, \"title\": {}, \"url\": {}",
                    json_or_empty(&file["id"]),
                    json_or_empty(&file["title"]["rendered"]),
                    json_or_empty(&file["source_url"])
                )?;
            }
            Ok(())
        }
        OutputMode::Json => write_json(out, &kept),
    }
}

/// Whether a media file's `source_url` extension is in the exclusion list
///
/// The comparison is case-sensitive: `JPG` does not exclude `photo.jpg`.
pub fn should_exclude(file: &Value, excluded_extensions: &[String]) -> bool {
    file["source_url"]
        .as_str()
        .and_then(file_extension)
        .is_some_and(|ext| excluded_extensions.iter().any(|excluded| excluded == ext))
}

/// Extension of the last path segment of a URL, without the dot
///
/// Query strings and fragments are ignored, and a leading dot (`.htaccess`)
/// does not start an extension.
pub fn file_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Renders a JSON value for human-readable lines
fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON-encodes a value, using `""` for missing fields
fn json_or_empty(value: &Value) -> String {
    if value.is_null() {
        "\"\"".to_string()
    } else {
        value.to_string()
    }
}

fn write_json<W: Write, T: serde::Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
