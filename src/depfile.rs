//! Dependency record parsing.
//!
//! Compilers invoked with `-MD -MF <file>` leave one record per object in
//! make syntax: `<object>: <prereq> <prereq> ...`. The record lists the
//! compiled source plus every header it transitively included, which is what
//! makes header edits rebuild the right objects even though the source file's
//! own timestamp never moves.
//!
//! Escaping rules:
//! - a backslash immediately followed by a line break is a continuation and
//!   is removed;
//! - a backslash followed by any other character keeps that character as part
//!   of the current token (spaces inside paths, most commonly);
//! - the first unescaped colon separates the record's target name from its
//!   prerequisite list; everything after it is a prerequisite.

use std::fs;
use std::io;
use std::path::Path;

/// Parse a dependency record, returning its prerequisite paths in order.
///
/// A missing, unreadable, or malformed record (one with no target
/// separator) surfaces as `Err`; callers must treat that as "dependencies
/// unknown" and rebuild rather than trusting a partial read.
pub fn parse(record_path: &Path) -> io::Result<Vec<String>> {
    let bytes = fs::read(record_path)?;

    let mut prereqs = Vec::new();
    let mut token: Vec<u8> = Vec::new();
    let mut seen_colon = false;

    let mut flush = |token: &mut Vec<u8>, seen_colon: bool, prereqs: &mut Vec<String>| {
        if !token.is_empty() {
            if seen_colon {
                prereqs.push(String::from_utf8_lossy(token).into_owned());
            }
            token.clear();
        }
    };

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\\' => {
                match bytes.get(i + 1) {
                    Some(b'\n') => i += 2,
                    Some(b'\r') => {
                        i += 2;
                        if bytes.get(i) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    Some(&escaped) => {
                        token.push(escaped);
                        i += 2;
                    }
                    None => i += 1,
                }
            }
            b':' if !seen_colon => {
                token.clear();
                seen_colon = true;
                i += 1;
            }
            _ if b.is_ascii_whitespace() => {
                flush(&mut token, seen_colon, &mut prereqs);
                i += 1;
            }
            _ => {
                token.push(b);
                i += 1;
            }
        }
    }
    flush(&mut token, seen_colon, &mut prereqs);

    if !seen_colon {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "malformed dependency record: no target separator",
        ));
    }
    Ok(prereqs)
}
