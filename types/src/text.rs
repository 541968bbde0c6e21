//! Small pure text helpers.

use std::borrow::Cow;

/// Appended to shortened credential ids.
pub const ID_ELISION: &str = "???";

/// Shorten a credential id to `prefix_len` characters plus [`ID_ELISION`].
///
/// The marker is always appended so a shortened id never reads as a full one.
#[must_use]
pub fn truncate_id(id: &str, prefix_len: usize) -> String {
    let head: String = id.chars().take(prefix_len).collect();
    format!("{head}{ID_ELISION}")
}

/// Strip escape sequences and control characters before terminal display.
///
/// User names and error messages come from persisted blobs and the platform,
/// so they are untrusted. Newlines and tabs survive.
#[must_use]
pub fn strip_control(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_stripped) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI: ESC [ params final-byte
            if chars.peek() == Some(&'[') {
                chars.next();
                for next in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&next) {
                        break;
                    }
                }
            } else {
                chars.next();
            }
        } else if !is_stripped(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

fn is_stripped(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}
