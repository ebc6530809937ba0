use std::io::{self, Write};

fn replacement(b: u8) -> Option<&'static [u8]> {
    match b {
        b'&' => Some(b"&amp;"),
        b'<' => Some(b"&lt;"),
        b'>' => Some(b"&gt;"),
        b'"' => Some(b"&quot;"),
        b'\'' => Some(b"&#39;"),
        _ => None,
    }
}

/// Write `s` HTML-escaped into `out`.
///
/// The same escaping is used for text content and quoted attribute values. Runs of bytes that
/// need no escaping are written with a single `write_all`.
pub(crate) fn write_escaped(out: &mut dyn Write, s: &str) -> io::Result<()> {
    let bytes = s.as_bytes();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if let Some(rep) = replacement(b) {
            if start < i {
                out.write_all(&bytes[start..i])?;
            }
            out.write_all(rep)?;
            start = i + 1;
        }
    }
    if start < bytes.len() {
        out.write_all(&bytes[start..])?;
    }
    Ok(())
}

/// Escape `s` into a new string.
pub fn escape_html(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len());
    // Writing into a Vec cannot fail.
    let _ = write_escaped(&mut out, s);
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/escape.rs"]
mod tests;
