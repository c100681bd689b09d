//! HTML export.
//!
//! Renders the screen as a `<pre>` fragment with one `<span>` per format
//! run. Format CSS is deterministic (attributes sorted alphabetically), so
//! the fragment is directly comparable in tests. Useful for debugging a
//! screen reader or publishing a snapshot of terminal output.

use crate::format::Format;
use crate::terminal::Terminal;

/// Escape a rune the way `html.EscapeString` would, if it needs it.
fn maybe_escape_rune(r: char) -> Option<&'static str> {
    match r {
        '&' => Some("&amp;"),
        '\'' => Some("&#39;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        _ => None,
    }
}

impl Terminal {
    /// Render the screen as an HTML fragment.
    pub fn html(&self) -> String {
        let mut buf = String::from(r#"<pre style="color:white;background-color:black;">"#);

        // Open a new span whenever the format changes; unformatted cells
        // never open one.
        let mut last = Format::EMPTY;
        for y in 0..self.screen.height() {
            let line = self.screen.line(y).unwrap_or(&[]);
            let mut pos = 0;
            for region in self.screen.regions(y) {
                let end = (pos + region.size).min(line.len());
                if end <= pos {
                    break;
                }
                if region.format != last {
                    if last != Format::EMPTY {
                        buf.push_str("</span>");
                    }
                    if region.format != Format::EMPTY {
                        buf.push_str("<span style=\"");
                        buf.push_str(&region.format.css());
                        buf.push_str("\">");
                    }
                    last = region.format;
                }
                for &r in &line[pos..end] {
                    match maybe_escape_rune(r) {
                        Some(esc) => buf.push_str(esc),
                        None => buf.push(r),
                    }
                }
                pos = end;
            }
            buf.push('\n');
        }
        if last != Format::EMPTY {
            buf.push_str("</span>");
        }

        buf.push_str("</pre>");
        buf
    }
}
