//! Deterministic ANSI re-serialization.
//!
//! [`Terminal::marshal_binary`] emits a byte sequence that, written into a
//! fresh terminal of the same dimensions, reproduces the visible state:
//! cell content and formats up to the written extent, scroll region, cursor
//! position/format/style, cursor visibility, alternate screen content, the
//! window title, and the deferred-wrap flag.
//!
//! The active screen is serialized last so the final alt-screen state and
//! the wrap flag land correctly in the replica.

use std::fmt::Write as _;

use crate::format::Format;
use crate::screen::Screen;
use crate::terminal::Terminal;

const ENTER_ALT: &str = "\x1b[?1049h";
const EXIT_ALT: &str = "\x1b[?1049l";
const RESET_SEQ: &str = "\x1b[0m";

impl Terminal {
    /// Serialize the terminal into a replayable ANSI byte sequence.
    pub fn marshal_binary(&self) -> Vec<u8> {
        let mut out = String::new();

        if let Some(inactive) = &self.alt {
            // The inactive screen first: enter the alternate to fill it when
            // the main screen is current, or fill the main screen directly
            // when the alternate is current.
            if !self.is_alt {
                out.push_str(ENTER_ALT);
            }
            marshal_screen(&mut out, inactive);
            if self.is_alt {
                out.push_str(ENTER_ALT);
            } else {
                out.push_str(EXIT_ALT);
            }
        }
        marshal_screen(&mut out, &self.screen);

        if let Some(title) = self.title.as_deref()
            && !title.is_empty()
        {
            let _ = write!(out, "\x1b]2;{title}\x07");
        }

        if self.wrap {
            // Reposition onto the wrap column, repaint the pending rune
            // under the trailing region's format, then restore the cursor
            // format. Replaying this print re-arms the deferred wrap.
            let cursor = self.screen.cursor();
            let _ = write!(out, "\x1b[{};{}H", cursor.y + 1, cursor.x + 1);
            let trailing = self
                .screen
                .canvas()
                .last_region(cursor.y)
                .map_or(Format::EMPTY, |r| r.format);
            out.push_str(&trailing.sgr());
            out.push(self.screen.cell(cursor.y, cursor.x).unwrap_or(' '));
            out.push_str(&cursor.format.sgr());
        }

        out.into_bytes()
    }
}

fn marshal_screen(out: &mut String, screen: &Screen) {
    if let Some(max_y) = screen.max_y() {
        for row in 0..=max_y {
            if row > 0 {
                out.push_str("\r\n");
            }
            marshal_line(out, screen, row);
        }
    }

    if let Some(region) = screen.scroll_region() {
        let _ = write!(out, "\x1b[{};{}r", region.start + 1, region.end + 1);
    }

    let cursor = screen.cursor();
    let _ = write!(out, "\x1b[{};{}H", cursor.y + 1, cursor.x + 1);
    out.push_str(&cursor.format.sgr());
    let _ = write!(out, "\x1b[{} q", cursor.style as u8);

    if screen.cursor_visible() {
        out.push_str("\x1b[?25h");
    } else {
        out.push_str("\x1b[?25l");
    }
}

/// Emit one row: SGR transitions at region boundaries, content clipped to
/// the written extent, reset at the end.
fn marshal_line(out: &mut String, screen: &Screen, row: usize) {
    let Some(line) = screen.line(row) else {
        return;
    };
    let max_x = screen.max_x().unwrap_or(0);

    let mut last = Format::EMPTY;
    let mut pos = 0;
    for region in screen.regions(row) {
        if region.format != last {
            out.push_str(&region.format.sgr());
            last = region.format;
        }
        let end = (pos + region.size).min(max_x + 1).min(line.len());
        if end > pos {
            out.extend(&line[pos..end]);
        }
        if pos + region.size > max_x {
            // The screen never extended past here; skip the rest.
            break;
        }
        pos += region.size;
    }

    out.push_str(RESET_SEQ);
}
