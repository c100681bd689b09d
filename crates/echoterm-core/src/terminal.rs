//! The terminal orchestrator.
//!
//! A [`Terminal`] consumes bytes produced by a program that expects an
//! ANSI/VT-series terminal on the other end and applies the decoded commands
//! to its screen model. It owns a main and (lazily) an alternate
//! [`Screen`], the deferred-wrap flag, auto-resize policy, and the two
//! optional passthrough sinks for escapes that a downstream real terminal
//! must see (requests) and replies to device queries (responses).
//!
//! The terminal performs no I/O of its own: bytes come in through
//! [`std::io::Write`], response bytes leave through the sinks the host
//! installs. All mutating methods take `&mut self`; callers sharing a
//! terminal across threads wrap it in a `Mutex`.

use std::fmt;
use std::io;
use std::time::Instant;

use tracing::{debug, trace};

use crate::command::Command;
use crate::decoder;
use crate::error::{CommandError, DecodeError};
use crate::render::Line;
use crate::screen::{Cursor, CursorStyle, Screen, ScrollRegion};

const TAB_WIDTH: usize = 8;

type ResizeHook = Box<dyn FnMut(usize, usize) + Send>;
type ScrollbackHook = Box<dyn FnMut(Line) + Send>;

/// An in-memory ANSI/VT terminal.
pub struct Terminal {
    pub(crate) screen: Screen,
    /// The inactive screen: the alternate while the main is shown, the main
    /// while the alternate is shown. Allocated on first use of mode 1049.
    pub(crate) alt: Option<Screen>,
    pub(crate) is_alt: bool,

    /// Grow individual rows instead of wrapping when printing past the
    /// right edge. Rows need not be uniformly wide in this mode; the
    /// nominal width is the width newly created rows start with.
    pub auto_resize_x: bool,
    /// Grow by one row instead of scrolling when printing past the bottom.
    pub auto_resize_y: bool,
    /// Cap for `auto_resize_x` growth; 0 means unlimited.
    pub limit_x: usize,
    /// Cap for `auto_resize_y` growth; 0 means unlimited. Past the cap the
    /// terminal scrolls.
    pub limit_y: usize,

    /// In raw mode a line feed only advances the row; in cooked mode (the
    /// default, common for displaying logs) it also returns the column to 0.
    pub raw: bool,
    /// Ignore scroll-region requests entirely. Useful when the terminal
    /// displays an append-only log.
    pub append_only: bool,

    pub(crate) wrap: bool,
    pub(crate) title: Option<String>,
    unparsed: Vec<u8>,

    requests_sink: Option<Box<dyn io::Write + Send>>,
    responses_sink: Option<Box<dyn io::Write + Send>>,
    resize_hook: Option<ResizeHook>,
    scrollback_hook: Option<ScrollbackHook>,
    sink_error: Option<io::Error>,
}

impl fmt::Debug for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminal")
            .field("height", &self.screen.height())
            .field("width", &self.screen.width())
            .field("cursor", &self.screen.cursor)
            .field("is_alt", &self.is_alt)
            .field("wrap", &self.wrap)
            .finish_non_exhaustive()
    }
}

impl Terminal {
    /// Create a terminal with the given dimensions.
    ///
    /// Dimensions may be zero for a terminal that is about to have
    /// auto-resizing enabled; a fixed-size terminal should have both
    /// greater than zero.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            screen: Screen::new(rows, cols),
            alt: None,
            is_alt: false,
            auto_resize_x: false,
            auto_resize_y: false,
            limit_x: 0,
            limit_y: 0,
            raw: false,
            append_only: false,
            wrap: false,
            title: None,
            unparsed: Vec::new(),
            requests_sink: None,
            responses_sink: None,
            resize_hook: None,
            scrollback_hook: None,
            sink_error: None,
        }
    }

    /// Create a terminal with no fixed dimensions that grows to fit
    /// whatever is written to it. Useful for displaying dynamically sized
    /// content.
    pub fn new_auto_resizing() -> Self {
        let mut term = Self::new(0, 0);
        term.auto_resize_x = true;
        term.auto_resize_y = true;
        term
    }

    // ── Inspection ──────────────────────────────────────────────────

    pub fn height(&self) -> usize {
        self.screen.height()
    }

    pub fn width(&self) -> usize {
        self.screen.width()
    }

    /// The active screen.
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// The inactive screen, if the alternate was ever entered.
    pub fn alt_screen(&self) -> Option<&Screen> {
        self.alt.as_ref()
    }

    /// Whether the alternate screen is currently active.
    pub fn is_alt(&self) -> bool {
        self.is_alt
    }

    pub fn cursor(&self) -> Cursor {
        self.screen.cursor
    }

    /// Whether the last print landed in the rightmost column and the next
    /// one will wrap first.
    pub fn pending_wrap(&self) -> bool {
        self.wrap
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// One past the largest row ever printed to.
    pub fn used_height(&self) -> usize {
        self.screen.max_y().map_or(0, |y| y + 1)
    }

    /// One past the largest column ever printed to.
    pub fn used_width(&self) -> usize {
        self.screen.max_x().map_or(0, |x| x + 1)
    }

    // ── Configuration ───────────────────────────────────────────────

    /// Install the sink that passthrough escapes (mouse modes, bracketed
    /// paste, OSC 52, keypad and cursor-key modes, charset designators) are
    /// forwarded to.
    pub fn set_forward_requests(&mut self, w: impl io::Write + Send + 'static) {
        self.requests_sink = Some(Box::new(w));
    }

    /// Install the sink that replies to device queries (DSR, CPR, DA) are
    /// written to.
    pub fn set_forward_responses(&mut self, w: impl io::Write + Send + 'static) {
        self.responses_sink = Some(Box::new(w));
    }

    /// Register a resize hook. It is invoked immediately with the current
    /// dimensions, then after every geometry change. The hook must not call
    /// back into the terminal.
    pub fn on_resize(&mut self, mut hook: impl FnMut(usize, usize) + Send + 'static) {
        hook(self.screen.height(), self.screen.width());
        self.resize_hook = Some(Box::new(hook));
    }

    /// Register a hook receiving each line that scrolls off the top of the
    /// scroll region.
    pub fn on_scrollback(&mut self, hook: impl FnMut(Line) + Send + 'static) {
        self.scrollback_hook = Some(Box::new(hook));
    }

    // ── Geometry ────────────────────────────────────────────────────

    /// Set the terminal dimensions and disable auto-resizing on both axes.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.auto_resize_x = false;
        self.auto_resize_y = false;
        self.do_resize(rows, cols);
    }

    /// Set the terminal width and disable auto-resizing width.
    pub fn resize_x(&mut self, cols: usize) {
        self.auto_resize_x = false;
        let rows = self.screen.height();
        self.do_resize(rows, cols);
    }

    /// Set the terminal height and disable auto-resizing height.
    pub fn resize_y(&mut self, rows: usize) {
        self.auto_resize_y = false;
        let cols = self.screen.width();
        self.do_resize(rows, cols);
    }

    fn do_resize(&mut self, rows: usize, cols: usize) {
        self.screen.resize(rows, cols);
        self.notify_resize();
    }

    fn notify_resize(&mut self) {
        let (h, w) = (self.screen.height(), self.screen.width());
        if let Some(hook) = self.resize_hook.as_mut() {
            hook(h, w);
        }
    }

    /// Reinitialize the active screen and return the cursor to the origin.
    pub fn reset(&mut self) {
        self.screen.reset();
        self.wrap = false;
    }

    // ── Command input ───────────────────────────────────────────────

    /// Apply a single pre-decoded command.
    ///
    /// Unlike byte input this surfaces the command's error, classified as
    /// either recoverable ([`CommandError::Unsupported`]) or a bad parameter
    /// shape ([`CommandError::Malformed`]).
    pub fn process(&mut self, cmd: &Command) -> Result<(), CommandError> {
        self.apply(cmd)
    }

    fn apply(&mut self, cmd: &Command) -> Result<(), CommandError> {
        // Grow before handling every command rather than as part of the
        // move that went out of bounds. A trailing newline therefore never
        // materializes a blank row, but indexing is back in bounds by the
        // time any handler runs.
        self.scroll_or_resize_y_if_needed();
        trace!(%cmd, "apply");
        match cmd {
            Command::Print(r) => {
                self.put(*r);
                Ok(())
            }
            Command::Control(r) => {
                self.control(*r);
                Ok(())
            }
            Command::Csi { final_byte, args } => self.csi(*final_byte, args),
            Command::Esc { designator, arg } => self.esc(*designator, arg),
            Command::Osc(arg) => {
                self.osc(arg);
                Ok(())
            }
        }
    }

    // ── Printing ────────────────────────────────────────────────────

    /// Place a rune at the cursor, applying the cursor format and deferred
    /// wrap semantics.
    fn put(&mut self, r: char) {
        if self.wrap {
            // Consume the deferred wrap: line feed first, then print.
            self.screen.cursor.x = 0;
            self.move_down();
            self.wrap = false;
            self.scroll_or_resize_y_if_needed();
        }

        let Cursor { y, x, format, .. } = self.screen.cursor;
        self.screen.put(y, x, r, format);

        let wrap_at = if self.auto_resize_x {
            self.limit_x
        } else {
            self.screen.width()
        };
        if wrap_at > 0 && x + 1 >= wrap_at {
            // The cursor stays in the last column until the next print.
            self.wrap = true;
        } else {
            self.screen.cursor.x = x + 1;
        }
    }

    fn scroll_or_resize_y_if_needed(&mut self) {
        let y = self.screen.cursor.y;
        let h = self.screen.height();
        if y < h {
            return;
        }
        if self.auto_resize_y && (self.limit_y == 0 || y + 1 <= self.limit_y) {
            debug!(y, h, "growing height");
            self.screen.grow_height(y + 1);
            self.notify_resize();
        } else {
            debug!(y, h, "scrolling");
            self.scroll_up_n(1);
            self.screen.cursor.y = h.saturating_sub(1);
        }
    }

    // ── Cursor movement ─────────────────────────────────────────────

    fn set_cursor_pos(&mut self, y: usize, x: usize) {
        let old = self.screen.cursor.y;
        if old != y {
            self.screen.changed(old, true);
        }
        self.screen.cursor.y = y;
        self.screen.cursor.x = x;
        self.screen.changed(y, true);
    }

    /// Move the cursor, clamping into the grid. The move always takes
    /// effect; a clamped target is additionally reported as an error.
    ///
    /// Axes that auto-resize do not clamp upward: growth happens when
    /// something is printed there.
    fn home_checked(&mut self, y: isize, x: isize) -> Result<(), CommandError> {
        let h = self.screen.height() as isize;
        let w = self.screen.width() as isize;
        let mut cy = y.max(0);
        let mut cx = x.max(0);
        if !self.auto_resize_y && cy >= h {
            cy = (h - 1).max(0);
        }
        if !self.auto_resize_x && cx >= w {
            cx = (w - 1).max(0);
        }
        self.home(cy as usize, cx as usize);
        if cy == y && cx == x {
            Ok(())
        } else {
            Err(CommandError::OutOfBounds { y, x })
        }
    }

    fn home(&mut self, y: usize, x: usize) {
        self.set_cursor_pos(y, x);
        self.wrap = false;
    }

    /// Move down one row, scrolling instead when at the bottom of the
    /// active scroll region.
    fn move_down(&mut self) {
        if let Some(region) = self.screen.scroll_region
            && self.screen.cursor.y == region.end
        {
            self.scroll_up_n(1);
        } else {
            let y = self.screen.cursor.y;
            let x = self.screen.cursor.x;
            self.set_cursor_pos(y + 1, x);
        }
    }

    /// Move up one row, scrolling instead when at the top of the active
    /// scroll region.
    fn move_up(&mut self) {
        if let Some(region) = self.screen.scroll_region
            && self.screen.cursor.y == region.start
        {
            self.scroll_down_n(1);
        } else {
            let y = self.screen.cursor.y;
            let x = self.screen.cursor.x;
            self.set_cursor_pos(y.saturating_sub(1), x);
        }
    }

    fn backspace(&mut self) {
        self.wrap = false;
        let c = self.screen.cursor;
        if c.x > 0 {
            self.set_cursor_pos(c.y, c.x - 1);
        } else if c.y > 0 {
            let prev_end = if self.auto_resize_x {
                self.screen.line(c.y - 1).map_or(0, |l| l.len())
            } else {
                self.screen.width()
            };
            self.set_cursor_pos(c.y - 1, prev_end.saturating_sub(1));
        }
    }

    fn linefeed(&mut self) {
        self.wrap = false;
        if !self.raw {
            // Cooked mode, commonly used for displaying logs: \n implies \r\n.
            self.screen.cursor.x = 0;
        }
        self.move_down();
    }

    fn tab(&mut self) {
        self.wrap = false;
        let c = self.screen.cursor;
        let mut target = (c.x / TAB_WIDTH + 1) * TAB_WIDTH;
        if self.auto_resize_x {
            for _ in c.x..target {
                self.put(' ');
            }
            return;
        }
        if target >= self.screen.width() {
            target = self.screen.width().saturating_sub(1);
        }
        for x in c.x..target {
            self.screen.clear(c.y, x, c.format);
        }
        self.set_cursor_pos(c.y, target);
    }

    fn control(&mut self, r: char) {
        match r {
            '\u{8}' => self.backspace(),
            '\r' => {
                self.wrap = false;
                let y = self.screen.cursor.y;
                self.set_cursor_pos(y, 0);
            }
            '\n' => self.linefeed(),
            '\t' => self.tab(),
            _ => trace!(rune = ?r, "ignoring control rune"),
        }
    }

    // ── Erase ───────────────────────────────────────────────────────

    /// End column of a row: in dynamic-width mode rows are only as wide as
    /// what was printed to them.
    fn row_end(&self, y: usize) -> usize {
        self.screen
            .line(y)
            .map_or(self.screen.width(), |l| l.len())
            .saturating_sub(1)
    }

    fn erase_columns(&mut self, direction: u16) {
        self.wrap = false;
        let c = self.screen.cursor;
        let f = c.format;
        let end = self.row_end(c.y);
        match direction {
            0 => self.screen.erase_region(c.y, c.x, c.y, end, f),
            1 => self.screen.erase_region(c.y, 0, c.y, c.x, f),
            _ => self.screen.erase_region(c.y, 0, c.y, end, f),
        }
    }

    fn erase_lines(&mut self, direction: u16) {
        self.wrap = false;
        let c = self.screen.cursor;
        let f = c.format;
        let h = self.screen.height();
        match direction {
            0 => {
                let end = self.row_end(c.y);
                self.screen.erase_region(c.y, c.x, c.y, end, f);
                if c.y + 1 < h {
                    self.screen.erase_rows(c.y + 1, h - 1, f);
                }
            }
            1 => {
                if c.y > 0 {
                    self.screen.erase_rows(0, c.y - 1, f);
                }
                self.screen.erase_region(c.y, 0, c.y, c.x, f);
            }
            _ => {
                if h > 0 {
                    self.screen.erase_rows(0, h - 1, f);
                }
            }
        }
    }

    fn erase_direction(args: &[u16]) -> Result<u16, CommandError> {
        let d = args.first().copied().unwrap_or(0);
        if d > 2 {
            return Err(CommandError::Malformed(format!(
                "unknown erase direction: {d}"
            )));
        }
        Ok(d)
    }

    // ── Scrolling ───────────────────────────────────────────────────

    fn scroll_bounds(&self) -> (usize, usize) {
        match self.screen.scroll_region {
            Some(region) => (region.start, region.end),
            None => (0, self.screen.height().saturating_sub(1)),
        }
    }

    fn scroll_up_n(&mut self, n: usize) {
        let (start, end) = self.scroll_bounds();
        let fill = self.screen.cursor.format;
        let evicted = self.screen.scroll_up(n, start, end, fill);
        if let Some(hook) = self.scrollback_hook.as_mut() {
            for row in evicted {
                hook(Line {
                    content: row.content,
                    regions: row.regions,
                });
            }
        }
    }

    fn scroll_down_n(&mut self, n: usize) {
        let (start, end) = self.scroll_bounds();
        let fill = self.screen.cursor.format;
        self.screen.scroll_down(n, start, end, fill);
    }

    /// Insert blank lines at the cursor, pushing lines below it down within
    /// the scroll region. A no-op when the cursor is outside the region.
    fn insert_lines(&mut self, n: usize) {
        let (start, end) = self.scroll_bounds();
        let y = self.screen.cursor.y;
        if y < start || y > end {
            debug!(y, start, end, "insert lines outside scroll region");
            return;
        }
        let fill = self.screen.cursor.format;
        self.screen.scroll_down(n, y, end, fill);
    }

    /// Delete lines at the cursor, pulling lines below it up within the
    /// scroll region. A no-op when the cursor is outside the region.
    fn delete_lines(&mut self, n: usize) {
        let (start, end) = self.scroll_bounds();
        let y = self.screen.cursor.y;
        if y < start || y > end {
            debug!(y, start, end, "delete lines outside scroll region");
            return;
        }
        let fill = self.screen.cursor.format;
        let _ = self.screen.scroll_up(n, y, end, fill);
    }

    // ── CSI dispatch ────────────────────────────────────────────────

    fn csi(&mut self, final_byte: char, args: &str) -> Result<(), CommandError> {
        match final_byte {
            'h' => self.set_mode(args, true),
            'l' => self.set_mode(args, false),
            'm' => self.update_attributes(args),
            'r' => self.set_scroll_region(args),
            's' => {
                self.save_cursor();
                Ok(())
            }
            // NB: vim prints `CSI ? u` on start; treated as a plain restore.
            'u' => {
                self.restore_cursor();
                Ok(())
            }
            'q' => self.set_cursor_style(args),
            // Window manipulation; ignored.
            't' => Ok(()),
            _ => {
                let params = Command::parse_int_args(args)?;
                self.csi_int(final_byte, &params)
            }
        }
    }

    fn csi_int(&mut self, final_byte: char, args: &[u16]) -> Result<(), CommandError> {
        let n = args.first().copied().unwrap_or(1) as usize;
        let c = self.screen.cursor;
        match final_byte {
            'A' => self.home_checked(c.y as isize - n as isize, c.x as isize),
            'B' => self.home_checked(c.y as isize + n as isize, c.x as isize),
            'C' => self.home_checked(c.y as isize, c.x as isize + n as isize),
            'D' => self.home_checked(c.y as isize, c.x as isize - n as isize),
            'G' => self.home_checked(c.y as isize, n as isize - 1),
            'H' | 'f' => {
                let (y, x) = if args.len() >= 2 {
                    (args[0] as isize - 1, args[1] as isize - 1)
                } else {
                    (0, 0)
                };
                self.home_checked(y, x)
            }
            'd' => self.home_checked(n as isize - 1, c.x as isize),
            'J' => {
                let d = Self::erase_direction(args)?;
                self.erase_lines(d);
                Ok(())
            }
            'K' => {
                let d = Self::erase_direction(args)?;
                self.erase_columns(d);
                Ok(())
            }
            'L' => {
                self.insert_lines(n);
                Ok(())
            }
            'M' => {
                self.delete_lines(n);
                Ok(())
            }
            'S' => {
                self.scroll_up_n(n);
                Ok(())
            }
            'T' => {
                self.scroll_down_n(n);
                Ok(())
            }
            '@' => {
                self.screen.insert_chars(c.y, c.x, n);
                Ok(())
            }
            'P' => {
                self.wrap = false;
                self.screen.delete_chars(c.y, c.x, n.max(1), c.format);
                Ok(())
            }
            'X' => {
                self.wrap = false;
                self.screen.erase_chars(c.y, c.x, n.max(1), c.format);
                Ok(())
            }
            'b' => {
                self.screen.repeat_preceding(c.y, c.x, n);
                Ok(())
            }
            'n' => {
                self.device_status(args);
                Ok(())
            }
            'c' => {
                // DA: report VT220 + ANSI.
                self.forward_response(b"\x1b[?62;22c");
                Ok(())
            }
            _ => Err(CommandError::Unsupported(format!(
                "csi {final_byte:?} args {args:?}"
            ))),
        }
    }

    fn device_status(&mut self, args: &[u16]) {
        let Some(&query) = args.first() else {
            debug!("empty device status query");
            return;
        };
        match query {
            5 => self.forward_response(b"\x1b[0n"),
            6 => {
                let c = self.screen.cursor;
                let reply = format!("\x1b[{};{}R", c.y + 1, c.x + 1);
                self.forward_response(reply.as_bytes());
            }
            other => debug!(query = other, "unknown device status query"),
        }
    }

    fn save_cursor(&mut self) {
        self.screen.saved_cursor = self.screen.cursor;
    }

    fn restore_cursor(&mut self) {
        let saved = self.screen.saved_cursor;
        self.screen.cursor = saved;
        self.wrap = false;
    }

    fn set_cursor_style(&mut self, args: &str) -> Result<(), CommandError> {
        // DECSCUSR arrives as `CSI Ps SP q`; the intermediate space is part
        // of the accumulated argument bytes.
        let trimmed = args.trim_end_matches(' ');
        let shape = if trimmed.is_empty() {
            0
        } else {
            trimmed
                .parse::<u16>()
                .map_err(|_| CommandError::Malformed(format!("bad cursor style: {args:?}")))?
        };
        self.screen.cursor.style = CursorStyle::from_param(shape);
        Ok(())
    }

    fn update_attributes(&mut self, args: &str) -> Result<(), CommandError> {
        // Modifier-key reports confusingly share the `m` final byte, with a
        // `>` or `?` prefix; they belong to the downstream terminal.
        if args.starts_with('>') || args.starts_with('?') {
            let seq = format!("\x1b[{args}m");
            self.forward_request(seq.as_bytes());
            return Ok(());
        }
        let params = Command::parse_int_args(args)?;
        self.screen.cursor.format.apply_sgr(&params)
    }

    fn set_scroll_region(&mut self, args: &str) -> Result<(), CommandError> {
        if self.append_only {
            debug!(args, "scroll region ignored in append-only mode");
            return Ok(());
        }
        let parts = Command::parse_str_args(args);
        match parts.len() {
            0 => {
                self.screen.scroll_region = None;
            }
            2 => {
                let parse = |s: &str, default: usize| -> Result<usize, CommandError> {
                    if s.is_empty() {
                        Ok(default)
                    } else {
                        s.parse().map_err(|_| {
                            CommandError::Malformed(format!("bad scroll region: {args:?}"))
                        })
                    }
                };
                let start = parse(parts[0], 1)?.max(1);
                let end = parse(parts[1], self.screen.height())?.max(1);
                if end < start {
                    debug!(start, end, "refusing inverted scroll region");
                    return Ok(());
                }
                if start == 1 && end == self.screen.height() {
                    // A full-screen region is equivalent to none.
                    self.screen.scroll_region = None;
                } else {
                    self.screen.scroll_region = Some(ScrollRegion {
                        start: start - 1,
                        end: end - 1,
                    });
                }
            }
            _ => debug!(args, "unhandled scroll region args"),
        }
        // TODO: respect origin mode.
        self.home(0, 0);
        Ok(())
    }

    // ── Modes ───────────────────────────────────────────────────────

    fn set_mode(&mut self, args: &str, set: bool) -> Result<(), CommandError> {
        let parts = Command::parse_str_args(args);
        let Some(&mode) = parts.first() else {
            debug!(set, "empty mode list");
            return Ok(());
        };
        let mut forward = false;
        match mode {
            // Insert mode.
            "4" => debug!(set, "insert mode ignored"),
            // Application cursor keys.
            "?1" => forward = true,
            // Line wrap is always on; acknowledge silently.
            "?7" => {}
            // Blinking cursor.
            "?12" => {
                self.screen.cursor_blink_epoch = if set { Some(Instant::now()) } else { None };
            }
            // Cursor visibility.
            "?25" => {
                self.screen.cursor_visible = set;
                let y = self.screen.cursor.y;
                self.screen.changed(y, false);
            }
            // Mouse tracking: basic, drag, all-motion, SGR coordinates.
            "?1000" | "?1002" | "?1003" | "?1006" => forward = true,
            // Window focus tracking.
            "?1004" => forward = true,
            // Alternate screen.
            "?1049" => self.set_alt_screen(set),
            // Bracketed paste.
            "?2004" => forward = true,
            other => debug!(mode = other, set, "unknown mode"),
        }
        if forward {
            let seq = format!("\x1b[{}{}", mode, if set { 'h' } else { 'l' });
            self.forward_request(seq.as_bytes());
        }
        Ok(())
    }

    fn set_alt_screen(&mut self, enter: bool) {
        if enter == self.is_alt {
            debug!(enter, "alt screen already in requested state");
            return;
        }
        if enter && self.alt.is_none() {
            debug!("allocating alt screen");
            self.alt = Some(Screen::new(self.screen.height(), self.screen.width()));
        }
        self.swap_alt();
    }

    fn swap_alt(&mut self) {
        if let Some(alt) = self.alt.as_mut() {
            std::mem::swap(&mut self.screen, alt);
            self.is_alt = !self.is_alt;
        }
    }

    // ── Escapes and OSC ─────────────────────────────────────────────

    fn esc(&mut self, designator: char, arg: &str) -> Result<(), CommandError> {
        match designator {
            // Character set designation belongs to the downstream terminal.
            '(' | ')' | '*' | '+' | '-' | '.' | '/' => {
                let seq = format!("\x1b{designator}{arg}");
                self.forward_request(seq.as_bytes());
                Ok(())
            }
            // Keypad application/normal mode.
            '=' | '>' => {
                let seq = format!("\x1b{designator}");
                self.forward_request(seq.as_bytes());
                Ok(())
            }
            '7' => {
                self.save_cursor();
                Ok(())
            }
            '8' => {
                self.restore_cursor();
                Ok(())
            }
            'D' => {
                self.move_down();
                Ok(())
            }
            'M' => {
                self.move_up();
                Ok(())
            }
            'c' => {
                self.reset();
                Ok(())
            }
            other => Err(CommandError::Unsupported(format!("escape {other:?}"))),
        }
    }

    fn osc(&mut self, arg: &str) {
        let (selector, rest) = arg.split_once(';').unwrap_or((arg, ""));
        match selector {
            // Clipboard get/set; the downstream terminal owns the clipboard.
            "52" => {
                debug!(arg, "forwarding osc 52");
                let seq = format!("\x1b]{arg}\x07");
                self.forward_request(seq.as_bytes());
            }
            // Window title.
            "0" | "2" => self.title = Some(rest.to_string()),
            // Cursor color reset.
            "112" => trace!("ignoring osc cursor color reset"),
            other => debug!(osc = other, "ignoring unknown osc"),
        }
    }

    // ── Sinks ───────────────────────────────────────────────────────

    fn forward_request(&mut self, bytes: &[u8]) {
        let Some(w) = self.requests_sink.as_mut() else {
            trace!("no requests sink installed");
            return;
        };
        if let Err(err) = w.write_all(bytes) {
            debug!(%err, "requests sink write failed");
            if self.sink_error.is_none() {
                self.sink_error = Some(err);
            }
        }
    }

    fn forward_response(&mut self, bytes: &[u8]) {
        let Some(w) = self.responses_sink.as_mut() else {
            debug!("no responses sink for device query");
            return;
        };
        if let Err(err) = w.write_all(bytes) {
            debug!(%err, "responses sink write failed");
            if self.sink_error.is_none() {
                self.sink_error = Some(err);
            }
        }
    }
}

impl io::Write for Terminal {
    /// Consume arbitrary bytes.
    ///
    /// Always reports the full input as written. Malformed commands are
    /// logged and skipped so a misbehaving program cannot desynchronize
    /// future input; partial escape sequences are retained and completed by
    /// the next call. Only I/O errors from the forwarding sinks propagate.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len();

        let owned: Vec<u8>;
        let mut rest: &[u8] = if self.unparsed.is_empty() {
            buf
        } else {
            let mut joined = std::mem::take(&mut self.unparsed);
            joined.extend_from_slice(buf);
            owned = joined;
            &owned
        };

        while !rest.is_empty() {
            match decoder::decode(rest) {
                Ok((cmd, used)) => {
                    rest = &rest[used..];
                    if let Err(err) = self.apply(&cmd) {
                        debug!(%cmd, %err, "command failed");
                    }
                }
                Err(DecodeError::Incomplete) => {
                    debug!(len = rest.len(), "retaining partial sequence");
                    self.unparsed = rest.to_vec();
                    break;
                }
                Err(DecodeError::InvalidUtf8) => {
                    debug!("skipping invalid utf-8 byte");
                    rest = &rest[1..];
                }
            }
        }

        if let Some(err) = self.sink_error.take() {
            return Err(err);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
