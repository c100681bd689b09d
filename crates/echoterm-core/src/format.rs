//! Cell formatting: colors plus a packed set of text attribute flags.
//!
//! A [`Format`] is the value painted onto the attribute plane for every cell
//! a program prints. Equality is structural and sits on a hot path (the
//! canvas merges neighbouring runs by comparing formats), so the whole value
//! is a small `Copy` struct.

use bitflags::bitflags;

use crate::error::CommandError;

bitflags! {
    /// Packed text attribute flags.
    ///
    /// Maps to the ECMA-48 SGR parameter values the terminal actually
    /// tracks. Attributes with no visible effect in a state snapshot
    /// (strikethrough, overline) are not stored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FormatFlags: u8 {
        /// The format was produced by an explicit `SGR 0`.
        const RESET     = 1 << 0;
        const BOLD      = 1 << 1;
        const FAINT     = 1 << 2;
        const ITALIC    = 1 << 3;
        const UNDERLINE = 1 << 4;
        const BLINK     = 1 << 5;
        const REVERSE   = 1 << 6;
        const CONCEAL   = 1 << 7;
    }
}

/// Color of a cell's foreground or background.
///
/// Follows the terminal color model hierarchy: unset → 16 named → 256
/// indexed → 24-bit RGB. `38;5;N` directives with `N < 16` normalize to
/// [`Color::Named`] so canonical state never holds a low palette index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default; rendered as the absence of a color parameter.
    #[default]
    Default,
    /// Named ANSI color 0-15: standard 8 plus bright 8.
    Named(u8),
    /// 256-color palette index.
    Indexed(u8),
    /// Direct 24-bit color.
    Rgb(u8, u8, u8),
}

impl Color {
    /// SGR parameter fragment selecting this color, or `None` when unset.
    fn sequence(self, bg: bool) -> Option<String> {
        match self {
            Color::Default => None,
            Color::Named(n) if n < 8 => Some(format!("{}", if bg { 40 + n } else { 30 + n })),
            Color::Named(n) => Some(format!("{}", if bg { 92 + n } else { 82 + n })),
            Color::Indexed(n) => Some(format!("{};5;{}", if bg { 48 } else { 38 }, n)),
            Color::Rgb(r, g, b) => {
                Some(format!("{};2;{};{};{}", if bg { 48 } else { 38 }, r, g, b))
            }
        }
    }

    /// Map to 24-bit RGB using the standard xterm palette.
    ///
    /// Used for CSS output only; ANSI serialization keeps the original form.
    pub(crate) fn to_rgb(self) -> (u8, u8, u8) {
        const NAMED: [(u8, u8, u8); 16] = [
            (0x00, 0x00, 0x00),
            (0xcd, 0x00, 0x00),
            (0x00, 0xcd, 0x00),
            (0xcd, 0xcd, 0x00),
            (0x00, 0x00, 0xee),
            (0xcd, 0x00, 0xcd),
            (0x00, 0xcd, 0xcd),
            (0xe5, 0xe5, 0xe5),
            (0x7f, 0x7f, 0x7f),
            (0xff, 0x00, 0x00),
            (0x00, 0xff, 0x00),
            (0xff, 0xff, 0x00),
            (0x5c, 0x5c, 0xff),
            (0xff, 0x00, 0xff),
            (0x00, 0xff, 0xff),
            (0xff, 0xff, 0xff),
        ];
        match self {
            Color::Default => (0, 0, 0),
            Color::Named(n) => NAMED[(n as usize) % 16],
            Color::Indexed(n) if n < 16 => NAMED[n as usize],
            Color::Indexed(n) if n < 232 => {
                // 6x6x6 color cube.
                const STEPS: [u8; 6] = [0, 95, 135, 175, 215, 255];
                let i = n - 16;
                (
                    STEPS[(i / 36) as usize],
                    STEPS[((i / 6) % 6) as usize],
                    STEPS[(i % 6) as usize],
                )
            }
            Color::Indexed(n) => {
                // 24-step grayscale ramp.
                let v = 8 + 10 * (n - 232);
                (v, v, v)
            }
            Color::Rgb(r, g, b) => (r, g, b),
        }
    }
}

/// Per-cell text format: foreground, background, and attribute flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Format {
    pub fg: Color,
    pub bg: Color,
    pub flags: FormatFlags,
}

/// Bold text on a basic ANSI color conventionally displays as bright.
fn brighten(color: Color) -> Color {
    match color {
        Color::Named(n) if n < 8 => Color::Named(n + 8),
        other => other,
    }
}

impl Format {
    /// No colors, no flags. The format of untouched cells.
    pub const EMPTY: Format = Format {
        fg: Color::Default,
        bg: Color::Default,
        flags: FormatFlags::empty(),
    };

    /// The format installed by an explicit `SGR 0`.
    pub const RESET: Format = Format {
        fg: Color::Default,
        bg: Color::Default,
        flags: FormatFlags::RESET,
    };

    /// Apply a list of SGR parameters to this format in place.
    ///
    /// An empty list is equivalent to `0` (reset). Parameters are applied
    /// left to right; a reset mid-list clears everything applied so far.
    /// Returns [`CommandError::Malformed`] when an 8/24-bit color directive
    /// is missing operands and [`CommandError::Unsupported`] listing any
    /// unrecognized parameters (all recognized ones are still applied).
    pub fn apply_sgr(&mut self, params: &[u16]) -> Result<(), CommandError> {
        if params.is_empty() {
            *self = Format::RESET;
            return Ok(());
        }

        let mut unsupported = Vec::new();
        let mut i = 0;
        while i < params.len() {
            let p = params[i];
            i += 1;
            match p {
                0 => *self = Format::RESET,
                1 => {
                    self.flags.insert(FormatFlags::BOLD);
                    self.flags.remove(FormatFlags::FAINT);
                }
                2 => {
                    self.flags.insert(FormatFlags::FAINT);
                    self.flags.remove(FormatFlags::BOLD);
                }
                22 => self.flags.remove(FormatFlags::BOLD | FormatFlags::FAINT),
                3 => self.flags.insert(FormatFlags::ITALIC),
                23 => self.flags.remove(FormatFlags::ITALIC),
                4 => self.flags.insert(FormatFlags::UNDERLINE),
                24 => self.flags.remove(FormatFlags::UNDERLINE),
                // Slow and fast blink are not distinguished.
                5 | 6 => self.flags.insert(FormatFlags::BLINK),
                25 => self.flags.remove(FormatFlags::BLINK),
                7 => self.flags.insert(FormatFlags::REVERSE),
                27 => self.flags.remove(FormatFlags::REVERSE),
                8 => self.flags.insert(FormatFlags::CONCEAL),
                28 => self.flags.remove(FormatFlags::CONCEAL),
                30..=37 => self.fg = Color::Named((p - 30) as u8),
                39 => self.fg = Color::Default,
                90..=97 => self.fg = Color::Named((p - 90 + 8) as u8),
                40..=47 => self.bg = Color::Named((p - 40) as u8),
                49 => self.bg = Color::Default,
                100..=107 => self.bg = Color::Named((p - 100 + 8) as u8),
                38 | 48 => {
                    let color = extended_color(params, &mut i)?;
                    if p == 48 {
                        self.bg = color;
                    } else {
                        self.fg = color;
                    }
                }
                other => unsupported.push(other),
            }
        }

        if unsupported.is_empty() {
            Ok(())
        } else {
            Err(CommandError::Unsupported(format!(
                "unknown attributes: {unsupported:?}"
            )))
        }
    }

    /// Canonical ANSI serialization, as used by state marshaling.
    ///
    /// Parameters are emitted in a fixed order (intensity, colors, italic,
    /// underline, blink, reverse, conceal); a reset-flagged or empty format
    /// emits `CSI 0 m` first.
    pub fn sgr(&self) -> String {
        self.write_sgr(false, None, None)
    }

    /// ANSI serialization for human display.
    ///
    /// Identical to [`Format::sgr`] except that a bold format with a basic
    /// ANSI foreground is brightened to its 8-15 counterpart, and unset
    /// colors fall back to the provided defaults.
    pub fn render(&self, fg: Option<Color>, bg: Option<Color>) -> String {
        self.write_sgr(true, fg, bg)
    }

    fn write_sgr(&self, display: bool, fg_default: Option<Color>, bg_default: Option<Color>) -> String {
        let mut styles: Vec<String> = Vec::new();

        let mut fg = self.fg;
        if self.flags.contains(FormatFlags::BOLD) {
            styles.push("1".to_string());
            if display {
                fg = brighten(fg);
            }
        } else if self.flags.contains(FormatFlags::FAINT) {
            styles.push("2".to_string());
        }

        if let Some(s) = fg.sequence(false) {
            styles.push(s);
        } else if let Some(s) = fg_default.and_then(|c| c.sequence(false)) {
            styles.push(s);
        }
        if let Some(s) = self.bg.sequence(true) {
            styles.push(s);
        } else if let Some(s) = bg_default.and_then(|c| c.sequence(true)) {
            styles.push(s);
        }

        if self.flags.contains(FormatFlags::ITALIC) {
            styles.push("3".to_string());
        }
        if self.flags.contains(FormatFlags::UNDERLINE) {
            styles.push("4".to_string());
        }
        if self.flags.contains(FormatFlags::BLINK) {
            styles.push("5".to_string());
        }
        if self.flags.contains(FormatFlags::REVERSE) {
            styles.push("7".to_string());
        }
        if self.flags.contains(FormatFlags::CONCEAL) {
            styles.push("8".to_string());
        }

        let mut out = String::new();
        if self.flags.contains(FormatFlags::RESET) || *self == Format::EMPTY {
            out.push_str("\x1b[0m");
        }
        if !styles.is_empty() {
            out.push_str("\x1b[");
            out.push_str(&styles.join(";"));
            out.push('m');
        }
        out
    }

    /// CSS fragment for HTML export.
    ///
    /// Attributes are sorted alphabetically after generation so the style of
    /// a given format is always the same string and HTML output can be
    /// compared in tests.
    pub fn css(&self) -> String {
        let (mut fg, mut bg) = (self.fg, self.bg);
        if self.flags.contains(FormatFlags::REVERSE) {
            std::mem::swap(&mut fg, &mut bg);
        }

        let mut parts = Vec::new();
        if fg != Color::Default {
            let (r, g, b) = fg.to_rgb();
            parts.push(format!("color:#{r:02x}{g:02x}{b:02x}"));
        }
        if bg != Color::Default {
            let (r, g, b) = bg.to_rgb();
            parts.push(format!("background-color:#{r:02x}{g:02x}{b:02x}"));
        }
        if self.flags.contains(FormatFlags::BOLD) {
            parts.push("font-weight:bold".to_string());
        }
        if self.flags.contains(FormatFlags::FAINT) {
            parts.push("opacity:0.33".to_string());
        }
        if self.flags.contains(FormatFlags::UNDERLINE) {
            parts.push("text-decoration:underline".to_string());
        }
        if self.flags.contains(FormatFlags::BLINK) {
            parts.push("text-decoration:blink".to_string());
        }
        if self.flags.contains(FormatFlags::CONCEAL) {
            parts.push("display:none".to_string());
        }

        parts.sort();
        parts.join(";")
    }
}

/// Consume the operands of a `38`/`48` extended color directive.
fn extended_color(params: &[u16], i: &mut usize) -> Result<Color, CommandError> {
    let malformed = || CommandError::Malformed(format!("bad 8- or 24-bit color args: {params:?}"));

    let kind = *params.get(*i).ok_or_else(malformed)?;
    *i += 1;
    match kind {
        5 => {
            let n = *params.get(*i).ok_or_else(malformed)?;
            *i += 1;
            if n < 16 {
                Ok(Color::Named(n as u8))
            } else if n < 256 {
                Ok(Color::Indexed(n as u8))
            } else {
                Err(malformed())
            }
        }
        2 => {
            if *i + 3 > params.len() {
                return Err(malformed());
            }
            let (r, g, b) = (params[*i], params[*i + 1], params[*i + 2]);
            *i += 3;
            if r > 255 || g > 255 || b > 255 {
                return Err(malformed());
            }
            Ok(Color::Rgb(r as u8, g as u8, b as u8))
        }
        _ => Err(malformed()),
    }
}
