//! Streaming byte-to-command tokenizer.
//!
//! [`decode`] cuts one command off the front of a byte slice:
//!
//! - a printable rune (ASCII or multi-byte UTF-8) → [`Command::Print`]
//! - a control rune → [`Command::Control`]
//! - `ESC` (or the single-byte CSI `0x9B`) → an escape sequence: CSI with
//!   accumulated argument bytes, OSC with three accepted terminators (BEL,
//!   ST, `ESC \`), charset designators, and the single-byte escapes
//!
//! The decoder is pure and synchronous. When the slice ends mid-sequence it
//! reports [`DecodeError::Incomplete`] so the caller can stash the tail and
//! retry once more bytes arrive; a byte that cannot start or continue UTF-8
//! is [`DecodeError::InvalidUtf8`].

use tracing::debug;

use crate::command::Command;
use crate::error::DecodeError;

const ESC: char = '\u{1b}';
/// Single-rune CSI, equivalent to `ESC [`.
const MONOGRAM_CSI: char = '\u{9b}';

/// Decode one command from the front of `input`.
///
/// Returns the command and the number of bytes consumed. `input` must not be
/// empty.
pub fn decode(input: &[u8]) -> Result<(Command, usize), DecodeError> {
    let (r, n) = next_rune(input)?;

    if r == ESC || r == MONOGRAM_CSI {
        return scan_escape(input);
    }
    if r.is_control() {
        return Ok((Command::Control(r), n));
    }
    Ok((Command::Print(r), n))
}

/// Decode the leading rune of `input`.
///
/// A truncated multi-byte rune at the end of the slice is `Incomplete`; a
/// byte that can never appear at its position is `InvalidUtf8`.
fn next_rune(input: &[u8]) -> Result<(char, usize), DecodeError> {
    let b = input[0];
    if b < 0x80 {
        return Ok((b as char, 1));
    }

    let len = match b {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        // Continuation bytes and overlong/out-of-range leading bytes.
        _ => return Err(DecodeError::InvalidUtf8),
    };
    if input.len() < len {
        // Every present continuation byte must still be valid, otherwise
        // waiting for more input cannot help.
        if input[1..].iter().all(|&c| (0x80..=0xBF).contains(&c)) {
            return Err(DecodeError::Incomplete);
        }
        return Err(DecodeError::InvalidUtf8);
    }

    match std::str::from_utf8(&input[..len]) {
        Ok(s) => match s.chars().next() {
            Some(c) => Ok((c, len)),
            None => Err(DecodeError::InvalidUtf8),
        },
        Err(_) => Err(DecodeError::InvalidUtf8),
    }
}

fn is_csi_final(r: char) -> bool {
    ('\u{40}'..='\u{7e}').contains(&r)
}

/// Scan a full escape sequence starting at the introducer.
fn scan_escape(input: &[u8]) -> Result<(Command, usize), DecodeError> {
    let (introducer, mut pos) = next_rune(input)?;
    let mut csi = introducer == MONOGRAM_CSI;

    let mut args = String::new();
    let mut quote = false;
    let mut first = true;

    loop {
        if pos >= input.len() {
            return Err(DecodeError::Incomplete);
        }
        let (r, n) = next_rune(&input[pos..])?;
        pos += n;

        if first {
            first = false;
            match r {
                '[' => {
                    csi = true;
                    continue;
                }
                // Character set designation: one more rune selects the set.
                '(' | ')' | '*' | '+' | '-' | '.' | '/' => {
                    if pos >= input.len() {
                        return Err(DecodeError::Incomplete);
                    }
                    let (set, sn) = next_rune(&input[pos..])?;
                    pos += sn;
                    return Ok((
                        Command::Esc {
                            designator: r,
                            arg: set.to_string(),
                        },
                        pos,
                    ));
                }
                ']' => return scan_osc(input, pos),
                '=' | '>' | '7' | '8' | 'D' | 'M' | 'c' => {
                    return Ok((
                        Command::Esc {
                            designator: r,
                            arg: String::new(),
                        },
                        pos,
                    ));
                }
                _ => {}
            }
        }

        if !csi {
            // An ESC followed by a rune we do not classify; surface it as a
            // zero-argument control sequence so the terminal can report it.
            debug!(rune = %r, "unknown non-CSI escape");
            return Ok((
                Command::Csi {
                    final_byte: r,
                    args: String::new(),
                },
                pos,
            ));
        }

        if !quote && is_csi_final(r) {
            return Ok((Command::Csi { final_byte: r, args }, pos));
        }
        if r == '"' {
            quote = !quote;
        }
        args.push(r);
    }
}

/// Scan an OSC body; `pos` sits just past `ESC ]`.
fn scan_osc(input: &[u8], mut pos: usize) -> Result<(Command, usize), DecodeError> {
    let mut arg = String::new();
    loop {
        if pos >= input.len() {
            return Err(DecodeError::Incomplete);
        }
        let (r, n) = next_rune(&input[pos..])?;
        pos += n;
        match r {
            // BEL or ST.
            '\u{7}' | '\u{9c}' => return Ok((Command::Osc(arg), pos)),
            // Possibly the two-rune ST form (ESC \).
            ESC => {
                if pos >= input.len() {
                    return Err(DecodeError::Incomplete);
                }
                let (next, nn) = next_rune(&input[pos..])?;
                pos += nn;
                if next == '\\' {
                    return Ok((Command::Osc(arg), pos));
                }
            }
            _ => arg.push(r),
        }
    }
}
