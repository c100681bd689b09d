//! Decoded terminal commands.
//!
//! Commands are a closed sum dispatched by a single match in the terminal
//! layer. CSI parameters stay as the raw byte string at this level because
//! their interpretation depends on the final byte (`h`/`l` mode numbers keep
//! a `?` prefix, `m` may carry `>`/`?` passthrough forms); the helpers below
//! parse them on demand.

use std::fmt;

use smallvec::SmallVec;

use crate::error::CommandError;

/// Inline capacity for CSI parameter lists.
///
/// Most sequences carry a handful of parameters; this avoids a heap
/// allocation for the common case.
pub type CsiParams = SmallVec<[u16; 8]>;

/// One decoded unit of the input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A printable rune to place at the cursor.
    Print(char),
    /// A C0/C1 control rune.
    Control(char),
    /// A control sequence: `ESC [ args final_byte`.
    Csi { final_byte: char, args: String },
    /// A non-CSI escape: `ESC designator [arg]` (charset designators carry
    /// their selector letter as the argument).
    Esc { designator: char, arg: String },
    /// An operating system command: `ESC ] arg` up to BEL or ST.
    Osc(String),
}

impl Command {
    /// Parse a CSI argument string as integers.
    ///
    /// An empty string parses to an empty list (each handler applies its own
    /// defaults). Any segment that is not an integer makes the whole command
    /// malformed; the stream itself is unaffected.
    pub fn parse_int_args(args: &str) -> Result<CsiParams, CommandError> {
        let mut out = CsiParams::new();
        if args.is_empty() {
            return Ok(out);
        }
        for part in args.split(';') {
            let value: u32 = part
                .parse()
                .map_err(|_| CommandError::Malformed(format!("bad int args: {args:?}")))?;
            out.push(value.min(u16::MAX as u32) as u16);
        }
        Ok(out)
    }

    /// Split a CSI argument string on `;` without interpreting the parts.
    pub fn parse_str_args(args: &str) -> Vec<&str> {
        if args.is_empty() {
            Vec::new()
        } else {
            args.split(';').collect()
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Print(r) => write!(f, "print({r:?})"),
            Command::Control(r) => write!(f, "control({r:?})"),
            Command::Csi { final_byte, args } => write!(f, "csi({final_byte:?}, {args:?})"),
            Command::Esc { designator, arg } => write!(f, "esc({designator:?}, {arg:?})"),
            Command::Osc(arg) => write!(f, "osc({arg:?})"),
        }
    }
}
