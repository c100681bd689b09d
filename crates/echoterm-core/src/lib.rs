#![forbid(unsafe_code)]

//! Embeddable ANSI/VT terminal state engine.
//!
//! `echoterm-core` consumes the byte stream of a program that expects an
//! ANSI/VT-series terminal, interprets the control sequences, and maintains
//! an in-memory model of the character grid with per-cell text attributes.
//! Hosts (multiplexers, CI log viewers, TUIs, test harnesses) can inspect
//! the model, render it, or re-serialize it — without owning a real pty.
//!
//! # Primary responsibilities
//!
//! - **Decoder**: byte stream → commands (runes, C0 controls, CSI, ESC, OSC).
//! - **Format**: per-cell colors + packed attribute flags.
//! - **Canvas**: run-length attribute plane with paint/insert/delete/resize.
//! - **Screen**: content grid, cursor, scroll region, per-row change counters.
//! - **Terminal**: applies commands; owns main + alternate screens, deferred
//!   wrap, auto-resizing, and the forwarding sinks.
//! - **Marshal / Render / HTML**: re-serialization and display output.
//!
//! # Design principles
//!
//! - **No I/O**: bytes come in through [`std::io::Write`]; replies to device
//!   queries leave through sinks the host installs.
//! - **Deterministic**: identical byte sequences always produce identical
//!   state, and serialization always emits the same canonical forms.
//! - **Never desynchronize**: malformed commands are logged and skipped,
//!   partial escape sequences are retained across writes.
//!
//! ```
//! use std::io::Write;
//!
//! let mut term = echoterm_core::Terminal::new(24, 80);
//! term.write_all(b"\x1b[1;31mhello\x1b[0m world").unwrap();
//! assert_eq!(term.screen().cell(0, 0), Some('h'));
//! ```

pub mod canvas;
pub mod command;
pub mod decoder;
pub mod error;
pub mod format;
mod html;
mod marshal;
mod render;
pub mod screen;
pub mod terminal;

pub use canvas::{Canvas, Region};
pub use command::{Command, CsiParams};
pub use decoder::decode;
pub use error::{CommandError, DecodeError};
pub use format::{Color, Format, FormatFlags};
pub use render::Line;
pub use screen::{Cursor, CursorStyle, Screen, ScrollRegion};
pub use terminal::Terminal;
