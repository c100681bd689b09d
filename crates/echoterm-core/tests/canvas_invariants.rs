//! Property-based invariant tests.
//!
//! These verify structural invariants that must hold for **any** operation
//! sequence:
//!
//! 1. After a `resize(h, w)`, region sizes sum to `w` for every row.
//! 2. No region ever has size zero.
//! 3. Adjacent regions always differ in format (merging happened).
//! 4. `paint` is idempotent.
//! 5. The decoder round-trips printable runes and CSI parameter lists.
//! 6. Arbitrary bytes never panic the terminal.

use std::io::Write as _;

use echoterm_core::{Canvas, Color, Command, Format, Terminal, decode};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum CanvasOp {
    Paint { row: usize, col: usize, color: u8 },
    Insert { row: usize, col: usize, color: u8, n: usize },
    Delete { row: usize, col: usize, n: usize },
}

fn format_of(color: u8) -> Format {
    if color == 0 {
        Format::EMPTY
    } else {
        Format {
            fg: Color::Named(color % 16),
            ..Format::EMPTY
        }
    }
}

fn canvas_op() -> impl Strategy<Value = CanvasOp> {
    prop_oneof![
        (0usize..6, 0usize..40, 0u8..5).prop_map(|(row, col, color)| CanvasOp::Paint {
            row,
            col,
            color
        }),
        (0usize..6, 0usize..40, 0u8..5, 1usize..8).prop_map(|(row, col, color, n)| {
            CanvasOp::Insert { row, col, color, n }
        }),
        (0usize..6, 0usize..40, 1usize..8).prop_map(|(row, col, n)| CanvasOp::Delete {
            row,
            col,
            n
        }),
    ]
}

fn apply_op(canvas: &mut Canvas, op: &CanvasOp) {
    match *op {
        CanvasOp::Paint { row, col, color } => canvas.paint(row, col, format_of(color)),
        CanvasOp::Insert { row, col, color, n } => canvas.insert(row, col, format_of(color), n),
        CanvasOp::Delete { row, col, n } => canvas.delete(row, col, n),
    }
}

fn assert_structurally_valid(canvas: &Canvas) {
    for row in 0..canvas.height() {
        let regions: Vec<_> = canvas.regions(row).collect();
        for r in &regions {
            assert!(r.size > 0, "zero-size region in row {row}");
        }
        for pair in regions.windows(2) {
            assert_ne!(
                pair[0].format, pair[1].format,
                "unmerged neighbours in row {row}"
            );
        }
    }
}

// ── Canvas properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn ops_preserve_structure(ops in proptest::collection::vec(canvas_op(), 0..64)) {
        let mut canvas = Canvas::new();
        for op in &ops {
            apply_op(&mut canvas, op);
            assert_structurally_valid(&canvas);
        }
    }

    #[test]
    fn resize_restores_row_widths(
        ops in proptest::collection::vec(canvas_op(), 0..64),
        h in 1usize..8,
        w in 1usize..48,
    ) {
        let mut canvas = Canvas::new();
        for op in &ops {
            apply_op(&mut canvas, op);
        }
        canvas.resize(h, w);
        assert_structurally_valid(&canvas);
        prop_assert_eq!(canvas.height(), h);
        for row in 0..h {
            prop_assert_eq!(canvas.row_width(row), w);
        }
    }

    #[test]
    fn paint_is_idempotent(
        ops in proptest::collection::vec(canvas_op(), 0..32),
        row in 0usize..6,
        col in 0usize..40,
        color in 0u8..5,
    ) {
        let mut once = Canvas::new();
        for op in &ops {
            apply_op(&mut once, op);
        }
        let mut twice = once.clone();

        once.paint(row, col, format_of(color));
        twice.paint(row, col, format_of(color));
        twice.paint(row, col, format_of(color));

        let a: Vec<Vec<_>> = (0..once.height()).map(|r| once.regions(r).collect()).collect();
        let b: Vec<Vec<_>> = (0..twice.height()).map(|r| twice.regions(r).collect()).collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn painted_cell_reads_back(
        ops in proptest::collection::vec(canvas_op(), 0..32),
        row in 0usize..6,
        col in 0usize..40,
        color in 0u8..5,
    ) {
        let mut canvas = Canvas::new();
        for op in &ops {
            apply_op(&mut canvas, op);
        }
        canvas.paint(row, col, format_of(color));
        prop_assert_eq!(canvas.format_at(row, col), Some(format_of(color)));
    }
}

// ── Decoder properties ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn printable_runes_round_trip(text in "[a-zA-Z0-9 éü中🎉]{0,40}") {
        let bytes = text.as_bytes();
        let mut rest = bytes;
        let mut decoded = String::new();
        while !rest.is_empty() {
            let (cmd, n) = decode(rest).expect("decode printable");
            match cmd {
                Command::Print(r) => decoded.push(r),
                other => panic!("unexpected command: {other}"),
            }
            rest = &rest[n..];
        }
        prop_assert_eq!(decoded, text);
    }

    #[test]
    fn csi_parameter_lists_round_trip(params in proptest::collection::vec(0u16..10000, 1..6)) {
        let rendered: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let input = format!("\x1b[{}d", rendered.join(";"));
        let (cmd, n) = decode(input.as_bytes()).expect("decode csi");
        prop_assert_eq!(n, input.len());
        match cmd {
            Command::Csi { final_byte, args } => {
                prop_assert_eq!(final_byte, 'd');
                let parsed = Command::parse_int_args(&args).expect("int args");
                prop_assert_eq!(parsed.as_slice(), params.as_slice());
            }
            other => panic!("unexpected command: {other}"),
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut term = Terminal::new(8, 20);
        let _ = term.write_all(&bytes);
        // The cursor must stay inside the (possibly transiently taller)
        // grid and the screen must stay internally consistent.
        let c = term.cursor();
        prop_assert!(c.y <= term.height());
        prop_assert!(c.x <= term.width().max(term.used_width()));
    }

    #[test]
    fn split_writes_equal_single_write(
        bytes in proptest::collection::vec(any::<u8>(), 0..128),
        split in 0usize..128,
    ) {
        let split = split.min(bytes.len());
        let mut one = Terminal::new(6, 12);
        let _ = one.write_all(&bytes);

        let mut two = Terminal::new(6, 12);
        let _ = two.write_all(&bytes[..split]);
        let _ = two.write_all(&bytes[split..]);

        for y in 0..6 {
            prop_assert_eq!(one.screen().line(y), two.screen().line(y));
        }
        prop_assert_eq!(one.cursor().y, two.cursor().y);
        prop_assert_eq!(one.cursor().x, two.cursor().x);
    }
}
