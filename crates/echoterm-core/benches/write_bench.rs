//! Write-throughput benchmarks over representative output streams.

use std::io::Write as _;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use echoterm_core::Terminal;

/// Plain log-style output: lines of text, no styling.
fn plain_stream() -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..200 {
        out.extend_from_slice(format!("line {i}: the quick brown fox jumps over the lazy dog\r\n").as_bytes());
    }
    out
}

/// Colored output with frequent SGR transitions, the canvas's worst case.
fn colored_stream() -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..200 {
        for word in 0..8 {
            out.extend_from_slice(format!("\x1b[3{}mword{word} ", (i + word) % 8).as_bytes());
        }
        out.extend_from_slice(b"\x1b[0m\r\n");
    }
    out
}

/// Full-screen redraw traffic: cursor positioning plus erase sequences.
fn fullscreen_stream() -> Vec<u8> {
    let mut out = Vec::new();
    for frame in 0..20 {
        out.extend_from_slice(b"\x1b[H\x1b[2J");
        for row in 1..=24 {
            out.extend_from_slice(format!("\x1b[{row};1H\x1b[44mframe {frame} row {row}\x1b[0m").as_bytes());
        }
    }
    out
}

fn bench_write(c: &mut Criterion) {
    let plain = plain_stream();
    let colored = colored_stream();
    let fullscreen = fullscreen_stream();

    c.bench_function("write_plain", |b| {
        b.iter(|| {
            let mut term = Terminal::new(24, 80);
            term.write_all(black_box(&plain)).unwrap();
            black_box(term.used_height())
        })
    });

    c.bench_function("write_colored", |b| {
        b.iter(|| {
            let mut term = Terminal::new(24, 80);
            term.write_all(black_box(&colored)).unwrap();
            black_box(term.used_height())
        })
    });

    c.bench_function("write_fullscreen", |b| {
        b.iter(|| {
            let mut term = Terminal::new(24, 80);
            term.write_all(black_box(&fullscreen)).unwrap();
            black_box(term.used_height())
        })
    });

    c.bench_function("marshal_binary", |b| {
        let mut term = Terminal::new(24, 80);
        term.write_all(&colored).unwrap();
        b.iter(|| black_box(term.marshal_binary()))
    });
}

criterion_group!(benches, bench_write);
criterion_main!(benches);
