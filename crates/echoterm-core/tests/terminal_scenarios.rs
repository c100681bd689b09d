//! End-to-end scenarios: literal input bytes in, expected grid state out.

use std::io::Write as _;

use echoterm_core::{Color, FormatFlags, Terminal};

fn text(t: &Terminal, y: usize) -> String {
    t.screen().line(y).unwrap().iter().collect()
}

fn rendered(t: &Terminal) -> String {
    let mut buf = Vec::new();
    t.render(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

/// Foreground/background of a cell, ignoring attribute flags.
fn colors(t: &Terminal, y: usize, x: usize) -> (Color, Color) {
    let f = t.screen().format_at(y, x).unwrap();
    (f.fg, f.bg)
}

#[test]
fn plain_print_with_auto_resize() {
    let mut t = Terminal::new(1, 1);
    t.auto_resize_x = true;
    t.auto_resize_y = true;
    t.write_all(b"hey\nyo").unwrap();

    assert_eq!(t.height(), 2);
    assert_eq!(text(&t, 0), "hey");
    assert_eq!(text(&t, 1), "yo");
    assert_eq!((t.cursor().y, t.cursor().x), (1, 2));
    assert_eq!(t.used_height(), 2);
    assert_eq!(t.used_width(), 3);
    assert_eq!(rendered(&t), "hey\x1b[0m\nyo\x1b[0m");
}

#[test]
fn deferred_wrap_on_last_column() {
    let mut t = Terminal::new(5, 5);
    t.raw = true;

    t.write_all(b"aaaaa").unwrap();
    assert_eq!(t.cursor().x, 4);
    assert_eq!(t.cursor().y, 0);
    assert!(t.pending_wrap());

    t.write_all(b"b").unwrap();
    assert_eq!(t.screen().cell(1, 0), Some('b'));
    assert_eq!((t.cursor().y, t.cursor().x), (1, 1));
    assert!(!t.pending_wrap());
    // No blank row between the wrapped lines.
    assert_eq!(text(&t, 0), "aaaaa");
    assert_eq!(text(&t, 1), "b    ");
}

#[test]
fn sgr_color_and_reset() {
    let mut t = Terminal::new(1, 10);
    t.write_all(b"\x1b[31mRED\x1b[0mX").unwrap();

    assert_eq!(text(&t, 0), "REDX      ");
    for x in 0..3 {
        assert_eq!(colors(&t, 0, x), (Color::Named(1), Color::Default));
    }
    // The cell printed after the reset carries no colors or styling.
    let f = t.screen().format_at(0, 3).unwrap();
    assert_eq!(f.fg, Color::Default);
    assert_eq!(f.bg, Color::Default);
    assert!(!f.flags.intersects(FormatFlags::BOLD | FormatFlags::UNDERLINE));
}

#[test]
fn erase_display_fills_with_background() {
    let mut t = Terminal::new(3, 3);
    t.write_all(b"\x1b[41m\x1b[2J\x1b[H*").unwrap();

    for y in 0..3 {
        for x in 0..3 {
            assert_eq!(colors(&t, y, x).1, Color::Named(1), "cell ({y}, {x})");
        }
    }
    assert_eq!(t.screen().cell(0, 0), Some('*'));
}

#[test]
fn scroll_region_confines_newline_scrolling() {
    let mut t = Terminal::new(10, 10);
    // Mark the rows outside the region so we can see they never move.
    t.write_all(b"\x1b[2;1Hout2\x1b[6;1Hout6").unwrap();
    t.write_all(b"\x1b[3;5r\x1b[5;1HABC\nDEF\nGHI").unwrap();

    assert_eq!(text(&t, 1), "out2      ");
    assert_eq!(text(&t, 2), "ABC       ");
    assert_eq!(text(&t, 3), "DEF       ");
    assert_eq!(text(&t, 4), "GHI       ");
    assert_eq!(text(&t, 5), "out6      ");
    assert_eq!((t.cursor().y, t.cursor().x), (4, 3));
}

#[test]
fn alt_screen_toggle() {
    let mut t = Terminal::new(5, 10);
    t.write_all(b"MAIN\x1b[?1049hALT\x1b[?1049l").unwrap();

    assert!(!t.is_alt());
    assert_eq!(text(&t, 0), "MAIN      ");
    assert_eq!((t.cursor().y, t.cursor().x), (0, 4));

    let alt = t.alt_screen().unwrap();
    let alt_line: String = alt.line(0).unwrap().iter().collect();
    assert_eq!(alt_line, "ALT       ");
}

#[test]
fn horizontal_tab_paints_to_next_stop() {
    let mut t = Terminal::new(1, 20);
    t.write_all(b"ab\tc").unwrap();
    assert_eq!(text(&t, 0), "ab      c           ");
    assert_eq!(t.cursor().x, 9);
}

#[test]
fn cursor_position_report_is_one_indexed() {
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Sink(Arc<Mutex<Vec<u8>>>);
    impl std::io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let replies = Arc::new(Mutex::new(Vec::new()));
    let mut t = Terminal::new(24, 80);
    t.set_forward_responses(Sink(replies.clone()));
    t.write_all(b"\x1b[10;20H\x1b[6n").unwrap();
    assert_eq!(
        String::from_utf8(replies.lock().unwrap().clone()).unwrap(),
        "\x1b[10;20R"
    );
}

#[test]
fn garbage_never_panics_or_desynchronizes() {
    let mut t = Terminal::new(4, 8);
    t.write_all(b"\x1b[999;999H\x1b[;;;m\xff\xfe\x1b[?9999hok").unwrap();
    let all: String = (0..4).map(|y| text(&t, y)).collect();
    assert!(all.contains("ok"));
}
