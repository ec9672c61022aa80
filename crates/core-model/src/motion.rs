//! Cursor motions over a [`Frame`](crate::frame::Frame), byte-wise (no
//! grapheme awareness — see `examples/freddiehaddad-oxidized/crates/core-text/src/motion.rs`
//! for the byte-vs-grapheme distinction this crate deliberately drops).

use crate::frame::{Frame, VCT_END};
use core_state::{mode_line_end, Buffer, Mode};
use core_text::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    Prev,
    Next,
    Home,
    End,
    HomeSp,
    FileBeg,
    FileEnd,
    PageUp,
    PageDown,
    ParaUp,
    ParaDown,
}

fn line_len(buf: &Buffer, line: usize) -> usize {
    buf.text.line(line).map(|l| l.len()).unwrap_or(0)
}

/// Applies `motion` to `frame.cur`; `counter` is the verb's repeat count
/// (clamped to at least 1), `page_height` is the active frame's visible
/// height (for `PAGE_UP`/`PAGE_DOWN`). Returns whether the cursor moved.
pub fn apply_motion(
    frame: &mut Frame,
    buf: &Buffer,
    mode: Mode,
    motion: Motion,
    counter: usize,
    page_height: usize,
) -> bool {
    let counter = counter.max(1);
    let before = frame.cur;
    match motion {
        Motion::Left => move_horz(frame, buf, mode, counter, -1, false),
        Motion::Right => move_horz(frame, buf, mode, counter, 1, false),
        Motion::Prev => move_horz(frame, buf, mode, counter, -1, true),
        Motion::Next => move_horz(frame, buf, mode, counter, 1, true),
        Motion::Up => move_vert(frame, buf, mode, counter, -1),
        Motion::Down => move_vert(frame, buf, mode, counter, 1),
        Motion::Home => {
            frame.cur.col = 0;
            frame.vct = 0;
        }
        Motion::HomeSp => {
            let indent = buf.line_indent(frame.cur.line).min(line_len(buf, frame.cur.line));
            frame.cur.col = indent;
            frame.vct = indent;
        }
        Motion::End => {
            frame.cur.col = mode_line_end(mode, line_len(buf, frame.cur.line));
            frame.vct = VCT_END;
        }
        Motion::FileBeg => {
            let target = counter.saturating_sub(1).min(last_line(buf));
            set_line(frame, buf, mode, target);
        }
        Motion::FileEnd => {
            let target = if counter > 1 {
                counter.saturating_sub(1).min(last_line(buf))
            } else {
                last_line(buf)
            };
            set_line(frame, buf, mode, target);
        }
        Motion::PageUp => {
            let dist = (2 * page_height / 3).max(1);
            move_vert(frame, buf, mode, dist, -1);
        }
        Motion::PageDown => {
            let dist = (2 * page_height / 3).max(1);
            move_vert(frame, buf, mode, dist, 1);
        }
        Motion::ParaUp => move_para(frame, buf, mode, counter, -1),
        Motion::ParaDown => move_para(frame, buf, mode, counter, 1),
    }
    frame.cur != before
}

/// Clips `frame.cur.col` to the new mode's line-end rule without touching
/// `vct` — used on mode transitions (e.g. leaving Insert), matching the
/// original's `set_cursor`, which clips but never consults `vct`.
pub fn clip_to_mode(frame: &mut Frame, buf: &Buffer, mode: Mode) {
    let ceiling = mode_line_end(mode, line_len(buf, frame.cur.line));
    frame.cur.col = frame.cur.col.min(ceiling);
}

fn last_line(buf: &Buffer) -> usize {
    buf.text.num_lines() - 1
}

fn move_horz(frame: &mut Frame, buf: &Buffer, mode: Mode, count: usize, dir: i32, wrap: bool) {
    for _ in 0..count {
        if dir < 0 {
            if frame.cur.col > 0 {
                frame.cur.col -= 1;
            } else if wrap && frame.cur.line > 0 {
                frame.cur.line -= 1;
                frame.cur.col = mode_line_end(mode, line_len(buf, frame.cur.line));
            } else {
                break;
            }
        } else {
            let ceiling = mode_line_end(mode, line_len(buf, frame.cur.line));
            if frame.cur.col < ceiling {
                frame.cur.col += 1;
            } else if wrap && frame.cur.line + 1 < buf.text.num_lines() {
                frame.cur.line += 1;
                frame.cur.col = 0;
            } else {
                break;
            }
        }
    }
    frame.vct = frame.cur.col;
}

fn move_vert(frame: &mut Frame, buf: &Buffer, mode: Mode, count: usize, dir: i32) {
    let new_line = if dir < 0 {
        frame.cur.line.saturating_sub(count)
    } else {
        (frame.cur.line + count).min(last_line(buf))
    };
    set_line(frame, buf, mode, new_line);
}

/// Moves to `line`, clipping the column to `min(vct, mode_line_end(line))`
/// (`vct == VCT_END` sticks to the line's end). `vct` itself is untouched —
/// vertical motion preserves the desired column across short lines.
fn set_line(frame: &mut Frame, buf: &Buffer, mode: Mode, line: usize) {
    frame.cur.line = line;
    let ceiling = mode_line_end(mode, line_len(buf, line));
    frame.cur.col = if frame.vct == VCT_END {
        ceiling
    } else {
        frame.vct.min(ceiling)
    };
}

fn move_para(frame: &mut Frame, buf: &Buffer, mode: Mode, count: usize, dir: i32) {
    let num_lines = buf.text.num_lines();
    let mut line = frame.cur.line;
    let mut found = 0;
    loop {
        if dir < 0 {
            if line == 0 {
                break;
            }
            line -= 1;
        } else {
            if line + 1 >= num_lines {
                break;
            }
            line += 1;
        }
        if line_len(buf, line) == 0 {
            found += 1;
            if found == count {
                break;
            }
        }
    }
    set_line(frame, buf, mode, line);
}

pub fn clamp_to_buffer(buf: &Buffer, pos: Position) -> Position {
    buf.text.clamp(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutRegion;
    use core_state::Buffer as StateBuffer;

    fn buf_of(lines: &[&str]) -> StateBuffer {
        let mut b = StateBuffer::empty(1);
        let src: Vec<core_text::RawLine> = lines.iter().map(|s| core_text::RawLine::from_str(s)).collect();
        b.insert_range(Position::origin(), &src, 1, Position::origin(), false);
        b
    }

    fn frame() -> Frame {
        Frame::new(LayoutRegion::new(0, 0, 80, 24), 1)
    }

    #[test]
    fn right_clips_to_normal_mode_line_end() {
        let buf = buf_of(&["abc"]);
        let mut f = frame();
        for _ in 0..10 {
            apply_motion(&mut f, &buf, Mode::Normal, Motion::Right, 1, 24);
        }
        assert_eq!(f.cur, Position::new(0, 2));
    }

    #[test]
    fn next_wraps_to_following_line() {
        let buf = buf_of(&["ab", "cd"]);
        let mut f = frame();
        f.cur = Position::new(0, 1);
        apply_motion(&mut f, &buf, Mode::Normal, Motion::Next, 1, 24);
        assert_eq!(f.cur, Position::new(1, 0));
    }

    #[test]
    fn vertical_motion_clips_to_shorter_line_but_preserves_vct() {
        let buf = buf_of(&["abcdef", "ab", "abcdef"]);
        let mut f = frame();
        f.cur = Position::new(0, 5);
        f.vct = 5;
        apply_motion(&mut f, &buf, Mode::Normal, Motion::Down, 1, 24);
        assert_eq!(f.cur, Position::new(1, 1));
        assert_eq!(f.vct, 5, "vct must survive clipping on a short line");
        apply_motion(&mut f, &buf, Mode::Normal, Motion::Down, 1, 24);
        assert_eq!(f.cur, Position::new(2, 5), "vct is restored on a long enough line");
    }

    #[test]
    fn end_sets_sticky_vct() {
        let buf = buf_of(&["abcdef", "ab"]);
        let mut f = frame();
        apply_motion(&mut f, &buf, Mode::Normal, Motion::End, 1, 24);
        assert_eq!(f.vct, VCT_END);
        apply_motion(&mut f, &buf, Mode::Normal, Motion::Down, 1, 24);
        assert_eq!(f.cur, Position::new(1, 1));
    }

    #[test]
    fn home_sp_lands_on_first_non_blank() {
        let buf = buf_of(&["   x"]);
        let mut f = frame();
        f.cur.col = 4;
        apply_motion(&mut f, &buf, Mode::Normal, Motion::HomeSp, 1, 24);
        assert_eq!(f.cur.col, 3);
    }

    #[test]
    fn para_down_counts_blank_lines() {
        let buf = buf_of(&["a", "", "b", "", "c"]);
        let mut f = frame();
        apply_motion(&mut f, &buf, Mode::Normal, Motion::ParaDown, 2, 24);
        assert_eq!(f.cur.line, 3);
    }

    #[test]
    fn file_end_goes_to_last_line_without_counter() {
        let buf = buf_of(&["a", "b", "c"]);
        let mut f = frame();
        apply_motion(&mut f, &buf, Mode::Normal, Motion::FileEnd, 1, 24);
        assert_eq!(f.cur.line, 2);
    }
}
