//! Operator application: resolves a motion or linewise target into a span,
//! then runs delete/yank against the buffer, recording the yanked/deleted
//! text into a register.

use crate::motion_map::{is_linewise, motion_for_char};
use crate::registers::{RegisterContent, Registers};
use core_model::{Frame, Motion};
use core_state::{Buffer, Mode};
use core_text::{Position, RawLine};

/// What an operator did, so the dispatcher can follow up (e.g. `c` enters
/// Insert mode after deleting).
pub enum OperatorEffect {
    None,
    EnterInsert,
}

fn ordered(a: Position, b: Position) -> (Position, Position) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Runs `motion` as a scratch cursor step (without mutating `frame`) to find
/// the span an operator+motion combo covers.
fn charwise_span(
    frame: &Frame,
    buf: &Buffer,
    mode: Mode,
    motion: Motion,
    count: usize,
    page_height: usize,
) -> (Position, Position) {
    let mut scratch = frame.clone();
    core_model::apply_motion(&mut scratch, buf, mode, motion, count, page_height);
    let (mut from, mut to) = ordered(frame.cur, scratch.cur);
    if to > from {
        // Treat the target as inclusive: `d$`/`dw` consume the character the
        // motion lands on, not just everything strictly before it.
        let line_len = buf.text.line(to.line).map(|l| l.len()).unwrap_or(0);
        to.col = (to.col + 1).min(line_len);
    }
    if from.line == to.line && from.col == to.col && motion != Motion::Left {
        // zero-width same-line result (e.g. motion blocked at a boundary):
        // nothing to do.
        to = from;
    }
    (from, to)
}

fn linewise_span(frame: &Frame, buf: &Buffer, mode: Mode, motion: Motion, count: usize) -> (Position, Position) {
    let mut scratch = frame.clone();
    core_model::apply_motion(&mut scratch, buf, mode, motion, count, buf.text.num_lines());
    let lo = frame.cur.line.min(scratch.cur.line);
    let hi = frame.cur.line.max(scratch.cur.line);
    (Position::new(lo, 0), Position::new(hi + 1, 0))
}

/// Applies operator `op` (`d`/`c`/`y`) against the span `motion` describes,
/// repeated `count` times. Returns whether the operator produced a mutation
/// and what mode-level follow-up (if any) is needed.
pub fn apply_operator_motion(
    op: char,
    motion_char: char,
    count: usize,
    register: Option<char>,
    frame: &mut Frame,
    buf: &mut Buffer,
    mode: Mode,
    regs: &mut Registers,
) -> OperatorEffect {
    let Some(motion) = motion_for_char(motion_char) else {
        return OperatorEffect::None;
    };
    let page_height = frame.rect.height as usize;
    // `=` (re-indent) always acts on whole lines, regardless of the motion's
    // own charwise/linewise nature.
    let linewise = op == '=' || is_linewise(motion);
    let (from, to) = if linewise {
        linewise_span(frame, buf, mode, motion, count)
    } else {
        charwise_span(frame, buf, mode, motion, count, page_height)
    };
    if from == to {
        return OperatorEffect::None;
    }
    run_operator(op, from, to, linewise, register, frame, buf, regs)
}

/// Applies operator `op` linewise over `count` whole lines starting at the
/// cursor (`dd`, `yy`, `cc`), i.e. the operator doubled (`dd`) or given an
/// explicit line count (`3dd`).
pub fn apply_operator_lines(
    op: char,
    count: usize,
    register: Option<char>,
    frame: &mut Frame,
    buf: &mut Buffer,
    regs: &mut Registers,
) -> OperatorEffect {
    let start = frame.cur.line;
    let end = (start + count - 1).min(buf.text.num_lines() - 1);
    let span = (Position::new(start, 0), Position::new(end + 1, 0));
    run_operator(op, span.0, span.1, true, register, frame, buf, regs)
}

fn run_operator(
    op: char,
    from: Position,
    to: Position,
    linewise: bool,
    register: Option<char>,
    frame: &mut Frame,
    buf: &mut Buffer,
    regs: &mut Registers,
) -> OperatorEffect {
    match op {
        'y' => {
            let yanked = buf.text.get_range(from, to);
            regs.set(
                register,
                RegisterContent {
                    lines: yanked,
                    linewise,
                },
            );
            OperatorEffect::None
        }
        'd' | 'c' => {
            let cursor_before = frame.cur;
            let removed = buf.delete_range(from, to, cursor_before, from, false);
            regs.set(register, RegisterContent { lines: removed, linewise });
            frame.cur = buf.text.clamp(from);
            if op == 'c' {
                OperatorEffect::EnterInsert
            } else {
                OperatorEffect::None
            }
        }
        '=' => {
            let cursor_before = frame.cur;
            for line_i in from.line..to.line {
                buf.indent_line(line_i, cursor_before);
            }
            let indent = buf.line_indent(from.line);
            frame.cur = buf.text.clamp(Position::new(from.line, indent));
            OperatorEffect::None
        }
        _ => OperatorEffect::None,
    }
}

/// Pastes register `name`'s content `count` times, after (`before = false`)
/// or before (`before = true`) the cursor.
pub fn paste(
    name: Option<char>,
    count: usize,
    before: bool,
    frame: &mut Frame,
    buf: &mut Buffer,
    regs: &Registers,
) {
    let Some(content) = regs.get(name) else {
        return;
    };
    let lines: Vec<RawLine> = content.lines.clone();
    if lines.is_empty() {
        return;
    }
    let cursor_before = frame.cur;
    if content.linewise {
        let at = Position::new(if before { frame.cur.line } else { frame.cur.line + 1 }, 0);
        buf.insert_range(at, &lines, count, cursor_before, false);
        frame.cur = Position::new(at.line, 0);
    } else {
        let at = Position::new(frame.cur.line, if before { frame.cur.col } else { frame.cur.col + 1 });
        let at = buf.text.clamp(at);
        let end = buf.insert_range(at, &lines, count, cursor_before, false);
        frame.cur = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::LayoutRegion;
    use core_text::RawLine;

    fn buf_of(lines: &[&str]) -> Buffer {
        let mut b = Buffer::empty(1);
        let src: Vec<RawLine> = lines.iter().map(|s| RawLine::from_str(s)).collect();
        b.insert_range(Position::origin(), &src, 1, Position::origin(), false);
        b
    }

    fn frame() -> Frame {
        Frame::new(LayoutRegion::new(0, 0, 80, 24), 1)
    }

    #[test]
    fn delete_to_end_of_line() {
        let mut buf = buf_of(&["hello world"]);
        let mut f = frame();
        f.cur = Position::new(0, 6);
        let mut regs = Registers::new();
        apply_operator_motion('d', '$', 1, None, &mut f, &mut buf, Mode::Normal, &mut regs);
        assert_eq!(buf.text.line(0).unwrap().as_str_lossy(), "hello ");
        assert_eq!(regs.get(None).unwrap().lines, vec![RawLine::from_str("world")]);
    }

    #[test]
    fn dd_removes_whole_line_linewise() {
        let mut buf = buf_of(&["a", "b", "c"]);
        let mut f = frame();
        f.cur = Position::new(1, 0);
        let mut regs = Registers::new();
        apply_operator_lines('d', 1, None, &mut f, &mut buf, &mut regs);
        assert_eq!(buf.text.num_lines(), 2);
        assert_eq!(buf.text.line(1).unwrap().as_str_lossy(), "c");
        assert!(regs.get(None).unwrap().linewise);
    }

    #[test]
    fn yank_does_not_mutate_buffer() {
        let mut buf = buf_of(&["abcdef"]);
        let mut f = frame();
        let mut regs = Registers::new();
        apply_operator_motion('y', 'l', 2, None, &mut f, &mut buf, Mode::Normal, &mut regs);
        assert_eq!(buf.text.line(0).unwrap().as_str_lossy(), "abcdef");
        assert_eq!(regs.get(None).unwrap().lines, vec![RawLine::from_str("ab")]);
    }

    #[test]
    fn paste_after_inserts_past_cursor() {
        let mut buf = buf_of(&["ac"]);
        let mut f = frame();
        let mut regs = Registers::new();
        regs.set(
            None,
            RegisterContent {
                lines: vec![RawLine::from_str("b")],
                linewise: false,
            },
        );
        paste(None, 1, false, &mut f, &mut buf, &regs);
        assert_eq!(buf.text.line(0).unwrap().as_str_lossy(), "abc");
    }

    #[test]
    fn linewise_paste_inserts_new_line_below() {
        let mut buf = buf_of(&["a", "b"]);
        let mut f = frame();
        let mut regs = Registers::new();
        regs.set(
            None,
            RegisterContent {
                lines: vec![RawLine::from_str("x")],
                linewise: true,
            },
        );
        paste(None, 1, false, &mut f, &mut buf, &regs);
        assert_eq!(buf.text.line(1).unwrap().as_str_lossy(), "x");
        assert_eq!(buf.text.num_lines(), 3);
    }

    #[test]
    fn equals_operator_indents_line_to_match_previous() {
        let mut buf = buf_of(&["    a", "b"]);
        let mut f = frame();
        f.cur = Position::new(1, 0);
        let mut regs = Registers::new();
        apply_operator_lines('=', 1, None, &mut f, &mut buf, &mut regs);
        assert_eq!(buf.text.line(1).unwrap().as_str_lossy(), "    b");
        assert_eq!(f.cur, Position::new(1, 4));
    }

    #[test]
    fn equals_operator_removes_excess_indent() {
        let mut buf = buf_of(&["a", "      b"]);
        let mut f = frame();
        f.cur = Position::new(1, 0);
        let mut regs = Registers::new();
        apply_operator_lines('=', 1, None, &mut f, &mut buf, &mut regs);
        assert_eq!(buf.text.line(1).unwrap().as_str_lossy(), "b");
        assert_eq!(f.cur, Position::new(1, 0));
    }

    #[test]
    fn equals_operator_is_linewise_even_with_charwise_motion() {
        let mut buf = buf_of(&["  a", "b"]);
        let mut f = frame();
        f.cur = Position::new(1, 0);
        let mut regs = Registers::new();
        apply_operator_motion('=', 'l', 1, None, &mut f, &mut buf, Mode::Normal, &mut regs);
        assert_eq!(buf.text.line(1).unwrap().as_str_lossy(), "  b");
    }
}
