//! Direct Insert-mode key handling. Insert mode bypasses the normal-mode
//! keymap trie entirely (every printable key is itself, not a command), so
//! the dispatcher routes `KeyEvent`s here instead of through `core-keymap`.
//!
//! Each typed character is recorded as its own insertion event with
//! `transient = false`; `core_state::undo`'s `should_join` already collapses
//! consecutive position-adjacent insertions into one undo step, so a whole
//! typed word undoes as a unit without this module tracking "last keystroke"
//! itself.

use core_model::Frame;
use core_state::Buffer;
use core_text::{Position, RawLine};

pub fn insert_char(frame: &mut Frame, buf: &mut Buffer, ch: char) {
    let cursor_before = frame.cur;
    let mut bytes = [0u8; 4];
    let encoded = ch.encode_utf8(&mut bytes);
    let end = buf.insert_range(
        frame.cur,
        &[RawLine::from_str(encoded)],
        1,
        cursor_before,
        false,
    );
    frame.cur = end;
    frame.vct = frame.cur.col;
}

/// Splits the line at the cursor. `carry_indent` reproduces the leading
/// whitespace of the line being split onto the new line (used by typed
/// `Enter`, not by the `o`/`O` composite commands which indent explicitly).
pub fn insert_newline(frame: &mut Frame, buf: &mut Buffer, carry_indent: bool) {
    let cursor_before = frame.cur;
    let split_line = frame.cur.line;
    let new_pos = buf.break_line(frame.cur, cursor_before, false);
    frame.cur = new_pos;
    if carry_indent {
        let indent = buf.line_indent(split_line);
        if indent > 0 {
            let pad = RawLine::from_str(&" ".repeat(indent));
            let end = buf.insert_range(frame.cur, &[pad], 1, frame.cur, true);
            frame.cur = end;
        }
    }
    frame.vct = frame.cur.col;
}

/// `Backspace`: deletes one byte before the cursor, joining into the
/// previous line at column end if the cursor sits at column 0.
pub fn backspace(frame: &mut Frame, buf: &mut Buffer) {
    let cursor_before = frame.cur;
    let to = frame.cur;
    let from = if to.col > 0 {
        Position::new(to.line, to.col - 1)
    } else if to.line > 0 {
        let prev_len = buf.text.line(to.line - 1).map(|l| l.len()).unwrap_or(0);
        Position::new(to.line - 1, prev_len)
    } else {
        return;
    };
    buf.delete_range(from, to, cursor_before, from, false);
    frame.cur = from;
    frame.vct = frame.cur.col;
}

/// `Delete`: removes one byte at (not before) the cursor.
pub fn delete_forward(frame: &mut Frame, buf: &mut Buffer) {
    let cursor_before = frame.cur;
    let from = frame.cur;
    let line_len = buf.text.line(from.line).map(|l| l.len()).unwrap_or(0);
    let to = if from.col < line_len {
        Position::new(from.line, from.col + 1)
    } else if from.line + 1 < buf.text.num_lines() {
        Position::new(from.line + 1, 0)
    } else {
        return;
    };
    buf.delete_range(from, to, cursor_before, from, false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::LayoutRegion;

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
    fn typed_characters_join_as_one_undo_step() {
        let mut buf = buf_of(&[""]);
        let mut f = frame();
        for ch in ['f', 'o', 'o'] {
            insert_char(&mut f, &mut buf, ch);
        }
        assert_eq!(buf.text.line(0).unwrap().as_str_lossy(), "foo");
        buf.undo();
        assert_eq!(buf.text.line(0).unwrap().as_str_lossy(), "");
    }

    #[test]
    fn enter_carries_indent_forward() {
        let mut buf = buf_of(&["  abc"]);
        let mut f = frame();
        f.cur = Position::new(0, 5);
        insert_newline(&mut f, &mut buf, true);
        assert_eq!(buf.text.line(1).unwrap().as_str_lossy(), "  ");
        assert_eq!(f.cur, Position::new(1, 2));
    }

    #[test]
    fn backspace_at_line_start_joins_previous_line() {
        let mut buf = buf_of(&["ab", "cd"]);
        let mut f = frame();
        f.cur = Position::new(1, 0);
        backspace(&mut f, &mut buf);
        assert_eq!(buf.text.num_lines(), 1);
        assert_eq!(buf.text.line(0).unwrap().as_str_lossy(), "abcd");
        assert_eq!(f.cur, Position::new(0, 2));
    }
}
