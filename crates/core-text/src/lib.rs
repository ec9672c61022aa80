//! Line-array text storage.
//!
//! A [`Text`] is a non-empty sequence of [`Line`]s. Positions are byte offsets;
//! this crate does no Unicode grapheme or width reasoning by design — a `col`
//! is simply an index into a line's raw byte vector.

use std::cmp::Ordering;

/// A `(line, col)` position in byte units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    pub const fn origin() -> Self {
        Self { line: 0, col: 0 }
    }
}

/// One line of text: no embedded `\n`, plus the bookkeeping bits the rest of
/// the editor hangs off a line (breakpoints, fold/hide state, the cached
/// highlight state, and a per-line dirty flag consulted by the highlighter).
#[derive(Debug, Clone, Default)]
pub struct Line {
    bytes: Vec<u8>,
    pub breakpoint: bool,
    pub hidden: bool,
    pub dirty: bool,
    /// Packed highlight state left behind by the last highlight pass over
    /// this line; low 8 bits are the current state, higher bytes are a stack
    /// of suspended states (see `core-highlight`).
    pub hl_state: u64,
}

impl Line {
    pub fn new(bytes: Vec<u8>) -> Self {
        debug_assert!(!bytes.contains(&b'\n'));
        Self {
            bytes,
            breakpoint: false,
            hidden: false,
            dirty: true,
            hl_state: 0,
        }
    }

    pub fn from_str(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Number of leading blank bytes (`' '` or `'\t'`).
    pub fn indent(&self) -> usize {
        self.bytes
            .iter()
            .take_while(|&&b| b == b' ' || b == b'\t')
            .count()
    }
}

/// A line of raw bytes used to stage insertions, deletions, and segment
/// payloads; never contains `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLine(pub Vec<u8>);

impl RawLine {
    pub fn new(bytes: Vec<u8>) -> Self {
        debug_assert!(!bytes.contains(&b'\n'));
        Self(bytes)
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&Line> for RawLine {
    fn from(line: &Line) -> Self {
        RawLine(line.bytes.clone())
    }
}

/// Resolves `to == num_lines` ("through end of buffer") to the true last
/// position, and swaps `from`/`to` if given in reverse order.
fn normalize_range(text: &Text, mut from: Position, mut to: Position) -> (Position, Position) {
    if from > to {
        std::mem::swap(&mut from, &mut to);
    }
    let last = text.lines.len() - 1;
    if to.line >= text.lines.len() {
        to = Position::new(last, text.lines[last].len());
    }
    from.line = from.line.min(last);
    from.col = from.col.min(text.lines[from.line].len());
    to.col = to.col.min(text.lines[to.line].len());
    (from, to)
}

/// Ordered, non-empty sequence of lines.
#[derive(Debug, Clone)]
pub struct Text {
    lines: Vec<Line>,
}

impl Default for Text {
    fn default() -> Self {
        Self::new()
    }
}

impl Text {
    pub fn new() -> Self {
        Self {
            lines: vec![Line::default()],
        }
    }

    pub fn from_raw_lines(lines: Vec<RawLine>) -> Self {
        let lines = if lines.is_empty() {
            vec![Line::default()]
        } else {
            lines.into_iter().map(|r| Line::new(r.0)).collect()
        };
        Self { lines }
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, i: usize) -> Option<&Line> {
        self.lines.get(i)
    }

    pub fn line_mut(&mut self, i: usize) -> Option<&mut Line> {
        self.lines.get_mut(i)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn clamp(&self, pos: Position) -> Position {
        let line = pos.line.min(self.lines.len() - 1);
        let col = pos.col.min(self.lines[line].len());
        Position::new(line, col)
    }

    /// `insert_range` — inserts `src` `repeat` times starting at `pos`.
    ///
    /// When `src` is a single line, its bytes are spliced into the line at
    /// `pos.col`. Otherwise the first source line is appended to the prefix
    /// of the line at `pos`, the remaining source lines (minus the last) are
    /// inserted as whole new lines, and the last source line is prefixed to
    /// the suffix of the original line at `pos`.
    pub fn insert_range(&mut self, pos: Position, src: &[RawLine], repeat: usize) -> Position {
        if src.is_empty() || repeat == 0 {
            return pos;
        }
        let pos = self.clamp(pos);
        let mut end = pos;
        for _ in 0..repeat {
            end = self.insert_once(end, src);
        }
        for l in pos.line..=end.line.min(self.lines.len() - 1) {
            self.lines[l].dirty = true;
        }
        end
    }

    fn insert_once(&mut self, pos: Position, src: &[RawLine]) -> Position {
        if src.len() == 1 {
            let line = &mut self.lines[pos.line];
            let mut bytes = line.bytes.clone();
            bytes.splice(pos.col..pos.col, src[0].0.iter().copied());
            line.bytes = bytes;
            line.dirty = true;
            return Position::new(pos.line, pos.col + src[0].len());
        }
        let old = self.lines[pos.line].bytes.clone();
        let prefix = &old[..pos.col];
        let suffix = &old[pos.col..];

        let mut first = prefix.to_vec();
        first.extend_from_slice(&src[0].0);
        self.lines[pos.line] = Line::new(first);

        let mut last = src[src.len() - 1].0.clone();
        last.extend_from_slice(suffix);
        let last_col = src[src.len() - 1].len();

        let middle: Vec<Line> = src[1..src.len() - 1]
            .iter()
            .map(|r| Line::new(r.0.clone()))
            .collect();
        let n_middle = middle.len();
        self.lines.splice(pos.line + 1..pos.line + 1, middle);
        self.lines
            .insert(pos.line + 1 + n_middle, Line::new(last));

        Position::new(pos.line + 1 + n_middle, last_col)
    }

    /// `insert_block` — rectangular insert: pads short target lines with
    /// spaces up to `pos.col`, then splices the matching source row.
    pub fn insert_block(&mut self, pos: Position, src: &[RawLine], repeat: usize) -> Position {
        if src.is_empty() || repeat == 0 {
            return pos;
        }
        let pos = self.clamp_line_only(pos);
        let needed = pos.line + src.len();
        if needed > self.lines.len() {
            self.lines.resize_with(needed, || Line::new(Vec::new()));
        }
        for _ in 0..repeat {
            for (i, row) in src.iter().enumerate() {
                let line = &mut self.lines[pos.line + i];
                if pos.col > line.len() {
                    line.bytes.resize(pos.col, b' ');
                }
                line.bytes.splice(pos.col..pos.col, row.0.iter().copied());
                line.dirty = true;
            }
        }
        Position::new(
            pos.line + src.len() - 1,
            pos.col + src.last().map(RawLine::len).unwrap_or(0) * repeat,
        )
    }

    fn clamp_line_only(&self, pos: Position) -> Position {
        Position::new(pos.line.min(self.lines.len() - 1), pos.col)
    }

    /// `delete_range` — clips and orders `from`/`to`, joins the boundary
    /// lines, drops any rows strictly between them, and returns the removed
    /// text.
    pub fn delete_range(&mut self, from: Position, to: Position) -> Vec<RawLine> {
        let (from, to) = normalize_range(self, from, to);
        if from == to {
            return Vec::new();
        }
        if from.line == to.line {
            let line = &mut self.lines[from.line];
            let removed: Vec<u8> = line.bytes.splice(from.col..to.col, []).collect();
            line.dirty = true;
            return vec![RawLine(removed)];
        }

        let mut removed = Vec::with_capacity(to.line - from.line + 1);
        let first = &self.lines[from.line];
        removed.push(RawLine(first.bytes[from.col..].to_vec()));
        for l in (from.line + 1)..to.line {
            removed.push(RawLine(self.lines[l].bytes.clone()));
        }
        let last = &self.lines[to.line];
        removed.push(RawLine(last.bytes[..to.col].to_vec()));

        let mut joined = self.lines[from.line].bytes[..from.col].to_vec();
        joined.extend_from_slice(&self.lines[to.line].bytes[to.col..]);
        self.lines.drain(from.line..=to.line);
        self.lines.insert(from.line, Line::new(joined));

        removed
    }

    /// `delete_block` — per row in `[from.line, to.line]`, deletes
    /// `[from.col, to.col]` clamped to that row's length (padding rows are a
    /// no-op, matching the insert side's padding behavior).
    pub fn delete_block(&mut self, from: Position, to: Position) -> Vec<RawLine> {
        let (mut lo, mut hi) = (from, to);
        if lo.line > hi.line {
            std::mem::swap(&mut lo, &mut hi);
        }
        let (mut c0, mut c1) = (from.col, to.col);
        if c0 > c1 {
            std::mem::swap(&mut c0, &mut c1);
        }
        let hi_line = hi.line.min(self.lines.len() - 1);
        let mut removed = Vec::with_capacity(hi_line - lo.line + 1);
        for l in lo.line..=hi_line {
            let line = &mut self.lines[l];
            let len = line.len();
            if c0 >= len {
                removed.push(RawLine::default());
                continue;
            }
            let end = c1.min(len);
            let bytes: Vec<u8> = line.bytes.splice(c0..end, []).collect();
            line.dirty = true;
            removed.push(RawLine(bytes));
        }
        removed
    }

    /// Per-byte transform over `[from, to)`; returns the XOR delta between
    /// old and new bytes (self-inverse — reapplying it undoes the change).
    pub fn change_range(
        &mut self,
        from: Position,
        to: Position,
        conv: impl Fn(u8) -> u8,
    ) -> Vec<RawLine> {
        let (from, to) = normalize_range(self, from, to);
        if from == to {
            return Vec::new();
        }
        let mut deltas = Vec::new();
        if from.line == to.line {
            let line = &mut self.lines[from.line];
            let mut delta = vec![0u8; to.col - from.col];
            for (k, i) in (from.col..to.col).enumerate() {
                let old = line.bytes[i];
                let new = conv(old);
                delta[k] = old ^ new;
                line.bytes[i] = new;
            }
            line.dirty = true;
            deltas.push(RawLine(delta));
            return deltas;
        }
        {
            let line = &mut self.lines[from.line];
            let mut delta = vec![0u8; line.len() - from.col];
            for (k, i) in (from.col..line.len()).enumerate() {
                let old = line.bytes[i];
                let new = conv(old);
                delta[k] = old ^ new;
                line.bytes[i] = new;
            }
            line.dirty = true;
            deltas.push(RawLine(delta));
        }
        for l in (from.line + 1)..to.line {
            let line = &mut self.lines[l];
            let mut delta = vec![0u8; line.len()];
            for (k, b) in line.bytes.iter_mut().enumerate() {
                let new = conv(*b);
                delta[k] = *b ^ new;
                *b = new;
            }
            line.dirty = true;
            deltas.push(RawLine(delta));
        }
        {
            let line = &mut self.lines[to.line];
            let mut delta = vec![0u8; to.col];
            for (k, i) in (0..to.col).enumerate() {
                let old = line.bytes[i];
                let new = conv(old);
                delta[k] = old ^ new;
                line.bytes[i] = new;
            }
            line.dirty = true;
            deltas.push(RawLine(delta));
        }
        deltas
    }

    /// Per-byte transform over a rectangular block; returns the XOR deltas,
    /// one `RawLine` per affected row.
    pub fn change_block(
        &mut self,
        from: Position,
        to: Position,
        conv: impl Fn(u8) -> u8,
    ) -> Vec<RawLine> {
        let (mut lo, mut hi) = (from, to);
        if lo.line > hi.line {
            std::mem::swap(&mut lo, &mut hi);
        }
        let (mut c0, mut c1) = (from.col, to.col);
        if c0 > c1 {
            std::mem::swap(&mut c0, &mut c1);
        }
        let hi_line = hi.line.min(self.lines.len() - 1);
        let mut deltas = Vec::with_capacity(hi_line - lo.line + 1);
        for l in lo.line..=hi_line {
            let line = &mut self.lines[l];
            let len = line.len();
            let end = c1.min(len);
            if c0 >= end {
                deltas.push(RawLine::default());
                continue;
            }
            let mut delta = vec![0u8; end - c0];
            for (k, i) in (c0..end).enumerate() {
                let old = line.bytes[i];
                let new = conv(old);
                delta[k] = old ^ new;
                line.bytes[i] = new;
            }
            line.dirty = true;
            deltas.push(RawLine(delta));
        }
        deltas
    }

    pub fn get_range(&self, from: Position, to: Position) -> Vec<RawLine> {
        let (from, to) = normalize_range(self, from, to);
        if from == to {
            return Vec::new();
        }
        if from.line == to.line {
            return vec![RawLine(
                self.lines[from.line].bytes[from.col..to.col].to_vec(),
            )];
        }
        let mut out = Vec::with_capacity(to.line - from.line + 1);
        out.push(RawLine(self.lines[from.line].bytes[from.col..].to_vec()));
        for l in (from.line + 1)..to.line {
            out.push(RawLine(self.lines[l].bytes.clone()));
        }
        out.push(RawLine(self.lines[to.line].bytes[..to.col].to_vec()));
        out
    }

    pub fn get_block(&self, from: Position, to: Position) -> Vec<RawLine> {
        let (mut lo, mut hi) = (from, to);
        if lo.line > hi.line {
            std::mem::swap(&mut lo, &mut hi);
        }
        let (mut c0, mut c1) = (from.col, to.col);
        if c0 > c1 {
            std::mem::swap(&mut c0, &mut c1);
        }
        let hi_line = hi.line.min(self.lines.len().saturating_sub(1));
        let mut out = Vec::with_capacity(hi_line - lo.line + 1);
        for l in lo.line..=hi_line {
            let line = &self.lines[l];
            let len = line.len();
            if c0 >= len {
                out.push(RawLine::default());
                continue;
            }
            let end = c1.min(len);
            out.push(RawLine(line.bytes[c0..end].to_vec()));
        }
        out
    }

    /// Breaks the line at `pos` into two: the suffix from `pos.col` becomes a
    /// new line immediately after.
    pub fn break_line(&mut self, pos: Position) -> Position {
        let pos = self.clamp(pos);
        let suffix = self.lines[pos.line].bytes.split_off(pos.col);
        self.lines[pos.line].dirty = true;
        self.lines.insert(pos.line + 1, Line::new(suffix));
        Position::new(pos.line + 1, 0)
    }

    /// Tiles `src` `count` times into a freestanding sequence of lines.
    pub fn repeat_text(src: &[RawLine], count: usize) -> Vec<RawLine> {
        let mut out = Vec::with_capacity(src.len() * count.max(1));
        for _ in 0..count {
            out.extend(src.iter().cloned());
        }
        out
    }

    /// Tiles `src` `count` times, padding short tiles with spaces so the
    /// result stays rectangular.
    pub fn repeat_text_block(src: &[RawLine], count: usize) -> Vec<RawLine> {
        let width = src.iter().map(RawLine::len).max().unwrap_or(0);
        let mut out = Vec::with_capacity(src.len());
        for row in src {
            let mut tile = row.0.clone();
            tile.resize(width, b' ');
            let mut bytes = Vec::with_capacity(tile.len() * count);
            for _ in 0..count {
                bytes.extend_from_slice(&tile);
            }
            out.push(RawLine(bytes));
        }
        out
    }
}

/// Mode-aware effective end-of-line column: normal mode treats the last byte
/// as the cursor ceiling, insert/visual modes allow one-past-end.
pub fn mode_line_end(line_len: usize, insert_like: bool) -> usize {
    if insert_like {
        line_len
    } else {
        line_len.saturating_sub(1)
    }
}

pub fn positions_ordered(a: Position, b: Position) -> Ordering {
    a.cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(lines: &[&str]) -> Text {
        Text::from_raw_lines(lines.iter().map(|s| RawLine::from_str(s)).collect())
    }

    fn as_strings(t: &Text) -> Vec<String> {
        t.lines()
            .iter()
            .map(|l| l.as_str_lossy().into_owned())
            .collect()
    }

    #[test]
    fn insert_and_undo_scenario() {
        let mut t = Text::new();
        let src = vec![RawLine::from_str("abc"), RawLine::from_str("de")];
        let end = t.insert_range(Position::origin(), &src, 1);
        assert_eq!(as_strings(&t), vec!["abc", "de"]);
        assert_eq!(end, Position::new(1, 2));
        let removed = t.delete_range(Position::origin(), end);
        assert_eq!(as_strings(&t), vec![""]);
        assert_eq!(removed, src);
        t.insert_range(Position::origin(), &removed, 1);
        assert_eq!(as_strings(&t), vec!["abc", "de"]);
    }

    #[test]
    fn multiline_join_via_delete_range() {
        let mut t = text_of(&["hello", "world"]);
        let removed = t.delete_range(Position::new(0, 3), Position::new(1, 2));
        assert_eq!(as_strings(&t), vec!["helrld"]);
        assert_eq!(
            removed,
            vec![RawLine::from_str("lo"), RawLine::from_str("wo")]
        );
        t.insert_range(Position::new(0, 3), &removed, 1);
        assert_eq!(as_strings(&t), vec!["hello", "world"]);
    }

    #[test]
    fn block_insert_with_padding() {
        let mut t = text_of(&["a", "bb", "ccc"]);
        let src = vec![
            RawLine::from_str("X"),
            RawLine::from_str("X"),
            RawLine::from_str("X"),
        ];
        t.insert_block(Position::new(0, 2), &src, 1);
        assert_eq!(as_strings(&t), vec!["a X", "bbX", "ccX"]);
    }

    #[test]
    fn delete_block_pads_with_noop_on_short_rows() {
        let mut t = text_of(&["abcdef", "ab", "abcdef"]);
        let removed = t.delete_block(Position::new(0, 2), Position::new(2, 4));
        assert_eq!(as_strings(&t), vec!["abef", "ab", "abef"]);
        assert_eq!(removed[1], RawLine::default());
    }

    #[test]
    fn to_equal_num_lines_means_through_end_of_buffer() {
        let mut t = text_of(&["one", "two", "three"]);
        let removed = t.delete_range(Position::new(0, 0), Position::new(3, 0));
        assert_eq!(as_strings(&t), vec![""]);
        assert_eq!(removed.len(), 3);
    }

    #[test]
    fn change_range_xor_delta_is_self_inverse() {
        let mut t = text_of(&["hello"]);
        let delta = t.change_range(Position::new(0, 0), Position::new(0, 5), |b| {
            b.to_ascii_uppercase()
        });
        assert_eq!(as_strings(&t), vec!["HELLO"]);
        let line = t.line_mut(0).unwrap();
        for (i, d) in delta[0].0.iter().enumerate() {
            line.bytes_mut_for_test()[i] ^= d;
        }
        assert_eq!(as_strings(&t), vec!["hello"]);
    }

    #[test]
    fn break_line_at_end_creates_trailing_empty_line() {
        let mut t = text_of(&["abc"]);
        t.break_line(Position::new(0, 3));
        assert_eq!(as_strings(&t), vec!["abc", ""]);
    }

    #[test]
    fn empty_range_is_noop() {
        let mut t = text_of(&["abc"]);
        let removed = t.delete_range(Position::new(0, 1), Position::new(0, 1));
        assert!(removed.is_empty());
        assert_eq!(as_strings(&t), vec!["abc"]);
    }

    #[test]
    fn repeat_text_block_pads_short_tiles() {
        let src = vec![RawLine::from_str("ab"), RawLine::from_str("c")];
        let out = Text::repeat_text_block(&src, 2);
        assert_eq!(out[0].0, b"abab");
        assert_eq!(out[1].0, b"c c ");
    }
}

#[cfg(test)]
impl Line {
    fn bytes_mut_for_test(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}
