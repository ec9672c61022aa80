//! A small regex dialect over line-structured text.
//!
//! Parses into a tree of concat/alternation/repeat/group nodes with literal
//! leaves carrying a 256-bit character set, then matches with an explicit
//! backtracking stack (no recursion, so pathological patterns fail by
//! running out of time rather than blowing the native stack).

use core_text::{Position, Text};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegexError {
    #[error("unterminated character class")]
    UnterminatedClass,
    #[error("unterminated group")]
    UnterminatedGroup,
    #[error("unexpected ')'")]
    UnmatchedCloseParen,
    #[error("trailing backslash")]
    TrailingEscape,
    #[error("empty pattern")]
    Empty,
}

/// A 256-bit set of bytes, stored as 16 16-bit words (mirrors the original
/// dialect's `struct char_set`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharSet([u16; 16]);

impl CharSet {
    pub fn empty() -> Self {
        Self([0; 16])
    }

    pub fn set(&mut self, ch: u8) {
        self.0[(ch >> 4) as usize] |= 1 << (ch & 0xf);
    }

    pub fn unset(&mut self, ch: u8) {
        self.0[(ch >> 4) as usize] &= !(1 << (ch & 0xf));
    }

    pub fn contains(&self, ch: u8) -> bool {
        self.0[(ch >> 4) as usize] & (1 << (ch & 0xf)) != 0
    }

    pub fn invert(&mut self) {
        for word in &mut self.0 {
            *word ^= 0xffff;
        }
    }

    fn set_range(&mut self, lo: u8, hi: u8) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        for c in lo..=hi {
            self.set(c);
        }
    }

    fn any_byte_except_newline() -> Self {
        let mut s = Self([0xffff; 16]);
        s.unset(b'\n');
        s
    }

    fn digits() -> Self {
        let mut s = Self::empty();
        s.set_range(b'0', b'9');
        s
    }

    /// `\k`/`\K`: identifier characters — alnum plus underscore.
    fn identifier_chars() -> Self {
        let mut s = Self::digits();
        s.set_range(b'a', b'z');
        s.set_range(b'A', b'Z');
        s.set(b'_');
        s
    }

    fn whitespace() -> Self {
        let mut s = Self::empty();
        for c in [b' ', 0x0c, b'\t', 0x0b] {
            s.set(c);
        }
        s
    }

    /// `\w`/`\W`: alphabetic only (matches the dialect's own definition,
    /// distinct from `\k`'s inclusion of digits and `_`).
    fn alpha() -> Self {
        let mut s = Self::empty();
        s.set_range(b'a', b'z');
        s.set_range(b'A', b'Z');
        s
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    /// Zero-width node that always matches (empty alternative/concat).
    Empty,
    Lit(CharSet),
    WordStart,
    WordEnd,
    LineStart,
    LineEnd,
    Concat,
    Alt,
    Repeat { min: u32, max: u32 },
    Group,
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    kind: NodeKind,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

/// A compiled pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Regex {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Regex {
    pub fn compile(pattern: &str) -> Result<Self, RegexError> {
        let mut p = Parser {
            bytes: pattern.as_bytes(),
            pos: 0,
            nodes: Vec::new(),
        };
        let root = p.parse_alt()?;
        if p.pos != p.bytes.len() {
            if p.bytes[p.pos] == b')' {
                return Err(RegexError::UnmatchedCloseParen);
            }
        }
        Ok(Regex {
            nodes: p.nodes,
            root,
        })
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Attempts a match anchored exactly at `start`; returns the end
    /// position on success.
    pub fn match_at(&self, text: &Text, start: Position) -> Option<Position> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut cur: Option<NodeId> = Some(self.root);
        let mut pos = start;

        loop {
            let Some(id) = cur else {
                return Some(pos);
            };
            let node = self.node(id);
            let mut failed = false;
            match &node.kind {
                NodeKind::Empty => {}
                NodeKind::Concat | NodeKind::Alt | NodeKind::Repeat { .. } | NodeKind::Group => {
                    stack.push(Frame {
                        node: id,
                        pos,
                        times: 0,
                    });
                    cur = node.left;
                    continue;
                }
                NodeKind::WordStart => {
                    let Some(line) = text.line(pos.line) else {
                        return None;
                    };
                    let n = line.len();
                    let at_word = pos.col < n && is_word_byte(line.as_bytes()[pos.col]);
                    let prev_word = pos.col > 0 && is_word_byte(line.as_bytes()[pos.col - 1]);
                    if !at_word || prev_word {
                        failed = true;
                    }
                }
                NodeKind::WordEnd => {
                    let Some(line) = text.line(pos.line) else {
                        return None;
                    };
                    let n = line.len();
                    if pos.col == n || pos.col == 0 {
                        failed = true;
                    } else {
                        let at_word = is_word_byte(line.as_bytes()[pos.col]);
                        let prev_word = is_word_byte(line.as_bytes()[pos.col - 1]);
                        if at_word || !prev_word {
                            failed = true;
                        }
                    }
                }
                NodeKind::LineStart => {
                    if pos.col > 0 {
                        failed = true;
                    }
                }
                NodeKind::LineEnd => {
                    let Some(line) = text.line(pos.line) else {
                        return None;
                    };
                    if pos.col < line.len() {
                        failed = true;
                    }
                }
                NodeKind::Lit(set) => {
                    let Some(line) = text.line(pos.line) else {
                        return None;
                    };
                    let n = line.len();
                    if pos.col == n {
                        if pos.line + 1 < text.num_lines() && set.contains(b'\n') {
                            pos = Position::new(pos.line + 1, 0);
                        } else {
                            failed = true;
                        }
                    } else if set.contains(line.as_bytes()[pos.col]) {
                        pos.col += 1;
                    } else {
                        failed = true;
                    }
                }
            }

            if failed {
                match self.pop_fail(&mut stack, &mut pos) {
                    Some(next) => cur = Some(next),
                    None => return None,
                }
            } else {
                cur = self.pop_success(&mut stack, &mut pos);
            }
        }
    }

    /// Continuation after a leaf matched: walks the stack outward, resuming
    /// a concat's right branch, retrying a repeat body, or falling through
    /// transparent alt/group frames.
    fn pop_success(&self, stack: &mut Vec<Frame>, pos: &mut Position) -> Option<NodeId> {
        while let Some(frame) = stack.pop() {
            let node = self.node(frame.node);
            match &node.kind {
                NodeKind::Alt | NodeKind::Group => continue,
                NodeKind::Concat => return node.right,
                NodeKind::Repeat { max, .. } => {
                    let times = frame.times + 1;
                    if (times as u64) < *max as u64 {
                        stack.push(Frame {
                            node: frame.node,
                            pos: *pos,
                            times,
                        });
                        return node.left;
                    }
                }
                _ => return Some(frame.node),
            }
        }
        None
    }

    /// Continuation after a leaf failed: pops frames looking for a
    /// backtrackable alternative (untried alt branch, or a repeat that has
    /// already met its minimum and can stop).
    fn pop_fail(&self, stack: &mut Vec<Frame>, pos: &mut Position) -> Option<NodeId> {
        while let Some(frame) = stack.pop() {
            let node = self.node(frame.node);
            match &node.kind {
                NodeKind::Alt => {
                    *pos = frame.pos;
                    return node.right;
                }
                NodeKind::Repeat { min, .. } => {
                    if frame.times < *min {
                        continue;
                    }
                    *pos = frame.pos;
                    return self.pop_success(stack, pos);
                }
                _ => continue,
            }
        }
        None
    }

    /// Scans the whole text, returning non-overlapping matches in order.
    pub fn find_all(&self, text: &Text) -> Vec<(Position, Position)> {
        let mut out = Vec::new();
        let mut line = 0usize;
        let mut col = 0usize;
        while line < text.num_lines() {
            let len = text.line(line).map(|l| l.len()).unwrap_or(0);
            if col > len {
                line += 1;
                col = 0;
                continue;
            }
            let start = Position::new(line, col);
            if let Some(end) = self.match_at(text, start) {
                out.push((start, end));
                if end == start {
                    col += 1;
                } else {
                    line = end.line;
                    col = end.col;
                }
            } else {
                col += 1;
            }
            if col > len {
                line += 1;
                col = 0;
            }
        }
        out
    }
}

struct Frame {
    node: NodeId,
    pos: Position,
    times: u32,
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    nodes: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn push(&mut self, kind: NodeKind, left: Option<NodeId>, right: Option<NodeId>) -> NodeId {
        self.nodes.push(Node { kind, left, right });
        self.nodes.len() - 1
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn parse_alt(&mut self) -> Result<NodeId, RegexError> {
        let first = self.parse_concat()?;
        if self.peek() != Some(b'|') {
            return Ok(first);
        }
        self.bump();
        let rest = self.parse_alt()?;
        Ok(self.push(NodeKind::Alt, Some(first), Some(rest)))
    }

    fn parse_concat(&mut self) -> Result<NodeId, RegexError> {
        let mut items = Vec::new();
        while let Some(b) = self.peek() {
            if b == b'|' || b == b')' {
                break;
            }
            items.push(self.parse_postfix()?);
        }
        if items.is_empty() {
            return Ok(self.push(NodeKind::Empty, None, None));
        }
        let mut node = items.pop().unwrap();
        while let Some(prev) = items.pop() {
            node = self.push(NodeKind::Concat, Some(prev), Some(node));
        }
        Ok(node)
    }

    fn parse_postfix(&mut self) -> Result<NodeId, RegexError> {
        let mut node = self.parse_primary()?;
        loop {
            let (min, max) = match self.peek() {
                Some(b'*') => (0u32, u32::MAX),
                Some(b'+') => (1u32, u32::MAX),
                Some(b'?') => (0u32, 1u32),
                _ => break,
            };
            self.bump();
            node = self.push(NodeKind::Repeat { min, max }, Some(node), None);
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<NodeId, RegexError> {
        match self.bump() {
            Some(b'(') => {
                let inner = self.parse_alt()?;
                if self.bump() != Some(b')') {
                    return Err(RegexError::UnterminatedGroup);
                }
                Ok(self.push(NodeKind::Group, Some(inner), None))
            }
            Some(b'[') => {
                let set = self.parse_class()?;
                Ok(self.push(NodeKind::Lit(set), None, None))
            }
            Some(b'.') => Ok(self.push(
                NodeKind::Lit(CharSet::any_byte_except_newline()),
                None,
                None,
            )),
            Some(b'^') => Ok(self.push(NodeKind::LineStart, None, None)),
            Some(b'$') => Ok(self.push(NodeKind::LineEnd, None, None)),
            Some(b'\\') => self.parse_escape(),
            Some(c) => {
                let mut set = CharSet::empty();
                set.set(c);
                Ok(self.push(NodeKind::Lit(set), None, None))
            }
            None => Err(RegexError::Empty),
        }
    }

    fn parse_escape(&mut self) -> Result<NodeId, RegexError> {
        let c = self.bump().ok_or(RegexError::TrailingEscape)?;
        match c {
            b'<' => Ok(self.push(NodeKind::WordStart, None, None)),
            b'>' => Ok(self.push(NodeKind::WordEnd, None, None)),
            b'd' => Ok(self.push(NodeKind::Lit(CharSet::digits()), None, None)),
            b'D' => {
                let mut s = CharSet::digits();
                s.invert();
                Ok(self.push(NodeKind::Lit(s), None, None))
            }
            b'k' => Ok(self.push(NodeKind::Lit(CharSet::identifier_chars()), None, None)),
            b'K' => {
                let mut s = CharSet::identifier_chars();
                s.invert();
                Ok(self.push(NodeKind::Lit(s), None, None))
            }
            b's' => Ok(self.push(NodeKind::Lit(CharSet::whitespace()), None, None)),
            b'S' => {
                let mut s = CharSet::whitespace();
                s.invert();
                Ok(self.push(NodeKind::Lit(s), None, None))
            }
            b'w' => Ok(self.push(NodeKind::Lit(CharSet::alpha()), None, None)),
            b'W' => {
                let mut s = CharSet::alpha();
                s.invert();
                Ok(self.push(NodeKind::Lit(s), None, None))
            }
            b'x' => self.parse_hex_sequence(2),
            b'u' => self.parse_hex_sequence(4),
            b'U' => self.parse_hex_sequence(8),
            other => {
                let mut set = CharSet::empty();
                set.set(unescape(other));
                Ok(self.push(NodeKind::Lit(set), None, None))
            }
        }
    }

    /// Reads up to `digits` hex nibbles, grouping pairs into raw bytes
    /// (so `\uHHHH` yields two literal bytes concatenated), matching the
    /// dialect's treatment of unicode escapes as raw byte sequences rather
    /// than UTF-8 encoding.
    fn parse_hex_sequence(&mut self, digits: usize) -> Result<NodeId, RegexError> {
        let mut nibbles = Vec::with_capacity(digits);
        for _ in 0..digits {
            match self.peek().and_then(hex_value) {
                Some(v) => {
                    nibbles.push(v);
                    self.bump();
                }
                None => break,
            }
        }
        if nibbles.is_empty() {
            let mut set = CharSet::empty();
            set.set(b'x');
            return Ok(self.push(NodeKind::Lit(set), None, None));
        }
        if nibbles.len() % 2 == 1 {
            nibbles.insert(0, 0);
        }
        let bytes: Vec<u8> = nibbles.chunks(2).map(|c| (c[0] << 4) | c[1]).collect();
        let mut node = {
            let mut set = CharSet::empty();
            set.set(bytes[0]);
            self.push(NodeKind::Lit(set), None, None)
        };
        for &b in &bytes[1..] {
            let mut set = CharSet::empty();
            set.set(b);
            let lit = self.push(NodeKind::Lit(set), None, None);
            node = self.push(NodeKind::Concat, Some(node), Some(lit));
        }
        Ok(node)
    }

    fn parse_class(&mut self) -> Result<CharSet, RegexError> {
        let mut set = CharSet::empty();
        let negate = self.peek() == Some(b'^');
        if negate {
            self.bump();
        }
        let mut first = true;
        let mut pending: Option<u8> = None;
        loop {
            match self.peek() {
                None => return Err(RegexError::UnterminatedClass),
                Some(b']') if !first => {
                    self.bump();
                    break;
                }
                Some(b) => {
                    first = false;
                    self.bump();
                    let literal = if b == b'\\' {
                        self.bump().map(unescape).ok_or(RegexError::TrailingEscape)?
                    } else {
                        b
                    };
                    if literal == b'-' && pending.is_some() && self.peek() != Some(b']') {
                        let hi = match self.bump() {
                            Some(b'\\') => {
                                self.bump().map(unescape).ok_or(RegexError::TrailingEscape)?
                            }
                            Some(h) => h,
                            None => return Err(RegexError::UnterminatedClass),
                        };
                        set.set_range(pending.take().unwrap(), hi);
                    } else {
                        if let Some(p) = pending.take() {
                            set.set(p);
                        }
                        pending = Some(literal);
                    }
                }
            }
        }
        if let Some(p) = pending {
            set.set(p);
        }
        if negate {
            set.invert();
        }
        Ok(set)
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn unescape(c: u8) -> u8 {
    match c {
        b'0' => 0,
        b'a' => 0x07,
        b'b' => 0x08,
        b'f' => 0x0c,
        b'n' => b'\n',
        b'r' => b'\r',
        b'v' => 0x0b,
        b't' => b'\t',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::{RawLine, Text};

    fn text_of(lines: &[&str]) -> Text {
        Text::from_raw_lines(lines.iter().map(|s| RawLine::from_str(s)).collect())
    }

    #[test]
    fn word_boundary_scenario() {
        let text = text_of(&["int foo(int x);", "int bar(int y);"]);
        let re = Regex::compile(r"\<int\>").unwrap();
        let matches = re.find_all(&text);
        assert_eq!(
            matches,
            vec![
                (Position::new(0, 0), Position::new(0, 3)),
                (Position::new(0, 8), Position::new(0, 11)),
                (Position::new(1, 0), Position::new(1, 3)),
                (Position::new(1, 8), Position::new(1, 11)),
            ]
        );
    }

    #[test]
    fn alternation_and_repeat() {
        let text = text_of(&["cat dog catdog"]);
        let re = Regex::compile(r"(cat|dog)+").unwrap();
        let matches = re.find_all(&text);
        assert_eq!(matches[0], (Position::new(0, 0), Position::new(0, 3)));
        assert_eq!(matches[1], (Position::new(0, 4), Position::new(0, 7)));
        assert_eq!(matches[2], (Position::new(0, 8), Position::new(0, 14)));
    }

    #[test]
    fn character_class_with_range_and_negation() {
        let text = text_of(&["a1 b2 _3"]);
        let re = Regex::compile(r"[a-z][0-9]").unwrap();
        let matches = re.find_all(&text);
        assert_eq!(
            matches,
            vec![
                (Position::new(0, 0), Position::new(0, 2)),
                (Position::new(0, 3), Position::new(0, 5)),
            ]
        );
    }

    #[test]
    fn anchors_line_start_and_end() {
        let text = text_of(&["hello", "world"]);
        let re = Regex::compile(r"^world$").unwrap();
        let matches = re.find_all(&text);
        assert_eq!(matches, vec![(Position::new(1, 0), Position::new(1, 5))]);
    }

    #[test]
    fn matches_are_sorted_and_non_overlapping() {
        let text = text_of(&["aaaa"]);
        let re = Regex::compile(r"aa").unwrap();
        let matches = re.find_all(&text);
        assert_eq!(
            matches,
            vec![
                (Position::new(0, 0), Position::new(0, 2)),
                (Position::new(0, 2), Position::new(0, 4)),
            ]
        );
    }

    #[test]
    fn dot_matches_any_byte_except_newline() {
        let text = text_of(&["a.b"]);
        let re = Regex::compile(r"a.b").unwrap();
        assert!(re.match_at(&text, Position::origin()).is_some());
    }

    #[test]
    fn shorthand_classes() {
        let text = text_of(&["foo_1 bar"]);
        let re = Regex::compile(r"\k+").unwrap();
        let matches = re.find_all(&text);
        assert_eq!(matches[0], (Position::new(0, 0), Position::new(0, 5)));
    }

    #[test]
    fn unterminated_class_is_an_error() {
        assert_eq!(Regex::compile("[abc"), Err(RegexError::UnterminatedClass));
    }
}
