//! Incremental, per-line syntax highlighting driven by a stackable
//! byte-state machine.

pub mod lang_c;

use core_text::{Position, Text};
use std::collections::BTreeMap;

/// Semantic class attributed to a highlighted run. Color/attribute mapping
/// is a presentation concern left to the outer shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiClass {
    Normal,
    Identifier,
    Type,
    TypeMod,
    Keyword,
    Number,
    String,
    Char,
    Comment,
    Javadoc,
}

/// A contiguous attributed run on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub line: usize,
    pub from: usize,
    pub to: usize,
    pub class: HiClass,
}

/// State value a line ends on and (implicitly) resumes from. `0` is the
/// universal "not continuing" sentinel — any other value persists across the
/// line boundary, which is this crate's concrete rendering of the spec's
/// `FSTATE_MULTI` bit: a line only resumes mid-construct when its state
/// isn't back at rest.
pub const STATE_START: u8 = 0;

/// The low byte is live state; a nested nonzero state can be pushed above it
/// (string inside preprocessor, etc). `push`/`pop` treat the 64-bit value as
/// a byte stack, bounded to 7 levels of nesting (56 usable bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackedState(pub u64);

impl StackedState {
    pub const MAX_DEPTH: u32 = 7;

    pub fn current(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub fn is_resting(self) -> bool {
        self.current() == STATE_START
    }

    pub fn push(self, new_state: u8) -> Self {
        debug_assert!((self.0.leading_zeros() / 8) as u32 >= 1, "state stack overflow");
        Self((self.0 << 8) | new_state as u64)
    }

    pub fn pop(self) -> Self {
        Self(self.0 >> 8)
    }

    pub fn set(self, new_state: u8) -> Self {
        Self((self.0 & !0xff) | new_state as u64)
    }
}

/// What a dispatch call saw, as much as it needs to decide the run's class
/// and how many bytes it consumed.
pub struct StateCtx<'a> {
    pub s: &'a [u8],
    pub i: usize,
    pub n: usize,
}

/// A pluggable highlight language: one dispatch function per 8-bit state.
pub trait Language {
    /// Runs the handler for `state.current()`, returning the number of bytes
    /// consumed (driver enforces `max(consumed, 1)` forward progress), the
    /// class to attribute to that run, and the state to carry into the next
    /// dispatch (same line or, if at EOL, the next one).
    fn dispatch(&self, state: StackedState, ctx: &StateCtx) -> (usize, HiClass, StackedState);

    /// Called once per `({[`/`)}]` byte the language's runs flag as a paren;
    /// default languages don't opt into tracking, see [`lang_c`] for one
    /// that does via [`HighlightDriver::note_paren`].
    fn is_open_paren(&self, _b: u8) -> bool {
        false
    }

    fn is_close_paren(&self, _b: u8) -> bool {
        false
    }
}

/// Drives highlight passes for one buffer's worth of text and owns the
/// matching-paren table built up as a side effect of dispatch.
#[derive(Default)]
pub struct HighlightDriver {
    /// Position of an open paren -> position of its matching close, and the
    /// reverse direction, so lookup works from either side.
    parens: BTreeMap<Position, Position>,
}

impl HighlightDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching_paren(&self, pos: Position) -> Option<Position> {
        self.parens.get(&pos).copied()
    }

    fn note_paren_pair(&mut self, open: Position, close: Position) {
        self.parens.insert(open, close);
        self.parens.insert(close, open);
    }

    /// Re-highlights `[from_line, through_line]` of `text`, resuming from
    /// the cached state of `from_line - 1` (or the resting state at line 0),
    /// returning the attributed runs and leaving each visited line's
    /// `hl_state`/`dirty` updated.
    pub fn highlight_range(
        &mut self,
        lang: &impl Language,
        text: &mut Text,
        from_line: usize,
        through_line: usize,
    ) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut state = if from_line == 0 {
            StackedState::default()
        } else {
            text
                .line(from_line - 1)
                .map(|l| StackedState(l.hl_state))
                .unwrap_or_default()
        };
        let mut open_stack: Vec<(u8, Position)> = Vec::new();
        let through = through_line.min(text.num_lines().saturating_sub(1));

        for line_i in from_line..=through {
            let bytes = text.line(line_i).map(|l| l.as_bytes().to_vec()).unwrap_or_default();
            let n = bytes.len();
            let mut col = 0usize;
            let mut end_state = state;
            while col < n {
                let ctx = StateCtx { s: &bytes, i: col, n };
                let (consumed, class, next) = lang.dispatch(state, &ctx);
                let consumed = consumed.max(1);
                let to = (col + consumed).min(n);
                runs.push(Run {
                    line: line_i,
                    from: col,
                    to,
                    class,
                });
                for i in col..to {
                    let b = bytes[i];
                    if lang.is_open_paren(b) {
                        open_stack.push((b, Position::new(line_i, i)));
                    } else if lang.is_close_paren(b) {
                        if let Some((_, open_pos)) = open_stack.pop() {
                            self.note_paren_pair(open_pos, Position::new(line_i, i));
                        }
                    }
                }
                state = next;
                end_state = next;
                col = to;
            }
            if end_state.is_resting() {
                state = StackedState::default();
            } else {
                state = end_state;
            }
            if let Some(l) = text.line_mut(line_i) {
                l.hl_state = state.0;
                l.dirty = false;
            }
        }
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::{RawLine, Text};
    use pretty_assertions::assert_eq;

    #[test]
    fn resumes_multiline_comment_across_lines() {
        let mut text = Text::from_raw_lines(vec![
            RawLine::from_str("/* start"),
            RawLine::from_str("still comment"),
            RawLine::from_str("end */ code"),
        ]);
        let mut driver = HighlightDriver::new();
        let lang = lang_c::CLanguage;
        let runs = driver.highlight_range(&lang, &mut text, 0, 2);

        let all_comment = |line: usize| {
            runs.iter()
                .filter(|r| r.line == line)
                .all(|r| r.class == HiClass::Comment)
        };
        assert!(all_comment(0));
        assert!(all_comment(1));

        let line2: Vec<_> = runs.iter().filter(|r| r.line == 2).collect();
        let comment_prefix = line2
            .iter()
            .take_while(|r| r.class == HiClass::Comment)
            .map(|r| r.to - r.from)
            .sum::<usize>();
        assert_eq!(comment_prefix, "end */".len());
        assert!(line2.iter().any(|r| r.class == HiClass::Normal));
    }
}
