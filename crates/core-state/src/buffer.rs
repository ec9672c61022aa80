//! Buffer aggregate: text store + file identity + dirty range tracking +
//! search matches + undo log.

use crate::undo::UndoEngine;
use core_regex::Regex;
use core_text::{Position, RawLine, Text};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Language tag attached to a buffer, driving which highlight table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    None,
    C,
    Diff,
}

fn detect_language(text: &Text, path: Option<&Path>) -> Language {
    for i in 0..text.num_lines() {
        let line = text.line(i).expect("line index in bounds");
        let mut saw_non_blank = false;
        for &b in line.as_bytes() {
            if b == b' ' || b == b'\t' {
                continue;
            }
            saw_non_blank = true;
            if b == b'#' {
                return Language::C;
            }
            break;
        }
        if saw_non_blank {
            break;
        }
    }

    let ext = path.and_then(|p| p.extension()).and_then(|e| e.to_str());
    match ext {
        Some("c") | Some("h") => Language::C,
        Some("diff") | Some("patch") => Language::Diff,
        _ => Language::None,
    }
}

/// Line delimiter style detected on read and preserved on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
    Cr,
}

impl LineEnding {
    fn detect(bytes: &[u8]) -> Self {
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'\n' {
                if i > 0 && bytes[i - 1] == b'\r' {
                    return LineEnding::Crlf;
                }
                return LineEnding::Lf;
            }
            if b == b'\r' {
                return LineEnding::Cr;
            }
        }
        LineEnding::Lf
    }
}

/// Split raw file bytes into lines on the first-seen delimiter style,
/// transcoding non-UTF-8 input (per the detected encoding) to UTF-8 first.
fn split_lines(bytes: &[u8]) -> (Vec<RawLine>, LineEnding) {
    let ending = LineEnding::detect(bytes);
    let (decoded, _enc, _had_errors) = encoding_rs::Encoding::for_bom(bytes)
        .map(|(enc, bom_len)| enc.decode(&bytes[bom_len..]))
        .unwrap_or_else(|| {
            let (text, enc, had_errors) = encoding_rs::UTF_8.decode(bytes);
            (text, enc, had_errors)
        });
    let text = decoded.as_bytes();

    let mut lines = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < text.len() {
        match text[i] {
            b'\n' => {
                let end = if i > start && text[i - 1] == b'\r' { i - 1 } else { i };
                lines.push(RawLine(text[start..end].to_vec()));
                i += 1;
                start = i;
            }
            b'\r' if ending == LineEnding::Cr => {
                lines.push(RawLine(text[start..i].to_vec()));
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < text.len() {
        lines.push(RawLine(text[start..].to_vec()));
    }
    (lines, ending)
}

/// The searchable, dirty-range-tracked, undo-backed editable text for one
/// open file (or scratch buffer).
pub struct Buffer {
    pub id: usize,
    pub text: Text,
    pub path: Option<PathBuf>,
    pub mtime: Option<SystemTime>,
    pub language: Language,
    pub line_ending: LineEnding,
    undo: UndoEngine,
    pub min_dirty: usize,
    pub max_dirty: usize,
    pub matches: Vec<(Position, Position)>,
    pub search_pattern: Option<String>,
    pub saved_cursor: Position,
    pub saved_scroll: Position,
}

impl Buffer {
    /// Creates an empty, unnamed buffer.
    pub fn empty(id: usize) -> Self {
        let text = Text::new();
        Self {
            id,
            language: detect_language(&text, None),
            text,
            path: None,
            mtime: None,
            line_ending: LineEnding::Lf,
            undo: UndoEngine::new(),
            min_dirty: 0,
            max_dirty: 0,
            matches: Vec::new(),
            search_pattern: None,
            saved_cursor: Position::origin(),
            saved_scroll: Position::origin(),
        }
    }

    /// Loads `path` if it exists, otherwise starts an empty buffer pointed at
    /// that path for a later save.
    pub fn open(id: usize, path: &Path) -> std::io::Result<Self> {
        let mut buf = Self::empty(id);
        buf.path = Some(path.to_path_buf());
        match std::fs::read(path) {
            Ok(bytes) => {
                let meta = std::fs::metadata(path)?;
                buf.mtime = meta.modified().ok();
                let (lines, ending) = split_lines(&bytes);
                buf.line_ending = ending;
                buf.text = if lines.is_empty() {
                    Text::new()
                } else {
                    Text::from_raw_lines(lines)
                };
                buf.max_dirty = buf.text.num_lines().saturating_sub(1);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        buf.language = detect_language(&buf.text, buf.path.as_deref());
        Ok(buf)
    }

    pub fn is_modified(&self) -> bool {
        self.undo.is_modified()
    }

    pub fn mark_saved(&mut self) {
        self.undo.mark_saved();
    }

    fn mark_dirty(&mut self, from_line: usize, to_line: usize) {
        self.min_dirty = self.min_dirty.min(from_line);
        self.max_dirty = self.max_dirty.max(to_line);
    }

    pub fn set_language(&mut self, lang: Language) {
        if self.language == lang {
            return;
        }
        self.language = lang;
        self.min_dirty = 0;
        self.max_dirty = self.text.num_lines().saturating_sub(1);
        for i in 0..self.text.num_lines() {
            if let Some(line) = self.text.line_mut(i) {
                line.dirty = true;
            }
        }
    }

    pub fn insert_range(
        &mut self,
        pos: Position,
        src: &[RawLine],
        repeat: usize,
        cursor_before: Position,
        transient: bool,
    ) -> Position {
        let end = self.text.insert_range(pos, src, repeat);
        self.mark_dirty(pos.line, end.line);
        self.undo
            .record_insertion(pos, end, cursor_before, end, src.to_vec(), false, transient);
        end
    }

    pub fn insert_block(
        &mut self,
        pos: Position,
        src: &[RawLine],
        repeat: usize,
        cursor_before: Position,
        transient: bool,
    ) -> Position {
        let end = self.text.insert_block(pos, src, repeat);
        self.mark_dirty(pos.line, end.line);
        self.undo
            .record_insertion(pos, end, cursor_before, end, src.to_vec(), true, transient);
        end
    }

    pub fn delete_range(
        &mut self,
        from: Position,
        to: Position,
        cursor_before: Position,
        cursor_after: Position,
        transient: bool,
    ) -> Vec<RawLine> {
        let removed = self.text.delete_range(from, to);
        self.mark_dirty(from.line, from.line);
        self.undo
            .record_deletion(from, to, cursor_before, cursor_after, removed.clone(), false, transient);
        removed
    }

    pub fn delete_block(
        &mut self,
        from: Position,
        to: Position,
        cursor_before: Position,
        cursor_after: Position,
        transient: bool,
    ) -> Vec<RawLine> {
        let removed = self.text.delete_block(from, to);
        self.mark_dirty(from.line, to.line);
        self.undo
            .record_deletion(from, to, cursor_before, cursor_after, removed.clone(), true, transient);
        removed
    }

    pub fn change_range(
        &mut self,
        from: Position,
        to: Position,
        conv: impl Fn(u8) -> u8,
        cursor_before: Position,
        cursor_after: Position,
    ) {
        let delta = self.text.change_range(from, to, conv);
        self.mark_dirty(from.line, to.line);
        self.undo
            .record_replace(from, to, cursor_before, cursor_after, delta, false);
    }

    pub fn change_block(
        &mut self,
        from: Position,
        to: Position,
        conv: impl Fn(u8) -> u8,
        cursor_before: Position,
        cursor_after: Position,
    ) {
        let delta = self.text.change_block(from, to, conv);
        self.mark_dirty(from.line, to.line);
        self.undo
            .record_replace(from, to, cursor_before, cursor_after, delta, true);
    }

    pub fn break_line(&mut self, pos: Position, cursor_before: Position, transient: bool) -> Position {
        let new_pos = self.text.break_line(pos);
        self.mark_dirty(pos.line, new_pos.line);
        self.undo.record_insertion(
            pos,
            new_pos,
            cursor_before,
            new_pos,
            vec![RawLine::default(), RawLine::default()],
            false,
            transient,
        );
        new_pos
    }

    pub fn undo(&mut self) -> Option<Position> {
        let cur = self.undo.undo(&mut self.text);
        self.min_dirty = 0;
        self.max_dirty = self.text.num_lines().saturating_sub(1);
        cur
    }

    pub fn redo(&mut self) -> Option<Position> {
        let cur = self.undo.redo(&mut self.text);
        self.min_dirty = 0;
        self.max_dirty = self.text.num_lines().saturating_sub(1);
        cur
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.undo.redo_depth()
    }

    /// Line indent, counted in leading spaces/tabs (`get_line_indent`).
    pub fn line_indent(&self, line_i: usize) -> usize {
        self.text.line(line_i).map(|l| l.indent()).unwrap_or(0)
    }

    /// Re-indents `line_i` to match the indent of the line above it (0 for
    /// the first line), inserting the shortfall or deleting the excess.
    pub fn indent_line(&mut self, line_i: usize, cursor_before: Position) {
        if line_i >= self.text.num_lines() {
            return;
        }
        let new_indent = if line_i == 0 { 0 } else { self.line_indent(line_i - 1) };
        let cur_indent = self.line_indent(line_i);
        let pos = Position::new(line_i, 0);
        if new_indent > cur_indent {
            let pad = RawLine::from_str(&" ".repeat(new_indent - cur_indent));
            self.insert_range(pos, std::slice::from_ref(&pad), 1, cursor_before, false);
        } else if cur_indent > new_indent {
            let to = Position::new(line_i, cur_indent - new_indent);
            self.delete_range(pos, to, cursor_before, pos, false);
        }
    }

    /// Literal, case-sensitive scan populating `matches`; an empty needle
    /// clears them.
    pub fn search_string(&mut self, needle: &str) {
        self.matches.clear();
        self.search_pattern = if needle.is_empty() {
            None
        } else {
            Some(needle.to_string())
        };
        if needle.is_empty() {
            return;
        }
        let needle_bytes = needle.as_bytes();
        for line_i in 0..self.text.num_lines() {
            let line = self.text.line(line_i).expect("line index in bounds");
            let hay = line.as_bytes();
            if needle_bytes.len() > hay.len() {
                continue;
            }
            for col in 0..=(hay.len() - needle_bytes.len()) {
                if &hay[col..col + needle_bytes.len()] == needle_bytes {
                    let from = Position::new(line_i, col);
                    let to = Position::new(line_i, col + needle_bytes.len());
                    self.matches.push((from, to));
                }
            }
        }
    }

    /// Regex-driven scan; same match-list contract as [`search_string`].
    pub fn search_regex(&mut self, pattern: &str) -> Result<(), core_regex::RegexError> {
        let re = Regex::compile(pattern)?;
        self.matches = re.find_all(&self.text);
        self.search_pattern = Some(pattern.to_string());
        Ok(())
    }

    /// Writes lines `[from, to]` (clamped, inclusive) to `w`, separating with
    /// `\n` and omitting the trailing delimiter only when the last line
    /// written is empty.
    pub fn write_range(&self, from: usize, to: usize, w: &mut impl Write) -> std::io::Result<usize> {
        let last = self.text.num_lines().saturating_sub(1);
        let to = to.min(last);
        if from > to {
            return Ok(0);
        }
        let from = from.min(last);
        let mut written = 0;
        for i in from..=to {
            let line = self.text.line(i).expect("line index in bounds");
            w.write_all(line.as_bytes())?;
            written += line.len();
            if i + 1 != self.text.num_lines() || !line.is_empty() {
                w.write_all(b"\n")?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Writes the buffer to `self.path`. Unless `force`, refuses when the
    /// on-disk mtime no longer matches the mtime cached at open/last-save
    /// (someone else changed the file since).
    pub fn write_file(&mut self, force: bool) -> std::io::Result<()> {
        let Some(path) = self.path.clone() else {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "buffer has no path"));
        };
        if !force {
            if let (Some(cached), Ok(meta)) = (self.mtime, std::fs::metadata(&path)) {
                if meta.modified().ok() != Some(cached) {
                    return Err(std::io::Error::other(
                        "on-disk file changed since open; use :w! to overwrite",
                    ));
                }
            }
        }
        let mut file = std::fs::File::create(&path)?;
        self.write_range(0, self.text.num_lines().saturating_sub(1), &mut file)?;
        let meta = std::fs::metadata(&path)?;
        self.mtime = meta.modified().ok();
        self.mark_saved();
        Ok(())
    }

    /// Reads a whole external byte stream, split as [`open`] would, and
    /// inserts it as a single insertion at `pos`.
    pub fn read_file_at(&mut self, pos: Position, r: &mut impl Read) -> std::io::Result<()> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        let (lines, _ending) = split_lines(&bytes);
        if lines.is_empty() {
            return Ok(());
        }
        self.insert_range(pos, &lines, 1, pos, false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_starts_with_one_line() {
        let buf = Buffer::empty(1);
        assert_eq!(buf.text.num_lines(), 1);
        assert!(!buf.is_modified());
    }

    #[test]
    fn insert_then_undo_clears_modified_relative_to_watermark() {
        let mut buf = Buffer::empty(1);
        let src = vec![RawLine::from_str("hi")];
        buf.insert_range(Position::origin(), &src, 1, Position::origin(), false);
        assert!(buf.is_modified());
        buf.mark_saved();
        assert!(!buf.is_modified());
        buf.undo();
        assert!(buf.is_modified());
    }

    #[test]
    fn set_language_marks_every_line_dirty() {
        let mut buf = Buffer::empty(1);
        let src = vec![RawLine::from_str("a"), RawLine::from_str("b")];
        buf.insert_range(Position::origin(), &src, 1, Position::origin(), false);
        for i in 0..buf.text.num_lines() {
            buf.text.line_mut(i).unwrap().dirty = false;
        }
        buf.set_language(Language::C);
        for i in 0..buf.text.num_lines() {
            assert!(buf.text.line(i).unwrap().dirty);
        }
    }

    #[test]
    fn search_string_finds_non_overlapping_matches_sorted() {
        let mut buf = Buffer::empty(1);
        let src = vec![RawLine::from_str("abcabc"), RawLine::from_str("xabcx")];
        buf.insert_range(Position::origin(), &src, 1, Position::origin(), false);
        buf.text.line_mut(0).unwrap();
        buf.search_string("abc");
        assert_eq!(buf.matches.len(), 3);
        assert!(buf.matches.windows(2).all(|w| w[0].1 <= w[1].0));
    }

    #[test]
    fn write_range_omits_trailing_newline_for_empty_last_line() {
        let mut buf = Buffer::empty(1);
        let src = vec![RawLine::from_str("a"), RawLine::from_str("")];
        buf.insert_range(Position::new(0, 0), &src, 1, Position::origin(), false);
        let mut out = Vec::new();
        buf.write_range(0, buf.text.num_lines() - 1, &mut out).unwrap();
        assert_eq!(out, b"a\n");
    }
}
