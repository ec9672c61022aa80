//! Linear undo/redo event log with coalescing and spill-to-file for large
//! segments.

use core_text::{Position, RawLine, Text};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::trace;

/// Number of lines a segment must reach before it is written to the spill
/// file instead of staying resident.
pub const HUGE_UNDO_THRESHOLD: usize = 8;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventFlags: u8 {
        const TRANSIENT = 0x01;
        const BLOCK     = 0x02;
        const INSERTION = 0x04;
        const DELETION  = 0x08;
        const REPLACE   = 0x10;
    }
}

/// A segment of lines referenced by an undo event: inserted text, deleted
/// text, or (for REPLACE) the XOR delta between old and new bytes.
#[derive(Debug, Clone)]
enum Segment {
    Resident(Vec<RawLine>),
    Spilled { file_pos: u64, num_lines: usize },
}

impl Segment {
    fn num_lines(&self) -> usize {
        match self {
            Segment::Resident(lines) => lines.len(),
            Segment::Spilled { num_lines, .. } => *num_lines,
        }
    }
}

/// One entry in the undo log.
#[derive(Debug, Clone)]
pub struct UndoEvent {
    pub flags: EventFlags,
    pub time: std::time::SystemTime,
    pub pos: Position,
    pub end: Position,
    pub cursor_before: Position,
    pub cursor_after: Position,
    data_i: usize,
}

fn is_in_range(p: Position, from: Position, to: Position) -> bool {
    p >= from && p <= to
}

/// Per the reference coalescer: never joins REPLACE events; insertion
/// extends insertion/deletion landing within its own extent; deletions at
/// a shared point join with each other or with a following insertion at
/// that same point.
pub fn should_join(ev1: &UndoEvent, ev2: &UndoEvent) -> bool {
    if ev1.flags.union(ev2.flags).contains(EventFlags::REPLACE) {
        return false;
    }
    let to1 = ev1.end;
    let to2 = ev2.end;

    if ev1.flags.contains(EventFlags::INSERTION) {
        if ev2.flags.contains(EventFlags::INSERTION) {
            return is_in_range(ev2.pos, ev1.pos, to1);
        }
        return is_in_range(ev2.pos, ev1.pos, to1) && is_in_range(to2, ev1.pos, to1);
    }
    if ev2.flags.contains(EventFlags::INSERTION) {
        return ev1.pos == ev2.pos;
    }
    ev1.pos == ev2.pos || ev1.pos == to2
}

/// Append-only table of undo segments; small ones stay resident, large ones
/// spill to a backing file keyed by `fpos`.
pub struct SegmentStore {
    segments: Vec<Segment>,
    spill: tempfile::NamedTempFile,
}

impl SegmentStore {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            segments: Vec::new(),
            spill: tempfile::NamedTempFile::new()?,
        })
    }

    fn push(&mut self, lines: Vec<RawLine>) -> usize {
        let idx = self.segments.len();
        if lines.len() >= HUGE_UNDO_THRESHOLD {
            let file_pos = self.write_spill(&lines).expect("undo spill write failed");
            self.segments.push(Segment::Spilled {
                file_pos,
                num_lines: lines.len(),
            });
        } else {
            self.segments.push(Segment::Resident(lines));
        }
        idx
    }

    fn write_spill(&mut self, lines: &[RawLine]) -> std::io::Result<u64> {
        let file = self.spill.as_file_mut();
        let pos = file.seek(SeekFrom::End(0))?;
        for line in lines {
            let len = (line.len() as u32).to_le_bytes();
            file.write_all(&len)?;
            file.write_all(line.0.as_slice())?;
        }
        file.flush()?;
        Ok(pos)
    }

    fn load(&mut self, idx: usize) -> Vec<RawLine> {
        match &self.segments[idx] {
            Segment::Resident(lines) => lines.clone(),
            Segment::Spilled { file_pos, num_lines } => {
                let file = self.spill.as_file_mut();
                file.seek(SeekFrom::Start(*file_pos)).expect("seek undo spill");
                let mut out = Vec::with_capacity(*num_lines);
                for _ in 0..*num_lines {
                    let mut len_buf = [0u8; 4];
                    file.read_exact(&mut len_buf).expect("read undo spill length");
                    let len = u32::from_le_bytes(len_buf) as usize;
                    let mut bytes = vec![0u8; len];
                    file.read_exact(&mut bytes).expect("read undo spill bytes");
                    out.push(RawLine(bytes));
                }
                out
            }
        }
    }
}

/// Linear event vector with a movable cursor (`event_i`) splitting applied
/// history from redo-able history.
pub struct UndoEngine {
    events: Vec<UndoEvent>,
    event_i: usize,
    segments: SegmentStore,
    /// Event index at the time of the last save; buffer is modified iff
    /// `event_i != save_event_i`.
    pub save_event_i: usize,
}

impl UndoEngine {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            event_i: 0,
            segments: SegmentStore::new().expect("failed to create undo spill file"),
            save_event_i: 0,
        }
    }

    pub fn event_i(&self) -> usize {
        self.event_i
    }

    pub fn is_modified(&self) -> bool {
        self.event_i != self.save_event_i
    }

    pub fn mark_saved(&mut self) {
        self.save_event_i = self.event_i;
    }

    /// Appends a new event, truncating any redo history beyond `event_i` and
    /// joining it into the previous event when `should_join` says so.
    fn add_event(
        &mut self,
        flags: EventFlags,
        pos: Position,
        end: Position,
        cursor_before: Position,
        cursor_after: Position,
        lines: Vec<RawLine>,
    ) {
        self.events.truncate(self.event_i);
        let data_i = self.segments.push(lines);
        let candidate = UndoEvent {
            flags,
            time: std::time::SystemTime::now(),
            pos,
            end,
            cursor_before,
            cursor_after,
            data_i,
        };
        if let Some(prev) = self.events.last_mut() {
            if should_join(prev, &candidate) {
                prev.flags |= EventFlags::TRANSIENT;
            }
        }
        self.events.push(candidate);
        self.event_i = self.events.len();
        trace!(event_i = self.event_i, "undo_event_pushed");
    }

    pub fn record_insertion(
        &mut self,
        pos: Position,
        end: Position,
        cursor_before: Position,
        cursor_after: Position,
        inserted: Vec<RawLine>,
        block: bool,
        transient: bool,
    ) {
        let mut flags = EventFlags::INSERTION;
        if block {
            flags |= EventFlags::BLOCK;
        }
        if transient {
            flags |= EventFlags::TRANSIENT;
        }
        self.add_event(flags, pos, end, cursor_before, cursor_after, inserted);
    }

    pub fn record_deletion(
        &mut self,
        pos: Position,
        end: Position,
        cursor_before: Position,
        cursor_after: Position,
        deleted: Vec<RawLine>,
        block: bool,
        transient: bool,
    ) {
        let mut flags = EventFlags::DELETION;
        if block {
            flags |= EventFlags::BLOCK;
        }
        if transient {
            flags |= EventFlags::TRANSIENT;
        }
        self.add_event(flags, pos, end, cursor_before, cursor_after, deleted);
    }

    pub fn record_replace(
        &mut self,
        pos: Position,
        end: Position,
        cursor_before: Position,
        cursor_after: Position,
        xor_delta: Vec<RawLine>,
        block: bool,
    ) {
        let mut flags = EventFlags::REPLACE;
        if block {
            flags |= EventFlags::BLOCK;
        }
        self.add_event(flags, pos, end, cursor_before, cursor_after, xor_delta);
    }

    fn apply(&mut self, text: &mut Text, ev_idx: usize, flags: EventFlags) -> (Position, Position) {
        let ev = self.events[ev_idx].clone();
        let lines = self.segments.load(ev.data_i);
        let block = flags.contains(EventFlags::BLOCK);

        if flags.contains(EventFlags::REPLACE) {
            if block {
                apply_xor_block(text, ev.pos, &lines);
            } else {
                apply_xor_range(text, ev.pos, &lines);
            }
        } else if flags.contains(EventFlags::INSERTION) {
            if block {
                text.insert_block(ev.pos, &lines, 1);
            } else {
                text.insert_range(ev.pos, &lines, 1);
            }
        } else if flags.contains(EventFlags::DELETION) {
            if block {
                text.delete_block(ev.pos, ev.end);
            } else {
                text.delete_range(ev.pos, ev.end);
            }
        }
        (ev.cursor_before, ev.cursor_after)
    }

    /// Undoes the event at `event_i - 1` (and any transient chain leading
    /// into it), returning the cursor to restore.
    pub fn undo(&mut self, text: &mut Text) -> Option<Position> {
        if self.event_i == 0 {
            return None;
        }
        let mut cursor_before = None;
        loop {
            self.event_i -= 1;
            let flags = self.events[self.event_i].flags;
            let reversed = flags ^ (EventFlags::INSERTION | EventFlags::DELETION);
            let (before, _after) = self.apply(text, self.event_i, reversed);
            if cursor_before.is_none() {
                cursor_before = Some(before);
            }
            let chain_continues = self.event_i > 0
                && self.events[self.event_i - 1].flags.contains(EventFlags::TRANSIENT);
            if !chain_continues {
                break;
            }
        }
        cursor_before
    }

    /// Redoes the event at `event_i` (and any transient chain following
    /// it), returning the cursor to restore.
    pub fn redo(&mut self, text: &mut Text) -> Option<Position> {
        if self.event_i == self.events.len() {
            return None;
        }
        let mut cursor_after = None;
        loop {
            let flags = self.events[self.event_i].flags;
            let transient = flags.contains(EventFlags::TRANSIENT);
            let (_before, after) = self.apply(text, self.event_i, flags);
            cursor_after = Some(after);
            self.event_i += 1;
            if !transient || self.event_i == self.events.len() {
                break;
            }
        }
        cursor_after
    }

    pub fn undo_depth(&self) -> usize {
        self.event_i
    }

    pub fn redo_depth(&self) -> usize {
        self.events.len() - self.event_i
    }
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_xor_range(text: &mut Text, pos: Position, delta: &[RawLine]) {
    for (i, seg) in delta.iter().enumerate() {
        let line_i = pos.line + i;
        let Some(line) = text.line_mut(line_i) else { continue };
        let start = if i == 0 { pos.col } else { 0 };
        xor_into(line, start, &seg.0);
    }
}

fn apply_xor_block(text: &mut Text, pos: Position, delta: &[RawLine]) {
    for (i, seg) in delta.iter().enumerate() {
        let line_i = pos.line + i;
        let Some(line) = text.line_mut(line_i) else { continue };
        xor_into(line, pos.col, &seg.0);
    }
}

fn xor_into(line: &mut core_text::Line, start: usize, delta: &[u8]) {
    let bytes = line.as_bytes();
    if start >= bytes.len() {
        return;
    }
    let end = (start + delta.len()).min(bytes.len());
    let mut new_bytes = bytes.to_vec();
    for (i, b) in delta.iter().enumerate().take(end - start) {
        new_bytes[start + i] ^= b;
    }
    *line = core_text::Line::new(new_bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::RawLine;

    fn ev(flags: EventFlags, pos: (usize, usize), end: (usize, usize)) -> UndoEvent {
        UndoEvent {
            flags,
            time: std::time::SystemTime::now(),
            pos: Position::new(pos.0, pos.1),
            end: Position::new(end.0, end.1),
            cursor_before: Position::origin(),
            cursor_after: Position::origin(),
            data_i: 0,
        }
    }

    #[test]
    fn replace_never_joins() {
        let a = ev(EventFlags::REPLACE, (0, 0), (0, 3));
        let b = ev(EventFlags::INSERTION, (0, 1), (0, 2));
        assert!(!should_join(&a, &b));
    }

    #[test]
    fn insertion_joins_insertion_within_extent() {
        let a = ev(EventFlags::INSERTION, (0, 0), (0, 5));
        let b = ev(EventFlags::INSERTION, (0, 3), (0, 4));
        assert!(should_join(&a, &b));
        let c = ev(EventFlags::INSERTION, (0, 6), (0, 7));
        assert!(!should_join(&a, &c));
    }

    #[test]
    fn deletion_joins_deletion_at_shared_point() {
        let a = ev(EventFlags::DELETION, (0, 2), (0, 3));
        let b = ev(EventFlags::DELETION, (0, 2), (0, 3));
        assert!(should_join(&a, &b));
        let c = ev(EventFlags::DELETION, (0, 5), (0, 6));
        assert!(!should_join(&a, &c));
    }

    #[test]
    fn deletion_joins_following_insertion_at_same_point() {
        let a = ev(EventFlags::DELETION, (0, 2), (0, 3));
        let b = ev(EventFlags::INSERTION, (0, 2), (0, 4));
        assert!(should_join(&a, &b));
    }

    #[test]
    fn insert_then_undo_then_redo_round_trips() {
        let mut text = Text::new();
        let mut engine = UndoEngine::new();
        let src = vec![RawLine::from_str("abc"), RawLine::from_str("de")];
        let pos = Position::origin();
        let end = text.insert_range(pos, &src, 1);
        engine.record_insertion(pos, end, pos, end, src, false, false);

        assert_eq!(text.num_lines(), 2);
        let cur = engine.undo(&mut text);
        assert!(cur.is_some());
        assert_eq!(text.num_lines(), 1);
        assert_eq!(text.line(0).unwrap().len(), 0);

        let cur = engine.redo(&mut text);
        assert!(cur.is_some());
        assert_eq!(text.num_lines(), 2);
        assert_eq!(text.line(0).unwrap().as_str_lossy(), "abc");
    }

    #[test]
    fn huge_segment_spills_and_reloads() {
        let mut text = Text::new();
        let mut engine = UndoEngine::new();
        let src: Vec<RawLine> = (0..HUGE_UNDO_THRESHOLD + 2)
            .map(|i| RawLine::from_str(&format!("line{i}")))
            .collect();
        let pos = Position::origin();
        let end = text.insert_range(pos, &src, 1);
        engine.record_insertion(pos, end, pos, end, src.clone(), false, false);
        engine.undo(&mut text);
        engine.redo(&mut text);
        assert_eq!(text.num_lines(), src.len());
        assert_eq!(text.line(3).unwrap().as_str_lossy(), "line3");
    }

    #[test]
    fn transient_chain_undoes_as_one_unit() {
        let mut text = Text::new();
        let mut engine = UndoEngine::new();
        let pos0 = Position::origin();
        let src_a = vec![RawLine::from_str("a")];
        let end_a = text.insert_range(pos0, &src_a, 1);
        engine.record_insertion(pos0, end_a, pos0, end_a, src_a, false, true);

        let pos1 = end_a;
        let src_b = vec![RawLine::from_str("b")];
        let end_b = text.insert_range(pos1, &src_b, 1);
        engine.record_insertion(pos1, end_b, pos1, end_b, src_b, false, false);

        assert_eq!(text.line(0).unwrap().as_str_lossy(), "ab");
        engine.undo(&mut text);
        assert_eq!(text.line(0).unwrap().as_str_lossy(), "");
        assert_eq!(engine.undo_depth(), 0);
    }
}
