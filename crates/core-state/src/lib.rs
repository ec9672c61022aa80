//! Editor state: buffer collection, active-buffer tracking, and the undo
//! engine and buffer aggregate each buffer owns.

pub mod buffer;
pub mod registry;
pub mod undo;

pub use buffer::{Buffer, Language, LineEnding};
pub use registry::BufferRegistry;
pub use undo::{EventFlags, UndoEngine, HUGE_UNDO_THRESHOLD};

use core_text::Position;

/// Current editor mode, mirrored by frame-level mode handlers in `core-actions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Visual,
    VisualLine,
    VisualBlock,
}

/// Top-level container: the buffer registry plus which buffer the active
/// frame is pointed at. Frame/viewport state itself lives in `core-model`.
pub struct EditorState {
    pub buffers: BufferRegistry,
    pub active_buffer: Option<usize>,
    pub mode: Mode,
}

impl EditorState {
    pub fn new() -> Self {
        let mut buffers = BufferRegistry::new();
        let active_buffer = Some(buffers.create_empty());
        Self {
            buffers,
            active_buffer,
            mode: Mode::Normal,
        }
    }

    pub fn active_buffer(&self) -> Option<&Buffer> {
        self.active_buffer.and_then(|id| self.buffers.get(id))
    }

    pub fn active_buffer_mut(&mut self) -> Option<&mut Buffer> {
        self.active_buffer.and_then(move |id| self.buffers.get_mut(id))
    }

    /// Opens (or finds already-open) `path` and makes it the active buffer.
    pub fn open_file(&mut self, path: &std::path::Path) -> std::io::Result<usize> {
        let id = self.buffers.open(path)?;
        self.active_buffer = Some(id);
        Ok(id)
    }

    /// Closes `id`; if it was active, activates the buffer with the next
    /// smallest id, or `None` if it was the last one.
    pub fn close_buffer(&mut self, id: usize) {
        self.buffers.destroy(id);
        if self.active_buffer == Some(id) {
            self.active_buffer = self.buffers.iter().next().map(|b| b.id);
        }
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

/// Effective one-past-end column for the given mode, per the spec's
/// mode-aware line-end rule: insert/visual positions can rest one past the
/// last byte, normal mode clips to the last byte itself.
pub fn mode_line_end(mode: Mode, line_len: usize) -> usize {
    core_text::mode_line_end(line_len, !matches!(mode, Mode::Normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_one_empty_active_buffer() {
        let state = EditorState::new();
        assert_eq!(state.buffers.len(), 1);
        assert!(state.active_buffer().is_some());
    }

    #[test]
    fn closing_active_buffer_falls_back_to_next() {
        let mut state = EditorState::new();
        let second = state.buffers.create_empty();
        state.active_buffer = Some(second);
        state.close_buffer(second);
        assert_eq!(state.active_buffer, Some(1));
    }

    #[test]
    fn mode_line_end_clips_in_normal_extends_in_insert() {
        assert_eq!(mode_line_end(Mode::Normal, 5), 4);
        assert_eq!(mode_line_end(Mode::Insert, 5), 5);
        assert_eq!(mode_line_end(Mode::Normal, 0), 0);
    }

    #[test]
    fn cursor_positions_stay_within_fresh_buffer() {
        let state = EditorState::new();
        let buf = state.active_buffer().unwrap();
        assert_eq!(buf.text.num_lines(), 1);
        let _ = Position::origin();
    }
}
