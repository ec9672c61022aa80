//! Viewport layer: frames tiling the screen, each a cursor/scroll/vct view
//! onto one buffer, plus the motion set that drives the cursor within one.

pub mod frame;
pub mod layout;
pub mod motion;

pub use frame::{Frame, FrameSet, SplitDir, VCT_END};
pub use layout::LayoutRegion;
pub use motion::{apply_motion, clip_to_mode, Motion};

use core_state::{Buffer, EditorState, Mode};

/// Ties a [`FrameSet`] to the [`EditorState`] it views, and derives the
/// scroll offset needed to keep the active frame's cursor on screen.
pub struct ViewState {
    pub frames: FrameSet,
}

impl ViewState {
    pub fn new(rect: LayoutRegion, state: &EditorState) -> Self {
        let buf_id = state.active_buffer.unwrap_or(1);
        Self {
            frames: FrameSet::new(rect, buf_id),
        }
    }

    /// Runs `motion` against the active frame's buffer, then re-settles
    /// scroll so the cursor stays inside the frame's visible rows.
    pub fn apply_motion(
        &mut self,
        state: &EditorState,
        mode: Mode,
        motion: Motion,
        counter: usize,
    ) -> bool {
        let frame = self.frames.active_mut();
        let Some(buf) = state.buffers.get(frame.buf_id) else {
            return false;
        };
        let page_height = frame.rect.height as usize;
        let moved = motion::apply_motion(frame, buf, mode, motion, counter, page_height);
        adjust_scroll(frame, scroll_margin(frame));
        moved
    }

    pub fn split(&mut self, dir: SplitDir) -> usize {
        let buf_id = self.frames.active().buf_id;
        self.frames.split(dir, buf_id)
    }

    pub fn close_active(&mut self) {
        self.frames.close(self.frames.active_index());
    }
}

fn scroll_margin(frame: &Frame) -> usize {
    (frame.rect.height as usize / 4).max(1)
}

/// Re-centers `frame.scroll` so `frame.cur` stays within `[margin, h -
/// margin)` of the visible rows whenever possible, matching the original's
/// `adjust_scroll` (a smaller margin than half the frame just snaps the
/// cursor to an edge instead of centering).
fn adjust_scroll(frame: &mut Frame, margin: usize) {
    let h = frame.rect.height as usize;
    if h == 0 {
        return;
    }
    let top = frame.scroll.line;
    let bottom = top + h;
    let cur = frame.cur.line;
    if cur < top + margin {
        frame.scroll.line = cur.saturating_sub(margin);
    } else if cur + margin >= bottom {
        frame.scroll.line = cur + margin + 1 - h.min(cur + margin + 1);
    }
}

/// Pure scroll-intent calculation, independent of any `Frame`: given the
/// current top row, cursor row, viewport height, and margin, returns the new
/// top row, or `None` if no scroll is needed. Exposed separately from
/// `adjust_scroll` because callers that don't hold a `Frame` (status-line
/// preview, tests) still want the same margin rule.
pub fn compute_scroll_intent(
    first_visible: usize,
    cursor_line: usize,
    viewport_height: usize,
    margin: usize,
) -> Option<usize> {
    if viewport_height == 0 {
        return None;
    }
    let margin = margin.min(viewport_height.saturating_sub(1) / 2);
    if cursor_line < first_visible + margin {
        Some(cursor_line.saturating_sub(margin))
    } else if cursor_line + margin >= first_visible + viewport_height {
        Some(cursor_line + margin + 1 - viewport_height)
    } else {
        None
    }
}

pub fn active_buffer<'a>(state: &'a EditorState, frame: &Frame) -> Option<&'a Buffer> {
    state.buffers.get(frame.buf_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Position;

    #[test]
    fn view_state_starts_pointed_at_active_buffer() {
        let state = EditorState::new();
        let view = ViewState::new(LayoutRegion::new(0, 0, 80, 24), &state);
        assert_eq!(view.frames.active().buf_id, state.active_buffer.unwrap());
    }

    #[test]
    fn split_then_close_restores_single_frame() {
        let state = EditorState::new();
        let mut view = ViewState::new(LayoutRegion::new(0, 0, 80, 24), &state);
        let new_idx = view.split(SplitDir::Right);
        assert_eq!(view.frames.count(), 2);
        view.frames.set_active(new_idx);
        view.close_active();
        assert_eq!(view.frames.count(), 1);
    }

    #[test]
    fn compute_scroll_intent_scrolls_down_past_margin() {
        let next = compute_scroll_intent(0, 20, 10, 2);
        assert_eq!(next, Some(11));
        assert_eq!(compute_scroll_intent(0, 5, 10, 2), None);
    }

    #[test]
    fn apply_motion_moves_cursor_through_view_state() {
        let mut state = EditorState::new();
        state
            .active_buffer_mut()
            .unwrap()
            .insert_range(
                Position::origin(),
                &[core_text::RawLine::from_str("hello")],
                1,
                Position::origin(),
                false,
            );
        let mut view = ViewState::new(LayoutRegion::new(0, 0, 80, 24), &state);
        let moved = view.apply_motion(&state, Mode::Normal, Motion::Right, 1);
        assert!(moved);
        assert_eq!(view.frames.active().cur, Position::new(0, 1));
    }
}
