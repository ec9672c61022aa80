//! Frame tiling: rectangles of screen space, each bound to one buffer, kept
//! in a flat list rather than a split tree (matching the original's
//! singly-linked `struct frame` list — closing a frame looks for whichever
//! sibling shares a full edge with the freed rect and grows it, rather than
//! walking a parent/child tree).

use crate::layout::LayoutRegion;
use core_text::Position;

/// How a frame came to exist relative to its former sibling. `None` for the
/// very first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDir {
    None,
    Left,
    Right,
    Up,
    Down,
}

/// Sentinel `vct` meaning "stick to the end of whatever line we land on",
/// set by the `END` motion.
pub const VCT_END: usize = usize::MAX;

#[derive(Debug, Clone)]
pub struct Frame {
    pub rect: LayoutRegion,
    pub buf_id: usize,
    pub cur: Position,
    pub scroll: Position,
    pub vct: usize,
    pub prev_cur: Position,
    pub split_dir: SplitDir,
    /// Visual-mode selection anchor, set when visual mode is entered and
    /// cleared on exit.
    pub anchor: Option<Position>,
}

impl Frame {
    pub fn new(rect: LayoutRegion, buf_id: usize) -> Self {
        Self {
            rect,
            buf_id,
            cur: Position::origin(),
            scroll: Position::origin(),
            vct: 0,
            prev_cur: Position::origin(),
            split_dir: SplitDir::None,
            anchor: None,
        }
    }

    pub fn enter_visual(&mut self) {
        self.anchor = Some(self.cur);
    }

    pub fn exit_visual(&mut self) {
        self.anchor = None;
    }

    /// Byte range of the current selection, ordered, or `None` outside
    /// visual mode.
    pub fn selection_range(&self) -> Option<(Position, Position)> {
        let anchor = self.anchor?;
        Some(if anchor <= self.cur {
            (anchor, self.cur)
        } else {
            (self.cur, anchor)
        })
    }
}

/// The set of frames tiling the screen, with one marked active.
pub struct FrameSet {
    frames: Vec<Frame>,
    active: usize,
}

impl FrameSet {
    pub fn new(rect: LayoutRegion, buf_id: usize) -> Self {
        Self {
            frames: vec![Frame::new(rect, buf_id)],
            active: 0,
        }
    }

    pub fn active(&self) -> &Frame {
        &self.frames[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Frame {
        &mut self.frames[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn set_active(&mut self, idx: usize) {
        if idx < self.frames.len() {
            self.active = idx;
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_at(&self, x: u16, y: u16) -> Option<usize> {
        self.frames.iter().position(|f| {
            x >= f.rect.x
                && x < f.rect.x + f.rect.width
                && y >= f.rect.y
                && y < f.rect.y + f.rect.height
        })
    }

    /// Splits the active frame in `dir`, pointing the new half at `buf_id`
    /// (pass the active frame's own `buf_id` to split onto the same
    /// buffer). Returns the new frame's index and makes it active.
    pub fn split(&mut self, dir: SplitDir, buf_id: usize) -> usize {
        let parent = self.frames[self.active].rect;
        let (new_rect, shrunk) = match dir {
            SplitDir::Left => {
                let w1 = parent.width / 2;
                let w2 = parent.width - w1;
                (
                    LayoutRegion::new(parent.x, parent.y, w1, parent.height),
                    LayoutRegion::new(parent.x + w1, parent.y, w2, parent.height),
                )
            }
            SplitDir::Right => {
                let w2 = parent.width / 2;
                let w1 = parent.width - w2;
                (
                    LayoutRegion::new(parent.x + w1, parent.y, w2, parent.height),
                    LayoutRegion::new(parent.x, parent.y, w1, parent.height),
                )
            }
            SplitDir::Up => {
                let h1 = parent.height / 2;
                let h2 = parent.height - h1;
                (
                    LayoutRegion::new(parent.x, parent.y, parent.width, h1),
                    LayoutRegion::new(parent.x, parent.y + h1, parent.width, h2),
                )
            }
            SplitDir::Down => {
                let h2 = parent.height / 2;
                let h1 = parent.height - h2;
                (
                    LayoutRegion::new(parent.x, parent.y + h1, parent.width, h2),
                    LayoutRegion::new(parent.x, parent.y, parent.width, h1),
                )
            }
            SplitDir::None => return self.active,
        };
        self.frames[self.active].rect = shrunk;
        let mut new_frame = Frame::new(new_rect, buf_id);
        new_frame.split_dir = dir;
        self.frames.push(new_frame);
        let new_idx = self.frames.len() - 1;
        self.active = new_idx;
        tracing::debug!(?dir, new_idx, "frame_split");
        new_idx
    }

    /// Destroys frame `idx`, expanding whichever remaining frame shares a
    /// full edge with the freed rectangle to cover it. A no-op if `idx` is
    /// the last remaining frame.
    pub fn close(&mut self, idx: usize) {
        if self.frames.len() <= 1 || idx >= self.frames.len() {
            return;
        }
        let closed = self.frames[idx].rect;
        for (i, f) in self.frames.iter_mut().enumerate() {
            if i == idx {
                continue;
            }
            if f.rect.left_of(&closed) {
                f.rect.width += closed.width;
                break;
            }
            if closed.left_of(&f.rect) {
                f.rect.x = closed.x;
                f.rect.width += closed.width;
                break;
            }
            if f.rect.above(&closed) {
                f.rect.height += closed.height;
                break;
            }
            if closed.above(&f.rect) {
                f.rect.y = closed.y;
                f.rect.height += closed.height;
                break;
            }
        }
        self.frames.remove(idx);
        if self.active == idx {
            self.active = self.active.min(self.frames.len() - 1);
        } else if self.active > idx {
            self.active -= 1;
        }
        tracing::debug!(idx, remaining = self.frames.len(), "frame_closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_left_halves_width_and_activates_new_frame() {
        let mut set = FrameSet::new(LayoutRegion::new(0, 0, 80, 24), 1);
        let new_idx = set.split(SplitDir::Left, 1);
        assert_eq!(set.active_index(), new_idx);
        assert_eq!(set.frames()[new_idx].rect, LayoutRegion::new(0, 0, 40, 24));
        assert_eq!(set.frames()[0].rect, LayoutRegion::new(40, 0, 40, 24));
    }

    #[test]
    fn close_expands_left_neighbor_to_reclaim_space() {
        let mut set = FrameSet::new(LayoutRegion::new(0, 0, 80, 24), 1);
        let right = set.split(SplitDir::Right, 1);
        set.close(right);
        assert_eq!(set.count(), 1);
        assert_eq!(set.frames()[0].rect, LayoutRegion::new(0, 0, 80, 24));
    }

    #[test]
    fn close_on_single_frame_is_noop() {
        let mut set = FrameSet::new(LayoutRegion::new(0, 0, 80, 24), 1);
        set.close(0);
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn selection_range_orders_anchor_and_cursor() {
        let mut f = Frame::new(LayoutRegion::new(0, 0, 10, 10), 1);
        f.cur = Position::new(2, 3);
        f.enter_visual();
        f.cur = Position::new(0, 1);
        let (lo, hi) = f.selection_range().unwrap();
        assert_eq!(lo, Position::new(0, 1));
        assert_eq!(hi, Position::new(2, 3));
    }
}
