//! Session file persistence: which buffers were open, and where the cursor
//! and scroll position sat in each frame, so the next launch can resume.
//!
//! The on-disk format is a plain-text line protocol behind a 3-byte magic
//! header, one buffer record per open file and one frame record per frame.

use core_model::{FrameSet, LayoutRegion};
use core_state::EditorState;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 3] = b"\x1EPC";

pub struct BufferRecord {
    pub path: Option<PathBuf>,
    pub cursor_line: usize,
    pub cursor_col: usize,
}

pub struct FrameRecord {
    pub buf_index: usize,
    pub rect: LayoutRegion,
    pub cursor_line: usize,
    pub cursor_col: usize,
    pub scroll_line: usize,
    pub scroll_col: usize,
}

pub struct SessionData {
    pub buffers: Vec<BufferRecord>,
    pub frames: Vec<FrameRecord>,
}

pub fn save(path: &Path, state: &EditorState, frames: &FrameSet) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(MAGIC)?;
    writeln!(file, "{} frames", frames.count())?;
    for buf in state.buffers.iter() {
        let p = buf.path.as_deref().map(|p| p.to_string_lossy().to_string()).unwrap_or_default();
        writeln!(file, "B{} {} {},{}", buf.id, p, buf.saved_cursor.line, buf.saved_cursor.col)?;
    }
    writeln!(file)?;
    for frame in frames.frames() {
        writeln!(
            file,
            "F{} {}:{};{}x{} {},{} {},{}",
            frame.buf_id,
            frame.rect.x,
            frame.rect.y,
            frame.rect.width,
            frame.rect.height,
            frame.cur.line,
            frame.cur.col,
            frame.scroll.line,
            frame.scroll.col,
        )?;
    }
    Ok(())
}

pub fn load(path: &Path) -> std::io::Result<Option<SessionData>> {
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut magic = [0u8; 3];
    use std::io::Read;
    if reader.read_exact(&mut magic).is_err() || &magic != MAGIC {
        return Ok(None);
    }
    let mut lines = reader.lines();
    let _header = lines.next();
    let mut buffers = Vec::new();
    let mut frames = Vec::new();
    for line in lines.by_ref() {
        let line = line?;
        if line.is_empty() {
            break;
        }
        if let Some(rest) = line.strip_prefix('B') {
            if let Some(record) = parse_buffer_line(rest) {
                buffers.push(record);
            }
        }
    }
    for line in lines {
        let line = line?;
        if let Some(rest) = line.strip_prefix('F') {
            if let Some(record) = parse_frame_line(rest) {
                frames.push(record);
            }
        }
    }
    Ok(Some(SessionData { buffers, frames }))
}

fn parse_buffer_line(rest: &str) -> Option<BufferRecord> {
    let mut parts = rest.splitn(3, ' ');
    let _id = parts.next()?;
    let path = parts.next()?;
    let cursor = parts.next()?;
    let (line, col) = cursor.split_once(',')?;
    Some(BufferRecord {
        path: if path.is_empty() { None } else { Some(PathBuf::from(path)) },
        cursor_line: line.parse().ok()?,
        cursor_col: col.parse().ok()?,
    })
}

fn parse_frame_line(rest: &str) -> Option<FrameRecord> {
    let mut parts = rest.split(' ');
    let buf_field = parts.next()?;
    let geom = parts.next()?;
    let cur = parts.next()?;
    let scroll = parts.next()?;

    let buf_index = buf_field.parse().ok()?;
    let (pos, size) = geom.split_once(';')?;
    let (x, y) = pos.split_once(':')?;
    let (w, h) = size.split_once('x')?;
    let (cur_line, cur_col) = cur.split_once(',')?;
    let (scroll_line, scroll_col) = scroll.split_once(',')?;

    Some(FrameRecord {
        buf_index,
        rect: LayoutRegion::new(x.parse().ok()?, y.parse().ok()?, w.parse().ok()?, h.parse().ok()?),
        cursor_line: cur_line.parse().ok()?,
        cursor_col: cur_col.parse().ok()?,
        scroll_line: scroll_line.parse().ok()?,
        scroll_col: scroll_col.parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::ViewState;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let session_path = dir.path().join("session");
        let state = EditorState::new();
        let view = ViewState::new(LayoutRegion::new(0, 0, 80, 24), &state);

        save(&session_path, &state, &view.frames).unwrap();
        let loaded = load(&session_path).unwrap().expect("magic header recognized");
        assert_eq!(loaded.frames.len(), 1);
        assert_eq!(loaded.frames[0].rect, LayoutRegion::new(0, 0, 80, 24));
    }

    #[test]
    fn rejects_files_without_magic_header() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus");
        std::fs::write(&bogus, b"not a session file").unwrap();
        assert!(load(&bogus).unwrap().is_none());
    }
}
