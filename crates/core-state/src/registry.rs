//! Process-wide buffer registry: a list sorted by ascending id, handing out
//! the smallest free id on creation.

use crate::buffer::Buffer;

#[derive(Default)]
pub struct BufferRegistry {
    buffers: Vec<Buffer>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn smallest_free_id(&self) -> usize {
        let mut id = 1;
        for buf in &self.buffers {
            if buf.id == id {
                id += 1;
            } else if buf.id > id {
                break;
            }
        }
        id
    }

    pub fn create_empty(&mut self) -> usize {
        let id = self.smallest_free_id();
        let buf = Buffer::empty(id);
        let insert_at = self.buffers.partition_point(|b| b.id < id);
        self.buffers.insert(insert_at, buf);
        id
    }

    /// Opens `path`, reusing an already-open buffer on the same path instead
    /// of creating a duplicate.
    pub fn open(&mut self, path: &std::path::Path) -> std::io::Result<usize> {
        if let Some(existing) = self.buffers.iter().find(|b| b.path.as_deref() == Some(path)) {
            return Ok(existing.id);
        }
        let id = self.smallest_free_id();
        let buf = Buffer::open(id, path)?;
        let insert_at = self.buffers.partition_point(|b| b.id < id);
        self.buffers.insert(insert_at, buf);
        Ok(id)
    }

    pub fn destroy(&mut self, id: usize) -> Option<Buffer> {
        let idx = self.buffers.iter().position(|b| b.id == id)?;
        Some(self.buffers.remove(idx))
    }

    pub fn get(&self, id: usize) -> Option<&Buffer> {
        self.buffers.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Buffer> {
        self.buffers.iter_mut().find(|b| b.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Buffer> {
        self.buffers.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
