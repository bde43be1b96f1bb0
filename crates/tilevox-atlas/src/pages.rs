use crossbeam_channel::Receiver;

use crate::allocator::PendingWrite;

/// Page-local RGBA buffers, owned by the thread that holds the graphics resources.
pub struct AtlasPages {
    page_size: i32,
    pages: Vec<Vec<u8>>,
    dirty: Vec<bool>,
    rx: Receiver<PendingWrite>,
}

impl AtlasPages {
    pub(crate) fn new(page_size: i32, page_count: u32, rx: Receiver<PendingWrite>) -> Self {
        let bytes = (page_size.max(0) as usize).pow(2) * 4;
        Self {
            page_size,
            pages: (0..page_count).map(|_| vec![0u8; bytes]).collect(),
            dirty: vec![false; page_count as usize],
            rx,
        }
    }

    /// Applies every pending write and hands each page touched by them to `flush` once.
    /// Returns the number of writes applied.
    pub fn commit(&mut self, mut flush: impl FnMut(u32, &[u8])) -> usize {
        let mut applied = 0;
        while let Ok(write) = self.rx.try_recv() {
            self.apply(&write);
            applied += 1;
        }
        for (page, dirty) in self.dirty.iter_mut().enumerate() {
            if std::mem::take(dirty) {
                flush(page as u32, &self.pages[page]);
            }
        }
        if applied > 0 {
            log::trace!(target: "atlas", "committed {applied} page writes");
        }
        applied
    }

    fn apply(&mut self, write: &PendingWrite) {
        let PendingWrite { slot, texture } = write;
        let Some(buf) = self.pages.get_mut(slot.page as usize) else {
            return;
        };
        let stride = self.page_size as usize * 4;
        for i in 0..texture.width() {
            for j in 0..texture.height() {
                let (px, py) = if slot.flipped {
                    (slot.rect.x + j, slot.rect.y + i)
                } else {
                    (slot.rect.x + i, slot.rect.y + j)
                };
                if px < 0 || py < 0 || px >= self.page_size || py >= self.page_size {
                    continue;
                }
                let at = py as usize * stride + px as usize * 4;
                buf[at..at + 4].copy_from_slice(&texture.page_color(i, j).to_bytes());
            }
        }
        self.dirty[slot.page as usize] = true;
    }

    #[inline]
    pub fn page(&self, page: u32) -> Option<&[u8]> {
        self.pages.get(page as usize).map(|p| p.as_slice())
    }

    #[inline]
    pub fn page_size(&self) -> i32 {
        self.page_size
    }

    /// RGBA of one page texel.
    pub fn texel(&self, page: u32, x: i32, y: i32) -> Option<[u8; 4]> {
        let buf = self.page(page)?;
        if x < 0 || y < 0 || x >= self.page_size || y >= self.page_size {
            return None;
        }
        let at = (y * self.page_size + x) as usize * 4;
        buf.get(at..at + 4).and_then(|b| b.try_into().ok())
    }
}
