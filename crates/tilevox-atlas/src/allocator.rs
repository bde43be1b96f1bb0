use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use hashbrown::HashMap;
use tilevox_geom::{IRect, IVec2};

use crate::error::AtlasError;
use crate::pages::AtlasPages;
use crate::settings::AtlasSettings;
use crate::texture::{TextureData, TextureId};

/// Where a texture lives: a rectangle on one page, transposed when `flipped`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AtlasSlot {
    pub page: u32,
    pub rect: IRect,
    pub flipped: bool,
}

impl AtlasSlot {
    /// Top-left corner in page UV space.
    pub fn uv_offset(&self, page_size: i32) -> [f32; 2] {
        let s = page_size as f32;
        [self.rect.x as f32 / s, self.rect.y as f32 / s]
    }

    /// Slot-relative UV of texture coordinate `coord`.
    pub fn coord_to_uv(&self, coord: [f32; 2], page_size: i32) -> [f32; 2] {
        let s = page_size as f32;
        if self.flipped {
            [coord[1] / s, coord[0] / s]
        } else {
            [coord[0] / s, coord[1] / s]
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct FreeRegion {
    page: u32,
    rect: IRect,
}

/// A page write queued by the allocator and applied by [`AtlasPages::commit`].
pub(crate) struct PendingWrite {
    pub slot: AtlasSlot,
    pub texture: Arc<TextureData>,
}

/// Creates the allocator (producer side) and the page buffers (consumer side) connected
/// by a bounded pending-write ring.
pub fn atlas_channel(settings: &AtlasSettings) -> (AtlasAllocator, AtlasPages) {
    let (tx, rx) = bounded(settings.ring_capacity.max(1));
    let mut alloc = AtlasAllocator {
        page_size: settings.page_size,
        page_count: settings.page_count,
        free: VecDeque::new(),
        used: HashMap::new(),
        tx,
        overflow: rx.clone(),
        overwritten: 0,
    };
    alloc.reset();
    let pages = AtlasPages::new(settings.page_size, settings.page_count, rx);
    (alloc, pages)
}

fn can_contain(region: IVec2, tex: IVec2) -> bool {
    region.min_elem() >= tex.min_elem() && region.max_elem() >= tex.max_elem()
}

/// Shelf packer over `page_count` square pages.
///
/// Free regions are kept most-recently-freed first; allocation takes the first region
/// that can hold the texture in either orientation.
pub struct AtlasAllocator {
    page_size: i32,
    page_count: u32,
    free: VecDeque<FreeRegion>,
    used: HashMap<TextureId, AtlasSlot>,
    tx: Sender<PendingWrite>,
    overflow: Receiver<PendingWrite>,
    overwritten: u64,
}

impl AtlasAllocator {
    /// Places `tex` (or re-stamps its existing slot) and queues its pixels for the next
    /// commit.
    pub fn register(&mut self, tex: &Arc<TextureData>) -> Result<AtlasSlot, AtlasError> {
        if let Some(slot) = self.used.get(&tex.id()).copied() {
            log::trace!(target: "atlas", "re-stamp {:?} at page {}", tex.id(), slot.page);
            self.enqueue(slot, tex.clone());
            return Ok(slot);
        }
        let size = tex.size();
        let region = self
            .free
            .iter()
            .position(|r| can_contain(r.rect.size(), size))
            .and_then(|pos| self.free.remove(pos))
            .ok_or(AtlasError::OutOfSpace {
                width: size.x,
                height: size.y,
                pages: self.page_count,
            })?;
        let slot = self.carve(region, size);
        self.used.insert(tex.id(), slot);
        log::debug!(
            target: "atlas",
            "slot {:?} page {} at ({}, {}) {}x{} flipped={}",
            tex.id(),
            slot.page,
            slot.rect.x,
            slot.rect.y,
            slot.rect.w,
            slot.rect.h,
            slot.flipped
        );
        self.enqueue(slot, tex.clone());
        Ok(slot)
    }

    fn carve(&mut self, region: FreeRegion, tex: IVec2) -> AtlasSlot {
        let r = region.rect.size();
        let flipped = tex.x != tex.y
            && if r.min_elem() < tex.max_elem() {
                r.min_axis() != tex.min_axis()
            } else {
                r.min_axis() == tex.min_axis()
            };
        let placed = if flipped { tex.transposed() } else { tex };
        let rect = IRect::new(region.rect.x, region.rect.y, placed.x, placed.y);
        if rect.w < region.rect.w {
            self.free.push_front(FreeRegion {
                page: region.page,
                rect: IRect::new(rect.x + rect.w, rect.y, region.rect.w - rect.w, rect.h),
            });
        }
        if rect.h < region.rect.h {
            self.free.push_front(FreeRegion {
                page: region.page,
                rect: IRect::new(rect.x, rect.y + rect.h, region.rect.w, region.rect.h - rect.h),
            });
        }
        AtlasSlot {
            page: region.page,
            rect,
            flipped,
        }
    }

    /// Returns the slot's rectangle to the front of the free list.
    pub fn deregister(&mut self, id: TextureId) -> Option<AtlasSlot> {
        let slot = self.used.remove(&id)?;
        self.free.push_front(FreeRegion {
            page: slot.page,
            rect: slot.rect,
        });
        Some(slot)
    }

    #[inline]
    pub fn slot(&self, id: TextureId) -> Option<AtlasSlot> {
        self.used.get(&id).copied()
    }

    /// Slot-relative UV of a texture coordinate, `None` when the texture has no slot.
    pub fn coord_to_uv(&self, id: TextureId, coord: [f32; 2]) -> Option<[f32; 2]> {
        self.slot(id).map(|s| s.coord_to_uv(coord, self.page_size))
    }

    /// Frees every slot and drops writes not yet committed.
    pub fn reset(&mut self) {
        self.used.clear();
        self.free.clear();
        for page in 0..self.page_count {
            self.free.push_back(FreeRegion {
                page,
                rect: IRect::new(0, 0, self.page_size, self.page_size),
            });
        }
        while self.overflow.try_recv().is_ok() {}
    }

    fn enqueue(&mut self, slot: AtlasSlot, texture: Arc<TextureData>) {
        let mut write = PendingWrite { slot, texture };
        loop {
            match self.tx.try_send(write) {
                Ok(()) => return,
                Err(TrySendError::Full(w)) => {
                    // ring is full: the oldest pending write is overwritten
                    if self.overflow.try_recv().is_ok() {
                        self.overwritten += 1;
                    }
                    write = w;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    #[inline]
    pub fn page_size(&self) -> i32 {
        self.page_size
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn live_slots(&self) -> impl Iterator<Item = (TextureId, AtlasSlot)> + '_ {
        self.used.iter().map(|(id, slot)| (*id, *slot))
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.used.len()
    }

    #[inline]
    pub fn free_region_count(&self) -> usize {
        self.free.len()
    }

    /// Pending writes dropped because the ring was full.
    #[inline]
    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }
}
