use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tilevox_segment::{Frame, VideoSettings};

#[derive(Debug, Default)]
struct Slots {
    /// Slot readers currently see.
    online: usize,
    online_users: usize,
    /// Slot being written, while `writing`.
    offline: usize,
    writing: bool,
    /// Most recently published slot.
    latest: usize,
}

/// Two frame buffers shared by one producer and any number of readers.
///
/// Slot selection happens under a single mutex; each frame sits behind its own lock so a
/// reader can never observe a frame the producer is resetting or filling.
pub struct FrameManager {
    slots: Mutex<Slots>,
    frames: [RwLock<Frame>; 2],
}

impl FrameManager {
    pub fn new(video: &VideoSettings) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            frames: [RwLock::new(Frame::new(video)), RwLock::new(Frame::new(video))],
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the slot readers are not using, resets it and hands it to the producer.
    ///
    /// Must not be called while the same thread holds an [`OnlineFrame`] of this manager.
    pub fn take_offline(&self) -> OfflineFrame<'_> {
        let slot = {
            let mut slots = self.slots();
            debug_assert!(!slots.writing, "offline frame taken twice");
            let slot = if slots.online_users > 0 {
                1 - slots.online
            } else {
                1 - slots.latest
            };
            slots.offline = slot;
            slots.writing = true;
            slot
        };
        let mut frame = self.frames[slot]
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        frame.reset();
        OfflineFrame {
            manager: self,
            slot,
            frame,
            published: false,
        }
    }

    /// Read access to the most recently published frame. While another reader holds the
    /// online frame the same slot is shared; a slot under construction is never chosen.
    pub fn take_online(&self) -> OnlineFrame<'_> {
        let slot = {
            let mut slots = self.slots();
            if slots.online_users == 0 {
                let mut slot = slots.latest;
                if slots.writing && slots.offline == slot {
                    slot = 1 - slot;
                }
                slots.online = slot;
            }
            slots.online_users += 1;
            slots.online
        };
        let frame = self.frames[slot]
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        OnlineFrame {
            manager: self,
            slot,
            frame,
        }
    }

    /// Publishes an empty frame so readers stop seeing shapes from before a reset.
    pub fn clear(&self) {
        self.take_offline().publish();
    }

    fn release_online(&self) {
        let mut slots = self.slots();
        slots.online_users = slots.online_users.saturating_sub(1);
    }

    fn release_offline(&self, slot: usize, published: bool) {
        let mut slots = self.slots();
        slots.writing = false;
        if published {
            slots.latest = slot;
        }
    }
}

/// The frame being filled by the producer. Dropping it without [`OfflineFrame::publish`]
/// discards its contents; readers keep the previous frame.
pub struct OfflineFrame<'a> {
    manager: &'a FrameManager,
    slot: usize,
    frame: RwLockWriteGuard<'a, Frame>,
    published: bool,
}

impl OfflineFrame<'_> {
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Makes the frame the next one readers get.
    pub fn publish(mut self) {
        self.published = true;
    }
}

impl Deref for OfflineFrame<'_> {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

impl DerefMut for OfflineFrame<'_> {
    fn deref_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }
}

impl Drop for OfflineFrame<'_> {
    fn drop(&mut self) {
        self.manager.release_offline(self.slot, self.published);
    }
}

/// Shared read access to the published frame.
pub struct OnlineFrame<'a> {
    manager: &'a FrameManager,
    slot: usize,
    frame: RwLockReadGuard<'a, Frame>,
}

impl OnlineFrame<'_> {
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl Deref for OnlineFrame<'_> {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

impl Drop for OnlineFrame<'_> {
    fn drop(&mut self) {
        self.manager.release_online();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_avoids_slot_in_use_by_readers() {
        let frames = FrameManager::new(&VideoSettings::default());
        let online = frames.take_online();
        let offline = frames.take_offline();
        assert_ne!(online.slot(), offline.slot());
        drop(online);
        offline.publish();

        let next = frames.take_online();
        assert_eq!(next.slot(), 1);
    }

    #[test]
    fn discarded_frame_is_not_published() {
        let frames = FrameManager::new(&VideoSettings::default());
        let published = frames.take_offline();
        let first = published.slot();
        published.publish();
        let discarded = frames.take_offline();
        assert_ne!(discarded.slot(), first);
        drop(discarded);
        assert_eq!(frames.take_online().slot(), first);
    }

    #[test]
    fn concurrent_readers_share_one_slot() {
        let frames = FrameManager::new(&VideoSettings::default());
        frames.take_offline().publish();
        let a = frames.take_online();
        frames.take_offline().publish();
        let b = frames.take_online();
        assert_eq!(a.slot(), b.slot());
    }
}
