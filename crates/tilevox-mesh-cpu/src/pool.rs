use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};

/// Buffers that can be emptied for reuse without giving back their allocation.
pub trait Recycle: Default + Send {
    fn recycle(&mut self);
}

/// Lock-free free-list of reusable buffers shared by mesh workers.
///
/// At most `max_idle` buffers are kept; extra ones returned to a full pool are dropped.
pub struct BufferPool<T> {
    available_tx: Sender<T>,
    available_rx: Receiver<T>,
    created: AtomicUsize,
}

impl<T: Recycle> BufferPool<T> {
    pub fn new(max_idle: usize) -> Arc<Self> {
        debug_assert!(max_idle > 0);
        let (tx, rx) = bounded(max_idle.max(1));
        Arc::new(Self {
            available_tx: tx,
            available_rx: rx,
            created: AtomicUsize::new(0),
        })
    }

    /// Takes an idle buffer or creates a new one.
    pub fn acquire(self: &Arc<Self>) -> Pooled<T> {
        let item = match self.available_rx.try_recv() {
            Ok(item) => item,
            Err(_) => {
                self.created.fetch_add(1, Ordering::Relaxed);
                T::default()
            }
        };
        Pooled {
            item,
            pool: Arc::clone(self),
        }
    }

    fn release(&self, mut item: T) {
        item.recycle();
        if self.available_tx.try_send(item).is_err() {
            log::trace!(target: "model", "mesh pool full, dropping buffer");
        }
    }

    #[inline]
    pub fn idle(&self) -> usize {
        self.available_rx.len()
    }

    /// Buffers allocated over the pool's lifetime.
    #[inline]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// A buffer on loan from a [`BufferPool`]; returned when dropped.
pub struct Pooled<T: Recycle> {
    item: T,
    pool: Arc<BufferPool<T>>,
}

impl<T: Recycle> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

impl<T: Recycle> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.item
    }
}

impl<T: Recycle> Drop for Pooled<T> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.item));
    }
}

impl<T: Recycle + std::fmt::Debug> std::fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.item.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MeshBuild;

    #[test]
    fn released_buffers_keep_capacity() {
        let pool = BufferPool::<MeshBuild>::new(2);
        {
            let mut m = pool.acquire();
            m.pos.extend_from_slice(&[1.0; 300]);
        }
        assert_eq!(pool.idle(), 1);
        let m = pool.acquire();
        assert!(m.pos.is_empty());
        assert!(m.pos.capacity() >= 300);
        assert_eq!(pool.created(), 1);
    }

    #[test]
    fn full_pool_drops_extra_buffers() {
        let pool = BufferPool::<MeshBuild>::new(1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 1);
        assert_eq!(pool.created(), 2);
    }
}
