use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Build phase of a model.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum ModelState {
    #[default]
    Initialized = 0,
    GeoCreated = 1,
    DataCreated = 2,
    Ready = 3,
    Released = 4,
}

impl ModelState {
    fn from_u8(v: u8) -> ModelState {
        match v {
            1 => ModelState::GeoCreated,
            2 => ModelState::DataCreated,
            3 => ModelState::Ready,
            4 => ModelState::Released,
            _ => ModelState::Initialized,
        }
    }
}

/// Model state shared between the building thread and the thread that uploads meshes.
///
/// The phase sits in the low byte and the build generation in the high 32 bits of one word,
/// so an upload can only finish the build that produced it.
#[derive(Clone, Debug, Default)]
pub struct SharedState(Arc<AtomicU64>);

const PHASE_MASK: u64 = 0xFF;

#[inline]
fn pack(generation: u32, state: ModelState) -> u64 {
    (u64::from(generation) << 32) | state as u64
}

impl SharedState {
    #[inline]
    pub fn get(&self) -> ModelState {
        ModelState::from_u8((self.0.load(Ordering::Acquire) & PHASE_MASK) as u8)
    }

    /// Build generation the current phase belongs to.
    #[inline]
    pub fn generation(&self) -> u32 {
        (self.0.load(Ordering::Acquire) >> 32) as u32
    }

    #[inline]
    pub fn set(&self, state: ModelState) {
        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
            Some((v & !PHASE_MASK) | state as u64)
        });
    }

    /// Starts a new build: bumps the generation and resets the phase to `Initialized`.
    pub fn begin_build(&self) -> u32 {
        let mut generation = 0;
        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
            generation = ((v >> 32) as u32).wrapping_add(1);
            Some(pack(generation, ModelState::Initialized))
        });
        generation
    }

    /// `DataCreated -> Ready` for build `generation`; fails when the model was rebuilt or
    /// released meanwhile.
    pub fn finish_upload(&self, generation: u32) -> bool {
        self.0
            .compare_exchange(
                pack(generation, ModelState::DataCreated),
                pack(generation, ModelState::Ready),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_invalidates_earlier_generation() {
        let state = SharedState::default();
        let first = state.begin_build();
        state.set(ModelState::DataCreated);
        let second = state.begin_build();
        state.set(ModelState::DataCreated);
        assert_ne!(first, second);
        assert!(!state.finish_upload(first));
        assert_eq!(state.get(), ModelState::DataCreated);
        assert!(state.finish_upload(second));
        assert_eq!(state.get(), ModelState::Ready);
        assert_eq!(state.generation(), second);
    }
}
