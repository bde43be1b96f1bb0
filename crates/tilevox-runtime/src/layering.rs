use tilevox_model::{Layer, LayerSettings};
use tilevox_pattern::PatternStore;
use tilevox_segment::{Frame, Shape};
use tilevox_tiles::{Density, PatternId};

/// Shapes smaller than this never take part in layering.
const MIN_TILES: usize = 4;

#[derive(Copy, Clone, Debug)]
struct Interaction {
    pattern: PatternId,
    contact: bool,
    overlap: bool,
}

fn is_actor(shape: &Shape, store: &PatternStore) -> bool {
    shape.tile_count() >= MIN_TILES
        && !shape.hidden
        && shape
            .pattern()
            .and_then(|id| store.get(id))
            .is_some_and(|p| p.pixel_density > Density::Low)
}

/// Sprites not pushed behind the background; only these can hide a pattern by crossing it.
fn in_front_layer(shape: &Shape, store: &PatternStore) -> bool {
    shape
        .pattern()
        .and_then(|id| store.get(id))
        .is_some_and(|p| matches!(p.layer(), Layer::Unidentified | Layer::L1))
}

/// Moves background patterns of unidentified layer in front of (L1) or behind (L2) the
/// sprites from how long sprites have been standing on them or crossing them.
///
/// Sprites are visited in frame order, so sort them by area first. Returns how many patterns
/// changed layer.
pub fn auto_layer(frame: &Frame, store: &mut PatternStore, layers: &LayerSettings) -> usize {
    let counter = frame.frame_counter();
    let grid = frame.grid();
    let registry = store.tiles();

    let actors: Vec<&Shape> = frame.sprite_shapes().filter(|s| is_actor(s, store)).collect();
    if actors.is_empty() {
        return 0;
    }
    let mut seen = Vec::new();
    for shape in frame.bg_shapes() {
        let Some(id) = shape.pattern() else { continue };
        let unidentified = store.get(id).is_some_and(|p| p.layer() == Layer::Unidentified);
        if shape.tile_count() < MIN_TILES || !unidentified {
            continue;
        }
        let contact = actors.iter().any(|s| shape.is_contact_with(s, grid, registry));
        let overlap = actors
            .iter()
            .filter(|s| in_front_layer(s, store))
            .any(|s| Shape::overlaps(shape, s, grid, registry));
        if contact || overlap {
            seen.push(Interaction {
                pattern: id,
                contact,
                overlap,
            });
        }
    }

    let mut moved = 0;
    for hit in seen {
        let Some(pattern) = store.get_mut(hit.pattern) else { continue };
        if pattern.layer() != Layer::Unidentified {
            continue;
        }
        let contacts = if hit.contact { pattern.lifecycle.record_contact(counter) } else { 0 };
        let overlaps = if hit.overlap { pattern.lifecycle.record_overlap(counter) } else { 0 };
        let layer = if contacts > layers.contact_frames {
            Some(Layer::L1)
        } else if overlaps > layers.overlap_frames {
            Some(Layer::L2)
        } else {
            None
        };
        if let Some(layer) = layer {
            pattern.set_layer(layer);
            moved += 1;
            log::debug!(
                target: "patterns",
                "pattern {:?} moved to {layer:?} at frame {counter}",
                hit.pattern
            );
        }
    }
    moved
}
