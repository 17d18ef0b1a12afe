use rstar::{RTree, RTreeObject, AABB};

use super::canvas::display_width;

/// Footprint of a placed label in character cells, padded by one cell
struct PlacedLabel {
    env: AABB<[f64; 2]>,
}

impl RTreeObject for PlacedLabel {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.env
    }
}

/// Labels already placed during one render pass.
/// First come, first placed: later labels that would overlap are refused.
#[derive(Default)]
pub struct LabelBuffer {
    tree: RTree<PlacedLabel>,
}

impl LabelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve room for `text` starting at character cell `(x, y)`.
    /// Returns false when the padded box collides with an earlier label.
    pub fn write_if_possible(&mut self, text: &str, x: i32, y: i32) -> bool {
        let width = display_width(text) as f64;
        let (x, y) = (x as f64, y as f64);
        let env = AABB::from_corners([x - 1.0, y - 1.0], [x + width + 1.0, y + 1.0]);

        if self.tree.locate_in_envelope_intersecting(&env).next().is_some() {
            return false;
        }
        self.tree.insert(PlacedLabel { env });
        true
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
