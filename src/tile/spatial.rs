use glam::DVec2;
use rstar::{RTree, RTreeObject, AABB};

/// Item stored in the tree with its decode order
struct Entry<T> {
    env: AABB<[f64; 2]>,
    order: usize,
    item: T,
}

impl<T> RTreeObject for Entry<T> {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.env
    }
}

/// R-tree over tile-local bounding boxes, built once per tile.
/// Queries return items in insertion order so draws are deterministic.
pub struct SpatialIndex<T> {
    tree: RTree<Entry<T>>,
}

impl<T> SpatialIndex<T> {
    /// Bulk load from `(min, max, item)` triples
    pub fn build(items: impl IntoIterator<Item = (DVec2, DVec2, T)>) -> Self {
        let entries: Vec<_> = items
            .into_iter()
            .enumerate()
            .map(|(order, (min, max, item))| Entry {
                env: AABB::from_corners([min.x, min.y], [max.x, max.y]),
                order,
                item,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn empty() -> Self {
        Self { tree: RTree::new() }
    }

    /// Items whose bounds intersect the box
    pub fn query(&self, min: DVec2, max: DVec2) -> Vec<&T> {
        let env = AABB::from_corners([min.x, min.y], [max.x, max.y]);
        let mut hits: Vec<&Entry<T>> = self.tree.locate_in_envelope_intersecting(&env).collect();
        hits.sort_unstable_by_key(|e| e.order);
        hits.into_iter().map(|e| &e.item).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.tree.iter().map(|e| &e.item)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
