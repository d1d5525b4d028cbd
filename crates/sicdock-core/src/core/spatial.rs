use crate::core::geometry::Xform;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::Point3;

/// A point in a fragment's local frame, with the weight it contributes to contact sums.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub position: Point3<f64>,
    pub weight: f64,
}

impl WeightedPoint {
    pub fn new(position: Point3<f64>, weight: f64) -> Self {
        Self { position, weight }
    }
}

/// One indexed point found near a placed query point.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub indexed: Point3<f64>,
    pub indexed_weight: f64,
    /// Query point after it has been moved into the index frame.
    pub query: Point3<f64>,
    pub query_weight: f64,
    pub dist_sq: f64,
}

/// Radius-bounded neighbor lookup over a fixed set of weighted points.
///
/// The tree is built once from the reference fragment and balanced over the
/// whole point set, so coplanar or coincident points are accepted. Queries
/// never modify it; only the transform used to place each query point changes.
pub struct SpatialIndex {
    points: Vec<WeightedPoint>,
    tree: Option<ImmutableKdTree<f64, 3>>,
    radius: f64,
    radius_sq: f64,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("len", &self.points.len())
            .field("radius", &self.radius)
            .finish()
    }
}

impl SpatialIndex {
    pub fn new(points: Vec<WeightedPoint>, radius: f64) -> Self {
        let coords: Vec<[f64; 3]> = points
            .iter()
            .map(|p| [p.position.x, p.position.y, p.position.z])
            .collect();
        let tree = (!coords.is_empty()).then(|| ImmutableKdTree::new_from_slice(&coords));
        let radius = radius.max(0.0);
        Self {
            points,
            tree,
            radius,
            radius_sq: radius * radius,
        }
    }

    /// Places `query` with `xform` and calls `visitor` for every indexed point
    /// strictly closer than the index radius.
    pub fn visit<F>(&self, xform: &Xform, query: &WeightedPoint, mut visitor: F)
    where
        F: FnMut(&Contact),
    {
        let Some(tree) = &self.tree else {
            return;
        };
        let placed = xform * query.position;
        let neighbours =
            tree.within_unsorted::<SquaredEuclidean>(&[placed.x, placed.y, placed.z], self.radius_sq);

        for neighbour in neighbours {
            let indexed = &self.points[neighbour.item as usize];
            let dist_sq = (indexed.position - placed).norm_squared();
            if dist_sq >= self.radius_sq {
                continue;
            }
            visitor(&Contact {
                indexed: indexed.position,
                indexed_weight: indexed.weight,
                query: placed,
                query_weight: query.weight,
                dist_sq,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

}
