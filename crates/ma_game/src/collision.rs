//! Box geometry, overlap queries and the move-and-slide resolver.
//!
//! Everything solid in a level is an axis-aligned box: tile platforms and the
//! lily pads that are currently solid. The player moves with
//! **axis-separable move-and-slide**: resolve X against the solids first, then
//! resolve Y from the corrected X. This keeps the player from tunneling on
//! diagonals and lets them slide along walls.

use std::collections::HashMap;

const EPS: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center_x: f32,
    pub center_y: f32,
    pub half_w: f32,
    pub half_h: f32,
}

impl Aabb {
    pub fn new(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self {
            center_x,
            center_y,
            half_w: width * 0.5,
            half_h: height * 0.5,
        }
    }

    pub fn left(&self) -> f32 {
        self.center_x - self.half_w
    }

    pub fn right(&self) -> f32 {
        self.center_x + self.half_w
    }

    pub fn bottom(&self) -> f32 {
        self.center_y - self.half_h
    }

    pub fn top(&self) -> f32 {
        self.center_y + self.half_h
    }

    pub fn width(&self) -> f32 {
        self.half_w * 2.0
    }

    pub fn height(&self) -> f32 {
        self.half_h * 2.0
    }

    /// Strict overlap: boxes that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.bottom() < other.top()
            && self.top() > other.bottom()
    }

    /// Same center, each half extent grown by the given amount.
    pub fn expanded(&self, dx: f32, dy: f32) -> Aabb {
        Aabb {
            half_w: self.half_w + dx,
            half_h: self.half_h + dy,
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CollisionMoveResult {
    pub aabb: Aabb,
    pub collided_y: bool,
    pub blocked_left: bool,
    pub blocked_right: bool,
    pub blocked_down: bool,
    pub blocked_up: bool,
}

/// The collidable geometry handed to the physics step for one frame.
#[derive(Debug, Clone, Default)]
pub struct SolidSet {
    boxes: Vec<Aabb>,
}

impl SolidSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_boxes(boxes: impl IntoIterator<Item = Aabb>) -> Self {
        Self {
            boxes: boxes.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Aabb> {
        self.boxes.iter()
    }

    pub fn move_and_collide(&self, aabb: Aabb, dx: f32, dy: f32) -> CollisionMoveResult {
        const MOVE_EPS: f32 = 0.0001;

        let resolved_x = self.resolve_axis_x(aabb, dx);
        let collided_x = (resolved_x - (aabb.center_x + dx)).abs() > MOVE_EPS;

        let mut moved = aabb;
        moved.center_x = resolved_x;
        let resolved_y = self.resolve_axis_y(moved, dy);
        let collided_y = (resolved_y - (aabb.center_y + dy)).abs() > MOVE_EPS;
        moved.center_y = resolved_y;

        CollisionMoveResult {
            aabb: moved,
            collided_y,
            blocked_left: collided_x && dx < 0.0,
            blocked_right: collided_x && dx > 0.0,
            blocked_down: collided_y && dy < 0.0,
            blocked_up: collided_y && dy > 0.0,
        }
    }

    /// Solids the mover already penetrates are ignored, so a platform that
    /// appears around the player lets them walk or fall out instead of
    /// pinning them in place.
    fn blockers<'a>(&'a self, start: Aabb, swept: Aabb) -> impl Iterator<Item = &'a Aabb> + 'a {
        let start = start.expanded(-EPS, -EPS);
        let swept = swept.expanded(-EPS, -EPS);
        self.boxes
            .iter()
            .filter(move |solid| swept.overlaps(solid) && !start.overlaps(solid))
    }

    fn resolve_axis_x(&self, aabb: Aabb, dx: f32) -> f32 {
        if dx == 0.0 {
            return aabb.center_x;
        }

        let mut candidate_x = aabb.center_x + dx;
        let swept = Aabb {
            center_x: aabb.center_x + dx * 0.5,
            half_w: aabb.half_w + dx.abs() * 0.5,
            ..aabb
        };

        for solid in self.blockers(aabb, swept) {
            if dx > 0.0 {
                candidate_x = candidate_x.min(solid.left() - aabb.half_w);
            } else {
                candidate_x = candidate_x.max(solid.right() + aabb.half_w);
            }
        }

        // Never push against the direction of travel.
        if dx > 0.0 {
            candidate_x.max(aabb.center_x)
        } else {
            candidate_x.min(aabb.center_x)
        }
    }

    fn resolve_axis_y(&self, aabb: Aabb, dy: f32) -> f32 {
        if dy == 0.0 {
            return aabb.center_y;
        }

        let mut candidate_y = aabb.center_y + dy;
        let swept = Aabb {
            center_y: aabb.center_y + dy * 0.5,
            half_h: aabb.half_h + dy.abs() * 0.5,
            ..aabb
        };

        for solid in self.blockers(aabb, swept) {
            if dy > 0.0 {
                candidate_y = candidate_y.min(solid.bottom() - aabb.half_h);
            } else {
                candidate_y = candidate_y.max(solid.top() + aabb.half_h);
            }
        }

        if dy > 0.0 {
            candidate_y.max(aabb.center_y)
        } else {
            candidate_y.min(aabb.center_y)
        }
    }
}

/// Uniform-grid bucket index over a fixed list of boxes.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f32,
    buckets: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialHash {
    pub fn build(cell_size: f32, boxes: &[Aabb]) -> Self {
        let mut hash = Self {
            cell_size: cell_size.max(1.0),
            buckets: HashMap::new(),
        };
        for (index, aabb) in boxes.iter().enumerate() {
            for cell in hash.cells_for(aabb) {
                hash.buckets.entry(cell).or_default().push(index);
            }
        }
        hash
    }

    fn cells_for(&self, aabb: &Aabb) -> impl Iterator<Item = (i32, i32)> {
        let x0 = (aabb.left() / self.cell_size).floor() as i32;
        let x1 = (aabb.right() / self.cell_size).floor() as i32;
        let y0 = (aabb.bottom() / self.cell_size).floor() as i32;
        let y1 = (aabb.top() / self.cell_size).floor() as i32;
        (x0..=x1).flat_map(move |x| (y0..=y1).map(move |y| (x, y)))
    }

    /// Indices of boxes sharing a bucket with `aabb`, sorted and deduplicated.
    /// Callers still run the exact overlap test on each candidate.
    pub fn candidates(&self, aabb: &Aabb) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .cells_for(aabb)
            .filter_map(|cell| self.buckets.get(&cell))
            .flatten()
            .copied()
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}
