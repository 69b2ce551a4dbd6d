//! KD-tree over triangles for segment queries.
//!
//! The split axis cycles X, Y, Z with depth and the split value is the median of the
//! triangles' extents along that axis. A triangle straddling the split plane is stored
//! in both children.

use crate::error::{PhotonError, Result};
use crate::triangle::Triangle;
use crate::vec3;
use num_traits::AsPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn next(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KdTreeParams {
    /// a node with fewer triangles than this becomes a leaf
    pub leaf_size: usize,
    pub max_depth: usize,
}

impl Default for KdTreeParams {
    fn default() -> Self {
        Self {
            leaf_size: 15,
            max_depth: 32,
        }
    }
}

impl KdTreeParams {
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.leaf_size == 0 {
            return Err(PhotonError::Configuration(
                "kd-tree leaf size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum KdNode<T> {
    Leaf {
        /// indices into the triangle list of the tree
        triangles: Vec<usize>,
    },
    Internal {
        axis: Axis,
        value: T,
        /// triangles with every vertex at or below `value`, plus the straddling ones
        left: Box<KdNode<T>>,
        /// triangles with every vertex at or above `value`, plus the straddling ones
        right: Box<KdNode<T>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit<T> {
    /// parameter along the segment in (0, 1]
    pub t: T,
    pub i_tri: usize,
}

#[derive(Debug, Clone)]
pub struct KdTree<T> {
    triangles: Vec<Triangle<T>>,
    root: KdNode<T>,
}

impl<T> KdTree<T>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    pub fn new(triangles: Vec<Triangle<T>>, params: &KdTreeParams) -> Self {
        let indices: Vec<usize> = (0..triangles.len()).collect();
        let root = build(&triangles, indices, Axis::X, 0, params);
        log::debug!(
            "kd-tree built over {} triangles: {} leaves, depth {}",
            triangles.len(),
            count_leaves(&root),
            node_depth(&root)
        );
        KdTree { triangles, root }
    }

    pub fn from_trimesh(tri2vtx: &[usize], vtx2xyz: &[T], params: &KdTreeParams) -> Self {
        Self::new(
            crate::triangle::triangles_from_trimesh(tri2vtx, vtx2xyz),
            params,
        )
    }

    pub fn triangles(&self) -> &[Triangle<T>] {
        &self.triangles
    }

    pub fn root(&self) -> &KdNode<T> {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn num_leaves(&self) -> usize {
        count_leaves(&self.root)
    }

    pub fn depth(&self) -> usize {
        node_depth(&self.root)
    }

    /// Closest hit along the segment from `a` to `b`, traversing the cells front to back
    /// with an explicit stack.
    pub fn first_intersection_segment(&self, a: &[T; 3], b: &[T; 3]) -> Option<SegmentHit<T>> {
        let dir = vec3::sub(b, a);
        let mut stack: Vec<(&KdNode<T>, T, T)> = vec![];
        let mut best: Option<SegmentHit<T>> = None;
        let mut node = &self.root;
        let (mut t_near, mut t_far) = (T::zero(), T::one());
        loop {
            match node {
                KdNode::Internal {
                    axis,
                    value,
                    left,
                    right,
                } => {
                    let (near, far, split) = order_children(*axis, *value, left, right, a, &dir);
                    match split {
                        Some(t_split) if t_split > T::zero() && t_split <= t_far => {
                            if t_split < t_near {
                                node = far;
                            } else {
                                stack.push((far, t_split, t_far));
                                node = near;
                                t_far = t_split;
                            }
                        }
                        _ => node = near,
                    }
                    continue;
                }
                KdNode::Leaf { triangles } => {
                    for &i_tri in triangles {
                        update_closest(&mut best, &self.triangles, i_tri, a, b);
                    }
                    if let Some(hit) = best {
                        if hit.t <= t_far {
                            return best;
                        }
                    }
                }
            }
            // the stack holds cells ordered front to back
            let Some((n, tn, tf)) = stack.pop() else {
                return best;
            };
            if let Some(hit) = best {
                if hit.t < tn {
                    return best;
                }
            }
            node = n;
            t_near = tn;
            t_far = tf;
        }
    }

    /// Same result as [`KdTree::first_intersection_segment`] with a recursive traversal.
    pub fn first_intersection_segment_recursive(
        &self,
        a: &[T; 3],
        b: &[T; 3],
    ) -> Option<SegmentHit<T>> {
        let dir = vec3::sub(b, a);
        let mut best = None;
        self.closest_in_node(&self.root, a, b, &dir, T::zero(), T::one(), &mut best);
        best
    }

    #[allow(clippy::too_many_arguments)]
    fn closest_in_node(
        &self,
        node: &KdNode<T>,
        a: &[T; 3],
        b: &[T; 3],
        dir: &[T; 3],
        t_near: T,
        t_far: T,
        best: &mut Option<SegmentHit<T>>,
    ) {
        match node {
            KdNode::Leaf { triangles } => {
                for &i_tri in triangles {
                    update_closest(best, &self.triangles, i_tri, a, b);
                }
            }
            KdNode::Internal {
                axis,
                value,
                left,
                right,
            } => {
                let (near, far, split) = order_children(*axis, *value, left, right, a, dir);
                match split {
                    Some(t_split) if t_split > T::zero() && t_split <= t_far => {
                        if t_split < t_near {
                            self.closest_in_node(far, a, b, dir, t_near, t_far, best);
                        } else {
                            self.closest_in_node(near, a, b, dir, t_near, t_split, best);
                            if best.map_or(true, |hit| hit.t >= t_split) {
                                self.closest_in_node(far, a, b, dir, t_split, t_far, best);
                            }
                        }
                    }
                    _ => self.closest_in_node(near, a, b, dir, t_near, t_far, best),
                }
            }
        }
    }

    /// Every triangle crossed by the segment, each reported once, ordered by triangle index.
    pub fn intersections_segment(&self, a: &[T; 3], b: &[T; 3]) -> Vec<SegmentHit<T>> {
        let dir = vec3::sub(b, a);
        let mut hits = vec![];
        let mut stack: Vec<(&KdNode<T>, T, T)> = vec![(&self.root, T::zero(), T::one())];
        while let Some((node, t_near, t_far)) = stack.pop() {
            match node {
                KdNode::Leaf { triangles } => {
                    for &i_tri in triangles {
                        if let Some(t) = self.triangles[i_tri].intersection_against_segment(a, b) {
                            hits.push(SegmentHit { t, i_tri });
                        }
                    }
                }
                KdNode::Internal {
                    axis,
                    value,
                    left,
                    right,
                } => {
                    let (near, far, split) = order_children(*axis, *value, left, right, a, &dir);
                    match split {
                        Some(t_split) if t_split > T::zero() && t_split <= t_far => {
                            if t_split < t_near {
                                stack.push((far, t_near, t_far));
                            } else {
                                stack.push((far, t_split, t_far));
                                stack.push((near, t_near, t_split));
                            }
                        }
                        _ => stack.push((near, t_near, t_far)),
                    }
                }
            }
        }
        hits.sort_by_key(|hit| hit.i_tri);
        hits.dedup_by_key(|hit| hit.i_tri);
        hits
    }
}

fn build<T>(
    triangles: &[Triangle<T>],
    indices: Vec<usize>,
    axis: Axis,
    depth: usize,
    params: &KdTreeParams,
) -> KdNode<T>
where
    T: num_traits::Float,
{
    if indices.len() < params.leaf_size || indices.len() <= 1 || depth >= params.max_depth {
        return KdNode::Leaf { triangles: indices };
    }
    let i_axis = axis.index();
    let value = median_extent(triangles, &indices, i_axis);
    let mut left = vec![];
    let mut right = vec![];
    for &i_tri in &indices {
        let tri = &triangles[i_tri];
        if tri.max[i_axis] <= value {
            left.push(i_tri);
        } else if tri.min[i_axis] >= value {
            right.push(i_tri);
        } else {
            left.push(i_tri);
            right.push(i_tri);
        }
    }
    if left.len() == indices.len() && right.len() == indices.len() {
        // every triangle straddles the plane
        return KdNode::Leaf { triangles: indices };
    }
    KdNode::Internal {
        axis,
        value,
        left: Box::new(build(triangles, left, axis.next(), depth + 1, params)),
        right: Box::new(build(triangles, right, axis.next(), depth + 1, params)),
    }
}

/// median of the sorted list holding each triangle's min and max along the axis
fn median_extent<T>(triangles: &[Triangle<T>], indices: &[usize], i_axis: usize) -> T
where
    T: num_traits::Float,
{
    let mut values: Vec<T> = Vec::with_capacity(indices.len() * 2);
    for &i_tri in indices {
        values.push(triangles[i_tri].min[i_axis]);
        values.push(triangles[i_tri].max[i_axis]);
    }
    let mid = values.len() / 2;
    let (_, median, _) = values.select_nth_unstable_by(mid, |a, b| {
        a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
    });
    *median
}

/// Children in the order the segment visits them, and the segment parameter of the split
/// plane (`None` when the segment runs parallel to it).
fn order_children<'a, T>(
    axis: Axis,
    value: T,
    left: &'a KdNode<T>,
    right: &'a KdNode<T>,
    a: &[T; 3],
    dir: &[T; 3],
) -> (&'a KdNode<T>, &'a KdNode<T>, Option<T>)
where
    T: num_traits::Float,
{
    let i = axis.index();
    let left_first = a[i] < value || (a[i] == value && dir[i] <= T::zero());
    let (near, far) = if left_first {
        (left, right)
    } else {
        (right, left)
    };
    if dir[i] == T::zero() {
        return (near, far, None);
    }
    (near, far, Some((value - a[i]) / dir[i]))
}

fn update_closest<T>(
    best: &mut Option<SegmentHit<T>>,
    triangles: &[Triangle<T>],
    i_tri: usize,
    a: &[T; 3],
    b: &[T; 3],
) where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    if let Some(t) = triangles[i_tri].intersection_against_segment(a, b) {
        if best.map_or(true, |hit| t < hit.t) {
            *best = Some(SegmentHit { t, i_tri });
        }
    }
}

pub fn sort_by_parameter<T>(hits: &mut [SegmentHit<T>])
where
    T: num_traits::Float,
{
    hits.sort_by(|h0, h1| {
        h0.t
            .partial_cmp(&h1.t)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn count_leaves<T>(node: &KdNode<T>) -> usize {
    match node {
        KdNode::Leaf { .. } => 1,
        KdNode::Internal { left, right, .. } => count_leaves(left) + count_leaves(right),
    }
}

fn node_depth<T>(node: &KdNode<T>) -> usize {
    match node {
        KdNode::Leaf { .. } => 0,
        KdNode::Internal { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

/// Closest hit by testing every triangle.
pub fn first_intersection_segment_bruteforce<T>(
    triangles: &[Triangle<T>],
    a: &[T; 3],
    b: &[T; 3],
) -> Option<SegmentHit<T>>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    let mut best = None;
    for i_tri in 0..triangles.len() {
        update_closest(&mut best, triangles, i_tri, a, b);
    }
    best
}

/// All hits by testing every triangle, ordered by triangle index.
pub fn intersections_segment_bruteforce<T>(
    triangles: &[Triangle<T>],
    a: &[T; 3],
    b: &[T; 3],
) -> Vec<SegmentHit<T>>
where
    T: num_traits::Float + 'static + Copy,
    f64: AsPrimitive<T>,
{
    triangles
        .iter()
        .enumerate()
        .filter_map(|(i_tri, tri)| {
            tri.intersection_against_segment(a, b)
                .map(|t| SegmentHit { t, i_tri })
        })
        .collect()
}
