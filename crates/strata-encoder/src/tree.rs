// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Indexed view over one generated shape tree.
//!
//! Shapes only know their parent. The tree is indexed once per traversal so
//! leaf detection, depth and ancestry are lookups instead of rescans.

use std::collections::{HashMap, HashSet};

use strata_geom_port::{Shape, ShapeId};

/// Borrowed shapes of one tree, in traversal order.
#[derive(Debug)]
pub struct ShapeTree<'a> {
    shapes: Vec<&'a Shape>,
    by_id: HashMap<ShapeId, usize>,
    parents: HashSet<ShapeId>,
}

impl<'a> ShapeTree<'a> {
    /// Index `shapes`. Later duplicates of an id shadow earlier ones.
    pub fn new(shapes: Vec<&'a Shape>) -> Self {
        let by_id = shapes.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        let parents = shapes.iter().filter_map(|s| s.parent).collect();
        Self {
            shapes,
            by_id,
            parents,
        }
    }

    /// Number of shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns `true` for an empty tree.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Shape with `id`.
    pub fn get(&self, id: ShapeId) -> Option<&'a Shape> {
        self.by_id.get(&id).map(|&i| self.shapes[i])
    }

    /// Shapes in traversal order.
    pub fn shapes(&self) -> &[&'a Shape] {
        &self.shapes
    }

    /// Returns `true` if no shape names `id` as its parent.
    pub fn is_leaf(&self, id: ShapeId) -> bool {
        !self.parents.contains(&id)
    }

    /// Leaves in traversal order.
    pub fn leaves(&self) -> impl Iterator<Item = &'a Shape> + '_ {
        self.shapes.iter().copied().filter(|s| self.is_leaf(s.id))
    }

    /// Distance from the root. Parents outside the tree end the walk.
    pub fn depth(&self, shape: &'a Shape) -> usize {
        self.ancestry(shape).count() - 1
    }

    /// `shape` followed by its ancestors up to the root.
    ///
    /// The walk is bounded by the tree size so a malformed parent cycle
    /// cannot loop forever.
    pub fn ancestry(&self, shape: &'a Shape) -> impl Iterator<Item = &'a Shape> + '_ {
        let mut next = Some(shape);
        let mut budget = self.shapes.len().max(1);
        std::iter::from_fn(move || {
            let current = next.take()?;
            budget = budget.checked_sub(1)?;
            next = current.parent.and_then(|p| self.get(p));
            Some(current)
        })
    }

    /// Shapes ordered by depth; ties keep traversal order.
    pub fn breadth_first(&self) -> Vec<&'a Shape> {
        let mut ordered: Vec<(usize, &'a Shape)> =
            self.shapes.iter().map(|&s| (self.depth(s), s)).collect();
        ordered.sort_by_key(|&(depth, _)| depth);
        ordered.into_iter().map(|(_, s)| s).collect()
    }
}
