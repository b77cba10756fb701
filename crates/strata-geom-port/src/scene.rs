// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Materialized shape trees.
//!
//! [`GeneratedScene`] is a [`ShapeSource`] over trees that were generated
//! ahead of time, e.g. loaded from a JSON scene description. A tree may
//! record a generation failure, which is replayed as a traversal error.

use crate::{InitialShape, Shape, ShapeSource, ShapeStream, TraversalError};

/// Replayed generation failure.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenerationFailure {
    /// Number of shapes yielded before the failure.
    pub after: usize,
    /// Failure message.
    pub message: String,
}

/// One initial shape and the tree generated from it.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct GeneratedTree {
    /// Input of the generate call.
    pub initial: InitialShape,
    /// Generated shapes, parents before children.
    pub shapes: Vec<Shape>,
    /// Failure to replay, if any.
    pub failure: Option<GenerationFailure>,
}

impl GeneratedTree {
    /// Tree that generated successfully.
    pub fn new(initial: InitialShape, shapes: Vec<Shape>) -> Self {
        Self {
            initial,
            shapes,
            failure: None,
        }
    }

    /// Fail the walk after `after` shapes.
    pub fn failing_after(mut self, after: usize, message: impl Into<String>) -> Self {
        self.failure = Some(GenerationFailure {
            after,
            message: message.into(),
        });
        self
    }
}

/// In-memory collection of generated trees.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct GeneratedScene {
    /// Trees by initial shape index.
    pub trees: Vec<GeneratedTree>,
}

impl GeneratedScene {
    /// Wrap a tree list.
    pub fn new(trees: Vec<GeneratedTree>) -> Self {
        Self { trees }
    }
}

impl ShapeSource for GeneratedScene {
    fn initial_shape_count(&self) -> usize {
        self.trees.len()
    }

    fn initial_shape(&self, index: usize) -> Option<&InitialShape> {
        self.trees.get(index).map(|t| &t.initial)
    }

    fn traverse(&self, index: usize) -> ShapeStream<'_> {
        let Some(tree) = self.trees.get(index) else {
            return Box::new(core::iter::once(Err(TraversalError::new(format!(
                "no initial shape at index {index}"
            )))));
        };
        match &tree.failure {
            None => Box::new(tree.shapes.iter().map(Ok)),
            Some(failure) => {
                let failed_at = tree.shapes.get(failure.after).map(|s| s.id);
                let err = TraversalError {
                    shape: failed_at,
                    message: failure.message.clone(),
                };
                Box::new(
                    tree.shapes
                        .iter()
                        .take(failure.after)
                        .map(Ok)
                        .chain(core::iter::once(Err(err))),
                )
            }
        }
    }
}
