// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Report aggregation over a shape tree.
//!
//! Raw emissions are grouped into domains by a [`ReportingStrategy`] and
//! reduced by an [`AccumulationPolicy`]:
//!
//! | Strategy | Domains | Emission order inside a domain |
//! |---|---|---|
//! | `AllShapes` | one for the whole tree | breadth first |
//! | `LeafShapes` | one per leaf | leaf first, then ancestors |
//! | `SingleShape` | one per shape | the shape alone |
//!
//! Whole-tree results are read with [`CollectedReports::reports`]; per-shape
//! results with [`CollectedReports::reports_for`]. Asking for the other
//! granularity is a [`ReportError`].

use strata_geom_port::{ReportEmission, ReportValue, Reports, ShapeId};
use thiserror::Error;
use tracing::warn;

use crate::options::{AccumulationPolicy, ReportingStrategy};
use crate::tree::ShapeTree;

/// Requested granularity is not produced by the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReportError {
    /// Whole-tree reports requested from a per-shape strategy.
    #[error("reporting strategy {strategy:?} has no whole-tree result")]
    NoWholeTree {
        /// Active strategy.
        strategy: ReportingStrategy,
    },
    /// Per-shape reports requested from a whole-tree strategy.
    #[error("reporting strategy {strategy:?} has no per-shape results")]
    NoPerShape {
        /// Active strategy.
        strategy: ReportingStrategy,
    },
}

/// Collects raw emissions into domains, then reduces them.
#[derive(Debug)]
pub struct ReportAggregator {
    strategy: ReportingStrategy,
    policy: AccumulationPolicy,
    tree: Vec<ReportEmission>,
    shapes: Vec<(ShapeId, Vec<ReportEmission>)>,
}

impl ReportAggregator {
    /// Aggregator for one strategy and policy.
    pub fn new(strategy: ReportingStrategy, policy: AccumulationPolicy) -> Self {
        Self {
            strategy,
            policy,
            tree: Vec::new(),
            shapes: Vec::new(),
        }
    }

    /// Walk `tree` and gather raw emissions per domain.
    pub fn collect(&mut self, tree: &ShapeTree<'_>) {
        match self.strategy {
            ReportingStrategy::AllShapes => {
                for shape in tree.breadth_first() {
                    self.tree.extend(shape.reports.iter().cloned());
                }
            }
            ReportingStrategy::LeafShapes => {
                for leaf in tree.leaves() {
                    let raw = tree
                        .ancestry(leaf)
                        .flat_map(|s| s.reports.iter().cloned())
                        .collect();
                    self.shapes.push((leaf.id, raw));
                }
            }
            ReportingStrategy::SingleShape => {
                for shape in tree.shapes() {
                    self.shapes.push((shape.id, shape.reports.clone()));
                }
            }
        }
    }

    /// Apply the accumulation policy to every domain.
    pub fn finalize(self) -> CollectedReports {
        let policy = self.policy;
        let domains = if self.strategy.is_whole_tree() {
            Domains::Tree(accumulate(&self.tree, policy))
        } else {
            Domains::Shapes(
                self.shapes
                    .iter()
                    .map(|(id, raw)| (*id, accumulate(raw, policy)))
                    .collect(),
            )
        };
        CollectedReports {
            strategy: self.strategy,
            domains,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Domains {
    Tree(Reports),
    Shapes(Vec<(ShapeId, Reports)>),
}

/// Reduced reports, one per domain.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedReports {
    strategy: ReportingStrategy,
    domains: Domains,
}

impl CollectedReports {
    /// Reports of the whole tree.
    pub fn reports(&self) -> Result<&Reports, ReportError> {
        match &self.domains {
            Domains::Tree(reports) => Ok(reports),
            Domains::Shapes(_) => Err(ReportError::NoWholeTree {
                strategy: self.strategy,
            }),
        }
    }

    /// Reports of the domain keyed by `shape`.
    pub fn reports_for(&self, shape: ShapeId) -> Result<Option<&Reports>, ReportError> {
        match &self.domains {
            Domains::Shapes(domains) => Ok(domains
                .iter()
                .find(|(id, _)| *id == shape)
                .map(|(_, r)| r)),
            Domains::Tree(_) => Err(ReportError::NoPerShape {
                strategy: self.strategy,
            }),
        }
    }

    /// Per-shape domains in collection order; empty for whole-tree results.
    pub fn domains(&self) -> impl Iterator<Item = (ShapeId, &Reports)> {
        let shapes: &[(ShapeId, Reports)] = match &self.domains {
            Domains::Shapes(domains) => domains,
            Domains::Tree(_) => &[],
        };
        shapes.iter().map(|(id, r)| (*id, r))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Float,
    String,
}

const fn kind_of(value: &ReportValue) -> Kind {
    match value {
        ReportValue::Bool(_) => Kind::Bool,
        ReportValue::Float(_) => Kind::Float,
        ReportValue::String(_) => Kind::String,
    }
}

// Groups by key in first-seen order. A key keeps the kind of its first
// emission; later emissions of another kind are dropped.
fn group(raw: &[ReportEmission]) -> Vec<(&str, Kind, Vec<&ReportValue>)> {
    let mut groups: Vec<(&str, Kind, Vec<&ReportValue>)> = Vec::new();
    for emission in raw {
        let kind = kind_of(&emission.value);
        match groups.iter_mut().find(|(k, _, _)| *k == emission.key) {
            Some((_, g, values)) if *g == kind => values.push(&emission.value),
            Some(_) => warn!(
                key = %emission.key,
                "report key emitted with mixed kinds, dropping value"
            ),
            None => groups.push((emission.key.as_str(), kind, vec![&emission.value])),
        }
    }
    groups
}

fn accumulate(raw: &[ReportEmission], policy: AccumulationPolicy) -> Reports {
    let mut out = Reports::default();
    match policy {
        AccumulationPolicy::Append => {
            for emission in raw {
                push(&mut out, emission.key.clone(), &emission.value);
            }
        }
        AccumulationPolicy::WriteFirst => {
            let mut seen: Vec<&str> = Vec::new();
            for emission in raw {
                if !seen.contains(&emission.key.as_str()) {
                    seen.push(&emission.key);
                    push(&mut out, emission.key.clone(), &emission.value);
                }
            }
        }
        AccumulationPolicy::Sum => {
            for (key, kind, values) in group(raw) {
                match kind {
                    Kind::Bool => out.floats.push((key.to_owned(), true_count(&values))),
                    Kind::Float => out.floats.push((key.to_owned(), floats(&values).sum())),
                    Kind::String => out
                        .strings
                        .push((key.to_owned(), most_frequent(&values).to_owned())),
                }
            }
        }
        AccumulationPolicy::Summarize => {
            for (key, kind, values) in group(raw) {
                summarize(&mut out, key, kind, &values);
            }
        }
    }
    out
}

fn push(out: &mut Reports, key: String, value: &ReportValue) {
    match value {
        ReportValue::Bool(b) => out.bools.push((key, *b)),
        ReportValue::Float(f) => out.floats.push((key, *f)),
        ReportValue::String(s) => out.strings.push((key, s.clone())),
    }
}

fn summarize(out: &mut Reports, key: &str, kind: Kind, values: &[&ReportValue]) {
    let n = values.len() as f64;
    out.floats.push((format!("{key}_n"), n));
    match kind {
        Kind::Float => {
            let sum: f64 = floats(values).sum();
            let min = floats(values).fold(f64::INFINITY, f64::min);
            let max = floats(values).fold(f64::NEG_INFINITY, f64::max);
            out.floats.push((format!("{key}_avg"), sum / n));
            out.floats.push((format!("{key}_sum"), sum));
            out.floats.push((format!("{key}_min"), min));
            out.floats.push((format!("{key}_max"), max));
        }
        Kind::Bool => {
            let sum = true_count(values);
            let min = bools(values).all(|b| b);
            let max = bools(values).any(|b| b);
            out.floats.push((format!("{key}_avg"), sum / n));
            out.floats.push((format!("{key}_sum"), sum));
            out.bools.push((format!("{key}_min"), min));
            out.bools.push((format!("{key}_max"), max));
        }
        Kind::String => {
            let frequent = most_frequent(values).to_owned();
            let min = strings(values).min().unwrap_or_default().to_owned();
            let max = strings(values).max().unwrap_or_default().to_owned();
            out.strings.push((format!("{key}_avg"), frequent.clone()));
            out.strings.push((format!("{key}_sum"), frequent));
            out.strings.push((format!("{key}_min"), min));
            out.strings.push((format!("{key}_max"), max));
        }
    }
}

fn floats<'a>(values: &'a [&ReportValue]) -> impl Iterator<Item = f64> + 'a {
    values.iter().filter_map(|v| match v {
        ReportValue::Float(f) => Some(*f),
        _ => None,
    })
}

fn bools<'a>(values: &'a [&ReportValue]) -> impl Iterator<Item = bool> + 'a {
    values.iter().filter_map(|v| match v {
        ReportValue::Bool(b) => Some(*b),
        _ => None,
    })
}

fn strings<'a>(values: &'a [&'a ReportValue]) -> impl Iterator<Item = &'a str> + 'a {
    values.iter().filter_map(|v| match v {
        ReportValue::String(s) => Some(s.as_str()),
        _ => None,
    })
}

fn true_count(values: &[&ReportValue]) -> f64 {
    bools(values).filter(|&b| b).count() as f64
}

// ties go to the value seen first
fn most_frequent<'a>(values: &'a [&'a ReportValue]) -> &'a str {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for s in strings(values) {
        match counts.iter_mut().find(|(v, _)| *v == s) {
            Some((_, c)) => *c += 1,
            None => counts.push((s, 1)),
        }
    }
    let mut best = ("", 0);
    for (s, c) in counts {
        if c > best.1 {
            best = (s, c);
        }
    }
    best.0
}
