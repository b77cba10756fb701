// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Encode driver.
//!
//! [`Encoder::encode`] runs the whole pipeline for one initial shape:
//! traverse the generated tree, aggregate reports, queue leaf shapes for
//! preparation, finalize instances, flatten each into a host callback, then
//! hand over whole-tree reports. Any failure while traversing or staging the
//! tree falls back to the unprocessed initial shape when `errorFallback` is
//! on; only a failure of that fallback is returned.

use std::sync::Arc;

use strata_cas::ArchiveCache;
use strata_geom_port::{
    AttributeMap, Callbacks, EncoderSink, InitialShape, Shape, ShapeSource, TraversalError,
};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::flatten::GeometryFlattener;
use crate::marshal::convert_reports;
use crate::names::NameRegistry;
use crate::options::EncodeOptions;
use crate::prepare::{InstancePreparator, PrepareError};
use crate::reports::{CollectedReports, ReportAggregator, ReportError};
use crate::texture::TextureResolver;
use crate::tree::ShapeTree;

/// Failure of one encode call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The callback object provides no encoder sink.
    #[error("callback object does not provide an encoder sink")]
    IllegalCallbackObject,
    /// The requested initial shape does not exist.
    #[error("initial shape {index} out of range (source has {count})")]
    InitialShapeOutOfRange {
        /// Requested index.
        index: usize,
        /// Initial shapes available.
        count: usize,
    },
    /// Generated geometry is malformed and fallback is disabled, or the
    /// fallback geometry itself is malformed.
    #[error(transparent)]
    Prepare(#[from] PrepareError),
    /// Traversal failed and fallback is disabled.
    #[error("traversal of initial shape {index} failed")]
    Traversal {
        /// Initial shape being encoded.
        index: usize,
        /// Generator failure.
        #[source]
        source: TraversalError,
    },
    /// Reports were requested at a granularity the strategy lacks.
    #[error(transparent)]
    Reports(#[from] ReportError),
}

/// Outcome of one encode call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    /// `add_geometry` calls made.
    pub instances: usize,
    /// The unprocessed initial shape was encoded instead of the tree.
    pub used_fallback: bool,
    /// `add_report` calls made.
    pub reports_emitted: usize,
}

/// Stateful encoder session.
///
/// Pools and asset names persist across [`encode`](Self::encode) calls until
/// [`finish`](Self::finish).
#[derive(Debug)]
pub struct Encoder {
    options: EncodeOptions,
    preparator: InstancePreparator,
    flattener: GeometryFlattener,
    names: NameRegistry,
}

impl Encoder {
    /// Encoder with `options`.
    pub fn new(options: EncodeOptions) -> Self {
        Self {
            options,
            preparator: InstancePreparator::new(),
            flattener: GeometryFlattener::new(),
            names: NameRegistry::new(),
        }
    }

    /// Active options.
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Instance pool, for inspection.
    pub fn preparator(&self) -> &InstancePreparator {
        &self.preparator
    }

    /// Encode initial shape `index` of `source` into `callbacks`.
    ///
    /// `archive` backs package-embedded textures; without it those textures
    /// are dropped with a warning.
    #[instrument(skip(self, source, callbacks, archive))]
    pub fn encode(
        &mut self,
        source: &dyn ShapeSource,
        index: usize,
        callbacks: &mut dyn Callbacks,
        mut archive: Option<&mut ArchiveCache>,
    ) -> Result<EncodeSummary, EncodeError> {
        let sink = callbacks
            .encoder_sink()
            .ok_or(EncodeError::IllegalCallbackObject)?;
        let initial = source
            .initial_shape(index)
            .ok_or(EncodeError::InitialShapeOutOfRange {
                index,
                count: source.initial_shape_count(),
            })?;

        let mut summary = EncodeSummary::default();
        let traversal: Result<Vec<&Shape>, TraversalError> = source.traverse(index).collect();
        let staged = match traversal {
            Ok(shapes) => self.stage_tree(index, initial, shapes),
            Err(err) => Err(EncodeError::Traversal { index, source: err }),
        };
        let collected = match staged {
            Ok(collected) => collected,
            Err(err) => {
                self.preparator.discard_pending();
                if !self.options.error_fallback {
                    return Err(err);
                }
                error!(index, error = %err, "generation failed, encoding initial shape");
                summary.used_fallback = true;
                if let Err(err) = self.preparator.add_initial_shape(index, initial) {
                    self.preparator.discard_pending();
                    return Err(err.into());
                }
                None
            }
        };

        let instances = self
            .preparator
            .fetch_finalized_instances(&self.options.preparation);
        if self.options.emit_geometry {
            for (instance_index, instance) in instances.iter().enumerate() {
                let batch = {
                    let mut textures = TextureResolver::new(
                        &mut *sink,
                        archive.as_deref_mut(),
                        &mut self.names,
                        self.options.texture_format,
                        &self.options.base_name,
                    );
                    self.flattener.convert(
                        instance,
                        instance_index,
                        self.options.emit_materials,
                        &mut textures,
                    )
                };
                sink.add_geometry(&batch);
                summary.instances += 1;
            }
        }

        if let Some(collected) = collected.filter(|_| self.options.reporting.is_whole_tree()) {
            summary.reports_emitted = emit_tree_reports(sink, index, &collected)?;
        }

        info!(
            index,
            instances = summary.instances,
            fallback = summary.used_fallback,
            reports = summary.reports_emitted,
            "encoded initial shape"
        );
        Ok(summary)
    }

    /// Encode every initial shape of `source` in order.
    ///
    /// Stops at the first error.
    pub fn encode_all(
        &mut self,
        source: &dyn ShapeSource,
        callbacks: &mut dyn Callbacks,
        mut archive: Option<&mut ArchiveCache>,
    ) -> Result<Vec<EncodeSummary>, EncodeError> {
        (0..source.initial_shape_count())
            .map(|index| self.encode(source, index, callbacks, archive.as_deref_mut()))
            .collect()
    }

    /// End the session: drop pooled geometry, materials and asset names.
    pub fn finish(&mut self) {
        self.preparator.clear();
        self.names.clear();
    }

    /// Queue the leaves of a generated tree. Returns the reports when
    /// reporting is on.
    fn stage_tree(
        &mut self,
        index: usize,
        initial: &InitialShape,
        shapes: Vec<&Shape>,
    ) -> Result<Option<CollectedReports>, EncodeError> {
        let tree = ShapeTree::new(shapes);
        let collected = self.options.emit_report.then(|| {
            let mut aggregator =
                ReportAggregator::new(self.options.reporting, self.options.accumulation);
            aggregator.collect(&tree);
            aggregator.finalize()
        });
        let per_shape = !self.options.reporting.is_whole_tree();
        let attributes = Arc::new(initial.attributes.clone());
        for leaf in tree.leaves() {
            let reports = match &collected {
                Some(c) if per_shape => c.reports_for(leaf.id)?.cloned(),
                _ => None,
            };
            self.preparator.add(index, leaf, &attributes, reports)?;
        }
        Ok(collected)
    }
}

fn emit_tree_reports(
    sink: &mut dyn EncoderSink,
    index: usize,
    collected: &CollectedReports,
) -> Result<usize, ReportError> {
    let reports = collected.reports()?;
    if reports.is_empty() {
        return Ok(0);
    }
    let map: AttributeMap = convert_reports(reports);
    sink.add_report(index, &map);
    Ok(1)
}
