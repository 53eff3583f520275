//! Vehicles are drained from the grouped input one chunk at a time, so only one chunk's
//! working set is alive at once. Chunking never changes the result.

use std::collections::{btree_map, BTreeMap};

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::classification::{group_by_vehicle, sort_rows, ClassificationMode, ClassificationRow};
use crate::error::Result;
use crate::models::{CaptureView, VehicleId};
use crate::timing::{elapsed_updates, ElapsedUpdate};

pub const DEFAULT_CHUNK_SIZE: usize = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeSummary {
    pub vehicles: usize,
    pub chunks: usize,
    pub updated: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkProcessor {
    chunk_size: usize,
}

impl Default for ChunkProcessor {
    fn default() -> Self {
        ChunkProcessor::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ChunkProcessor {
    pub fn new(chunk_size: usize) -> Self {
        ChunkProcessor {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunking only kicks in above twice the chunk size.
    pub fn is_chunked(&self, vehicles: usize) -> bool {
        vehicles > self.chunk_size.saturating_mul(2)
    }

    /// Drains grouped captures in vehicle order, one chunk per item.
    pub fn chunks(&self, groups: BTreeMap<VehicleId, Vec<CaptureView>>) -> VehicleChunks {
        let size = if self.is_chunked(groups.len()) {
            self.chunk_size
        } else {
            groups.len().max(1)
        };
        VehicleChunks {
            groups: groups.into_iter(),
            size,
        }
    }

    pub fn classify(&self, mode: ClassificationMode, captures: Vec<CaptureView>) -> Vec<ClassificationRow> {
        let groups = group_by_vehicle(captures);
        let mut rows = Vec::with_capacity(groups.len());
        for (index, chunk) in self.chunks(groups).enumerate() {
            let built: Vec<ClassificationRow> = chunk
                .par_iter()
                .filter_map(|captures| mode.build_row(captures))
                .collect();
            debug!(chunk = index, vehicles = chunk.len(), rows = built.len(), "classified chunk");
            rows.extend(built);
        }
        sort_rows(mode, &mut rows);
        rows
    }

    /// Recomputes elapsed times chunk by chunk and hands every update to `persist`, one at a
    /// time. Stops at the first failed write; updates already persisted stay in place.
    pub fn recompute<F>(&self, captures: Vec<CaptureView>, mut persist: F) -> Result<RecomputeSummary>
    where
        F: FnMut(&ElapsedUpdate) -> Result<()>,
    {
        let groups = group_by_vehicle(captures);
        let mut summary = RecomputeSummary {
            vehicles: groups.len(),
            ..RecomputeSummary::default()
        };
        for chunk in self.chunks(groups) {
            let updates: Vec<Vec<ElapsedUpdate>> = chunk
                .par_iter()
                .map(|captures| elapsed_updates(captures))
                .collect();
            for vehicle_updates in &updates {
                for update in vehicle_updates {
                    persist(update)?;
                    summary.updated += 1;
                }
            }
            debug!(chunk = summary.chunks, vehicles = chunk.len(), "recomputed chunk");
            summary.chunks += 1;
        }
        Ok(summary)
    }
}

pub struct VehicleChunks {
    groups: btree_map::IntoIter<VehicleId, Vec<CaptureView>>,
    size: usize,
}

impl Iterator for VehicleChunks {
    type Item = Vec<Vec<CaptureView>>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk: Vec<Vec<CaptureView>> = self
            .groups
            .by_ref()
            .take(self.size)
            .map(|(_, captures)| captures)
            .collect();
        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }
}
