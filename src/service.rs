use chrono::{NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::chunk::{ChunkProcessor, RecomputeSummary};
use crate::classification::{ClassificationMode, ClassificationRow};
use crate::config::Config;
use crate::error::{Result, TimingError};
use crate::models::{
    Capture, CaptureId, CaptureUpdate, CaptureView, CategoryId, Event, EventId, NewCapture,
    Penalties, PenaltyRequest, Stage, StageId, VehicleId, VehicleProfile,
};
use crate::penalty::duration_or_zero;
use crate::store::CaptureStore;
use crate::validator::Validator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassificationScope {
    General,
    Category(CategoryId),
    Stage(i32),
}

impl ClassificationScope {
    /// A category takes precedence over a stage when both are given.
    pub fn from_filters(category_id: Option<CategoryId>, stage_order: Option<i32>) -> Self {
        match (category_id, stage_order) {
            (Some(category_id), _) => ClassificationScope::Category(category_id),
            (None, Some(stage_order)) => ClassificationScope::Stage(stage_order),
            (None, None) => ClassificationScope::General,
        }
    }
}

fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub struct TimingService<S> {
    store: S,
    validator: Validator,
    chunks: ChunkProcessor,
    clock: fn() -> NaiveDateTime,
}

impl<S: CaptureStore> TimingService<S> {
    pub fn new(store: S, validator: Validator, chunks: ChunkProcessor) -> Self {
        TimingService {
            store,
            validator,
            chunks,
            clock: utc_now,
        }
    }

    pub fn from_config(store: S, config: &Config) -> Self {
        Self::new(
            store,
            Validator::new(config.timestamp_horizon),
            ChunkProcessor::new(config.chunk_size),
        )
    }

    /// Replaces the wall clock used by timestamp validation.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn require_event(&self, id: EventId) -> Result<Event> {
        self.store
            .event(id)?
            .ok_or_else(|| TimingError::not_found("event", id))
    }

    fn require_stage(&self, id: StageId) -> Result<Stage> {
        self.store
            .stage(id)?
            .ok_or_else(|| TimingError::not_found("stage", id))
    }

    fn require_vehicle(&self, id: VehicleId) -> Result<VehicleProfile> {
        self.store
            .vehicle(id)?
            .ok_or_else(|| TimingError::not_found("vehicle", id))
    }

    fn require_capture(&self, id: CaptureId) -> Result<Capture> {
        self.store
            .capture(id)?
            .ok_or_else(|| TimingError::capture_not_found(id))
    }

    fn check_timestamp(&self, timestamp: NaiveDateTime, stage: &Stage) -> Result<()> {
        let event = self.require_event(stage.event_id)?;
        self.validator.check_timestamp(timestamp, &event, (self.clock)())
    }

    pub fn create_capture(&self, request: &NewCapture) -> Result<Capture> {
        let stage = self.require_stage(request.stage_id)?;
        self.require_vehicle(request.vehicle_id)?;
        if self.store.exists(request.vehicle_id, request.stage_id)? {
            warn!(
                vehicle_id = request.vehicle_id,
                stage_id = request.stage_id,
                "rejected duplicate stage result"
            );
            return Err(TimingError::DuplicateCapture {
                vehicle_id: request.vehicle_id,
                stage_id: request.stage_id,
            });
        }
        self.check_timestamp(request.timestamp, &stage)?;
        self.validator
            .check_coordinates(Some(request.latitude), Some(request.longitude))?;

        let capture = self.store.insert_capture(request)?;
        info!(
            capture_id = capture.id,
            vehicle_id = capture.vehicle_id,
            stage_id = capture.stage_id,
            "created stage result"
        );
        Ok(capture)
    }

    /// Applies the fields present in `update`. Moving a capture onto a (vehicle, stage) pair
    /// that already has one is rejected; validation only covers fields that were sent.
    pub fn update_capture(&self, id: CaptureId, update: &CaptureUpdate) -> Result<Capture> {
        let mut capture = self.require_capture(id)?;

        let mut new_stage = None;
        if let Some(stage_id) = update.stage_id.filter(|s| *s != capture.stage_id) {
            new_stage = Some(self.require_stage(stage_id)?);
            capture.stage_id = stage_id;
        }
        let mut reassigned = new_stage.is_some();
        if let Some(vehicle_id) = update.vehicle_id.filter(|v| *v != capture.vehicle_id) {
            self.require_vehicle(vehicle_id)?;
            capture.vehicle_id = vehicle_id;
            reassigned = true;
        }
        if reassigned {
            if let Some(occupant) = self
                .store
                .find_by_vehicle_and_stage(capture.vehicle_id, capture.stage_id)?
            {
                if occupant.id != capture.id {
                    return Err(TimingError::DuplicateCapture {
                        vehicle_id: capture.vehicle_id,
                        stage_id: capture.stage_id,
                    });
                }
            }
        }

        if let Some(timestamp) = update.timestamp {
            let stage = match new_stage {
                Some(stage) => stage,
                None => self.require_stage(capture.stage_id)?,
            };
            self.check_timestamp(timestamp, &stage)?;
            capture.timestamp = Some(timestamp);
        }
        if update.latitude.is_some() || update.longitude.is_some() {
            self.validator
                .check_coordinates(update.latitude, update.longitude)?;
            capture.latitude = update.latitude.unwrap_or(capture.latitude);
            capture.longitude = update.longitude.unwrap_or(capture.longitude);
        }

        self.store.save_capture(&capture)?;
        info!(capture_id = id, "updated stage result");
        Ok(capture)
    }

    /// Overwrites all three adjustments. Missing or unreadable values become zero.
    pub fn apply_penalties(&self, id: CaptureId, request: &PenaltyRequest) -> Result<Capture> {
        let mut capture = self.require_capture(id)?;
        capture.penalties = Penalties {
            waypoint: duration_or_zero("penaltyWaypoint", request.penalty_waypoint.as_deref()),
            speed: duration_or_zero("penaltySpeed", request.penalty_speed.as_deref()),
            discount: duration_or_zero("discountClaim", request.discount_claim.as_deref()),
        };
        self.store.save_capture(&capture)?;
        info!(
            capture_id = id,
            waypoint = capture.penalties.waypoint.num_seconds(),
            speed = capture.penalties.speed.num_seconds(),
            discount = capture.penalties.discount.num_seconds(),
            "applied penalties"
        );
        Ok(capture)
    }

    /// Does not touch elapsed times of the remaining captures.
    pub fn delete_capture(&self, id: CaptureId) -> Result<()> {
        if !self.store.delete_capture(id)? {
            return Err(TimingError::capture_not_found(id));
        }
        info!(capture_id = id, "deleted stage result");
        Ok(())
    }

    /// Re-derives every elapsed time of the event from timestamps. A failure part way
    /// leaves earlier writes in place; running it again is safe.
    pub fn recompute_elapsed_times(&self, event_id: EventId) -> Result<RecomputeSummary> {
        self.require_event(event_id)?;
        let captures = self.store.timed_captures(event_id)?;
        let summary = self.chunks.recompute(captures, |update| {
            self.store
                .save_elapsed(update.capture_id, update.elapsed_time_seconds)
        })?;
        info!(
            event_id,
            vehicles = summary.vehicles,
            chunks = summary.chunks,
            updated = summary.updated,
            "recomputed elapsed times"
        );
        Ok(summary)
    }

    pub fn general_classification(&self, event_id: EventId) -> Result<Vec<ClassificationRow>> {
        self.require_event(event_id)?;
        let captures = self.store.captures_for_event(event_id)?;
        Ok(self.chunks.classify(ClassificationMode::Overall, captures))
    }

    pub fn category_classification(&self, event_id: EventId, category_id: CategoryId) -> Result<Vec<ClassificationRow>> {
        self.require_event(event_id)?;
        let captures = self.store.captures_for_category(event_id, category_id)?;
        Ok(self.chunks.classify(ClassificationMode::Overall, captures))
    }

    pub fn stage_classification(&self, event_id: EventId, stage_order: i32) -> Result<Vec<ClassificationRow>> {
        self.require_event(event_id)?;
        let captures = self.store.captures_for_stage_order(event_id, stage_order)?;
        Ok(self
            .chunks
            .classify(ClassificationMode::Stage(stage_order), captures))
    }

    /// Recomputes elapsed times, then builds the requested classification.
    pub fn classify(&self, event_id: EventId, scope: ClassificationScope) -> Result<Vec<ClassificationRow>> {
        self.recompute_elapsed_times(event_id)?;
        match scope {
            ClassificationScope::General => self.general_classification(event_id),
            ClassificationScope::Category(category_id) => {
                self.category_classification(event_id, category_id)
            }
            ClassificationScope::Stage(stage_order) => self.stage_classification(event_id, stage_order),
        }
    }

    /// Every capture of the event, by stage order then timestamp.
    pub fn results_by_event(&self, event_id: EventId) -> Result<Vec<CaptureView>> {
        self.require_event(event_id)?;
        let mut captures = self.store.captures_for_event(event_id)?;
        captures.sort_by_key(|v| (v.stage_order, v.capture.timestamp.is_none(), v.capture.timestamp));
        Ok(captures)
    }

    /// Captures on non-neutralized stages with order in `start..=end`, by timestamp.
    pub fn results_by_stage_range(&self, event_id: EventId, start: i32, end: i32) -> Result<Vec<CaptureView>> {
        self.require_event(event_id)?;
        let mut captures = self.store.captures_for_event(event_id)?;
        captures.retain(|v| !v.neutralized && (start..=end).contains(&v.stage_order));
        captures.sort_by_key(|v| (v.capture.timestamp.is_none(), v.capture.timestamp));
        Ok(captures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_filter_wins_over_stage() {
        assert_eq!(
            ClassificationScope::from_filters(Some(4), Some(2)),
            ClassificationScope::Category(4)
        );
        assert_eq!(
            ClassificationScope::from_filters(None, Some(2)),
            ClassificationScope::Stage(2)
        );
        assert_eq!(
            ClassificationScope::from_filters(None, None),
            ClassificationScope::General
        );
    }
}
