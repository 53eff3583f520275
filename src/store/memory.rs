use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, TimingError};
use crate::models::{
    Capture, CaptureId, CaptureView, CategoryId, Event, EventId, NewCapture, Penalties, Stage,
    StageId, VehicleId, VehicleProfile,
};
use crate::store::CaptureStore;

#[derive(Default)]
struct Tables {
    events: BTreeMap<EventId, Event>,
    stages: BTreeMap<StageId, Stage>,
    vehicles: BTreeMap<VehicleId, Arc<VehicleProfile>>,
    captures: BTreeMap<CaptureId, Capture>,
    last_capture_id: CaptureId,
}

impl Tables {
    fn occupant(&self, vehicle_id: VehicleId, stage_id: StageId) -> Option<&Capture> {
        self.captures
            .values()
            .find(|c| c.vehicle_id == vehicle_id && c.stage_id == stage_id)
    }

    fn views<P>(&self, event_id: EventId, keep: P) -> Vec<CaptureView>
    where
        P: Fn(&Capture, &Stage, &VehicleProfile) -> bool,
    {
        let mut views: Vec<CaptureView> = self
            .captures
            .values()
            .filter_map(|capture| {
                let stage = self.stages.get(&capture.stage_id)?;
                let vehicle = self.vehicles.get(&capture.vehicle_id)?;
                if stage.event_id != event_id || !keep(capture, stage, vehicle) {
                    return None;
                }
                Some(CaptureView {
                    capture: capture.clone(),
                    stage_order: stage.order_number,
                    neutralized: stage.neutralized,
                    vehicle: Arc::clone(vehicle),
                })
            })
            .collect();
        views.sort_by_key(|v| (v.vehicle_id(), v.stage_order, v.capture.id));
        views
    }
}

/// In-process capture store. Seed events, stages and vehicles with the `add_*` methods.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| TimingError::StorePoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| TimingError::StorePoisoned)
    }

    pub fn add_event(&self, event: Event) -> Result<()> {
        self.write()?.events.insert(event.id, event);
        Ok(())
    }

    pub fn add_stage(&self, stage: Stage) -> Result<()> {
        self.write()?.stages.insert(stage.id, stage);
        Ok(())
    }

    pub fn add_vehicle(&self, vehicle: VehicleProfile) -> Result<()> {
        self.write()?.vehicles.insert(vehicle.id, Arc::new(vehicle));
        Ok(())
    }

    /// Snapshot of every stored capture, by id.
    pub fn captures(&self) -> Result<Vec<Capture>> {
        Ok(self.read()?.captures.values().cloned().collect())
    }
}

impl CaptureStore for MemoryStore {
    fn event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.read()?.events.get(&id).cloned())
    }

    fn stage(&self, id: StageId) -> Result<Option<Stage>> {
        Ok(self.read()?.stages.get(&id).cloned())
    }

    fn vehicle(&self, id: VehicleId) -> Result<Option<VehicleProfile>> {
        Ok(self.read()?.vehicles.get(&id).map(|v| (**v).clone()))
    }

    fn capture(&self, id: CaptureId) -> Result<Option<Capture>> {
        Ok(self.read()?.captures.get(&id).cloned())
    }

    fn timed_captures(&self, event_id: EventId) -> Result<Vec<CaptureView>> {
        Ok(self.read()?.views(event_id, |c, _, _| c.timestamp.is_some()))
    }

    fn captures_for_event(&self, event_id: EventId) -> Result<Vec<CaptureView>> {
        Ok(self.read()?.views(event_id, |_, _, _| true))
    }

    fn captures_for_category(&self, event_id: EventId, category_id: CategoryId) -> Result<Vec<CaptureView>> {
        Ok(self
            .read()?
            .views(event_id, |_, _, v| v.category.id == category_id))
    }

    fn captures_for_stage_order(&self, event_id: EventId, stage_order: i32) -> Result<Vec<CaptureView>> {
        Ok(self
            .read()?
            .views(event_id, |_, s, _| s.order_number == stage_order))
    }

    fn find_by_vehicle_and_stage(&self, vehicle_id: VehicleId, stage_id: StageId) -> Result<Option<Capture>> {
        Ok(self.read()?.occupant(vehicle_id, stage_id).cloned())
    }

    fn insert_capture(&self, new: &NewCapture) -> Result<Capture> {
        let mut tables = self.write()?;
        if tables.occupant(new.vehicle_id, new.stage_id).is_some() {
            return Err(TimingError::DuplicateCapture {
                vehicle_id: new.vehicle_id,
                stage_id: new.stage_id,
            });
        }
        tables.last_capture_id += 1;
        let capture = Capture {
            id: tables.last_capture_id,
            stage_id: new.stage_id,
            vehicle_id: new.vehicle_id,
            timestamp: Some(new.timestamp),
            latitude: new.latitude,
            longitude: new.longitude,
            elapsed_time_seconds: None,
            penalties: Penalties::default(),
        };
        tables.captures.insert(capture.id, capture.clone());
        Ok(capture)
    }

    fn save_capture(&self, capture: &Capture) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.captures.contains_key(&capture.id) {
            return Err(TimingError::capture_not_found(capture.id));
        }
        if let Some(other) = tables.occupant(capture.vehicle_id, capture.stage_id) {
            if other.id != capture.id {
                return Err(TimingError::DuplicateCapture {
                    vehicle_id: capture.vehicle_id,
                    stage_id: capture.stage_id,
                });
            }
        }
        tables.captures.insert(capture.id, capture.clone());
        Ok(())
    }

    fn save_elapsed(&self, id: CaptureId, elapsed_time_seconds: i64) -> Result<()> {
        let mut tables = self.write()?;
        let capture = tables
            .captures
            .get_mut(&id)
            .ok_or_else(|| TimingError::capture_not_found(id))?;
        capture.elapsed_time_seconds = Some(elapsed_time_seconds);
        Ok(())
    }

    fn delete_capture(&self, id: CaptureId) -> Result<bool> {
        Ok(self.write()?.captures.remove(&id).is_some())
    }
}
