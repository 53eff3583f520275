mod memory;
mod pg;

pub use self::memory::MemoryStore;
pub use self::pg::{create_db, empty_db, establish_connection, PgStore};

use crate::error::Result;
use crate::models::{
    Capture, CaptureId, CaptureView, CategoryId, Event, EventId, NewCapture, Stage, StageId,
    VehicleId, VehicleProfile,
};

pub trait CaptureStore: Send + Sync {
    fn event(&self, id: EventId) -> Result<Option<Event>>;
    fn stage(&self, id: StageId) -> Result<Option<Stage>>;
    fn vehicle(&self, id: VehicleId) -> Result<Option<VehicleProfile>>;
    fn capture(&self, id: CaptureId) -> Result<Option<Capture>>;

    /// Captures of an event that have a timestamp, ordered by vehicle then stage order.
    fn timed_captures(&self, event_id: EventId) -> Result<Vec<CaptureView>>;
    /// Every capture of an event, ordered by vehicle then stage order.
    fn captures_for_event(&self, event_id: EventId) -> Result<Vec<CaptureView>>;
    fn captures_for_category(&self, event_id: EventId, category_id: CategoryId) -> Result<Vec<CaptureView>>;
    fn captures_for_stage_order(&self, event_id: EventId, stage_order: i32) -> Result<Vec<CaptureView>>;

    fn exists(&self, vehicle_id: VehicleId, stage_id: StageId) -> Result<bool> {
        Ok(self.find_by_vehicle_and_stage(vehicle_id, stage_id)?.is_some())
    }
    fn find_by_vehicle_and_stage(&self, vehicle_id: VehicleId, stage_id: StageId) -> Result<Option<Capture>>;

    /// Inserts a capture with zero penalties and no elapsed time.
    fn insert_capture(&self, capture: &NewCapture) -> Result<Capture>;
    fn save_capture(&self, capture: &Capture) -> Result<()>;
    fn save_elapsed(&self, id: CaptureId, elapsed_time_seconds: i64) -> Result<()>;
    /// Returns false if there was nothing to delete.
    fn delete_capture(&self, id: CaptureId) -> Result<bool>;
}
