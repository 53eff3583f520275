use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub type EventId = i64;
pub type StageId = i64;
pub type VehicleId = i64;
pub type CategoryId = i64;
pub type CaptureId = i64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub event_id: EventId,
    pub name: String,
    pub order_number: i32,
    pub neutralized: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub first_name: String,
    pub last_name: String,
    pub picture: String,
    pub team_name: String,
}

impl Driver {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A vehicle together with everything a classification row shows about it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub id: VehicleId,
    pub name: String,
    pub category: Category,
    pub driver: Option<Driver>,
}

/// The three manual adjustments of a capture. Zero means "not applied".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Penalties {
    pub waypoint: Duration,
    pub speed: Duration,
    pub discount: Duration,
}

impl Default for Penalties {
    fn default() -> Self {
        Penalties {
            waypoint: Duration::zero(),
            speed: Duration::zero(),
            discount: Duration::zero(),
        }
    }
}

/// One waypoint record of a vehicle at a stage.
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    pub id: CaptureId,
    pub stage_id: StageId,
    pub vehicle_id: VehicleId,
    pub timestamp: Option<NaiveDateTime>,
    pub latitude: f64,
    pub longitude: f64,
    pub elapsed_time_seconds: Option<i64>,
    pub penalties: Penalties,
}

/// A capture joined with the stage and vehicle data the timing engine reads.
#[derive(Clone, Debug)]
pub struct CaptureView {
    pub capture: Capture,
    pub stage_order: i32,
    pub neutralized: bool,
    pub vehicle: Arc<VehicleProfile>,
}

impl CaptureView {
    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle.id
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCapture {
    pub vehicle_id: VehicleId,
    pub stage_id: StageId,
    pub timestamp: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
}

/// Partial update; absent fields are left as they are.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureUpdate {
    pub vehicle_id: Option<VehicleId>,
    pub stage_id: Option<StageId>,
    pub timestamp: Option<NaiveDateTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Raw ISO-8601 duration text, as received from the caller.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyRequest {
    pub penalty_waypoint: Option<String>,
    pub penalty_speed: Option<String>,
    pub discount_claim: Option<String>,
}

/// Capture as returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDto {
    pub id: CaptureId,
    pub stage_id: StageId,
    pub vehicle_id: VehicleId,
    pub timestamp: Option<NaiveDateTime>,
    pub latitude: f64,
    pub longitude: f64,
    pub elapsed_time_seconds: Option<i64>,
    pub penalty_waypoint_seconds: i64,
    pub penalty_speed_seconds: i64,
    pub discount_claim_seconds: i64,
}

impl From<&Capture> for CaptureDto {
    fn from(capture: &Capture) -> Self {
        CaptureDto {
            id: capture.id,
            stage_id: capture.stage_id,
            vehicle_id: capture.vehicle_id,
            timestamp: capture.timestamp,
            latitude: capture.latitude,
            longitude: capture.longitude,
            elapsed_time_seconds: capture.elapsed_time_seconds,
            penalty_waypoint_seconds: crate::penalty::floor_seconds(capture.penalties.waypoint),
            penalty_speed_seconds: crate::penalty::floor_seconds(capture.penalties.speed),
            discount_claim_seconds: crate::penalty::floor_seconds(capture.penalties.discount),
        }
    }
}
