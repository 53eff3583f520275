use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{CaptureId, CaptureView, CategoryId, VehicleId};
use crate::penalty::{adjusted_seconds, floor_seconds};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimeCell {
    pub stage_order: i32,
    pub elapsed_time_seconds: i64,
    pub stage_result_id: CaptureId,
    pub penalty_waypoint_seconds: i64,
    pub penalty_speed_seconds: i64,
    pub discount_claim_seconds: i64,
    pub adjusted_time_seconds: i64,
}

impl StageTimeCell {
    pub fn new(stage_order: i32, view: &CaptureView) -> Self {
        let capture = &view.capture;
        StageTimeCell {
            stage_order,
            elapsed_time_seconds: capture.elapsed_time_seconds.unwrap_or(0),
            stage_result_id: capture.id,
            penalty_waypoint_seconds: floor_seconds(capture.penalties.waypoint),
            penalty_speed_seconds: floor_seconds(capture.penalties.speed),
            discount_claim_seconds: floor_seconds(capture.penalties.discount),
            adjusted_time_seconds: adjusted_seconds(capture.elapsed_time_seconds, &capture.penalties),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRow {
    pub vehicle_id: VehicleId,
    pub vehicle_name: String,
    pub driver_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub stage_times: Vec<StageTimeCell>,
    pub total_time: i64,
    pub user_picture: String,
    pub team_name: String,
}

impl ClassificationRow {
    fn new(view: &CaptureView, stage_times: Vec<StageTimeCell>, total_time: i64) -> Self {
        let vehicle = &view.vehicle;
        let driver = vehicle.driver.as_ref();
        ClassificationRow {
            vehicle_id: vehicle.id,
            vehicle_name: vehicle.name.clone(),
            driver_name: driver.map(|d| d.full_name()).unwrap_or_default(),
            category_id: vehicle.category.id,
            category_name: vehicle.category.name.clone(),
            stage_times,
            total_time,
            user_picture: driver.map(|d| d.picture.clone()).unwrap_or_default(),
            team_name: driver.map(|d| d.team_name.clone()).unwrap_or_default(),
        }
    }
}

/// Which kind of row a vehicle's captures turn into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassificationMode {
    /// One cell per stage, total over all of them. Used by the general and category views.
    Overall,
    /// A single cell for the given stage order.
    Stage(i32),
}

impl ClassificationMode {
    pub fn build_row(self, captures: &[CaptureView]) -> Option<ClassificationRow> {
        match self {
            ClassificationMode::Overall => build_vehicle_row(captures),
            ClassificationMode::Stage(order) => build_stage_row(order, captures),
        }
    }

    fn rank_key(self, row: &ClassificationRow) -> i64 {
        match self {
            ClassificationMode::Overall => row.total_time,
            ClassificationMode::Stage(_) => row
                .stage_times
                .first()
                .map_or(row.total_time, |cell| cell.adjusted_time_seconds),
        }
    }
}

/// Groups captures by vehicle, keeping encounter order within each stage order.
pub fn group_by_vehicle(captures: Vec<CaptureView>) -> BTreeMap<VehicleId, Vec<CaptureView>> {
    let mut groups: BTreeMap<VehicleId, Vec<CaptureView>> = BTreeMap::new();
    for view in captures {
        groups.entry(view.vehicle_id()).or_default().push(view);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|view| view.stage_order);
    }
    groups
}

/// Row over every stage of one vehicle. A repeated stage order keeps the later capture.
pub fn build_vehicle_row(captures: &[CaptureView]) -> Option<ClassificationRow> {
    let first = captures.first()?;
    let mut by_stage: BTreeMap<i32, &CaptureView> = BTreeMap::new();
    for view in captures {
        by_stage.insert(view.stage_order, view);
    }
    let stage_times: Vec<StageTimeCell> = by_stage
        .into_iter()
        .map(|(order, view)| StageTimeCell::new(order, view))
        .collect();
    let total_time = stage_times.iter().map(|cell| cell.adjusted_time_seconds).sum();
    Some(ClassificationRow::new(first, stage_times, total_time))
}

/// Row for a single stage of one vehicle, `None` if the vehicle has no capture there.
pub fn build_stage_row(stage_order: i32, captures: &[CaptureView]) -> Option<ClassificationRow> {
    let view = captures
        .iter()
        .rev()
        .find(|view| view.stage_order == stage_order)?;
    let cell = StageTimeCell::new(stage_order, view);
    let total_time = cell.adjusted_time_seconds;
    Some(ClassificationRow::new(view, vec![cell], total_time))
}

pub fn sort_rows(mode: ClassificationMode, rows: &mut [ClassificationRow]) {
    rows.sort_by(|a, b| {
        mode.rank_key(a)
            .cmp(&mode.rank_key(b))
            .then(a.vehicle_id.cmp(&b.vehicle_id))
    });
}
