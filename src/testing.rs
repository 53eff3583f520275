use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{
    Capture, CaptureId, CaptureView, Category, Driver, Penalties, VehicleId, VehicleProfile,
};

pub fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 4)
        .and_then(|day| day.and_hms_opt(hour, minute, second))
        .expect("valid fixture time")
}

pub fn profile(vehicle_id: VehicleId, category_id: i64) -> Arc<VehicleProfile> {
    Arc::new(VehicleProfile {
        id: vehicle_id,
        name: format!("Vehicle {vehicle_id}"),
        category: Category {
            id: category_id,
            name: format!("Category {category_id}"),
        },
        driver: Some(Driver {
            first_name: "Driver".into(),
            last_name: vehicle_id.to_string(),
            picture: format!("driver-{vehicle_id}.png"),
            team_name: "Team".into(),
        }),
    })
}

/// A capture whose stage id equals its stage order.
pub fn view(
    capture_id: CaptureId,
    vehicle_id: VehicleId,
    stage_order: i32,
    neutralized: bool,
    timestamp: Option<NaiveDateTime>,
) -> CaptureView {
    CaptureView {
        capture: Capture {
            id: capture_id,
            stage_id: i64::from(stage_order),
            vehicle_id,
            timestamp,
            latitude: 6.25,
            longitude: -75.56,
            elapsed_time_seconds: None,
            penalties: Penalties::default(),
        },
        stage_order,
        neutralized,
        vehicle: profile(vehicle_id, 1),
    }
}

pub fn timed(
    capture_id: CaptureId,
    vehicle_id: VehicleId,
    stage_order: i32,
    elapsed_time_seconds: Option<i64>,
) -> CaptureView {
    let mut view = view(capture_id, vehicle_id, stage_order, false, None);
    view.capture.elapsed_time_seconds = elapsed_time_seconds;
    view
}
