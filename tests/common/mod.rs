#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rallytiming::chunk::ChunkProcessor;
use rallytiming::models::{
    Capture, Category, Driver, Event, NewCapture, Stage, StageId, VehicleId, VehicleProfile,
};
use rallytiming::store::{CaptureStore, MemoryStore};
use rallytiming::validator::Validator;
use rallytiming::TimingService;

pub const EVENT: i64 = 1;
pub const MOTOS: i64 = 1;
pub const CARS: i64 = 2;

pub fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 4)
        .and_then(|day| day.and_hms_opt(hour, minute, second))
        .expect("valid fixture time")
}

pub fn fixed_now() -> NaiveDateTime {
    at(23, 0, 0) + chrono::Duration::days(6)
}

/// Event 1 (2024-05-03 to 2024-05-05) with `(stage id, order, neutralized)` stages.
pub fn rally(stages: &[(StageId, i32, bool)], chunk_size: usize) -> TimingService<MemoryStore> {
    let store = MemoryStore::new();
    store
        .add_event(Event {
            id: EVENT,
            name: "Vuelta a Antioquia".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
        })
        .unwrap();
    for &(id, order_number, neutralized) in stages {
        store
            .add_stage(Stage {
                id,
                event_id: EVENT,
                name: format!("Stage {order_number}"),
                order_number,
                neutralized,
            })
            .unwrap();
    }
    TimingService::new(
        store,
        Validator::new(chrono::Duration::days(365)),
        ChunkProcessor::new(chunk_size),
    )
    .with_clock(fixed_now)
}

pub fn add_vehicle(service: &TimingService<MemoryStore>, id: VehicleId, category: i64) {
    service
        .store()
        .add_vehicle(VehicleProfile {
            id,
            name: format!("Truck {id}"),
            category: Category {
                id: category,
                name: if category == MOTOS { "Motos" } else { "Cars" }.into(),
            },
            driver: Some(Driver {
                first_name: "Ana".into(),
                last_name: format!("Rider{id}"),
                picture: format!("pics/{id}.jpg"),
                team_name: "Team Andes".into(),
            }),
        })
        .unwrap();
}

pub fn new_capture(vehicle_id: VehicleId, stage_id: StageId, timestamp: NaiveDateTime) -> NewCapture {
    NewCapture {
        vehicle_id,
        stage_id,
        timestamp,
        latitude: 6.2442,
        longitude: -75.5812,
    }
}

pub fn capture(
    service: &TimingService<MemoryStore>,
    vehicle_id: VehicleId,
    stage_id: StageId,
    timestamp: NaiveDateTime,
) -> Capture {
    service
        .create_capture(&new_capture(vehicle_id, stage_id, timestamp))
        .expect("capture accepted")
}

pub fn stored(service: &TimingService<MemoryStore>, id: i64) -> Capture {
    service.store().capture(id).unwrap().expect("capture exists")
}
