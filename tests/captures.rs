mod common;

use chrono::{Duration, NaiveDate};
use common::*;
use rallytiming::models::{CaptureUpdate, Event, Penalties, PenaltyRequest, Stage};
use rallytiming::TimingError;

fn two_stage_rally() -> rallytiming::TimingService<rallytiming::store::MemoryStore> {
    let service = rally(&[(1, 1, false), (2, 2, false), (3, 3, false)], 100);
    add_vehicle(&service, 7, MOTOS);
    add_vehicle(&service, 8, CARS);
    service
}

#[test]
fn create_starts_without_penalties() {
    let service = two_stage_rally();
    let created = capture(&service, 7, 1, at(10, 0, 0));
    assert_eq!(created.penalties, Penalties::default());
    assert_eq!(created.elapsed_time_seconds, None);
    assert_eq!(stored(&service, created.id), created);
}

#[test]
fn second_capture_for_same_vehicle_and_stage_is_rejected() {
    let service = two_stage_rally();
    capture(&service, 7, 3, at(10, 0, 0));
    let before = service.store().captures().unwrap();

    let err = service
        .create_capture(&new_capture(7, 3, at(11, 0, 0)))
        .unwrap_err();
    assert!(matches!(
        err,
        TimingError::DuplicateCapture {
            vehicle_id: 7,
            stage_id: 3
        }
    ));
    assert!(err.is_client_error());
    assert_eq!(service.store().captures().unwrap(), before);
}

#[test]
fn unknown_references_are_not_found() {
    let service = two_stage_rally();
    assert!(matches!(
        service.create_capture(&new_capture(7, 99, at(10, 0, 0))),
        Err(TimingError::NotFound { entity: "stage", .. })
    ));
    assert!(matches!(
        service.create_capture(&new_capture(99, 1, at(10, 0, 0))),
        Err(TimingError::NotFound { entity: "vehicle", .. })
    ));
    assert!(matches!(
        service.update_capture(404, &CaptureUpdate::default()),
        Err(TimingError::NotFound { .. })
    ));
    assert!(service.store().captures().unwrap().is_empty());
}

#[test]
fn implausible_captures_are_rejected_with_validator_message() {
    let service = two_stage_rally();

    let mut off_map = new_capture(7, 1, at(10, 0, 0));
    off_map.latitude = 95.0;
    let err = service.create_capture(&off_map).unwrap_err();
    assert_eq!(err.to_string(), "latitude must be between -90 and 90 degrees");

    let before_event = at(10, 0, 0) - Duration::days(3);
    assert!(matches!(
        service.create_capture(&new_capture(7, 1, before_event)),
        Err(TimingError::Validation(_))
    ));

    let future = fixed_now() + Duration::minutes(1);
    assert!(matches!(
        service.create_capture(&new_capture(7, 1, future)),
        Err(TimingError::Validation(_))
    ));

    assert!(service.store().captures().unwrap().is_empty());
}

#[test]
fn update_rejects_moving_onto_an_occupied_pair() {
    let service = two_stage_rally();
    capture(&service, 7, 1, at(10, 0, 0));
    let other = capture(&service, 7, 2, at(10, 5, 0));

    let err = service
        .update_capture(
            other.id,
            &CaptureUpdate {
                stage_id: Some(1),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, TimingError::DuplicateCapture { .. }));
    assert_eq!(stored(&service, other.id), other);

    let moved = service
        .update_capture(
            other.id,
            &CaptureUpdate {
                stage_id: Some(3),
                vehicle_id: Some(8),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!((moved.vehicle_id, moved.stage_id), (8, 3));
    assert_eq!(stored(&service, other.id), moved);
}

#[test]
fn update_with_unchanged_pair_is_not_a_duplicate() {
    let service = two_stage_rally();
    let created = capture(&service, 7, 1, at(10, 0, 0));
    let updated = service
        .update_capture(
            created.id,
            &CaptureUpdate {
                vehicle_id: Some(7),
                stage_id: Some(1),
                longitude: Some(-74.0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.longitude, -74.0);
    assert_eq!(updated.latitude, created.latitude);
}

#[test]
fn update_validates_only_fields_sent() {
    let service = two_stage_rally();
    let created = capture(&service, 7, 1, at(10, 0, 0));

    assert!(matches!(
        service.update_capture(
            created.id,
            &CaptureUpdate {
                longitude: Some(200.0),
                ..Default::default()
            },
        ),
        Err(TimingError::Validation(_))
    ));

    let retimed = service
        .update_capture(
            created.id,
            &CaptureUpdate {
                timestamp: Some(at(10, 2, 0)),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(retimed.timestamp, Some(at(10, 2, 0)));
    assert_eq!(retimed.longitude, created.longitude);
}

#[test]
fn update_rejects_timestamp_outside_event() {
    let service = two_stage_rally();
    let created = capture(&service, 7, 1, at(10, 0, 0));

    let err = service
        .update_capture(
            created.id,
            &CaptureUpdate {
                timestamp: Some(at(10, 0, 0) - Duration::days(5)),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, TimingError::Validation(ref msg) if msg.contains("event period")));
    assert_eq!(stored(&service, created.id), created);
}

#[test]
fn moving_to_another_event_checks_its_dates() {
    let service = two_stage_rally();
    service
        .store()
        .add_event(Event {
            id: 2,
            name: "Rally del Cafe".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 8).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 9).unwrap(),
        })
        .unwrap();
    service
        .store()
        .add_stage(Stage {
            id: 40,
            event_id: 2,
            name: "Prologue".into(),
            order_number: 1,
            neutralized: false,
        })
        .unwrap();
    let created = capture(&service, 7, 1, at(10, 0, 0));

    let moved_only_stage = service.update_capture(
        created.id,
        &CaptureUpdate {
            stage_id: Some(40),
            timestamp: Some(at(10, 0, 0)),
            ..Default::default()
        },
    );
    assert!(matches!(moved_only_stage, Err(TimingError::Validation(_))));
    assert_eq!(stored(&service, created.id), created);

    let on_event_day = at(10, 0, 0) + Duration::days(4);
    let moved = service
        .update_capture(
            created.id,
            &CaptureUpdate {
                stage_id: Some(40),
                timestamp: Some(on_event_day),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!((moved.stage_id, moved.timestamp), (40, Some(on_event_day)));
}

#[test]
fn penalties_always_overwrite_all_three() {
    let service = two_stage_rally();
    let created = capture(&service, 7, 1, at(10, 0, 0));

    let penalised = service
        .apply_penalties(
            created.id,
            &PenaltyRequest {
                penalty_waypoint: Some("PT1M".into()),
                penalty_speed: Some("PT2M30S".into()),
                discount_claim: Some("PT15S".into()),
            },
        )
        .unwrap();
    assert_eq!(penalised.penalties.waypoint, Duration::seconds(60));
    assert_eq!(penalised.penalties.speed, Duration::seconds(150));
    assert_eq!(penalised.penalties.discount, Duration::seconds(15));

    let cleared = service
        .apply_penalties(
            created.id,
            &PenaltyRequest {
                penalty_waypoint: Some("PT0S".into()),
                penalty_speed: Some("two minutes".into()),
                discount_claim: None,
            },
        )
        .unwrap();
    assert_eq!(cleared.penalties, Penalties::default());
    assert_eq!(stored(&service, created.id).penalties, Penalties::default());
}

#[test]
fn penalties_on_unknown_capture_are_not_found() {
    let service = two_stage_rally();
    assert!(matches!(
        service.apply_penalties(5, &PenaltyRequest::default()),
        Err(TimingError::NotFound { .. })
    ));
}

#[test]
fn delete_does_not_recompute_neighbours() {
    let service = two_stage_rally();
    let first = capture(&service, 7, 1, at(10, 0, 0));
    let second = capture(&service, 7, 2, at(10, 4, 0));
    capture(&service, 7, 3, at(10, 9, 0));
    service.recompute_elapsed_times(EVENT).unwrap();

    service.delete_capture(second.id).unwrap();
    assert_eq!(stored(&service, first.id).elapsed_time_seconds, Some(240));
    assert!(matches!(
        service.delete_capture(second.id),
        Err(TimingError::NotFound { .. })
    ));

    service.recompute_elapsed_times(EVENT).unwrap();
    assert_eq!(stored(&service, first.id).elapsed_time_seconds, Some(540));
}
