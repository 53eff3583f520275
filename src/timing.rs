use crate::models::{CaptureId, CaptureView};
use crate::penalty::floor_seconds;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElapsedUpdate {
    pub capture_id: CaptureId,
    pub elapsed_time_seconds: i64,
}

/// Transit times for one vehicle's captures, ordered by stage order.
///
/// Each capture gets the time to the following capture. The last capture has no following
/// segment and neutralized stages are skipped, so neither appears in the result.
pub fn elapsed_updates(captures: &[CaptureView]) -> Vec<ElapsedUpdate> {
    captures
        .windows(2)
        .filter_map(|pair| {
            let (current, next) = (&pair[0], &pair[1]);
            if current.neutralized {
                return None;
            }
            let start = current.capture.timestamp?;
            let end = next.capture.timestamp?;
            Some(ElapsedUpdate {
                capture_id: current.capture.id,
                elapsed_time_seconds: floor_seconds(end.signed_duration_since(start)),
            })
        })
        .collect()
}
