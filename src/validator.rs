use chrono::{Duration, NaiveDateTime};
use tracing::warn;

use crate::error::{Result, TimingError};
use crate::models::Event;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Plausibility checks run before a capture is written.
#[derive(Clone, Copy, Debug)]
pub struct Validator {
    horizon: Duration,
}

impl Validator {
    /// `horizon` is how far in the past a capture timestamp may lie.
    pub fn new(horizon: Duration) -> Self {
        Validator { horizon }
    }

    pub fn check_timestamp(&self, timestamp: NaiveDateTime, event: &Event, now: NaiveDateTime) -> Result<()> {
        if timestamp > now {
            return Err(TimingError::Validation(
                "result timestamp cannot be in the future".into(),
            ));
        }
        if let Some(oldest) = now.checked_sub_signed(self.horizon) {
            if timestamp < oldest {
                return Err(TimingError::Validation(format!(
                    "result timestamp cannot be older than {} days",
                    self.horizon.num_days()
                )));
            }
        }
        // Captures recorded shortly after midnight on the last day still count.
        let last_day = event.end_date.succ_opt().unwrap_or(event.end_date);
        let date = timestamp.date();
        if date < event.start_date || date > last_day {
            return Err(TimingError::Validation(
                "result date must fall within the event period".into(),
            ));
        }
        Ok(())
    }

    /// Checks whichever coordinates are present.
    pub fn check_coordinates(&self, latitude: Option<f64>, longitude: Option<f64>) -> Result<()> {
        if let Some(latitude) = latitude {
            if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude) {
                return Err(TimingError::Validation(
                    "latitude must be between -90 and 90 degrees".into(),
                ));
            }
        }
        if let Some(longitude) = longitude {
            if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude) {
                return Err(TimingError::Validation(
                    "longitude must be between -180 and 180 degrees".into(),
                ));
            }
        }
        if latitude == Some(0.0) && longitude == Some(0.0) {
            warn!("capture at (0, 0), check that this is intentional");
        }
        Ok(())
    }
}
