use crate::error::MissionError;
use crate::mission::MAX_MISSION_ITEMS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Most sweep passes a mission may plan. Each pass is four waypoints and the
/// exported mission needs one extra item for the speed change.
pub const MAX_SURVEY_PASSES: usize = (MAX_MISSION_ITEMS - 1) / 4;

/// Survey box and cruise settings. Copied into the executor, so it cannot
/// change once a mission runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Half the side of the square survey box, centred on home.
    pub half_width_m: f64,
    pub stripe_spacing_m: f64,
    pub cruise_altitude_m: f64,
    pub cruise_velocity_mps: f64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            half_width_m: 10.0,
            stripe_spacing_m: 2.0,
            cruise_altitude_m: 30.0,
            cruise_velocity_mps: 5.0,
        }
    }
}

impl MissionConfig {
    pub fn validate(&self) -> Result<(), MissionError> {
        for (name, value) in [
            ("half_width_m", self.half_width_m),
            ("stripe_spacing_m", self.stripe_spacing_m),
            ("cruise_altitude_m", self.cruise_altitude_m),
            ("cruise_velocity_mps", self.cruise_velocity_mps),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MissionError::InvalidConfig(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }

        if self.stripe_spacing_m >= self.half_width_m * 2.0 {
            return Err(MissionError::InvalidConfig(format!(
                "stripe_spacing_m {} must be smaller than the box width {}",
                self.stripe_spacing_m,
                self.half_width_m * 2.0
            )));
        }

        // One pass of slack for rounding in the planner's running x.
        let passes = (self.half_width_m / self.stripe_spacing_m).ceil() + 1.0;
        if passes > MAX_SURVEY_PASSES as f64 {
            return Err(MissionError::InvalidConfig(format!(
                "box half-width {} at stripe spacing {} needs more than {MAX_SURVEY_PASSES} passes",
                self.half_width_m, self.stripe_spacing_m
            )));
        }

        Ok(())
    }

    /// Cruise altitude as a down-positive coordinate.
    pub fn cruise_down(&self) -> f64 {
        -self.cruise_altitude_m
    }
}

/// Executor tuning that is not part of the survey geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Wall-clock pause after hovering at the start corner.
    pub settle_delay_ms: u64,
    /// Missions cruising higher than this descend to it before landing.
    pub descent_altitude_m: f64,
    pub descent_velocity_mps: f64,
    /// Path-follow velocity ceiling as a multiple of cruise velocity.
    pub velocity_ceiling_factor: f64,
    pub lookahead: f64,
    pub event_buffer_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2000,
            descent_altitude_m: 5.0,
            descent_velocity_mps: 2.0,
            velocity_ceiling_factor: 1.5,
            lookahead: 1.0,
            event_buffer_size: 32,
        }
    }
}

impl ExecutorConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
