use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle state as reported by the link. Never mutated by the executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleState {
    pub armed: bool,
    pub landed_state: LandedState,
}

impl VehicleState {
    pub fn lifecycle(&self) -> VehicleLifecycleState {
        match (self.armed, self.landed_state) {
            (false, _) => VehicleLifecycleState::Disarmed,
            (true, LandedState::Unknown) => VehicleLifecycleState::Armed,
            (true, LandedState::Landed) => VehicleLifecycleState::Landed,
            (true, LandedState::Flying) => VehicleLifecycleState::Airborne,
        }
    }

    pub fn is_landed(&self) -> bool {
        self.landed_state == LandedState::Landed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandedState {
    #[default]
    Unknown,
    Landed,
    Flying,
}

impl LandedState {
    pub fn from_mav(state: mavlink::common::MavLandedState) -> Self {
        use mavlink::common::MavLandedState;
        match state {
            MavLandedState::MAV_LANDED_STATE_ON_GROUND => LandedState::Landed,
            MavLandedState::MAV_LANDED_STATE_IN_AIR
            | MavLandedState::MAV_LANDED_STATE_TAKEOFF
            | MavLandedState::MAV_LANDED_STATE_LANDING => LandedState::Flying,
            _ => LandedState::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleLifecycleState {
    Disarmed,
    Armed,
    Landed,
    Airborne,
}

/// Controller-owned mission stage. Advances forward only; `Aborted` is
/// terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    #[default]
    Idle,
    Arming,
    TakingOff,
    Climbing,
    ToStartCorner,
    Surveying,
    ReturningHome,
    Descending,
    Landing,
    Disarming,
    Aborted,
}

impl MissionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            MissionPhase::Idle => "idle",
            MissionPhase::Arming => "arming",
            MissionPhase::TakingOff => "taking_off",
            MissionPhase::Climbing => "climbing",
            MissionPhase::ToStartCorner => "to_start_corner",
            MissionPhase::Surveying => "surveying",
            MissionPhase::ReturningHome => "returning_home",
            MissionPhase::Descending => "descending",
            MissionPhase::Landing => "landing",
            MissionPhase::Disarming => "disarming",
            MissionPhase::Aborted => "aborted",
        }
    }

    pub(crate) fn ordinal(self) -> u8 {
        match self {
            MissionPhase::Idle => 0,
            MissionPhase::Arming => 1,
            MissionPhase::TakingOff => 2,
            MissionPhase::Climbing => 3,
            MissionPhase::ToStartCorner => 4,
            MissionPhase::Surveying => 5,
            MissionPhase::ReturningHome => 6,
            MissionPhase::Descending => 7,
            MissionPhase::Landing => 8,
            MissionPhase::Disarming => 9,
            MissionPhase::Aborted => 10,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == MissionPhase::Aborted
    }

    /// Forward moves only. `Disarming -> Idle` closes a completed mission and
    /// `Aborted` is entered from `TakingOff` alone.
    pub fn can_advance_to(self, next: MissionPhase) -> bool {
        match (self, next) {
            (MissionPhase::Aborted, _) => false,
            (MissionPhase::Disarming, MissionPhase::Idle) => true,
            (MissionPhase::TakingOff, MissionPhase::Aborted) => true,
            (_, MissionPhase::Aborted) => false,
            (from, to) => to.ordinal() > from.ordinal(),
        }
    }
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
