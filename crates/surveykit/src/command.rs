use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Every call a `VehicleLink` accepts, used to name commands in errors,
/// logs and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    ConfirmConnection,
    EnableApiControl,
    ArmDisarm,
    VehicleState,
    Takeoff,
    Land,
    Hover,
    MoveToPosition,
    MoveOnPath,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::ConfirmConnection => "confirm_connection",
            CommandKind::EnableApiControl => "enable_api_control",
            CommandKind::ArmDisarm => "arm_disarm",
            CommandKind::VehicleState => "vehicle_state",
            CommandKind::Takeoff => "takeoff",
            CommandKind::Land => "land",
            CommandKind::Hover => "hover",
            CommandKind::MoveToPosition => "move_to_position",
            CommandKind::MoveOnPath => "move_on_path",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drivetrain {
    /// Heading is free; the vehicle may crab sideways.
    #[default]
    MaxDegreeOfFreedom,
    /// Nose always points along the direction of travel.
    ForwardOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct YawMode {
    pub is_rate: bool,
    /// Degrees, or degrees per second when `is_rate`.
    pub yaw_or_rate_deg: f64,
}

/// Parameters of a path-follow command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathFollowParams {
    pub velocity_mps: f64,
    /// Budget for the whole path. The link decides what happens on expiry.
    pub timeout: Duration,
    pub drivetrain: Drivetrain,
    pub yaw: YawMode,
    pub velocity_ceiling_mps: f64,
    pub lookahead: f64,
}

impl PathFollowParams {
    /// Survey profile: forward-only, fixed yaw, ceiling at `factor` times
    /// the cruise velocity.
    pub fn survey(velocity_mps: f64, timeout: Duration, ceiling_factor: f64, lookahead: f64) -> Self {
        Self {
            velocity_mps,
            timeout,
            drivetrain: Drivetrain::ForwardOnly,
            yaw: YawMode {
                is_rate: false,
                yaw_or_rate_deg: 0.0,
            },
            velocity_ceiling_mps: velocity_mps * ceiling_factor,
            lookahead,
        }
    }
}
