pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod mission;
pub mod planner;
#[cfg(feature = "sim")]
pub mod sim;
pub mod state;
pub mod vehicle;

pub use config::{ExecutorConfig, MissionConfig, MAX_SURVEY_PASSES};
pub use error::MissionError;
pub use executor::{MissionEvent, MissionExecutor, MissionOutcome, MissionReport};
pub use vehicle::{MotionCompleter, MotionHandle, VehicleLink};

pub use command::{CommandKind, Drivetrain, PathFollowParams, YawMode};
pub use planner::{plan, Path, Waypoint};
pub use state::{LandedState, MissionPhase, VehicleLifecycleState, VehicleState};

pub use mission::{
    survey_mission_plan, validate_plan, IssueSeverity, MissionFrame, MissionItem, MissionIssue,
    MissionPlan,
};
