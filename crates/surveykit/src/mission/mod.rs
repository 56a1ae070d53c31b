pub mod export;
pub mod types;
pub mod validation;

pub use export::survey_mission_plan;
pub use types::{IssueSeverity, MissionFrame, MissionItem, MissionIssue, MissionPlan};
pub use validation::{validate_plan, MAX_MISSION_ITEMS};
