use crate::error::MissionError;
use mavlink::common::{self, MavCmd};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissionFrame {
    Mission,
    LocalNed,
}

impl MissionFrame {
    pub fn to_mav(self) -> common::MavFrame {
        match self {
            MissionFrame::Mission => common::MavFrame::MAV_FRAME_MISSION,
            MissionFrame::LocalNed => common::MavFrame::MAV_FRAME_LOCAL_NED,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionItem {
    pub seq: u16,
    pub command: u16,
    pub frame: MissionFrame,
    pub current: bool,
    pub autocontinue: bool,
    pub param1: f32,
    pub param2: f32,
    pub param3: f32,
    pub param4: f32,
    pub x: i32,
    pub y: i32,
    pub z: f32,
}

impl MissionItem {
    /// Encode as a `MISSION_ITEM_INT` addressed to the given component.
    pub fn to_mission_item_int(
        &self,
        target_system: u8,
        target_component: u8,
    ) -> Result<common::MISSION_ITEM_INT_DATA, MissionError> {
        let command: MavCmd = num_traits::FromPrimitive::from_u16(self.command).ok_or_else(|| {
            MissionError::MissionExport(format!("unsupported MAV_CMD value {}", self.command))
        })?;

        Ok(common::MISSION_ITEM_INT_DATA {
            param1: self.param1,
            param2: self.param2,
            param3: self.param3,
            param4: self.param4,
            x: self.x,
            y: self.y,
            z: self.z,
            seq: self.seq,
            command,
            target_system,
            target_component,
            frame: self.frame.to_mav(),
            current: u8::from(self.current),
            autocontinue: u8::from(self.autocontinue),
            mission_type: common::MavMissionType::MAV_MISSION_TYPE_MISSION,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionPlan {
    pub items: Vec<MissionItem>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissionIssue {
    pub code: String,
    pub message: String,
    pub seq: Option<u16>,
    pub severity: IssueSeverity,
}
