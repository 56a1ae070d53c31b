//! Survey path as an autopilot mission.
//!
//! An alternative to streaming the path through `move_on_path`: the plan can
//! be uploaded and flown in AUTO mode. Item 0 sets the ground speed, then one
//! `NAV_WAYPOINT` per survey waypoint follows in the local NED frame.

use super::types::{MissionFrame, MissionItem, MissionPlan};
use crate::error::MissionError;
use crate::planner::{Path, Waypoint};
use mavlink::common::MavCmd;

/// `MISSION_ITEM_INT` carries local x/y as metres * 1e4.
const LOCAL_POSITION_SCALE: f64 = 1e4;

const SPEED_TYPE_GROUND: f32 = 1.0;

pub fn survey_mission_plan(
    path: &Path,
    cruise_velocity_mps: f64,
) -> Result<MissionPlan, MissionError> {
    let mut items = Vec::with_capacity(path.len() + 1);
    items.push(MissionItem {
        seq: 0,
        command: MavCmd::MAV_CMD_DO_CHANGE_SPEED as u16,
        frame: MissionFrame::Mission,
        current: true,
        autocontinue: true,
        param1: SPEED_TYPE_GROUND,
        param2: cruise_velocity_mps as f32,
        param3: -1.0,
        param4: 0.0,
        x: 0,
        y: 0,
        z: 0.0,
    });

    for (index, waypoint) in path.waypoints.iter().enumerate() {
        let seq = u16::try_from(index + 1).map_err(|_| {
            MissionError::MissionExport(format!(
                "{} waypoints do not fit in a 16-bit mission sequence",
                path.len()
            ))
        })?;
        items.push(waypoint_item(seq, waypoint)?);
    }

    Ok(MissionPlan { items })
}

fn waypoint_item(seq: u16, waypoint: &Waypoint) -> Result<MissionItem, MissionError> {
    Ok(MissionItem {
        seq,
        command: MavCmd::MAV_CMD_NAV_WAYPOINT as u16,
        frame: MissionFrame::LocalNed,
        current: false,
        autocontinue: true,
        param1: 0.0,
        param2: 0.0,
        param3: 0.0,
        param4: 0.0,
        x: scaled_position(seq, "north", waypoint.north)?,
        y: scaled_position(seq, "east", waypoint.east)?,
        z: waypoint.down as f32,
    })
}

fn scaled_position(seq: u16, axis: &str, metres: f64) -> Result<i32, MissionError> {
    let scaled = (metres * LOCAL_POSITION_SCALE).round();
    if !scaled.is_finite() || scaled < f64::from(i32::MIN) || scaled > f64::from(i32::MAX) {
        return Err(MissionError::MissionExport(format!(
            "waypoint {seq} {axis} offset {metres} m is outside the MISSION_ITEM_INT range"
        )));
    }
    Ok(scaled as i32)
}
