//! In-process vehicle for exercising missions without a simulator.
//!
//! `SimVehicle` keeps a minimal kinematic state, records every call it
//! receives, and can be told to refuse, fail, time out or drop the link on
//! specific commands. Motion
//! handles resolve after `distance / velocity * time_scale` seconds of tokio
//! time; the default scale of zero resolves them immediately.

use crate::command::{CommandKind, PathFollowParams};
use crate::error::MissionError;
use crate::planner::{Path, Waypoint};
use crate::state::{LandedState, VehicleState};
use crate::vehicle::{MotionCompleter, MotionHandle, VehicleLink};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

const TAKEOFF_DOWN_M: f64 = -3.0;
const VERTICAL_SPEED_MPS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    ConfirmConnection,
    EnableApiControl(bool),
    ArmDisarm(bool),
    VehicleState,
    Takeoff,
    Land,
    Hover,
    MoveToPosition {
        target: Waypoint,
        velocity_mps: f64,
    },
    MoveOnPath {
        waypoints: Vec<Waypoint>,
        params: PathFollowParams,
    },
}

impl SimCall {
    pub fn kind(&self) -> CommandKind {
        match self {
            SimCall::ConfirmConnection => CommandKind::ConfirmConnection,
            SimCall::EnableApiControl(_) => CommandKind::EnableApiControl,
            SimCall::ArmDisarm(_) => CommandKind::ArmDisarm,
            SimCall::VehicleState => CommandKind::VehicleState,
            SimCall::Takeoff => CommandKind::Takeoff,
            SimCall::Land => CommandKind::Land,
            SimCall::Hover => CommandKind::Hover,
            SimCall::MoveToPosition { .. } => CommandKind::MoveToPosition,
            SimCall::MoveOnPath { .. } => CommandKind::MoveOnPath,
        }
    }
}

/// Faults injected into a `SimVehicle`.
#[derive(Debug, Clone, Default)]
pub struct SimFaults {
    pub reject_connection: bool,
    /// Takeoff reports success but the vehicle never leaves the ground.
    pub takeoff_stays_landed: bool,
    /// Refused synchronously with `CommandRejected`.
    pub reject: HashSet<CommandKind>,
    /// Accepted, but the handle resolves to `CommandFailed`.
    pub fail: HashSet<CommandKind>,
    /// Accepted, but the handle resolves to `CommandTimedOut`.
    pub time_out: HashSet<CommandKind>,
    /// The link drops on this command. A motion handle resolves to
    /// `Disconnected`; every later call fails with `Disconnected`.
    pub disconnect_on: Option<CommandKind>,
}

enum Resolution {
    Succeed,
    Fail,
    TimeOut,
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimState {
    pub api_control: bool,
    pub armed: bool,
    pub landed_state: LandedState,
    pub position: Waypoint,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            api_control: false,
            armed: false,
            landed_state: LandedState::Landed,
            position: Waypoint::new(0.0, 0.0, 0.0),
        }
    }
}

struct SimInner {
    state: SimState,
    faults: SimFaults,
    calls: Vec<SimCall>,
    time_scale: f64,
    link_down: bool,
}

/// Cloneable handle; clones share one simulated vehicle.
#[derive(Clone)]
pub struct SimVehicle {
    inner: Arc<Mutex<SimInner>>,
}

impl Default for SimVehicle {
    fn default() -> Self {
        Self::new()
    }
}

impl SimVehicle {
    /// Disarmed, on the ground at home.
    pub fn new() -> Self {
        Self::with_state(SimState::default())
    }

    pub fn with_state(state: SimState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimInner {
                state,
                faults: SimFaults::default(),
                calls: Vec::new(),
                time_scale: 0.0,
                link_down: false,
            })),
        }
    }

    /// Disarmed but already hovering at `altitude_m` above home.
    pub fn airborne(altitude_m: f64) -> Self {
        Self::with_state(SimState {
            landed_state: LandedState::Flying,
            position: Waypoint::new(0.0, 0.0, -altitude_m),
            ..SimState::default()
        })
    }

    pub fn with_faults(self, faults: SimFaults) -> Self {
        self.lock().faults = faults;
        self
    }

    pub fn with_time_scale(self, time_scale: f64) -> Self {
        self.lock().time_scale = time_scale.max(0.0);
        self
    }

    pub fn state(&self) -> SimState {
        self.lock().state
    }

    pub fn calls(&self) -> Vec<SimCall> {
        self.lock().calls.clone()
    }

    pub fn call_kinds(&self) -> Vec<CommandKind> {
        self.lock().calls.iter().map(SimCall::kind).collect()
    }

    fn lock(&self) -> MutexGuard<'_, SimInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and apply the rejection rules shared by every command.
    fn accept(&self, call: SimCall) -> Result<MutexGuard<'_, SimInner>, MissionError> {
        let kind = call.kind();
        trace!(?call, "sim command");
        let mut inner = self.lock();
        inner.calls.push(call);

        if inner.link_down {
            return Err(MissionError::Disconnected);
        }

        if inner.faults.reject.contains(&kind) {
            return Err(MissionError::rejected(kind.as_str(), "rejected by fault injection"));
        }

        let needs_control = !matches!(
            kind,
            CommandKind::ConfirmConnection | CommandKind::EnableApiControl | CommandKind::VehicleState
        );
        if needs_control && !inner.state.api_control {
            return Err(MissionError::rejected(kind.as_str(), "api control not enabled"));
        }

        let is_motion = matches!(
            kind,
            CommandKind::Takeoff
                | CommandKind::Land
                | CommandKind::Hover
                | CommandKind::MoveToPosition
                | CommandKind::MoveOnPath
        );
        if is_motion && !inner.state.armed {
            return Err(MissionError::rejected(kind.as_str(), "vehicle not armed"));
        }

        if inner.faults.disconnect_on == Some(kind) {
            trace!(%kind, "sim link dropped");
            inner.link_down = true;
            if !is_motion {
                return Err(MissionError::Disconnected);
            }
        }

        Ok(inner)
    }

    /// Apply `update` and resolve the handle after the travel time, unless a
    /// fault is injected for this command.
    fn dispatch(
        &self,
        mut inner: MutexGuard<'_, SimInner>,
        kind: CommandKind,
        distance_m: f64,
        velocity_mps: f64,
        update: impl FnOnce(&mut SimState),
    ) -> MotionHandle {
        let (completer, handle) = MotionHandle::channel(kind);
        let resolution = if inner.link_down {
            Resolution::Disconnect
        } else if inner.faults.fail.contains(&kind) {
            Resolution::Fail
        } else if inner.faults.time_out.contains(&kind) {
            Resolution::TimeOut
        } else {
            Resolution::Succeed
        };
        if matches!(resolution, Resolution::Succeed) {
            update(&mut inner.state);
        }

        let delay = if velocity_mps > 0.0 {
            distance_m / velocity_mps * inner.time_scale
        } else {
            0.0
        };
        drop(inner);

        if delay <= 0.0 {
            resolve(completer, resolution);
        } else {
            let delay = Duration::try_from_secs_f64(delay).unwrap_or(Duration::MAX);
            tokio::spawn(async move {
                let cancelled = tokio::select! {
                    _ = completer.cancelled() => true,
                    _ = tokio::time::sleep(delay) => false,
                };
                if cancelled {
                    trace!(command = %completer.command(), "sim motion cancelled");
                } else {
                    resolve(completer, resolution);
                }
            });
        }
        handle
    }
}

fn resolve(completer: MotionCompleter, resolution: Resolution) {
    match resolution {
        Resolution::Succeed => completer.succeed(),
        Resolution::Fail => completer.fail("injected fault"),
        Resolution::TimeOut => completer.time_out(),
        // the handle sees its sender go away
        Resolution::Disconnect => drop(completer),
    }
}

fn distance(a: Waypoint, b: Waypoint) -> f64 {
    ((a.north - b.north).powi(2) + (a.east - b.east).powi(2) + (a.down - b.down).powi(2)).sqrt()
}

impl VehicleLink for SimVehicle {
    fn confirm_connection(&self) -> Result<(), MissionError> {
        let inner = self.accept(SimCall::ConfirmConnection)?;
        if inner.faults.reject_connection {
            return Err(MissionError::ConnectionFailed(
                "simulated vehicle unreachable".to_string(),
            ));
        }
        Ok(())
    }

    fn enable_api_control(&self, enabled: bool) -> Result<(), MissionError> {
        let mut inner = self.accept(SimCall::EnableApiControl(enabled))?;
        inner.state.api_control = enabled;
        Ok(())
    }

    fn arm_disarm(&self, arm: bool) -> Result<(), MissionError> {
        let mut inner = self.accept(SimCall::ArmDisarm(arm))?;
        if !arm && inner.state.landed_state == LandedState::Flying {
            return Err(MissionError::rejected("arm_disarm", "cannot disarm in flight"));
        }
        inner.state.armed = arm;
        Ok(())
    }

    fn vehicle_state(&self) -> Result<VehicleState, MissionError> {
        let inner = self.accept(SimCall::VehicleState)?;
        Ok(VehicleState {
            armed: inner.state.armed,
            landed_state: inner.state.landed_state,
        })
    }

    fn takeoff(&self) -> Result<MotionHandle, MissionError> {
        let inner = self.accept(SimCall::Takeoff)?;
        let stays_landed = inner.faults.takeoff_stays_landed;
        let climb = (inner.state.position.down - TAKEOFF_DOWN_M).max(0.0);
        Ok(self.dispatch(inner, CommandKind::Takeoff, climb, VERTICAL_SPEED_MPS, |state| {
            if !stays_landed {
                state.landed_state = LandedState::Flying;
                state.position.down = state.position.down.min(TAKEOFF_DOWN_M);
            }
        }))
    }

    fn land(&self) -> Result<MotionHandle, MissionError> {
        let inner = self.accept(SimCall::Land)?;
        let drop_m = -inner.state.position.down;
        Ok(self.dispatch(inner, CommandKind::Land, drop_m, VERTICAL_SPEED_MPS, |state| {
            state.landed_state = LandedState::Landed;
            state.position.down = 0.0;
        }))
    }

    fn hover(&self) -> Result<MotionHandle, MissionError> {
        let inner = self.accept(SimCall::Hover)?;
        Ok(self.dispatch(inner, CommandKind::Hover, 0.0, 0.0, |_| {}))
    }

    fn move_to_position(
        &self,
        target: Waypoint,
        velocity_mps: f64,
    ) -> Result<MotionHandle, MissionError> {
        let inner = self.accept(SimCall::MoveToPosition {
            target,
            velocity_mps,
        })?;
        let travel = distance(inner.state.position, target);
        Ok(self.dispatch(inner, CommandKind::MoveToPosition, travel, velocity_mps, |state| {
            state.position = target;
            if target.down < 0.0 {
                state.landed_state = LandedState::Flying;
            }
        }))
    }

    fn move_on_path(
        &self,
        path: &Path,
        params: &PathFollowParams,
    ) -> Result<MotionHandle, MissionError> {
        let inner = self.accept(SimCall::MoveOnPath {
            waypoints: path.waypoints.clone(),
            params: *params,
        })?;
        if inner.state.landed_state != LandedState::Flying {
            return Err(MissionError::rejected("move_on_path", "vehicle is not flying"));
        }

        let mut travel = 0.0;
        let mut cursor = inner.state.position;
        for wp in &path.waypoints {
            travel += distance(cursor, *wp);
            cursor = *wp;
        }
        let end = path.waypoints.last().copied();
        Ok(self.dispatch(
            inner,
            CommandKind::MoveOnPath,
            travel,
            params.velocity_mps,
            |state| {
                if let Some(end) = end {
                    state.position = end;
                }
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn arming_requires_api_control() {
        let sim = SimVehicle::new();
        assert!(matches!(
            sim.arm_disarm(true),
            Err(MissionError::CommandRejected { reason, .. }) if reason == "api control not enabled"
        ));

        sim.enable_api_control(true).unwrap();
        sim.arm_disarm(true).unwrap();
        assert!(sim.state().armed);
    }

    #[tokio::test]
    async fn takeoff_and_land_update_landed_state() {
        let sim = SimVehicle::new();
        sim.enable_api_control(true).unwrap();
        sim.arm_disarm(true).unwrap();

        sim.takeoff().unwrap().join().await.unwrap();
        assert_eq!(sim.vehicle_state().unwrap().landed_state, LandedState::Flying);
        assert_eq!(sim.state().position.down, TAKEOFF_DOWN_M);

        sim.land().unwrap().join().await.unwrap();
        assert!(sim.vehicle_state().unwrap().is_landed());
    }

    #[tokio::test]
    async fn failed_motion_leaves_state_untouched() {
        let sim = SimVehicle::new().with_faults(SimFaults {
            fail: HashSet::from([CommandKind::MoveToPosition]),
            ..SimFaults::default()
        });
        sim.enable_api_control(true).unwrap();
        sim.arm_disarm(true).unwrap();

        let handle = sim
            .move_to_position(Waypoint::new(5.0, 0.0, -10.0), 2.0)
            .unwrap();
        assert!(matches!(
            handle.join().await,
            Err(MissionError::CommandFailed { .. })
        ));
        assert_eq!(sim.state().position, Waypoint::new(0.0, 0.0, 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn time_scale_delays_completion() {
        let sim = SimVehicle::new().with_time_scale(1.0);
        sim.enable_api_control(true).unwrap();
        sim.arm_disarm(true).unwrap();

        let started = tokio::time::Instant::now();
        sim.move_to_position(Waypoint::new(0.0, 0.0, -10.0), 2.0)
            .unwrap()
            .join()
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn timed_out_motion_reports_its_command() {
        let sim = SimVehicle::new().with_faults(SimFaults {
            time_out: HashSet::from([CommandKind::Hover]),
            ..SimFaults::default()
        });
        sim.enable_api_control(true).unwrap();
        sim.arm_disarm(true).unwrap();

        assert_eq!(
            sim.hover().unwrap().join().await,
            Err(MissionError::CommandTimedOut {
                command: "hover".to_string()
            })
        );
    }

    #[tokio::test]
    async fn dropped_link_fails_the_handle_and_every_later_call() {
        let sim = SimVehicle::new().with_faults(SimFaults {
            disconnect_on: Some(CommandKind::MoveToPosition),
            ..SimFaults::default()
        });
        sim.enable_api_control(true).unwrap();
        sim.arm_disarm(true).unwrap();

        let handle = sim
            .move_to_position(Waypoint::new(0.0, 0.0, -10.0), 2.0)
            .unwrap();
        assert_eq!(handle.join().await, Err(MissionError::Disconnected));
        assert_eq!(sim.state().position, Waypoint::new(0.0, 0.0, 0.0));

        assert_eq!(sim.vehicle_state(), Err(MissionError::Disconnected));
        assert!(matches!(sim.land(), Err(MissionError::Disconnected)));
    }

    #[test]
    fn disconnect_on_a_plain_command_fails_it_directly() {
        let sim = SimVehicle::new().with_faults(SimFaults {
            disconnect_on: Some(CommandKind::ArmDisarm),
            ..SimFaults::default()
        });
        sim.enable_api_control(true).unwrap();
        assert_eq!(sim.arm_disarm(true), Err(MissionError::Disconnected));
        assert!(!sim.state().armed);
    }

    #[test]
    fn records_calls_in_order() {
        let sim = SimVehicle::new();
        sim.confirm_connection().unwrap();
        sim.enable_api_control(true).unwrap();
        let _ = sim.vehicle_state();
        assert_eq!(
            sim.call_kinds(),
            vec![
                CommandKind::ConfirmConnection,
                CommandKind::EnableApiControl,
                CommandKind::VehicleState,
            ]
        );
    }
}
