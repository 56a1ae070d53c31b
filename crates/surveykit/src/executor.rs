//! Survey mission state machine.
//!
//! One command is in flight at a time. Every phase awaits its command
//! before the next is issued, and any error other than the survey leg's
//! stops the mission where it failed. The vehicle is not landed
//! automatically in that case.

use crate::command::{CommandKind, PathFollowParams};
use crate::config::{ExecutorConfig, MissionConfig};
use crate::error::MissionError;
use crate::planner::{plan, Path, Waypoint};
use crate::state::{MissionPhase, VehicleState};
use crate::vehicle::{MotionHandle, VehicleLink};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissionEvent {
    PhaseChanged {
        from: MissionPhase,
        to: MissionPhase,
    },
    SurveyPlanned {
        waypoints: usize,
        estimated_distance_m: f64,
        estimated_duration: Duration,
    },
    SurveyFault {
        message: String,
    },
    Aborted {
        reason: String,
    },
    Failed {
        phase: MissionPhase,
        message: String,
    },
    Completed {
        commands_issued: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionOutcome {
    Completed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionReport {
    pub outcome: MissionOutcome,
    /// Error absorbed from the survey leg, if any.
    pub survey_fault: Option<String>,
    pub estimated_distance_m: Option<f64>,
    pub estimated_duration: Option<Duration>,
    pub commands_issued: usize,
}

impl MissionReport {
    fn new() -> Self {
        Self {
            outcome: MissionOutcome::Completed,
            survey_fault: None,
            estimated_distance_m: None,
            estimated_duration: None,
            commands_issued: 0,
        }
    }
}

pub struct MissionExecutor<V> {
    vehicle: V,
    mission: MissionConfig,
    config: ExecutorConfig,
    phase: watch::Sender<MissionPhase>,
    events: broadcast::Sender<MissionEvent>,
    commands_issued: usize,
}

impl<V: VehicleLink> MissionExecutor<V> {
    pub fn new(vehicle: V, mission: MissionConfig) -> Result<Self, MissionError> {
        Self::with_config(vehicle, mission, ExecutorConfig::default())
    }

    pub fn with_config(
        vehicle: V,
        mission: MissionConfig,
        config: ExecutorConfig,
    ) -> Result<Self, MissionError> {
        mission.validate()?;
        let (phase, _) = watch::channel(MissionPhase::Idle);
        let (events, _) = broadcast::channel(config.event_buffer_size.max(1));
        Ok(Self {
            vehicle,
            mission,
            config,
            phase,
            events,
            commands_issued: 0,
        })
    }

    pub fn phase(&self) -> MissionPhase {
        *self.phase.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<MissionPhase> {
        self.phase.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MissionEvent> {
        self.events.subscribe()
    }

    pub fn mission(&self) -> &MissionConfig {
        &self.mission
    }

    pub fn vehicle(&self) -> &V {
        &self.vehicle
    }

    /// Fly the whole survey.
    ///
    /// Returns `Ok` with [`MissionOutcome::Aborted`] when the vehicle is still
    /// on the ground after takeoff; no further commands are sent in that case.
    /// Any other failure, except on the survey leg, is returned as `Err` and
    /// leaves the phase where it failed.
    pub async fn start(&mut self) -> Result<MissionReport, MissionError> {
        let phase = self.phase();
        if phase != MissionPhase::Idle {
            return Err(MissionError::InvalidPhase { phase });
        }

        self.commands_issued = 0;
        self.issue(CommandKind::ConfirmConnection, |v| v.confirm_connection())?;
        self.issue(CommandKind::EnableApiControl, |v| v.enable_api_control(true))?;

        let mut report = MissionReport::new();
        let result = self.run(&mut report).await;
        report.commands_issued = self.commands_issued;

        match result {
            Ok(outcome) => {
                report.outcome = outcome;
                if outcome == MissionOutcome::Completed {
                    info!(commands = self.commands_issued, "survey mission complete");
                    self.emit(MissionEvent::Completed {
                        commands_issued: self.commands_issued,
                    });
                }
                Ok(report)
            }
            Err(err) => {
                let phase = self.phase();
                warn!(%phase, error = %err, "survey mission failed");
                self.emit(MissionEvent::Failed {
                    phase,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run(&mut self, report: &mut MissionReport) -> Result<MissionOutcome, MissionError> {
        let velocity = self.mission.cruise_velocity_mps;
        let cruise = Waypoint::new(0.0, 0.0, self.mission.cruise_down());

        self.advance(MissionPhase::Arming);
        self.issue(CommandKind::ArmDisarm, |v| v.arm_disarm(true))?;

        if self.query_state()?.is_landed() {
            self.advance(MissionPhase::TakingOff);
            self.motion(CommandKind::Takeoff, |v| v.takeoff()).await?;

            if self.query_state()?.is_landed() {
                let reason = MissionError::TakeoffFailed.to_string();
                warn!(%reason, "aborting survey mission");
                self.advance(MissionPhase::Aborted);
                self.emit(MissionEvent::Aborted { reason });
                return Ok(MissionOutcome::Aborted);
            }

            self.advance(MissionPhase::Climbing);
            info!(altitude_m = self.mission.cruise_altitude_m, "climbing");
            self.motion(CommandKind::MoveToPosition, |v| {
                v.move_to_position(cruise, velocity)
            })
            .await?;
        } else {
            debug!("vehicle already airborne, skipping takeoff");
        }

        let path = plan(
            self.mission.half_width_m,
            self.mission.stripe_spacing_m,
            self.mission.cruise_altitude_m,
        );
        let half_width = self.mission.half_width_m;
        let corner = path
            .start_corner()
            .unwrap_or(Waypoint::new(-half_width, -half_width, self.mission.cruise_down()));

        self.advance(MissionPhase::ToStartCorner);
        self.motion(CommandKind::MoveToPosition, |v| {
            v.move_to_position(corner, velocity)
        })
        .await?;
        self.motion(CommandKind::Hover, |v| v.hover()).await?;
        tokio::time::sleep(self.config.settle_delay()).await;
        // hovering hands control back to the vehicle
        self.issue(CommandKind::EnableApiControl, |v| v.enable_api_control(true))?;

        self.advance(MissionPhase::Surveying);
        self.survey(&path, report).await;

        self.advance(MissionPhase::ReturningHome);
        self.motion(CommandKind::MoveToPosition, |v| {
            v.move_to_position(cruise, velocity)
        })
        .await?;

        self.advance(MissionPhase::Descending);
        let descent_down = -self.config.descent_altitude_m;
        if self.mission.cruise_down() < descent_down {
            let target = Waypoint::new(0.0, 0.0, descent_down);
            let descent_velocity = self.config.descent_velocity_mps;
            self.motion(CommandKind::MoveToPosition, |v| {
                v.move_to_position(target, descent_velocity)
            })
            .await?;
        } else {
            debug!(
                altitude_m = self.mission.cruise_altitude_m,
                "cruise altitude below descent altitude, skipping descent"
            );
        }

        self.advance(MissionPhase::Landing);
        self.motion(CommandKind::Land, |v| v.land()).await?;

        self.advance(MissionPhase::Disarming);
        self.issue(CommandKind::ArmDisarm, |v| v.arm_disarm(false))?;

        self.advance(MissionPhase::Idle);
        Ok(MissionOutcome::Completed)
    }

    /// The survey leg never fails the mission. Errors are reported and the
    /// caller carries on with the return leg.
    async fn survey(&mut self, path: &Path, report: &mut MissionReport) {
        let velocity = self.mission.cruise_velocity_mps;
        let duration = path.estimated_duration(velocity);

        info!(
            distance_m = path.total_distance,
            duration_s = duration.as_secs_f64(),
            waypoints = path.len(),
            "starting survey"
        );
        report.estimated_distance_m = Some(path.total_distance);
        report.estimated_duration = Some(duration);
        self.emit(MissionEvent::SurveyPlanned {
            waypoints: path.len(),
            estimated_distance_m: path.total_distance,
            estimated_duration: duration,
        });

        let params = PathFollowParams::survey(
            velocity,
            duration,
            self.config.velocity_ceiling_factor,
            self.config.lookahead,
        );
        let result = self
            .motion(CommandKind::MoveOnPath, |v| v.move_on_path(path, &params))
            .await;

        if let Err(err) = result {
            warn!(error = %err, "survey path failed, continuing home");
            let message = err.to_string();
            report.survey_fault = Some(message.clone());
            self.emit(MissionEvent::SurveyFault { message });
        }
    }

    fn query_state(&mut self) -> Result<VehicleState, MissionError> {
        let state = self.issue(CommandKind::VehicleState, |v| v.vehicle_state())?;
        debug!(lifecycle = ?state.lifecycle(), "vehicle state");
        Ok(state)
    }

    fn issue<T>(
        &mut self,
        command: CommandKind,
        call: impl FnOnce(&V) -> Result<T, MissionError>,
    ) -> Result<T, MissionError> {
        self.commands_issued += 1;
        debug!(%command, phase = %self.phase(), "issuing command");
        call(&self.vehicle)
    }

    async fn motion(
        &mut self,
        command: CommandKind,
        call: impl FnOnce(&V) -> Result<MotionHandle, MissionError>,
    ) -> Result<(), MissionError> {
        let handle = self.issue(command, call)?;
        handle.join().await
    }

    fn advance(&mut self, next: MissionPhase) {
        let from = self.phase();
        debug_assert!(
            from.can_advance_to(next),
            "illegal phase transition {from} -> {next}"
        );
        self.phase.send_replace(next);
        info!(phase = %next, %from, "mission phase");
        self.emit(MissionEvent::PhaseChanged { from, to: next });
    }

    fn emit(&self, event: MissionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::sim::{SimState, SimVehicle};
    use crate::state::LandedState;

    fn mission() -> MissionConfig {
        MissionConfig {
            half_width_m: 6.0,
            stripe_spacing_m: 3.0,
            cruise_altitude_m: 8.0,
            cruise_velocity_mps: 3.0,
        }
    }

    fn quick() -> ExecutorConfig {
        ExecutorConfig {
            settle_delay_ms: 0,
            ..ExecutorConfig::default()
        }
    }

    #[tokio::test]
    async fn unknown_landed_state_is_treated_as_airborne() {
        let sim = SimVehicle::with_state(SimState {
            landed_state: LandedState::Unknown,
            position: Waypoint::new(0.0, 0.0, -8.0),
            ..SimState::default()
        });
        let mut executor = MissionExecutor::with_config(sim.clone(), mission(), quick()).unwrap();

        executor.start().await.unwrap();
        assert!(!sim.call_kinds().contains(&CommandKind::Takeoff));
    }

    #[tokio::test]
    async fn phase_watch_follows_transitions() {
        let sim = SimVehicle::new();
        let mut executor = MissionExecutor::with_config(sim, mission(), quick()).unwrap();
        let mut phase_rx = executor.watch_phase();
        assert_eq!(*phase_rx.borrow_and_update(), MissionPhase::Idle);

        executor.start().await.unwrap();
        assert!(phase_rx.has_changed().unwrap());
        assert_eq!(*phase_rx.borrow(), MissionPhase::Idle);
    }
}
