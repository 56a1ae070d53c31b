use crate::command::{CommandKind, PathFollowParams};
use crate::error::MissionError;
use crate::planner::{Path, Waypoint};
use crate::state::VehicleState;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// High-level command surface of a vehicle.
///
/// Administrative calls and the state query complete synchronously. Motion
/// calls return a [`MotionHandle`] as soon as the command is accepted; an
/// `Err` from the call itself means the command was refused.
pub trait VehicleLink {
    fn confirm_connection(&self) -> Result<(), MissionError>;

    fn enable_api_control(&self, enabled: bool) -> Result<(), MissionError>;

    fn arm_disarm(&self, arm: bool) -> Result<(), MissionError>;

    fn vehicle_state(&self) -> Result<VehicleState, MissionError>;

    fn takeoff(&self) -> Result<MotionHandle, MissionError>;

    fn land(&self) -> Result<MotionHandle, MissionError>;

    fn hover(&self) -> Result<MotionHandle, MissionError>;

    fn move_to_position(
        &self,
        target: Waypoint,
        velocity_mps: f64,
    ) -> Result<MotionHandle, MissionError>;

    fn move_on_path(
        &self,
        path: &Path,
        params: &PathFollowParams,
    ) -> Result<MotionHandle, MissionError>;
}

/// Awaitable result of an accepted motion command.
#[must_use = "a motion handle does nothing unless joined"]
#[derive(Debug)]
pub struct MotionHandle {
    command: CommandKind,
    reply: oneshot::Receiver<Result<(), MissionError>>,
    cancel: CancellationToken,
}

/// Link-side half of a [`MotionHandle`].
#[derive(Debug)]
pub struct MotionCompleter {
    command: CommandKind,
    reply: oneshot::Sender<Result<(), MissionError>>,
    cancel: CancellationToken,
}

impl MotionHandle {
    pub fn channel(command: CommandKind) -> (MotionCompleter, MotionHandle) {
        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        (
            MotionCompleter {
                command,
                reply: tx,
                cancel: cancel.clone(),
            },
            MotionHandle {
                command,
                reply: rx,
                cancel,
            },
        )
    }

    /// A handle that is already resolved.
    pub fn resolved(command: CommandKind, result: Result<(), MissionError>) -> Self {
        let (completer, handle) = Self::channel(command);
        completer.complete(result);
        handle
    }

    pub fn command(&self) -> CommandKind {
        self.command
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the command to finish. A result that is already available
    /// wins over a concurrent cancel.
    pub async fn join(self) -> Result<(), MissionError> {
        let MotionHandle { reply, cancel, .. } = self;
        tokio::select! {
            biased;

            result = reply => result.map_err(|_| MissionError::Disconnected)?,
            _ = cancel.cancelled() => Err(MissionError::Cancelled),
        }
    }
}

impl MotionCompleter {
    pub fn command(&self) -> CommandKind {
        self.command
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn complete(self, result: Result<(), MissionError>) {
        let _ = self.reply.send(result);
    }

    pub fn succeed(self) {
        self.complete(Ok(()));
    }

    pub fn fail(self, message: impl Into<String>) {
        let err = MissionError::failed(self.command.as_str(), message);
        self.complete(Err(err));
    }

    pub fn time_out(self) {
        let err = MissionError::CommandTimedOut {
            command: self.command.as_str().to_string(),
        };
        self.complete(Err(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_returns_link_result() {
        let (completer, handle) = MotionHandle::channel(CommandKind::Takeoff);
        completer.succeed();
        assert_eq!(handle.join().await, Ok(()));

        let (completer, handle) = MotionHandle::channel(CommandKind::MoveOnPath);
        completer.fail("obstacle");
        assert_eq!(
            handle.join().await,
            Err(MissionError::CommandFailed {
                command: "move_on_path".into(),
                message: "obstacle".into(),
            })
        );
    }

    #[tokio::test]
    async fn dropped_completer_reads_as_disconnect() {
        let (completer, handle) = MotionHandle::channel(CommandKind::Land);
        drop(completer);
        assert_eq!(handle.join().await, Err(MissionError::Disconnected));
    }

    #[tokio::test]
    async fn cancel_resolves_pending_join() {
        let (completer, handle) = MotionHandle::channel(CommandKind::Hover);
        handle.cancel();
        assert!(completer.is_cancelled());
        assert_eq!(handle.join().await, Err(MissionError::Cancelled));
    }

    #[tokio::test]
    async fn completed_result_wins_over_late_cancel() {
        let handle = MotionHandle::resolved(CommandKind::Hover, Ok(()));
        handle.cancel();
        assert_eq!(handle.join().await, Ok(()));
    }

    #[tokio::test]
    async fn time_out_names_command() {
        let (completer, handle) = MotionHandle::channel(CommandKind::MoveToPosition);
        completer.time_out();
        assert!(matches!(
            handle.join().await,
            Err(MissionError::CommandTimedOut { command }) if command == "move_to_position"
        ));
    }
}
