use crate::state::MissionPhase;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MissionError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("vehicle disconnected")]
    Disconnected,
    #[error("command {command} rejected: {reason}")]
    CommandRejected { command: String, reason: String },
    #[error("command {command} timed out")]
    CommandTimedOut { command: String },
    #[error("command {command} failed: {message}")]
    CommandFailed { command: String, message: String },
    #[error("operation cancelled")]
    Cancelled,
    #[error("takeoff failed: vehicle still reports landed")]
    TakeoffFailed,
    #[error("invalid mission config: {0}")]
    InvalidConfig(String),
    #[error("mission export failed: {0}")]
    MissionExport(String),
    #[error("mission cannot start from phase '{phase}'")]
    InvalidPhase { phase: MissionPhase },
}

impl MissionError {
    pub fn rejected(command: &str, reason: impl Into<String>) -> Self {
        MissionError::CommandRejected {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    pub fn failed(command: &str, message: impl Into<String>) -> Self {
        MissionError::CommandFailed {
            command: command.to_string(),
            message: message.into(),
        }
    }
}
