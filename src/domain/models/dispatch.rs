use serde::{Deserialize, Serialize};

/// Whether the polling loop is authorized to run.
///
/// Shared between every process pointed at the same status store. It is
/// advisory: two processes may both observe `Running` and both poll.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    #[default]
    Stopped,
    Running,
}

impl DispatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchState::Stopped => "stopped",
            DispatchState::Running => "running",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "stopped" => Some(DispatchState::Stopped),
            "running" => Some(DispatchState::Running),
            _ => None,
        }
    }
}

/// Control request accepted by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    Start,
    Stop,
}

impl DispatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchAction::Start => "start",
            DispatchAction::Stop => "stop",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" => Some(DispatchAction::Start),
            "stop" => Some(DispatchAction::Stop),
            _ => None,
        }
    }
}
