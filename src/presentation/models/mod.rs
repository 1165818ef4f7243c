use poem_openapi::Enum;

use crate::domain::models::DispatchState;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum DispatchStateKind {
    #[oai(rename = "stopped")]
    Stopped,
    #[oai(rename = "running")]
    Running,
}

impl From<DispatchState> for DispatchStateKind {
    fn from(value: DispatchState) -> Self {
        match value {
            DispatchState::Stopped => DispatchStateKind::Stopped,
            DispatchState::Running => DispatchStateKind::Running,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperationStatusKind {
    #[oai(rename = "success")]
    Success,
}
