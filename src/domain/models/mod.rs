pub mod delivery;
pub mod dispatch;
pub mod message;

pub use delivery::{CycleReport, DeliveryRecord};
pub use dispatch::{DispatchAction, DispatchState};
pub use message::{Message, NewMessage, SentMessagesPage};
