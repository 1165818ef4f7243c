pub mod dispatcher;
pub mod health;
pub mod messages;
pub mod root;
