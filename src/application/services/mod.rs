pub mod dispatcher;
pub mod webhook;
