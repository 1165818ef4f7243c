pub mod handlers;
pub mod services;
