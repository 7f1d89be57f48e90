pub mod message;
pub mod requirement;
pub mod state;
