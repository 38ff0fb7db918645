pub mod config;
pub mod context;
pub mod error;
pub mod game;
pub mod io;
pub mod orchestrator;
pub mod position;
pub mod program;
pub mod routines;
pub mod sim;
pub mod status;
pub mod survival;
pub mod types;

pub use error::{BrazierError, Result};
