//! karat-axum: HTTP backend for the jewellery shop console.
//!
//! Routes sit on top of the session context and catalog services; errors
//! leave as the console's JSON error body.

pub mod app;
pub mod config;
pub mod routes;
pub mod state;
mod error;

pub use app::{build, ConsoleApp, ConsoleParts};
pub use config::ConsoleSettings;
pub use error::KaratAxumError;
pub use state::{Authenticated, ConsoleState};
