//! Wizard - multi-step form wizard engine
//!
//! Sequences named steps, validates each step's fields, keeps validated values
//! and a "furthest validated step" watermark in the user's session, and
//! decides where to send the user next.

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod rest;
pub mod session;
pub mod state;
pub mod steps;
pub mod validation;

pub use controller::{Outcome, WizardController};
pub use error::{ConfigurationError, WizardError};
pub use session::{Session, SessionBackend};
pub use state::WizardState;
pub use steps::{StepGraph, WizardRegistry};
