//! # Franchise Intake Client
//!
//! Headless driver for the seven-step application form:
//! - [`controller`]: step navigation, change handlers, final-step checks
//! - [`submit`]: multipart submission to the intake service

pub mod controller;
pub mod submit;

pub use controller::{ChangeEvent, FieldError, Phase, Step, WizardController};
pub use submit::{ClientError, IntakeClient, SubmitReceipt};
