//! # Franchise Intake Common Library
//!
//! Shared code for the intake service and the form client including:
//! - Flat value coercion and key-path parsing
//! - Structural transcoding between nested form state and flat multipart fields
//! - The client-side form value tree
//! - The persisted application model and its schema pass

pub mod coerce;
pub mod error;
pub mod form_value;
pub mod keypath;
pub mod model;
pub mod transcode;

pub use error::{Error, Result};
pub use form_value::{FileBlob, FormValue};
