//! Persistence model
//!
//! The typed [`Submission`] record, the schema pass that builds it from a
//! reconstructed JSON record, and aggregate stats.

pub mod schema;
pub mod stats;
pub mod submission;

pub use schema::{read_submission, RecordStamp, SchemaViolations, Violation};
pub use stats::ApplicationStats;
pub use submission::{
    ApplicationStatus, ClassroomEnvironment, DocumentRef, Documents, EducationBeliefs, Gender,
    InvestmentRange, ManagementType, Marketing, ProposedPremises, ResourceKind, Submission,
    TargetClass, TeachingTeam,
};
