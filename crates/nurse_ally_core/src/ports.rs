//! crates/nurse_ally_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! Every stubbed integration (triage engine, clinic lookup, insurance parsing)
//! and the conversation store sits behind one of these traits, so a real
//! implementation can replace a mock without touching the composer or the
//! HTTP layer.

use async_trait::async_trait;

use crate::domain::{
    ClinicSearch, InsuranceDocument, InsuranceSummary, Message, TriageResult, UrgencyTier,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait TriageService: Send + Sync {
    /// Classifies a free-text symptom description into an urgency tier.
    async fn classify(&self, text: &str) -> PortResult<TriageResult>;
}

#[async_trait]
pub trait ClinicDirectoryService: Send + Sync {
    /// Lists care facilities near `location` suitable for the given urgency.
    async fn find_clinics(&self, location: &str, urgency: UrgencyTier)
        -> PortResult<ClinicSearch>;
}

#[async_trait]
pub trait InsuranceSummaryService: Send + Sync {
    /// Produces a coverage summary for an uploaded insurance document.
    async fn summarize(&self, document: &InsuranceDocument) -> PortResult<InsuranceSummary>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Appends a message to the user's log, creating the session if needed.
    async fn append(&self, user_id: &str, message: Message) -> PortResult<()>;

    /// Returns the user's messages in insertion order; empty for unknown users.
    async fn history(&self, user_id: &str) -> PortResult<Vec<Message>>;

    /// Drops the user's session. Resetting an unknown user is not an error.
    async fn reset(&self, user_id: &str) -> PortResult<()>;
}
