//! crates/nurse_ally_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs carry no knowledge of HTTP or storage; they derive `serde`
//! so every consumer (server, CLI, offline fallback) shares one wire shape.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Conversation
//=========================================================================================

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A single chat turn. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn from_user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    pub fn from_assistant(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Assistant)
    }
}

/// The ordered message log of one user.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            messages: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Appends to the end of the log; messages are never reordered or dropped.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.last_active_at = Utc::now();
    }
}

//=========================================================================================
// Triage
//=========================================================================================

/// Severity classification of a symptom description.
///
/// Variants are declared from least to most severe so the derived `Ord`
/// gives `Emergency > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyTier {
    Low,
    Medium,
    High,
    Emergency,
}

impl UrgencyTier {
    /// All tiers in the order the classifier checks them, most severe first.
    pub const PRIORITY_ORDER: [UrgencyTier; 4] = [
        UrgencyTier::Emergency,
        UrgencyTier::High,
        UrgencyTier::Medium,
        UrgencyTier::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyTier::Low => "low",
            UrgencyTier::Medium => "medium",
            UrgencyTier::High => "high",
            UrgencyTier::Emergency => "emergency",
        }
    }

    /// Parses a tier label, mapping anything unrecognised to `Low`.
    pub fn parse_or_low(label: &str) -> Self {
        label.parse().unwrap_or(UrgencyTier::Low)
    }
}

impl fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown urgency tier: {0}")]
pub struct UnknownUrgencyTier(pub String);

impl FromStr for UrgencyTier {
    type Err = UnknownUrgencyTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(UrgencyTier::Low),
            "medium" => Ok(UrgencyTier::Medium),
            "high" => Ok(UrgencyTier::High),
            "emergency" => Ok(UrgencyTier::Emergency),
            _ => Err(UnknownUrgencyTier(s.to_string())),
        }
    }
}

/// Outcome of classifying a symptom description. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub urgency: UrgencyTier,
    pub reasoning: String,
    pub recommendations: Vec<String>,
}

//=========================================================================================
// Clinics
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicRecord {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub facility_type: String,
    pub wait_time: String,
    pub accepts_insurance: bool,
}

/// Result of a clinic lookup, echoing the query it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicSearch {
    pub clinics: Vec<ClinicRecord>,
    pub location: String,
    pub urgency: UrgencyTier,
}

//=========================================================================================
// Insurance
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceSummary {
    pub plan_name: String,
    pub provider: String,
    pub member_id: String,
    pub group_number: String,
    pub coverage_details: BTreeMap<String, String>,
    pub key_benefits: Vec<String>,
    pub source_filename: String,
}

/// An uploaded insurance document as handed to an `InsuranceSummaryService`.
#[derive(Debug, Clone)]
pub struct InsuranceDocument {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

//=========================================================================================
// Profile
//=========================================================================================

/// Client-held profile sent along with every chat call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "insuranceSummary")]
    pub insurance_summary: Option<InsuranceSummary>,
}

impl UserProfile {
    /// The profile location, or `None` when it is missing or blank.
    pub fn location(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|loc| !loc.is_empty())
    }
}
