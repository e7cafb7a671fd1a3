//! crates/nurse_ally_core/src/triage.rs
//!
//! Keyword-based symptom triage. This is a stand-in for a real triage engine:
//! it performs plain substring matching and nothing more.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{TriageResult, UrgencyTier};
use crate::ports::{PortResult, TriageService};

/// Reasoning returned when no keyword of any tier matches.
pub const GENERIC_REASONING: &str = "No specific warning signs were identified in your description. \
     Monitor your symptoms and seek care if they worsen or new symptoms appear.";

const EMERGENCY_KEYWORDS: &[&str] = &[
    "chest pain",
    "difficulty breathing",
    "can't breathe",
    "cannot breathe",
    "shortness of breath",
    "severe bleeding",
    "unconscious",
    "unresponsive",
    "stroke",
    "heart attack",
    "seizure",
    "overdose",
    "suicidal",
    "coughing blood",
];

const HIGH_KEYWORDS: &[&str] = &[
    "high fever",
    "severe pain",
    "broken",
    "fracture",
    "vomiting blood",
    "head injury",
    "deep cut",
    "dehydrated",
    "severe headache",
    "allergic reaction",
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "fever",
    "infection",
    "rash",
    "vomiting",
    "diarrhea",
    "sprain",
    "earache",
    "ear pain",
    "persistent cough",
    "swelling",
    "burning",
];

const LOW_KEYWORDS: &[&str] = &[
    "cold",
    "cough",
    "sore throat",
    "headache",
    "runny nose",
    "congestion",
    "sneezing",
    "minor",
    "allergy",
    "tired",
];

/// The keyword set for a tier.
fn keywords(tier: UrgencyTier) -> &'static [&'static str] {
    match tier {
        UrgencyTier::Emergency => EMERGENCY_KEYWORDS,
        UrgencyTier::High => HIGH_KEYWORDS,
        UrgencyTier::Medium => MEDIUM_KEYWORDS,
        UrgencyTier::Low => LOW_KEYWORDS,
    }
}

fn reasoning(tier: UrgencyTier) -> &'static str {
    match tier {
        UrgencyTier::Emergency => {
            "Your symptoms may indicate a life-threatening condition that requires immediate medical attention."
        }
        UrgencyTier::High => {
            "Your symptoms suggest a condition that should be evaluated by a healthcare provider within the next few hours."
        }
        UrgencyTier::Medium => {
            "Your symptoms should be evaluated by a healthcare provider within the next 24 to 48 hours."
        }
        UrgencyTier::Low => {
            "Your symptoms appear mild and can likely be managed with self-care or a routine appointment."
        }
    }
}

fn recommendations(tier: UrgencyTier) -> Vec<String> {
    let items: &[&str] = match tier {
        UrgencyTier::Emergency => &[
            "Call 911 or your local emergency number now",
            "Do not drive yourself to the hospital",
            "Stay with someone until help arrives",
        ],
        UrgencyTier::High => &[
            "Visit an urgent care center or emergency department today",
            "Avoid eating or drinking until you have been evaluated",
            "Have someone accompany you if possible",
        ],
        UrgencyTier::Medium => &[
            "Schedule an appointment with your primary care provider within 1 to 2 days",
            "Rest and stay hydrated",
            "Monitor your symptoms and note any changes",
        ],
        UrgencyTier::Low => &[
            "Rest and drink plenty of fluids",
            "Over-the-counter remedies may help relieve symptoms",
            "Book a routine appointment if symptoms last more than a week",
        ],
    };
    items.iter().map(|s| s.to_string()).collect()
}

/// Classifies `text` into an urgency tier.
///
/// Tiers are checked from most to least severe and the first tier with any
/// keyword occurring as a substring of the lower-cased text wins. Text that
/// matches nothing is `Low` with [`GENERIC_REASONING`].
pub fn classify(text: &str) -> TriageResult {
    let lowered = text.to_lowercase();

    for tier in UrgencyTier::PRIORITY_ORDER {
        if let Some(hit) = keywords(tier).iter().find(|kw| lowered.contains(*kw)) {
            debug!(urgency = %tier, keyword = *hit, "Triage keyword matched");
            return TriageResult {
                urgency: tier,
                reasoning: reasoning(tier).to_string(),
                recommendations: recommendations(tier),
            };
        }
    }

    TriageResult {
        urgency: UrgencyTier::Low,
        reasoning: GENERIC_REASONING.to_string(),
        recommendations: recommendations(UrgencyTier::Low),
    }
}

//=========================================================================================
// `TriageService` Implementation
//=========================================================================================

/// Mock triage engine backed by [`classify`].
#[derive(Debug, Clone, Default)]
pub struct KeywordTriageClassifier;

impl KeywordTriageClassifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TriageService for KeywordTriageClassifier {
    async fn classify(&self, text: &str) -> PortResult<TriageResult> {
        Ok(classify(text))
    }
}
