//! crates/nurse_ally_core/src/composer.rs
//!
//! Turns an incoming chat message into the assistant's reply.
//!
//! The composer performs no I/O of its own. It picks a reply branch from
//! keywords in the message, calls the injected triage and clinic capabilities
//! when the branch needs them, and renders the result into text.
//!
//! Conversation history is accepted as a window of the most recent messages.
//! It never affects classification of the current message; it only adjusts
//! wording (returning-user greetings, follow-ups on earlier symptoms).

use std::sync::Arc;

use crate::domain::{
    ClinicRecord, ClinicSearch, Message, Sender, TriageResult, UrgencyTier, UserProfile,
};
use crate::ports::{ClinicDirectoryService, PortResult, TriageService};

/// Closing line for every non-emergency triage reply.
pub const DISCLAIMER: &str = "Please remember that I'm a virtual assistant and this is not a medical diagnosis. \
     If your symptoms worsen or you're unsure, contact a healthcare professional.";

/// Replaces [`DISCLAIMER`] when triage returns the emergency tier.
pub const EMERGENCY_WARNING: &str = "Your symptoms may indicate a medical emergency. \
     Call 911 or go to the nearest emergency room immediately.";

/// Location used when the profile does not carry one.
pub const DEFAULT_LOCATION: &str = "your area";

/// Number of prior messages consulted when none is configured.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

const GREETING_WORDS: &[&str] = &["hello", "hi", "hey", "greetings", "howdy", "hiya"];
const GREETING_PHRASES: &[&str] = &["good morning", "good afternoon", "good evening"];
const PAIN_KEYWORDS: &[&str] = &["pain", "hurt", "ache", "sore", "cramp"];
const FEVER_KEYWORDS: &[&str] = &["fever", "temperature", "chills", "feverish"];
const INSURANCE_KEYWORDS: &[&str] = &["insurance", "coverage", "copay", "deductible", "plan"];
const CLINIC_KEYWORDS: &[&str] = &[
    "clinic",
    "appointment",
    "doctor",
    "hospital",
    "urgent care",
    "where should i go",
];

/// The reply branch chosen for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Pain,
    Fever,
    Insurance,
    Clinic,
    Unclear,
}

impl Intent {
    /// Picks the first matching branch in the order greeting, pain, fever,
    /// insurance, clinic; anything else is `Unclear`.
    pub fn detect(message: &str) -> Self {
        let lowered = message.to_lowercase();

        if is_greeting(&lowered) {
            Intent::Greeting
        } else if contains_any(&lowered, PAIN_KEYWORDS) {
            Intent::Pain
        } else if contains_any(&lowered, FEVER_KEYWORDS) {
            Intent::Fever
        } else if contains_any(&lowered, INSURANCE_KEYWORDS) {
            Intent::Insurance
        } else if contains_any(&lowered, CLINIC_KEYWORDS) {
            Intent::Clinic
        } else {
            Intent::Unclear
        }
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| haystack.contains(kw))
}

// Greetings are matched on whole words so that e.g. "this" or "they" never
// read as "hi"/"hey".
fn is_greeting(lowered: &str) -> bool {
    if contains_any(lowered, GREETING_PHRASES) {
        return true;
    }
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETING_WORDS.contains(&word))
}

//=========================================================================================
// ReplyComposer
//=========================================================================================

/// Builds assistant replies from the triage and clinic capabilities.
#[derive(Clone)]
pub struct ReplyComposer {
    triage: Arc<dyn TriageService>,
    clinics: Arc<dyn ClinicDirectoryService>,
    history_window: usize,
}

impl ReplyComposer {
    pub fn new(triage: Arc<dyn TriageService>, clinics: Arc<dyn ClinicDirectoryService>) -> Self {
        Self {
            triage,
            clinics,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// Sets how many of the most recent history messages are consulted.
    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Composes the reply to `message`.
    ///
    /// `history` holds the user's earlier messages (oldest first), excluding
    /// `message` itself. Only the last `history_window` entries are read.
    pub async fn compose(
        &self,
        message: &str,
        profile: &UserProfile,
        history: &[Message],
    ) -> PortResult<String> {
        let context = &history[history.len().saturating_sub(self.history_window)..];
        let location = profile.location().unwrap_or(DEFAULT_LOCATION);

        match Intent::detect(message) {
            Intent::Greeting => Ok(greeting_reply(context)),
            Intent::Pain => {
                let triage = self.triage.classify(message).await?;
                let clinics = self.clinics.find_clinics(location, triage.urgency).await?;
                Ok(pain_reply(&triage, &clinics))
            }
            Intent::Fever => {
                let triage = self.triage.classify(message).await?;
                Ok(fever_reply(&triage))
            }
            Intent::Insurance => Ok(insurance_reply(profile)),
            Intent::Clinic => {
                let triage = self.triage.classify(message).await?;
                let clinics = self.clinics.find_clinics(location, triage.urgency).await?;
                Ok(clinic_reply(&clinics))
            }
            Intent::Unclear => {
                let earlier = self.earlier_concern(context).await?;
                Ok(clarifying_reply(earlier))
            }
        }
    }

    /// The most recent earlier user message that triaged above `Low`, if any.
    async fn earlier_concern(&self, context: &[Message]) -> PortResult<Option<UrgencyTier>> {
        for message in context.iter().rev().filter(|m| m.sender == Sender::User) {
            let triage = self.triage.classify(&message.text).await?;
            if triage.urgency > UrgencyTier::Low {
                return Ok(Some(triage.urgency));
            }
        }
        Ok(None)
    }
}

//=========================================================================================
// Templates
//=========================================================================================

fn bullets<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| format!("• {}", item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_clinic(clinic: &ClinicRecord) -> String {
    let insurance = if clinic.accepts_insurance {
        "Accepts insurance"
    } else {
        "Does not accept insurance"
    };
    format!(
        "{} ({}), {}. Phone: {}. Estimated wait: {}. {}.",
        clinic.name, clinic.facility_type, clinic.address, clinic.phone, clinic.wait_time, insurance
    )
}

fn closing(urgency: UrgencyTier) -> &'static str {
    if urgency == UrgencyTier::Emergency {
        EMERGENCY_WARNING
    } else {
        DISCLAIMER
    }
}

fn assessment(triage: &TriageResult) -> String {
    format!(
        "Urgency level: {}\n{}\n\nRecommendations:\n{}",
        triage.urgency,
        triage.reasoning,
        bullets(&triage.recommendations)
    )
}

fn greeting_reply(context: &[Message]) -> String {
    let returning = context.iter().any(|m| m.sender == Sender::Assistant);
    if returning {
        "Welcome back! I'm still here to help. How are you feeling now? \
         Tell me about any new or changing symptoms."
            .to_string()
    } else {
        "Hello! I'm Nurse Ally, your virtual nurse assistant. I can help you understand \
         your symptoms, find nearby care and make sense of your insurance coverage. \
         How are you feeling today?"
            .to_string()
    }
}

fn pain_reply(triage: &TriageResult, clinics: &ClinicSearch) -> String {
    format!(
        "I'm sorry you're dealing with pain. Here is my assessment based on what you've described:\n\n\
         {}\n\n\
         Care options near {}:\n{}\n\n\
         {}",
        assessment(triage),
        clinics.location,
        bullets(clinics.clinics.iter().map(describe_clinic)),
        closing(triage.urgency)
    )
}

fn fever_reply(triage: &TriageResult) -> String {
    format!(
        "A fever is often your body's way of fighting an infection. \
         Here is my assessment based on what you've described:\n\n\
         {}\n\n\
         Keep track of your temperature and stay hydrated.\n\n\
         {}",
        assessment(triage),
        closing(triage.urgency)
    )
}

fn insurance_reply(profile: &UserProfile) -> String {
    match &profile.insurance_summary {
        Some(summary) => format!(
            "Here's an overview of your {} plan from {} (member ID {}):\n\n\
             Coverage:\n{}\n\n\
             Key benefits:\n{}\n\n\
             Contact your insurer to confirm coverage before scheduling care.",
            summary.plan_name,
            summary.provider,
            summary.member_id,
            bullets(
                summary
                    .coverage_details
                    .iter()
                    .map(|(category, copay)| format!("{}: {}", category.replace('_', " "), copay))
            ),
            bullets(&summary.key_benefits)
        ),
        None => "I don't have your insurance information yet. Upload your insurance card or \
                 summary of benefits as a PDF and I'll explain what your plan covers."
            .to_string(),
    }
}

fn clinic_reply(clinics: &ClinicSearch) -> String {
    format!(
        "Here are care options near {} suited to a {} urgency visit:\n{}\n\n\
         If you describe your symptoms, I can help you decide where to go.",
        clinics.location,
        clinics.urgency,
        bullets(clinics.clinics.iter().map(describe_clinic))
    )
}

fn clarifying_reply(earlier: Option<UrgencyTier>) -> String {
    let mut reply = String::from(
        "I want to make sure I understand. Could you tell me more about how you're feeling?\n\
         • What symptoms are you experiencing?\n\
         • When did they start?\n\
         • How severe are they on a scale of 1 to 10?",
    );
    if let Some(urgency) = earlier {
        reply.push_str(&format!(
            "\n\nEarlier you described symptoms I rated as {urgency} urgency. \
             Let me know if those have changed."
        ));
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinics::StaticClinicDirectory;
    use crate::insurance::summarize;
    use crate::ports::PortError;
    use crate::triage::KeywordTriageClassifier;
    use async_trait::async_trait;

    fn composer() -> ReplyComposer {
        ReplyComposer::new(
            Arc::new(KeywordTriageClassifier::new()),
            Arc::new(StaticClinicDirectory::new()),
        )
    }

    fn located(location: &str) -> UserProfile {
        UserProfile {
            location: Some(location.to_string()),
            insurance_summary: None,
        }
    }

    #[test]
    fn intent_order_is_greeting_pain_fever_insurance_clinic() {
        assert_eq!(Intent::detect("Hello, I have a fever"), Intent::Greeting);
        assert_eq!(Intent::detect("My back hurts and I have a fever"), Intent::Pain);
        assert_eq!(Intent::detect("fever, does my insurance cover it?"), Intent::Fever);
        assert_eq!(Intent::detect("Does my insurance cover a clinic?"), Intent::Insurance);
        assert_eq!(Intent::detect("I need an appointment"), Intent::Clinic);
        assert_eq!(Intent::detect("I feel weird"), Intent::Unclear);
    }

    #[test]
    fn greeting_words_must_stand_alone() {
        assert_eq!(Intent::detect("this is chest pain"), Intent::Pain);
        assert_eq!(Intent::detect("they think it's nothing"), Intent::Unclear);
        assert_eq!(Intent::detect("hi!"), Intent::Greeting);
        assert_eq!(Intent::detect("Good evening nurse"), Intent::Greeting);
    }

    #[tokio::test]
    async fn chest_pain_gets_emergency_warning_and_clinic() {
        let reply = composer()
            .compose("I have chest pain", &located("Springfield"), &[])
            .await
            .unwrap();

        assert!(reply.contains("Urgency level: emergency"));
        assert!(reply.contains(EMERGENCY_WARNING));
        assert!(!reply.contains(DISCLAIMER));
        assert!(reply.contains("100 Hospital Drive, Springfield"));
        assert!(reply.contains("• Call 911"));
    }

    #[test]
    fn closing_lines_are_plain_text() {
        assert!(EMERGENCY_WARNING.is_ascii());
        assert!(DISCLAIMER.is_ascii());
        assert!(EMERGENCY_WARNING.starts_with("Your symptoms may indicate a medical emergency."));
    }

    #[tokio::test]
    async fn non_emergency_pain_uses_disclaimer_and_default_location() {
        let reply = composer()
            .compose("my ankle hurts, might be a sprain", &UserProfile::default(), &[])
            .await
            .unwrap();

        assert!(reply.contains("Urgency level: medium"));
        assert!(reply.contains(DISCLAIMER));
        assert!(!reply.contains(EMERGENCY_WARNING));
        assert!(reply.contains(&format!("Care options near {DEFAULT_LOCATION}")));
    }

    #[tokio::test]
    async fn fever_reply_has_no_clinics() {
        let reply = composer()
            .compose("I have a high fever", &located("Springfield"), &[])
            .await
            .unwrap();

        assert!(reply.contains("Urgency level: high"));
        assert!(!reply.contains("Care options"));
    }

    #[tokio::test]
    async fn insurance_reply_uses_profile_summary() {
        let profile = UserProfile {
            location: None,
            insurance_summary: Some(summarize("card.pdf")),
        };
        let reply = composer()
            .compose("What does my insurance cover?", &profile, &[])
            .await
            .unwrap();
        assert!(reply.contains("HealthFirst PPO Gold"));
        assert!(reply.contains("• primary care: $25 copay"));

        let without = composer()
            .compose("What does my insurance cover?", &UserProfile::default(), &[])
            .await
            .unwrap();
        assert!(without.contains("Upload your insurance card"));
    }

    #[tokio::test]
    async fn clinic_request_lists_tier_clinic() {
        let reply = composer()
            .compose("Where is the nearest clinic?", &located("Capital City"), &[])
            .await
            .unwrap();
        assert!(reply.contains("12 Elm Street, Capital City"));
        assert!(reply.contains("low urgency"));
    }

    #[tokio::test]
    async fn greeting_recognises_returning_user_within_window() {
        let history = vec![
            Message::from_user("hello"),
            Message::from_assistant("Hello! I'm Nurse Ally"),
        ];
        let c = composer();
        let first = c.compose("hi", &UserProfile::default(), &[]).await.unwrap();
        let again = c.compose("hi", &UserProfile::default(), &history).await.unwrap();
        assert!(first.starts_with("Hello!"));
        assert!(again.starts_with("Welcome back!"));

        // An assistant turn that has scrolled out of the window is ignored.
        let mut long = history.clone();
        long.extend((0..3).map(|i| Message::from_user(format!("note {i}"))));
        let narrow = composer().with_history_window(3);
        let reply = narrow.compose("hi", &UserProfile::default(), &long).await.unwrap();
        assert!(reply.starts_with("Hello!"));
    }

    #[tokio::test]
    async fn clarifying_reply_follows_up_on_earlier_symptoms() {
        let history = vec![
            Message::from_user("I have a rash"),
            Message::from_assistant("..."),
        ];
        let reply = composer()
            .compose("ok", &UserProfile::default(), &history)
            .await
            .unwrap();
        assert!(reply.contains("Could you tell me more"));
        assert!(reply.contains("rated as medium urgency"));

        let plain = composer()
            .compose("ok", &UserProfile::default(), &[])
            .await
            .unwrap();
        assert!(!plain.contains("Earlier you described"));
    }

    struct FailingTriage;

    #[async_trait]
    impl TriageService for FailingTriage {
        async fn classify(&self, _text: &str) -> PortResult<TriageResult> {
            Err(PortError::Unexpected("triage backend offline".to_string()))
        }
    }

    #[tokio::test]
    async fn capability_errors_propagate() {
        let composer = ReplyComposer::new(
            Arc::new(FailingTriage),
            Arc::new(StaticClinicDirectory::new()),
        );
        let err = composer
            .compose("my head hurts", &UserProfile::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));

        // Branches that never triage are unaffected.
        assert!(composer
            .compose("hello", &UserProfile::default(), &[])
            .await
            .is_ok());
    }
}
