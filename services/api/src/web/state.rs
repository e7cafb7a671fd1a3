//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use nurse_ally_core::{
    ClinicDirectoryService, InsuranceSummaryService, KeywordTriageClassifier, ReplyComposer,
    SessionStore, StaticClinicDirectory, StubInsuranceSummarizer, TriageService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<dyn SessionStore>,
    pub triage: Arc<dyn TriageService>,
    pub clinics: Arc<dyn ClinicDirectoryService>,
    pub insurance: Arc<dyn InsuranceSummaryService>,
    pub composer: Arc<ReplyComposer>,
}

impl AppState {
    /// Wires the given session store to the mock triage, clinic and insurance
    /// capabilities.
    pub fn with_mock_services(config: Arc<Config>, sessions: Arc<dyn SessionStore>) -> Self {
        let triage: Arc<dyn TriageService> = Arc::new(KeywordTriageClassifier::new());
        let clinics: Arc<dyn ClinicDirectoryService> = Arc::new(StaticClinicDirectory::new());
        let composer = Arc::new(
            ReplyComposer::new(triage.clone(), clinics.clone())
                .with_history_window(config.history_window),
        );

        Self {
            config,
            sessions,
            triage,
            clinics,
            insurance: Arc::new(StubInsuranceSummarizer::new()),
            composer,
        }
    }
}
