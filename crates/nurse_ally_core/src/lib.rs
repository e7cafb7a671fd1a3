pub mod clinics;
pub mod composer;
pub mod domain;
pub mod insurance;
pub mod ports;
pub mod triage;

pub use clinics::StaticClinicDirectory;
pub use composer::{Intent, ReplyComposer};
pub use domain::{
    ClinicRecord, ClinicSearch, InsuranceDocument, InsuranceSummary, Message, Sender, Session,
    TriageResult, UrgencyTier, UserProfile,
};
pub use insurance::StubInsuranceSummarizer;
pub use ports::{
    ClinicDirectoryService, InsuranceSummaryService, PortError, PortResult, SessionStore,
    TriageService,
};
pub use triage::KeywordTriageClassifier;
