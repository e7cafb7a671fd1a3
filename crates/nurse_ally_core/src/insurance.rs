//! crates/nurse_ally_core/src/insurance.rs
//!
//! Insurance summary STUB. Nothing in this module reads or parses the uploaded
//! document: every upload yields the same fabricated plan, tagged with the
//! uploaded file's name. Swap in a real `InsuranceSummaryService` to get actual
//! document understanding.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::{InsuranceDocument, InsuranceSummary};
use crate::ports::{InsuranceSummaryService, PortResult};

/// Returns the fixed demo summary with `source_filename` set to `filename`.
pub fn summarize(filename: &str) -> InsuranceSummary {
    let coverage_details = [
        ("primary_care", "$25 copay"),
        ("specialist", "$50 copay"),
        ("urgent_care", "$75 copay"),
        ("emergency_room", "$250 copay"),
        ("prescription_drugs", "$10 generic / $35 brand"),
    ]
    .into_iter()
    .map(|(category, copay)| (category.to_string(), copay.to_string()))
    .collect::<BTreeMap<_, _>>();

    let key_benefits = [
        "Preventive care covered at 100%",
        "Nationwide network of providers",
        "24/7 nurse hotline",
        "Telehealth visits for $0 copay",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    InsuranceSummary {
        plan_name: "HealthFirst PPO Gold".to_string(),
        provider: "HealthFirst Insurance Co.".to_string(),
        member_id: "HF123456789".to_string(),
        group_number: "GRP-004521".to_string(),
        coverage_details,
        key_benefits,
        source_filename: filename.to_string(),
    }
}

/// Non-functional insurance "parser" backed by [`summarize`].
#[derive(Debug, Clone, Default)]
pub struct StubInsuranceSummarizer;

impl StubInsuranceSummarizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InsuranceSummaryService for StubInsuranceSummarizer {
    async fn summarize(&self, document: &InsuranceDocument) -> PortResult<InsuranceSummary> {
        Ok(summarize(&document.filename))
    }
}
