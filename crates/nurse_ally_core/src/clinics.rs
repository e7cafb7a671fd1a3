//! crates/nurse_ally_core/src/clinics.rs
//!
//! Static clinic directory. There is no geocoding here: each urgency tier has
//! one fixed facility and the caller's location is appended to its street
//! address.

use async_trait::async_trait;

use crate::domain::{ClinicRecord, ClinicSearch, UrgencyTier};
use crate::ports::{ClinicDirectoryService, PortResult};

struct ClinicTemplate {
    name: &'static str,
    street: &'static str,
    phone: &'static str,
    facility_type: &'static str,
    wait_time: &'static str,
    accepts_insurance: bool,
}

fn template(urgency: UrgencyTier) -> ClinicTemplate {
    match urgency {
        UrgencyTier::Emergency => ClinicTemplate {
            name: "City General Hospital Emergency Department",
            street: "100 Hospital Drive",
            phone: "(555) 911-0000",
            facility_type: "Emergency Room",
            wait_time: "Immediate",
            accepts_insurance: true,
        },
        UrgencyTier::High => ClinicTemplate {
            name: "Rapid Response Urgent Care",
            street: "250 Main Street",
            phone: "(555) 234-5678",
            facility_type: "Urgent Care",
            wait_time: "15-30 minutes",
            accepts_insurance: true,
        },
        UrgencyTier::Medium => ClinicTemplate {
            name: "Community Health Walk-In Clinic",
            street: "48 Oak Avenue",
            phone: "(555) 345-6789",
            facility_type: "Walk-In Clinic",
            wait_time: "30-60 minutes",
            accepts_insurance: true,
        },
        UrgencyTier::Low => ClinicTemplate {
            name: "Family Care Primary Practice",
            street: "12 Elm Street",
            phone: "(555) 456-7890",
            facility_type: "Primary Care",
            wait_time: "Next-day appointments",
            accepts_insurance: true,
        },
    }
}

/// Looks up the clinic list for `urgency`, interpolating `location` into the
/// address.
pub fn find_clinics(location: &str, urgency: UrgencyTier) -> ClinicSearch {
    let t = template(urgency);
    let clinic = ClinicRecord {
        name: t.name.to_string(),
        address: format!("{}, {}", t.street, location),
        phone: t.phone.to_string(),
        facility_type: t.facility_type.to_string(),
        wait_time: t.wait_time.to_string(),
        accepts_insurance: t.accepts_insurance,
    };

    ClinicSearch {
        clinics: vec![clinic],
        location: location.to_string(),
        urgency,
    }
}

/// Like [`find_clinics`], but takes a raw tier label. Unknown labels fall back
/// to the `low` tier.
pub fn find_clinics_for_label(location: &str, urgency: &str) -> ClinicSearch {
    find_clinics(location, UrgencyTier::parse_or_low(urgency))
}

//=========================================================================================
// `ClinicDirectoryService` Implementation
//=========================================================================================

/// Mock clinic directory backed by [`find_clinics`].
#[derive(Debug, Clone, Default)]
pub struct StaticClinicDirectory;

impl StaticClinicDirectory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ClinicDirectoryService for StaticClinicDirectory {
    async fn find_clinics(
        &self,
        location: &str,
        urgency: UrgencyTier,
    ) -> PortResult<ClinicSearch> {
        Ok(find_clinics(location, urgency))
    }
}
