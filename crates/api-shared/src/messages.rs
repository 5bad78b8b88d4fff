//! Request and response bodies for the HTTP API.
//!
//! These are wire types only. Conversion to and from `rx-core` domain types happens in
//! `api-rest`, which keeps this crate free of core dependencies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum UserRole {
    Doctor,
    Patient,
    Pharmacy,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupReq {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: UserRole,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// A user as returned by the API. The password is never included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserRes {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

/// Missing numbers default to 0, which the validator reports as incomplete data.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ValidateDosageReq {
    pub medicine: String,
    pub patient_age: u32,
    pub dosage: u32,
    pub frequency: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidateDosageRes {
    pub message: String,
    pub warning: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct IssuePrescriptionReq {
    pub patient_name: String,
    pub patient_age: u32,
    pub disease: String,
    pub medicine: String,
    pub dosage: u32,
    pub frequency: u32,
    pub duration: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PrescriptionStatus {
    Issued,
    Dispensed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionRes {
    pub id: String,
    pub patient_name: String,
    pub patient_age: u32,
    pub disease: String,
    pub medicine: String,
    pub dosage: u32,
    pub frequency: u32,
    pub duration: u32,
    pub doctor_id: String,
    pub doctor_name: String,
    pub status: PrescriptionStatus,
    pub adherence_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListPrescriptionsRes {
    pub prescriptions: Vec<PrescriptionRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdherenceRes {
    pub taken: u32,
    pub total: u32,
    pub percentage: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MedicationRes {
    pub prescription: PrescriptionRes,
    pub adherence: AdherenceRes,
    pub reminders: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListMedicationsRes {
    pub medications: Vec<MedicationRes>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SetRemindersReq {
    #[serde(default)]
    pub times: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ArmedReminderRes {
    pub tag: String,
    pub time: String,
    pub delay_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SetRemindersRes {
    pub prescription_id: String,
    pub armed: Vec<ArmedReminderRes>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RemindersRes {
    pub prescription_id: String,
    /// One entry per daily dose; blank where no time is saved.
    pub slots: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_request_missing_fields_default_to_blank() {
        let req: IssuePrescriptionReq =
            serde_json::from_str(r#"{"patient_name":"Sam","dosage":500}"#).unwrap();
        assert_eq!(req.patient_name, "Sam");
        assert_eq!(req.dosage, 500);
        assert_eq!(req.frequency, 0);
        assert!(req.disease.is_empty());
    }

    #[test]
    fn roles_and_statuses_use_title_case() {
        assert_eq!(
            serde_json::to_string(&UserRole::Pharmacy).unwrap(),
            "\"Pharmacy\""
        );
        assert_eq!(
            serde_json::from_str::<PrescriptionStatus>("\"Dispensed\"").unwrap(),
            PrescriptionStatus::Dispensed
        );
    }
}
