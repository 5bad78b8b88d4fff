//! Prescriptions: issue, list, adherence and dispensing.
//!
//! All prescriptions live in one array under the `prescriptions` key. Records are never
//! deleted; the only mutations are the adherence counter (patient) and the one-way
//! `Issued` → `Dispensed` status flip (pharmacy).

use crate::accounts::{Role, User};
use crate::constants::{
    MAX_PRESCRIBED_FREQUENCY, PRESCRIPTIONS_KEY, REFERENCE_ID_ATTEMPTS, REFERENCE_ID_PREFIX,
    REMINDER_TIMES_KEY,
};
use crate::reminders::ReminderBook;
use crate::store::LocalStore;
use crate::{RxError, RxResult};
use chrono::Datelike;
use rand::Rng;
use rx_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrescriptionStatus {
    Issued,
    Dispensed,
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrescriptionStatus::Issued => f.write_str("Issued"),
            PrescriptionStatus::Dispensed => f.write_str("Dispensed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    /// Reference id, `RX-<year>-<nnnnn>`.
    pub id: String,
    pub patient_name: String,
    pub patient_age: u32,
    pub disease: String,
    pub medicine: String,
    /// Milligrams per dose.
    pub dosage: u32,
    /// Doses per day.
    pub frequency: u32,
    /// Days.
    pub duration: u32,
    pub doctor_id: String,
    pub doctor_name: String,
    pub status: PrescriptionStatus,
    pub adherence_count: u32,
}

impl Prescription {
    pub fn total_doses(&self) -> u32 {
        self.frequency.saturating_mul(self.duration)
    }

    pub fn adherence(&self) -> Adherence {
        Adherence {
            taken: self.adherence_count,
            total: self.total_doses(),
        }
    }

    /// Case-insensitive comparison against a typed-in reference, ignoring surrounding whitespace.
    pub fn matches_reference(&self, reference: &str) -> bool {
        self.id.eq_ignore_ascii_case(reference.trim())
    }
}

/// Doses taken out of the doses prescribed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adherence {
    pub taken: u32,
    pub total: u32,
}

impl Adherence {
    /// 0 when nothing was prescribed.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.taken) / f64::from(self.total) * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.taken >= self.total
    }
}

/// Generates a reference id of the form `RX-<year>-<nnnnn>` with `nnnnn` in `10000..=99999`.
pub fn generate_reference_id<R: Rng + ?Sized>(year: i32, rng: &mut R) -> String {
    let number: u32 = rng.gen_range(10000..=99999);
    format!("{REFERENCE_ID_PREFIX}-{year}-{number}")
}

/// Raw input from the new-prescription form. Zero numbers count as "not filled in".
#[derive(Clone, Debug, Default)]
pub struct PrescriptionForm {
    pub patient_name: String,
    pub patient_age: u32,
    pub disease: String,
    pub medicine: String,
    pub dosage: u32,
    pub frequency: u32,
    pub duration: u32,
}

/// A prescription as shown on the patient dashboard.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientMedication {
    pub prescription: Prescription,
    pub adherence: Adherence,
    pub reminders: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct PrescriptionService {
    store: LocalStore,
}

impl PrescriptionService {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Issues a new prescription on behalf of `doctor`.
    ///
    /// # Errors
    ///
    /// - `RxError::Forbidden` unless `doctor` is a Doctor,
    /// - `RxError::MissingPrescriptionFields` if a text field is blank or dosage, frequency or
    ///   duration is zero,
    /// - `RxError::InvalidInput` if frequency is above `MAX_PRESCRIBED_FREQUENCY`,
    /// - `RxError::ReferenceIdExhausted` if no unused reference id could be drawn,
    /// - storage errors.
    pub fn issue(&self, doctor: &User, form: PrescriptionForm) -> RxResult<Prescription> {
        let year = chrono::Local::now().year();
        self.issue_with(doctor, form, year, &mut rand::thread_rng())
    }

    pub(crate) fn issue_with<R: Rng + ?Sized>(
        &self,
        doctor: &User,
        form: PrescriptionForm,
        year: i32,
        rng: &mut R,
    ) -> RxResult<Prescription> {
        doctor.require_role(Role::Doctor)?;

        let required = |value: &str| {
            NonEmptyText::new(value)
                .map(NonEmptyText::into_inner)
                .map_err(|_| RxError::MissingPrescriptionFields)
        };
        let patient_name = required(&form.patient_name)?;
        let disease = required(&form.disease)?;
        let medicine = required(&form.medicine)?;
        // Age 0 is a valid infant age.
        if [form.dosage, form.frequency, form.duration].contains(&0) {
            return Err(RxError::MissingPrescriptionFields);
        }
        if form.frequency > MAX_PRESCRIBED_FREQUENCY {
            return Err(RxError::InvalidInput(format!(
                "Frequency cannot exceed {MAX_PRESCRIBED_FREQUENCY} doses per day."
            )));
        }

        let prescription = self
            .store
            .update::<Vec<Prescription>, _>(PRESCRIPTIONS_KEY, |all| {
                let id = (0..REFERENCE_ID_ATTEMPTS)
                    .map(|_| generate_reference_id(year, rng))
                    .find(|candidate| !all.iter().any(|p| p.matches_reference(candidate)))
                    .ok_or(RxError::ReferenceIdExhausted(REFERENCE_ID_ATTEMPTS))?;

                let prescription = Prescription {
                    id,
                    patient_name,
                    patient_age: form.patient_age,
                    disease,
                    medicine,
                    dosage: form.dosage,
                    frequency: form.frequency,
                    duration: form.duration,
                    doctor_id: doctor.id.clone(),
                    doctor_name: doctor.name.clone(),
                    status: PrescriptionStatus::Issued,
                    adherence_count: 0,
                };
                all.push(prescription.clone());
                Ok(prescription)
            })?;

        tracing::info!(
            reference = %prescription.id,
            doctor_id = %doctor.id,
            medicine = %prescription.medicine,
            "prescription issued"
        );
        Ok(prescription)
    }

    /// Prescriptions issued by `doctor`, oldest first.
    pub fn issued_by(&self, doctor: &User) -> RxResult<Vec<Prescription>> {
        doctor.require_role(Role::Doctor)?;
        let all: Vec<Prescription> = self.store.get_or_default(PRESCRIPTIONS_KEY)?;
        Ok(all
            .into_iter()
            .filter(|p| p.doctor_id == doctor.id)
            .collect())
    }

    /// Prescriptions written for `patient` (matched by name), with adherence and reminders.
    pub fn for_patient(&self, patient: &User) -> RxResult<Vec<PatientMedication>> {
        patient.require_role(Role::Patient)?;
        let all: Vec<Prescription> = self.store.get_or_default(PRESCRIPTIONS_KEY)?;
        let book: ReminderBook = self.store.get_or_default(REMINDER_TIMES_KEY)?;

        Ok(all
            .into_iter()
            .filter(|p| p.patient_name == patient.name)
            .map(|prescription| PatientMedication {
                adherence: prescription.adherence(),
                reminders: book.get(&prescription.id).cloned().unwrap_or_default(),
                prescription,
            })
            .collect())
    }

    /// Finds a prescription by reference without any role check.
    pub fn find(&self, reference: &str) -> RxResult<Prescription> {
        let all: Vec<Prescription> = self.store.get_or_default(PRESCRIPTIONS_KEY)?;
        all.into_iter()
            .find(|p| p.matches_reference(reference))
            .ok_or_else(|| RxError::PrescriptionNotFound(reference.trim().to_string()))
    }

    /// Records one dose as taken.
    ///
    /// # Errors
    ///
    /// - `RxError::NotPrescriptionOwner` if the prescription is for someone else,
    /// - `RxError::AdherenceComplete` once every prescribed dose is recorded.
    pub fn mark_taken(&self, patient: &User, reference: &str) -> RxResult<Prescription> {
        patient.require_role(Role::Patient)?;

        let updated = self
            .store
            .update::<Vec<Prescription>, _>(PRESCRIPTIONS_KEY, |all| {
                let prescription = all
                    .iter_mut()
                    .find(|p| p.matches_reference(reference))
                    .ok_or_else(|| RxError::PrescriptionNotFound(reference.trim().to_string()))?;

                if prescription.patient_name != patient.name {
                    return Err(RxError::NotPrescriptionOwner(prescription.id.clone()));
                }
                if prescription.adherence().is_complete() {
                    return Err(RxError::AdherenceComplete(prescription.id.clone()));
                }

                prescription.adherence_count += 1;
                Ok(prescription.clone())
            })?;

        tracing::info!(
            reference = %updated.id,
            taken = updated.adherence_count,
            total = updated.total_doses(),
            "dose recorded"
        );
        Ok(updated)
    }

    /// Pharmacy search by reference id.
    pub fn lookup(&self, pharmacy: &User, reference: &str) -> RxResult<Prescription> {
        pharmacy.require_role(Role::Pharmacy)?;
        self.find(reference)
    }

    /// Marks a prescription as dispensed. The transition is one-way.
    pub fn dispense(&self, pharmacy: &User, reference: &str) -> RxResult<Prescription> {
        pharmacy.require_role(Role::Pharmacy)?;

        let updated = self
            .store
            .update::<Vec<Prescription>, _>(PRESCRIPTIONS_KEY, |all| {
                let prescription = all
                    .iter_mut()
                    .find(|p| p.matches_reference(reference))
                    .ok_or_else(|| RxError::PrescriptionNotFound(reference.trim().to_string()))?;

                if prescription.status == PrescriptionStatus::Dispensed {
                    return Err(RxError::AlreadyDispensed(prescription.id.clone()));
                }

                prescription.status = PrescriptionStatus::Dispensed;
                Ok(prescription.clone())
            })?;

        tracing::info!(
            reference = %updated.id,
            pharmacy_id = %pharmacy.id,
            "prescription dispensed"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn user(id: &str, name: &str, role: Role) -> User {
        User {
            id: id.into(),
            email: format!("{id}@example.com"),
            password: "pw".into(),
            name: name.into(),
            role,
        }
    }

    fn doctor() -> User {
        user("doc", "Dr Grey", Role::Doctor)
    }

    fn patient() -> User {
        user("pat", "Sam Patient", Role::Patient)
    }

    fn pharmacy() -> User {
        user("pha", "Corner Pharmacy", Role::Pharmacy)
    }

    fn form() -> PrescriptionForm {
        PrescriptionForm {
            patient_name: "Sam Patient".into(),
            patient_age: 34,
            disease: "Flu".into(),
            medicine: "Paracetamol".into(),
            dosage: 500,
            frequency: 2,
            duration: 2,
        }
    }

    fn service() -> (TempDir, PrescriptionService) {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::open(temp.path()).unwrap();
        (temp, PrescriptionService::new(store))
    }

    #[test]
    fn reference_id_format() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let id = generate_reference_id(2026, &mut rng);
            let number = id.strip_prefix("RX-2026-").expect("prefix");
            assert_eq!(number.len(), 5);
            let n: u32 = number.parse().unwrap();
            assert!((10000..=99999).contains(&n));
        }
    }

    #[test]
    fn issue_stores_new_issued_prescription() {
        let (_temp, service) = service();

        let issued = service.issue(&doctor(), form()).unwrap();
        assert!(issued.id.starts_with("RX-"));
        assert_eq!(issued.status, PrescriptionStatus::Issued);
        assert_eq!(issued.adherence_count, 0);
        assert_eq!(issued.doctor_id, "doc");
        assert_eq!(issued.doctor_name, "Dr Grey");

        assert_eq!(service.issued_by(&doctor()).unwrap(), vec![issued.clone()]);
        assert!(service
            .issued_by(&user("other", "Dr Other", Role::Doctor))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn issue_requires_doctor_and_every_field() {
        let (_temp, service) = service();

        assert!(matches!(
            service.issue(&patient(), form()),
            Err(RxError::Forbidden { .. })
        ));

        let blank_disease = PrescriptionForm {
            disease: "  ".into(),
            ..form()
        };
        let zero_duration = PrescriptionForm {
            duration: 0,
            ..form()
        };
        for bad in [blank_disease, zero_duration, PrescriptionForm::default()] {
            let err = service.issue(&doctor(), bad).unwrap_err();
            assert!(matches!(err, RxError::MissingPrescriptionFields));
            assert_eq!(err.to_string(), "Please fill all fields.");
        }
    }

    #[test]
    fn issue_accepts_infants_under_one() {
        let (_temp, service) = service();

        let issued = service
            .issue(
                &doctor(),
                PrescriptionForm {
                    patient_age: 0,
                    dosage: 120,
                    frequency: 4,
                    duration: 3,
                    ..form()
                },
            )
            .unwrap();
        assert_eq!(issued.patient_age, 0);
        assert_eq!(issued.total_doses(), 12);
    }

    #[test]
    fn issue_rejects_frequency_above_daily_cap() {
        let (_temp, service) = service();

        let at_cap = PrescriptionForm {
            frequency: MAX_PRESCRIBED_FREQUENCY,
            ..form()
        };
        assert!(service.issue(&doctor(), at_cap).is_ok());

        for frequency in [MAX_PRESCRIBED_FREQUENCY + 1, u32::MAX] {
            let err = service
                .issue(
                    &doctor(),
                    PrescriptionForm {
                        frequency,
                        ..form()
                    },
                )
                .unwrap_err();
            assert!(matches!(err, RxError::InvalidInput(_)));
        }
        assert_eq!(service.issued_by(&doctor()).unwrap().len(), 1);
    }

    #[test]
    fn reference_collisions_are_retried_then_reported() {
        let (_temp, service) = service();

        // StepRng with zero increment draws the same number every time.
        let first = service
            .issue_with(&doctor(), form(), 2026, &mut StepRng::new(0, 0))
            .unwrap();
        assert_eq!(first.id, "RX-2026-10000");

        let err = service
            .issue_with(&doctor(), form(), 2026, &mut StepRng::new(0, 0))
            .unwrap_err();
        assert!(matches!(err, RxError::ReferenceIdExhausted(5)));
        assert_eq!(service.issued_by(&doctor()).unwrap().len(), 1);
    }

    #[test]
    fn patient_sees_only_their_prescriptions_with_progress() {
        let (_temp, service) = service();
        let mine = service.issue(&doctor(), form()).unwrap();
        service
            .issue(
                &doctor(),
                PrescriptionForm {
                    patient_name: "Someone Else".into(),
                    ..form()
                },
            )
            .unwrap();

        service.mark_taken(&patient(), &mine.id).unwrap();

        let meds = service.for_patient(&patient()).unwrap();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].prescription.id, mine.id);
        assert_eq!(meds[0].adherence, Adherence { taken: 1, total: 4 });
        assert_eq!(meds[0].adherence.percentage(), 25.0);
        assert!(meds[0].reminders.is_empty());
    }

    #[test]
    fn mark_taken_caps_at_total_doses() {
        let (_temp, service) = service();
        let issued = service
            .issue(
                &doctor(),
                PrescriptionForm {
                    frequency: 1,
                    duration: 2,
                    ..form()
                },
            )
            .unwrap();

        service.mark_taken(&patient(), &issued.id).unwrap();
        let second = service
            .mark_taken(&patient(), &issued.id.to_lowercase())
            .unwrap();
        assert_eq!(second.adherence_count, 2);

        assert!(matches!(
            service.mark_taken(&patient(), &issued.id),
            Err(RxError::AdherenceComplete(_))
        ));
        assert_eq!(service.find(&issued.id).unwrap().adherence_count, 2);
    }

    #[test]
    fn mark_taken_rejects_other_patients() {
        let (_temp, service) = service();
        let issued = service.issue(&doctor(), form()).unwrap();

        let stranger = user("x", "Not Sam", Role::Patient);
        assert!(matches!(
            service.mark_taken(&stranger, &issued.id),
            Err(RxError::NotPrescriptionOwner(_))
        ));
        assert!(matches!(
            service.mark_taken(&patient(), "RX-1999-00000"),
            Err(RxError::PrescriptionNotFound(_))
        ));
    }

    #[test]
    fn pharmacy_lookup_is_case_insensitive() {
        let (_temp, service) = service();
        let issued = service.issue(&doctor(), form()).unwrap();

        let found = service
            .lookup(&pharmacy(), &format!("  {}  ", issued.id.to_lowercase()))
            .unwrap();
        assert_eq!(found, issued);

        let err = service.lookup(&pharmacy(), "RX-0000-11111").unwrap_err();
        assert_eq!(err.to_string(), "Prescription ID not found.");
        assert!(matches!(
            service.lookup(&doctor(), &issued.id),
            Err(RxError::Forbidden { .. })
        ));
    }

    #[test]
    fn dispense_is_one_way() {
        let (_temp, service) = service();
        let issued = service.issue(&doctor(), form()).unwrap();

        let dispensed = service.dispense(&pharmacy(), &issued.id).unwrap();
        assert_eq!(dispensed.status, PrescriptionStatus::Dispensed);
        assert!(matches!(
            service.dispense(&pharmacy(), &issued.id),
            Err(RxError::AlreadyDispensed(_))
        ));

        // Adherence tracking continues after dispensing.
        let taken = service.mark_taken(&patient(), &issued.id).unwrap();
        assert_eq!(taken.status, PrescriptionStatus::Dispensed);
        assert_eq!(taken.adherence_count, 1);
    }

    #[test]
    fn stored_json_uses_camel_case() {
        let (temp, service) = service();
        service.issue(&doctor(), form()).unwrap();

        let raw = std::fs::read_to_string(temp.path().join("prescriptions.json")).unwrap();
        assert!(raw.contains("\"patientName\""));
        assert!(raw.contains("\"adherenceCount\": 0"));
        assert!(raw.contains("\"status\": \"Issued\""));
    }

    #[test]
    fn adherence_percentage_handles_zero_total() {
        assert_eq!(Adherence { taken: 0, total: 0 }.percentage(), 0.0);
        assert!(Adherence { taken: 0, total: 0 }.is_complete());
    }
}
