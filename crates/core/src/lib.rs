//! # rxtrack Core
//!
//! Core business logic for the rxtrack prescription tracker.
//!
//! This crate contains pure data operations over a local JSON key-value store:
//! - accounts (signup, login, the current-user session)
//! - prescriptions (issue, adherence, dispensing)
//! - the advisory dosage validator
//! - medication reminders and their timers
//!
//! **No API concerns**: HTTP servers, request parsing and CLI presentation belong in
//! `api-rest`, `api-shared` or `rx-cli`.

pub mod accounts;
pub mod config;
pub mod constants;
pub mod dosage;
pub mod error;
pub mod prescriptions;
pub mod reminders;
pub mod store;
pub mod validation;

pub use accounts::{AccountService, NewUser, Role, User};
pub use config::CoreConfig;
pub use constants::DEFAULT_DATA_DIR;
pub use dosage::{Advisory, DosageQuery};
pub use error::{RxError, RxResult};
pub use prescriptions::{
    Adherence, PatientMedication, Prescription, PrescriptionForm, PrescriptionService,
    PrescriptionStatus,
};
pub use reminders::{
    ArmedReminder, ChannelNotifier, Notification, Notifier, ReminderScheduler, ReminderService,
    ReminderTime, TracingNotifier,
};
pub use rx_types::{EmailAddress, NonEmptyText};
pub use store::LocalStore;
