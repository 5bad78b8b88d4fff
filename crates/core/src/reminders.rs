//! Medication reminders.
//!
//! A patient saves one `HH:MM` time per daily dose. Saving overwrites the schedule for that
//! prescription and arms one single-shot timer per time, due at the next wall-clock occurrence
//! of that time. When a timer expires a [`Notification`] is handed to the configured
//! [`Notifier`].
//!
//! Timers live only in the running process. Nothing re-arms them after a restart, and saving a
//! schedule again does not cancel timers armed by an earlier save.

use crate::accounts::{Role, User};
use crate::constants::{MAX_PRESCRIBED_FREQUENCY, REMINDER_TIMES_KEY, REMINDER_TITLE};
use crate::prescriptions::PrescriptionService;
use crate::store::LocalStore;
use crate::validation::is_hh_mm;
use crate::{RxError, RxResult};
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Stored reminder schedules: prescription id → `HH:MM` strings in the order entered.
pub type ReminderBook = BTreeMap<String, Vec<String>>;

/// A validated time of day with minute precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReminderTime(NaiveTime);

impl ReminderTime {
    /// Parses a strict 24-hour `HH:MM` string.
    pub fn parse(value: &str) -> RxResult<Self> {
        if !is_hh_mm(value) {
            return Err(RxError::InvalidReminderTimes);
        }
        let digit = |i: usize| u32::from(value.as_bytes()[i] - b'0');
        let hour = digit(0) * 10 + digit(1);
        let minute = digit(3) * 10 + digit(4);

        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or(RxError::InvalidReminderTimes)
    }

    pub fn time(self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

/// Time from `now` until the next occurrence of `time`.
///
/// Today's occurrence is used unless it is already in the past, in which case the reminder
/// moves to tomorrow. An occurrence exactly at `now` is due immediately.
pub fn delay_until(now: NaiveDateTime, time: ReminderTime) -> TimeDelta {
    let today = now.date().and_time(time.time());
    let due = if today < now {
        today + TimeDelta::days(1)
    } else {
        today
    };
    due - now
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// `med-reminder-<prescription id>-<HH:MM>`
    pub tag: String,
}

impl Notification {
    pub fn medication(prescription_id: &str, medicine: &str, time: ReminderTime) -> Self {
        Self {
            title: REMINDER_TITLE.to_string(),
            body: format!("It's time to take your {medicine}."),
            tag: format!("med-reminder-{prescription_id}-{time}"),
        }
    }
}

/// Receives reminders when they fall due.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

/// Emits reminders as `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            title = %notification.title,
            tag = %notification.tag,
            "{}",
            notification.body
        );
    }
}

/// Forwards reminders into a channel.
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(e) = self.tx.send(notification) {
            tracing::warn!(tag = %e.0.tag, "reminder dropped: receiver closed");
        }
    }
}

/// A timer armed for one reminder time.
#[derive(Debug)]
pub struct ArmedReminder {
    pub tag: String,
    pub time: ReminderTime,
    pub delay: std::time::Duration,
    handle: JoinHandle<()>,
}

impl ArmedReminder {
    /// Waits for the reminder to fire. Returns `false` if it was cancelled.
    pub async fn fired(self) -> bool {
        self.handle.await.is_ok()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

/// Arms single-shot reminder timers on the current Tokio runtime.
#[derive(Clone)]
pub struct ReminderScheduler {
    notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReminderScheduler").finish_non_exhaustive()
    }
}

impl Default for ReminderScheduler {
    fn default() -> Self {
        Self::new(Arc::new(TracingNotifier))
    }
}

impl ReminderScheduler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Arms one timer per entry of `times`, measured from `now`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm(
        &self,
        prescription_id: &str,
        medicine: &str,
        times: &[ReminderTime],
        now: NaiveDateTime,
    ) -> Vec<ArmedReminder> {
        times
            .iter()
            .map(|&time| {
                let delay = delay_until(now, time).to_std().unwrap_or_default();
                let notification = Notification::medication(prescription_id, medicine, time);
                let tag = notification.tag.clone();
                let notifier = Arc::clone(&self.notifier);

                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    notifier.notify(notification);
                });

                tracing::debug!(%tag, delay_secs = delay.as_secs(), "reminder armed");
                ArmedReminder {
                    tag,
                    time,
                    delay,
                    handle,
                }
            })
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct ReminderService {
    store: LocalStore,
    prescriptions: PrescriptionService,
    scheduler: ReminderScheduler,
}

impl ReminderService {
    pub fn new(store: LocalStore, scheduler: ReminderScheduler) -> Self {
        Self {
            prescriptions: PrescriptionService::new(store.clone()),
            store,
            scheduler,
        }
    }

    /// Saved times for a prescription; empty when none were set.
    pub fn reminders_for(&self, reference: &str) -> RxResult<Vec<String>> {
        let prescription = self.prescriptions.find(reference)?;
        let book: ReminderBook = self.store.get_or_default(REMINDER_TIMES_KEY)?;
        Ok(book.get(&prescription.id).cloned().unwrap_or_default())
    }

    /// One entry per daily dose, pre-filled with saved times and blank otherwise.
    pub fn reminder_slots(&self, patient: &User, reference: &str) -> RxResult<Vec<String>> {
        let prescription = self.owned_prescription(patient, reference)?;
        let saved = self.reminders_for(&prescription.id)?;

        // Stored records are not trusted to respect the issue-time cap.
        let count = prescription.frequency.min(MAX_PRESCRIBED_FREQUENCY);
        Ok((0..count as usize)
            .map(|i| saved.get(i).cloned().unwrap_or_default())
            .collect())
    }

    /// Saves the schedule for a prescription and arms its reminders from the local time now.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn set_reminders(
        &self,
        patient: &User,
        reference: &str,
        times: &[String],
    ) -> RxResult<Vec<ArmedReminder>> {
        let now = chrono::Local::now().naive_local();
        self.set_reminders_at(patient, reference, times, now)
    }

    /// Like [`ReminderService::set_reminders`] with an explicit current time.
    ///
    /// # Errors
    ///
    /// - `RxError::NotPrescriptionOwner` if the prescription is for someone else,
    /// - `RxError::InvalidReminderTimes` unless exactly one valid `HH:MM` time is given per
    ///   daily dose.
    pub fn set_reminders_at(
        &self,
        patient: &User,
        reference: &str,
        times: &[String],
        now: NaiveDateTime,
    ) -> RxResult<Vec<ArmedReminder>> {
        let prescription = self.owned_prescription(patient, reference)?;

        if times.len() != prescription.frequency as usize {
            return Err(RxError::InvalidReminderTimes);
        }
        let parsed = times
            .iter()
            .map(|t| ReminderTime::parse(t))
            .collect::<RxResult<Vec<_>>>()?;

        self.store
            .update::<ReminderBook, _>(REMINDER_TIMES_KEY, |book| {
                book.insert(
                    prescription.id.clone(),
                    parsed.iter().map(ToString::to_string).collect(),
                );
                Ok(())
            })?;

        tracing::info!(
            reference = %prescription.id,
            count = parsed.len(),
            "reminders saved"
        );
        Ok(self
            .scheduler
            .arm(&prescription.id, &prescription.medicine, &parsed, now))
    }

    fn owned_prescription(
        &self,
        patient: &User,
        reference: &str,
    ) -> RxResult<crate::prescriptions::Prescription> {
        patient.require_role(Role::Patient)?;
        let prescription = self.prescriptions.find(reference)?;
        if prescription.patient_name != patient.name {
            return Err(RxError::NotPrescriptionOwner(prescription.id));
        }
        Ok(prescription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prescriptions::PrescriptionForm;
    use chrono::NaiveDate;
    use std::time::Duration;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn time(value: &str) -> ReminderTime {
        ReminderTime::parse(value).unwrap()
    }

    fn user(id: &str, name: &str, role: Role) -> User {
        User {
            id: id.into(),
            email: format!("{id}@example.com"),
            password: "pw".into(),
            name: name.into(),
            role,
        }
    }

    fn setup(
        frequency: u32,
    ) -> (
        TempDir,
        ReminderService,
        mpsc::UnboundedReceiver<Notification>,
        String,
    ) {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::open(temp.path()).unwrap();
        let prescription = PrescriptionService::new(store.clone())
            .issue(
                &user("doc", "Dr Grey", Role::Doctor),
                PrescriptionForm {
                    patient_name: "Sam".into(),
                    patient_age: 30,
                    disease: "Infection".into(),
                    medicine: "Amoxicillin".into(),
                    dosage: 500,
                    frequency,
                    duration: 5,
                },
            )
            .unwrap();
        let (notifier, rx) = ChannelNotifier::new();
        let service = ReminderService::new(store, ReminderScheduler::new(Arc::new(notifier)));
        (temp, service, rx, prescription.id)
    }

    fn sam() -> User {
        user("sam", "Sam", Role::Patient)
    }

    #[test]
    fn parse_accepts_only_strict_hh_mm() {
        assert_eq!(time("07:05").to_string(), "07:05");
        assert_eq!(time("23:59").to_string(), "23:59");
        for bad in ["7:05", "24:00", "12:60", "", "noon", "12:00:00"] {
            assert!(matches!(
                ReminderTime::parse(bad),
                Err(RxError::InvalidReminderTimes)
            ));
        }
    }

    #[test]
    fn delay_is_today_when_still_ahead() {
        assert_eq!(
            delay_until(at(7, 30, 0), time("08:00")),
            TimeDelta::minutes(30)
        );
    }

    #[test]
    fn delay_rolls_to_tomorrow_when_passed() {
        assert_eq!(
            delay_until(at(8, 0, 1), time("08:00")),
            TimeDelta::hours(24) - TimeDelta::seconds(1)
        );
        assert_eq!(
            delay_until(at(23, 30, 0), time("00:15")),
            TimeDelta::minutes(45)
        );
    }

    #[test]
    fn delay_is_zero_at_the_exact_minute() {
        assert_eq!(delay_until(at(8, 0, 0), time("08:00")), TimeDelta::zero());
    }

    #[test]
    fn notification_text_and_tag() {
        let n = Notification::medication("RX-2026-12345", "Amoxicillin", time("08:00"));
        assert_eq!(n.title, "Medication Reminder");
        assert_eq!(n.body, "It's time to take your Amoxicillin.");
        assert_eq!(n.tag, "med-reminder-RX-2026-12345-08:00");
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_fires_in_due_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let scheduler = ReminderScheduler::new(Arc::new(notifier));

        let armed = scheduler.arm(
            "RX-1",
            "Paracetamol",
            &[time("09:00"), time("08:00")],
            at(7, 0, 0),
        );
        assert_eq!(armed[0].delay, Duration::from_secs(2 * 3600));
        assert_eq!(armed[1].delay, Duration::from_secs(3600));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.tag, "med-reminder-RX-1-08:00");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.tag, "med-reminder-RX-1-09:00");

        for reminder in armed {
            assert!(reminder.fired().await);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_reminder_does_not_fire() {
        let (notifier, mut rx) = ChannelNotifier::new();
        let scheduler = ReminderScheduler::new(Arc::new(notifier));

        let mut armed = scheduler.arm("RX-1", "Paracetamol", &[time("08:00")], at(7, 0, 0));
        let reminder = armed.remove(0);
        reminder.cancel();
        assert!(!reminder.fired().await);

        drop(scheduler);
        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn set_reminders_saves_and_arms() {
        let (_temp, service, mut rx, id) = setup(3);

        let times = vec!["08:00".to_string(), "14:00".into(), "20:00".into()];
        let armed = service
            .set_reminders_at(&sam(), &id, &times, at(12, 0, 0))
            .unwrap();
        assert_eq!(armed.len(), 3);
        assert_eq!(service.reminders_for(&id).unwrap(), times);

        // 14:00 today, 20:00 today, then 08:00 tomorrow.
        let order: Vec<String> = vec![
            rx.recv().await.unwrap().tag,
            rx.recv().await.unwrap().tag,
            rx.recv().await.unwrap().tag,
        ];
        assert_eq!(
            order,
            vec![
                format!("med-reminder-{id}-14:00"),
                format!("med-reminder-{id}-20:00"),
                format!("med-reminder-{id}-08:00"),
            ]
        );
    }

    #[tokio::test]
    async fn set_reminders_requires_one_valid_time_per_dose() {
        let (_temp, service, _rx, id) = setup(2);

        for times in [
            vec!["08:00".to_string()],
            vec!["08:00".to_string(), "".into()],
            vec!["08:00".to_string(), "8pm".into()],
            vec!["08:00".to_string(), "12:00".into(), "16:00".into()],
        ] {
            let err = service
                .set_reminders_at(&sam(), &id, &times, at(6, 0, 0))
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                "Please enter all reminder times in a valid HH:MM format."
            );
        }
        assert!(service.reminders_for(&id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_reminders_overwrites_wholesale() {
        let (_temp, service, _rx, id) = setup(2);

        let first = vec!["08:00".to_string(), "20:00".into()];
        service
            .set_reminders_at(&sam(), &id, &first, at(6, 0, 0))
            .unwrap()
            .iter()
            .for_each(ArmedReminder::cancel);
        let second = vec!["09:30".to_string(), "21:30".into()];
        service
            .set_reminders_at(&sam(), &id, &second, at(6, 0, 0))
            .unwrap()
            .iter()
            .for_each(ArmedReminder::cancel);

        assert_eq!(service.reminders_for(&id).unwrap(), second);
        assert_eq!(service.reminder_slots(&sam(), &id).unwrap(), second);
    }

    #[tokio::test]
    async fn reminders_are_owner_only() {
        let (_temp, service, _rx, id) = setup(1);

        let other = user("o", "Other", Role::Patient);
        assert!(matches!(
            service.set_reminders_at(&other, &id, &["08:00".to_string()], at(6, 0, 0)),
            Err(RxError::NotPrescriptionOwner(_))
        ));
        let doctor = user("doc", "Dr Grey", Role::Doctor);
        assert!(matches!(
            service.reminder_slots(&doctor, &id),
            Err(RxError::Forbidden { .. })
        ));
    }

    #[test]
    fn slots_match_frequency_when_unset() {
        let (_temp, service, _rx, id) = setup(3);
        assert_eq!(
            service.reminder_slots(&sam(), &id).unwrap(),
            vec![String::new(), String::new(), String::new()]
        );
    }

    #[test]
    fn slots_are_capped_for_out_of_range_stored_frequency() {
        let (_temp, service, _rx, id) = setup(3);
        service
            .store
            .update::<Vec<crate::prescriptions::Prescription>, _>(
                crate::constants::PRESCRIPTIONS_KEY,
                |all| {
                    all[0].frequency = u32::MAX;
                    Ok(())
                },
            )
            .unwrap();

        let slots = service.reminder_slots(&sam(), &id).unwrap();
        assert_eq!(slots.len(), MAX_PRESCRIBED_FREQUENCY as usize);
    }
}
