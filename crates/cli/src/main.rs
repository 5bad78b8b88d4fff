use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rx_core::{
    dosage, AccountService, ChannelNotifier, CoreConfig, NewUser, Prescription, PrescriptionForm,
    PrescriptionService, ReminderScheduler, ReminderService, Role, DEFAULT_DATA_DIR,
};

#[derive(Parser)]
#[command(name = "rx")]
#[command(about = "rxtrack prescription tracker CLI")]
struct Cli {
    /// Directory holding the local store
    #[arg(long, env = "RX_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup {
        name: String,
        email: String,
        password: String,
        /// Doctor, Patient or Pharmacy
        #[arg(long)]
        role: Role,
    },
    /// Sign in
    Login {
        email: String,
        password: String,
        /// Must match the role chosen at signup
        #[arg(long)]
        role: Role,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check a dosage against the guideline table (doctor)
    Validate {
        medicine: String,
        #[arg(long, default_value_t = 0)]
        age: u32,
        /// Dosage in mg
        #[arg(long, default_value_t = 0)]
        dosage: u32,
        /// Doses per day
        #[arg(long, default_value_t = 0)]
        frequency: u32,
    },
    /// Issue a prescription (doctor)
    Issue {
        #[arg(long)]
        patient: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        disease: String,
        #[arg(long)]
        medicine: String,
        /// Dosage in mg
        #[arg(long)]
        dosage: u32,
        /// Doses per day
        #[arg(long)]
        frequency: u32,
        /// Duration in days
        #[arg(long)]
        duration: u32,
    },
    /// List prescriptions you have issued (doctor)
    Issued,
    /// List your medications with adherence and reminders (patient)
    Meds,
    /// Record one dose as taken (patient)
    Take {
        /// Prescription reference id
        id: String,
    },
    /// Save reminder times for a prescription and wait for them (patient)
    Remind {
        /// Prescription reference id
        id: String,
        /// One HH:MM time per daily dose
        #[arg(required = true)]
        times: Vec<String>,
        /// Save the schedule without waiting for reminders to fire
        #[arg(long)]
        no_wait: bool,
    },
    /// Verify a prescription by reference id (pharmacy)
    Lookup {
        /// Prescription reference id
        id: String,
    },
    /// Mark a prescription as dispensed (pharmacy)
    Dispense {
        /// Prescription reference id
        id: String,
    },
}

fn print_prescription(p: &Prescription) {
    println!("ID: {} [{}]", p.id, p.status);
    println!(
        "  Patient: {} (age {}), Disease: {}",
        p.patient_name, p.patient_age, p.disease
    );
    println!(
        "  Medicine: {} {} mg, {} times a day for {} days",
        p.medicine, p.dosage, p.frequency, p.duration
    );
    println!("  Doctor: {}", p.doctor_name);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rx_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let store = CoreConfig::new(cli.data_dir)?.open_store()?;
    let accounts = AccountService::new(store.clone());
    let prescriptions = PrescriptionService::new(store.clone());

    match cli.command {
        Some(Commands::Signup {
            name,
            email,
            password,
            role,
        }) => {
            let user = accounts.sign_up(NewUser {
                name,
                email,
                password,
                role,
            })?;
            println!("Signed up as {} ({})", user.name, user.role);
        }
        Some(Commands::Login {
            email,
            password,
            role,
        }) => {
            let user = accounts.login(&email, &password, role)?;
            println!("Logged in as {} ({})", user.name, user.role);
        }
        Some(Commands::Logout) => {
            accounts.logout()?;
            println!("Logged out.");
        }
        Some(Commands::Whoami) => match accounts.current_user()? {
            Some(user) => println!("{} <{}> ({}), ID: {}", user.name, user.email, user.role, user.id),
            None => println!("Not signed in."),
        },
        Some(Commands::Validate {
            medicine,
            age,
            dosage,
            frequency,
        }) => {
            accounts.require_current_user()?.require_role(Role::Doctor)?;
            let advisory = dosage::validate(dosage::DosageQuery {
                medicine: &medicine,
                age,
                dosage,
                frequency,
            });
            println!("{advisory}");
        }
        Some(Commands::Issue {
            patient,
            age,
            disease,
            medicine,
            dosage,
            frequency,
            duration,
        }) => {
            let doctor = accounts.require_current_user()?;
            let prescription = prescriptions.issue(
                &doctor,
                PrescriptionForm {
                    patient_name: patient,
                    patient_age: age,
                    disease,
                    medicine,
                    dosage,
                    frequency,
                    duration,
                },
            )?;
            println!("Prescription issued. ID: {}", prescription.id);
        }
        Some(Commands::Issued) => {
            let doctor = accounts.require_current_user()?;
            let issued = prescriptions.issued_by(&doctor)?;
            if issued.is_empty() {
                println!("No prescriptions issued yet.");
            }
            for p in &issued {
                print_prescription(p);
            }
        }
        Some(Commands::Meds) => {
            let patient = accounts.require_current_user()?;
            let meds = prescriptions.for_patient(&patient)?;
            if meds.is_empty() {
                println!("No prescriptions found.");
            }
            for med in &meds {
                print_prescription(&med.prescription);
                println!(
                    "  Adherence: {}/{} ({:.0}%)",
                    med.adherence.taken,
                    med.adherence.total,
                    med.adherence.percentage()
                );
                if !med.reminders.is_empty() {
                    println!("  Reminders: {}", med.reminders.join(", "));
                }
            }
        }
        Some(Commands::Take { id }) => {
            let patient = accounts.require_current_user()?;
            let p = prescriptions.mark_taken(&patient, &id)?;
            let adherence = p.adherence();
            println!(
                "Dose recorded for {}: {}/{}",
                p.id, adherence.taken, adherence.total
            );
        }
        Some(Commands::Remind { id, times, no_wait }) => {
            let patient = accounts.require_current_user()?;
            let (notifier, mut notifications) = ChannelNotifier::new();
            let reminders =
                ReminderService::new(store, ReminderScheduler::new(Arc::new(notifier)));

            let armed = reminders.set_reminders(&patient, &id, &times)?;
            println!("Reminders set successfully!");
            if no_wait {
                return Ok(());
            }

            for reminder in &armed {
                println!(
                    "  {} in {}m",
                    reminder.time,
                    reminder.delay.as_secs().div_ceil(60)
                );
            }
            for _ in 0..armed.len() {
                match notifications.recv().await {
                    Some(n) => println!("{}: {}", n.title, n.body),
                    None => break,
                }
            }
        }
        Some(Commands::Lookup { id }) => {
            let pharmacy = accounts.require_current_user()?;
            print_prescription(&prescriptions.lookup(&pharmacy, &id)?);
        }
        Some(Commands::Dispense { id }) => {
            let pharmacy = accounts.require_current_user()?;
            let p = prescriptions.dispense(&pharmacy, &id)?;
            println!("Prescription {} marked as dispensed.", p.id);
        }
        None => {
            println!("Use 'rx --help' for commands");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_role_case_insensitively() {
        let cli = Cli::try_parse_from([
            "rx", "login", "a@b.com", "pw", "--role", "pharmacy",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Login { role, .. }) => assert_eq!(role, Role::Pharmacy),
            _ => panic!("expected login"),
        }
    }

    #[test]
    fn remind_requires_times() {
        assert!(Cli::try_parse_from(["rx", "remind", "RX-2026-10000"]).is_err());

        let cli = Cli::try_parse_from([
            "rx", "remind", "RX-2026-10000", "08:00", "20:00", "--no-wait",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Remind { times, no_wait, .. }) => {
                assert_eq!(times, ["08:00", "20:00"]);
                assert!(no_wait);
            }
            _ => panic!("expected remind"),
        }
    }
}
