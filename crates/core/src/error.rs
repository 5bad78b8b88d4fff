use crate::accounts::Role;

#[derive(Debug, thiserror::Error)]
pub enum RxError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("invalid input: {0}")]
    Text(#[from] rx_types::TextError),

    #[error("All fields are required for signup.")]
    MissingSignupFields,
    #[error("User with this email already exists.")]
    DuplicateEmail,
    #[error("Invalid credentials or role mismatch.")]
    InvalidCredentials,
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error("{actual} accounts cannot perform this action ({required} required)")]
    Forbidden { required: Role, actual: Role },

    #[error("Please fill all fields.")]
    MissingPrescriptionFields,
    #[error("Prescription ID not found.")]
    PrescriptionNotFound(String),
    #[error("prescription {0} is not issued to this patient")]
    NotPrescriptionOwner(String),
    #[error("prescription {0} has already been dispensed")]
    AlreadyDispensed(String),
    #[error("all doses of prescription {0} are already recorded")]
    AdherenceComplete(String),
    #[error("failed to allocate a unique reference id after {0} attempts")]
    ReferenceIdExhausted(usize),

    #[error("Please enter all reminder times in a valid HH:MM format.")]
    InvalidReminderTimes,

    #[error("invalid store key: {0}")]
    InvalidStoreKey(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize value for key {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to deserialize value for key {key}: {source}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store lock poisoned")]
    StoreLockPoisoned,
}

pub type RxResult<T> = std::result::Result<T, RxError>;
