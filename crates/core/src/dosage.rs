//! Advisory dosage validator.
//!
//! A static decision table keyed by medicine, age bracket, dosage and frequency. Every query
//! yields exactly one [`Advisory`]; the first failing rule wins. Results are advice for the
//! prescribing doctor and never block issuing a prescription.

use std::fmt;

/// Highest accepted number of doses per day, for any medicine.
pub const MAX_DOSES_PER_DAY: u32 = 4;

/// The inputs a doctor has typed so far. Zero means "not filled in".
#[derive(Clone, Copy, Debug)]
pub struct DosageQuery<'a> {
    pub medicine: &'a str,
    pub age: u32,
    pub dosage: u32,
    pub frequency: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeBracket {
    /// Under 6.
    Infant,
    /// 6 to 12 inclusive.
    Child,
    /// 13 and over.
    Adult,
}

impl AgeBracket {
    pub fn for_age(age: u32) -> Self {
        match age {
            0..=5 => AgeBracket::Infant,
            6..=12 => AgeBracket::Child,
            _ => AgeBracket::Adult,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Medicine {
    Paracetamol,
    Amoxicillin,
    Azithromycin,
}

impl Medicine {
    /// Looks a medicine up by name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "paracetamol" => Some(Medicine::Paracetamol),
            "amoxicillin" => Some(Medicine::Amoxicillin),
            "azithromycin" => Some(Medicine::Azithromycin),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Medicine::Paracetamol => "Paracetamol",
            Medicine::Amoxicillin => "Amoxicillin",
            Medicine::Azithromycin => "Azithromycin",
        }
    }
}

/// One row of the decision table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guideline {
    /// Dosage must fall within `min..=max` mg; frequency is not checked.
    Range { min: u32, max: u32, interval: &'static str },
    /// Dosage must equal `dosage` mg, then frequency must equal `frequency`.
    Exact {
        dosage: u32,
        frequency: u32,
        schedule: &'static str,
    },
    /// Depends on body weight, which is not captured.
    WeightBased,
}

/// Decision table lookup.
pub fn guideline(medicine: Medicine, bracket: AgeBracket) -> Guideline {
    use AgeBracket::*;
    use Medicine::*;

    match (medicine, bracket) {
        (Paracetamol, Adult) => Guideline::Range {
            min: 500,
            max: 1000,
            interval: "every 6 hours",
        },
        (Paracetamol, Child) => Guideline::Range {
            min: 250,
            max: 500,
            interval: "every 6 hours",
        },
        (Paracetamol, Infant) => Guideline::Range {
            min: 120,
            max: 250,
            interval: "every 6 hours",
        },
        (Amoxicillin, Adult) => Guideline::Exact {
            dosage: 500,
            frequency: 3,
            schedule: "every 8 hours",
        },
        (Amoxicillin, Child | Infant) => Guideline::Exact {
            dosage: 250,
            frequency: 3,
            schedule: "every 8 hours",
        },
        (Azithromycin, Adult) => Guideline::Exact {
            dosage: 500,
            frequency: 1,
            schedule: "once daily",
        },
        (Azithromycin, Child | Infant) => Guideline::WeightBased,
    }
}

/// Outcome of a validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advisory {
    Incomplete,
    FrequencyTooHigh,
    DosageTooLow {
        dosage: u32,
        age: u32,
        bracket: AgeBracket,
        min: u32,
        max: u32,
        interval: &'static str,
    },
    DosageUnsafe {
        dosage: u32,
        age: u32,
        bracket: AgeBracket,
        min: u32,
        max: u32,
    },
    DosageIncorrect {
        medicine: Medicine,
        dosage: u32,
        bracket: AgeBracket,
        expected: u32,
        schedule: &'static str,
    },
    FrequencyUnusual {
        medicine: Medicine,
        frequency: u32,
        expected: u32,
    },
    NeedsWeight { medicine: Medicine },
    UnknownMedicine,
    Validated,
}

impl Advisory {
    pub fn is_warning(&self) -> bool {
        !matches!(self, Advisory::Validated)
    }

    /// The message shown to the doctor.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

fn patient_phrase(bracket: AgeBracket, age: u32) -> String {
    match bracket {
        AgeBracket::Adult => "an adult".to_string(),
        AgeBracket::Child => format!("a child aged {age}"),
        AgeBracket::Infant => format!("an infant aged {age}"),
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::Incomplete => f.write_str(
                "⚠️ Incomplete data. Please fill patient age, medicine, dosage, and frequency before validating.",
            ),
            Advisory::FrequencyTooHigh => write!(
                f,
                "⚠️ The entered frequency is too high. Recommended maximum is {MAX_DOSES_PER_DAY} times per day."
            ),
            Advisory::DosageTooLow {
                dosage,
                age,
                bracket,
                min,
                max,
                interval,
            } => write!(
                f,
                "⚠️ The entered dosage ({dosage} mg) is too low for {}. Recommended: {min}–{max} mg {interval}.",
                patient_phrase(*bracket, *age)
            ),
            Advisory::DosageUnsafe {
                dosage,
                age,
                bracket,
                min,
                max,
            } => {
                let who = match bracket {
                    AgeBracket::Adult => "adults".to_string(),
                    _ => patient_phrase(*bracket, *age),
                };
                write!(
                    f,
                    "⚠️ Unsafe dosage detected. The dosage ({dosage} mg) exceeds safe limit for {who}. Recommended: {min}–{max} mg."
                )
            }
            Advisory::DosageIncorrect {
                medicine,
                dosage,
                bracket,
                expected,
                schedule,
            } => {
                let who = match bracket {
                    AgeBracket::Adult => "an adult",
                    _ => "a child",
                };
                write!(
                    f,
                    "⚠️ The entered dosage ({dosage} mg) for {} is incorrect for {who}. Recommended: {expected} mg {schedule}.",
                    medicine.display_name()
                )
            }
            Advisory::FrequencyUnusual {
                medicine,
                frequency,
                expected,
            } => {
                if *expected == 1 {
                    write!(
                        f,
                        "⚠️ The frequency for {} is incorrect. Recommended: once daily.",
                        medicine.display_name()
                    )
                } else {
                    write!(
                        f,
                        "⚠️ The frequency for {} is typically {expected} times/day. Please confirm if {frequency} times/day is intended.",
                        medicine.display_name()
                    )
                }
            }
            Advisory::NeedsWeight { medicine } => write!(
                f,
                "⚠️ Cannot validate {} dosage for children without patient weight. Standard is 10 mg/kg once daily. Please verify manually.",
                medicine.display_name()
            ),
            Advisory::UnknownMedicine => f.write_str(
                "⚠️ No standard dosage information found for this medicine. Please verify manually.",
            ),
            Advisory::Validated => f.write_str("✅ Prescription validated successfully!"),
        }
    }
}

/// Runs `query` through the decision table.
pub fn validate(query: DosageQuery<'_>) -> Advisory {
    let DosageQuery {
        medicine,
        age,
        dosage,
        frequency,
    } = query;

    if dosage == 0 || frequency == 0 || age == 0 || medicine.trim().is_empty() {
        return Advisory::Incomplete;
    }

    // Zero frequency is already incomplete, so only the upper bound remains.
    if frequency > MAX_DOSES_PER_DAY {
        return Advisory::FrequencyTooHigh;
    }

    let Some(medicine) = Medicine::from_name(medicine) else {
        return Advisory::UnknownMedicine;
    };
    let bracket = AgeBracket::for_age(age);

    match guideline(medicine, bracket) {
        Guideline::Range { min, max, interval } => {
            if dosage < min {
                return Advisory::DosageTooLow {
                    dosage,
                    age,
                    bracket,
                    min,
                    max,
                    interval,
                };
            }
            if dosage > max {
                return Advisory::DosageUnsafe {
                    dosage,
                    age,
                    bracket,
                    min,
                    max,
                };
            }
        }
        Guideline::Exact {
            dosage: expected_dosage,
            frequency: expected_frequency,
            schedule,
        } => {
            if dosage != expected_dosage {
                return Advisory::DosageIncorrect {
                    medicine,
                    dosage,
                    bracket,
                    expected: expected_dosage,
                    schedule,
                };
            }
            if frequency != expected_frequency {
                return Advisory::FrequencyUnusual {
                    medicine,
                    frequency,
                    expected: expected_frequency,
                };
            }
        }
        Guideline::WeightBased => return Advisory::NeedsWeight { medicine },
    }

    Advisory::Validated
}
