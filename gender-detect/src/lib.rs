//! Name based gender inference.
//!
//! The linguistic work is delegated to a [`GenderLookup`] collaborator which
//! maps a first name (optionally scoped to a country) to a [`RawGender`]. The
//! [`NameGenderDetector`] turns those answers into the three avatar genders
//! and adds the multi-country consensus used when the locale-agnostic answer
//! is inconclusive.

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

mod detector;
mod dictionary;

pub use detector::{
    CountryComparison, DetailedGender, DetectionMethod, NameGenderDetector,
    Resolution, COMPARE_COUNTRIES, SMART_COUNTRIES,
};
pub use dictionary::NameDictionary;

/// Gender of an avatar asset set.
///
/// `Random` covers unisex and unknown names and selects from the mixed set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Random,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Random];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Random => "random",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "random" => Ok(Gender::Random),
            _ => Err(format!("Invalid gender: {}", s)),
        }
    }
}

/// Answer vocabulary of a [`GenderLookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawGender {
    Male,
    MostlyMale,
    Unisex,
    MostlyFemale,
    Female,
}

impl RawGender {
    /// Parses a dictionary code (`M`, `1M`, `?M`, `F`, `1F`, `?F`, `?`)
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(RawGender::Male),
            "1M" | "?M" => Some(RawGender::MostlyMale),
            "F" => Some(RawGender::Female),
            "1F" | "?F" => Some(RawGender::MostlyFemale),
            "?" => Some(RawGender::Unisex),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RawGender::Male => "Male",
            RawGender::MostlyMale => "MostlyMale",
            RawGender::Unisex => "Unisex",
            RawGender::MostlyFemale => "MostlyFemale",
            RawGender::Female => "Female",
        }
    }

    pub fn to_gender(self) -> Gender {
        match self {
            RawGender::Male | RawGender::MostlyMale => Gender::Male,
            RawGender::Female | RawGender::MostlyFemale => Gender::Female,
            RawGender::Unisex => Gender::Random,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn of(raw: Option<RawGender>) -> Self {
        match raw {
            None => Confidence::None,
            Some(RawGender::Male | RawGender::Female) => Confidence::High,
            Some(RawGender::MostlyMale | RawGender::MostlyFemale) => {
                Confidence::Medium
            }
            Some(RawGender::Unisex) => Confidence::Low,
        }
    }

    pub fn is_confident(&self) -> bool {
        matches!(self, Confidence::High | Confidence::Medium)
    }
}

/// External name to gender database.
///
/// `None` means the name is unknown (for the given country, if any). Unknown
/// answers are not errors: callers degrade them to [`Gender::Random`].
pub trait GenderLookup: Send + Sync {
    fn lookup(&self, first_name: &str, country: Option<&str>) -> Option<RawGender>;
}

impl<T: GenderLookup + ?Sized> GenderLookup for Box<T> {
    fn lookup(&self, first_name: &str, country: Option<&str>) -> Option<RawGender> {
        (**self).lookup(first_name, country)
    }
}

impl<T: GenderLookup + ?Sized> GenderLookup for Arc<T> {
    fn lookup(&self, first_name: &str, country: Option<&str>) -> Option<RawGender> {
        (**self).lookup(first_name, country)
    }
}
