use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Confidence, Gender, GenderLookup, RawGender};

/// Countries queried when the locale-agnostic answer is inconclusive.
pub const SMART_COUNTRIES: [&str; 6] = ["US", "GB", "DE", "FR", "IT", "ES"];

/// Countries listed by the comparison query.
pub const COMPARE_COUNTRIES: [&str; 10] =
    ["US", "GB", "DE", "FR", "IT", "ES", "NL", "SE", "NO", "DK"];

/// How a [`Resolution`] was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Caller supplied a valid gender
    Explicit,
    /// Caller supplied an invalid gender, normalised to random
    Fallback,
    /// Smart detection on the name
    Smart,
    /// Country-specific lookup overrode smart detection
    Country,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub gender: Gender,
    pub method: DetectionMethod,
    /// Result of smart detection on the name, independent of any override
    pub detected: Gender,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedGender {
    pub name: String,
    pub original_input: String,
    pub detected_gender: Gender,
    pub raw_result: String,
    pub country: Option<String>,
    pub confidence: Confidence,
    pub is_confident: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryComparison {
    pub name: String,
    pub default: Gender,
    pub countries: BTreeMap<String, Gender>,
    pub smart: Gender,
}

/// Adapter turning [`GenderLookup`] answers into avatar genders.
pub struct NameGenderDetector<L> {
    lookup: L,
}

impl<L: GenderLookup> NameGenderDetector<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    /// Detects the gender of the first name in `name`, optionally scoped to
    /// `country`. Unknown and unisex names are `Random`.
    pub fn detect(&self, name: &str, country: Option<&str>) -> Gender {
        self.raw(name, country)
            .map(RawGender::to_gender)
            .unwrap_or(Gender::Random)
    }

    /// Extracts the first name from a full name: the first whitespace
    /// separated token with everything but letters removed.
    pub fn extract_first_name(full_name: &str) -> String {
        full_name
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .chars()
            .filter(|c| is_name_char(*c))
            .collect()
    }

    pub fn detailed(&self, name: &str, country: Option<&str>) -> DetailedGender {
        let first_name = Self::extract_first_name(name);
        let raw = self.raw(name, country);
        let confidence = Confidence::of(raw);

        DetailedGender {
            name: first_name,
            original_input: name.to_owned(),
            detected_gender: raw.map(RawGender::to_gender).unwrap_or(Gender::Random),
            raw_result: raw.map(|r| r.name()).unwrap_or("Unknown").to_owned(),
            country: country.map(str::to_owned),
            confidence,
            is_confident: confidence.is_confident(),
        }
    }

    /// Locale-agnostic detection with a multi-country consensus fallback.
    ///
    /// A confident default answer wins outright. Otherwise every country in
    /// [`SMART_COUNTRIES`] is queried and the most frequent answer is taken
    /// if it got more than one vote and is not tied with another answer.
    /// In every other case the default answer is used.
    pub fn detect_smart(&self, name: &str) -> Gender {
        let default = self.raw(name, None);
        if Confidence::of(default).is_confident() {
            return default.map(RawGender::to_gender).unwrap_or(Gender::Random);
        }

        let votes: Vec<Gender> = SMART_COUNTRIES
            .iter()
            .filter_map(|&country| self.raw(name, Some(country)))
            .map(RawGender::to_gender)
            .collect();

        if let Some(gender) = consensus(&votes) {
            log::debug!("detector: consensus {} for {:?}", gender, name);
            return gender;
        }

        default.map(RawGender::to_gender).unwrap_or(Gender::Random)
    }

    /// Detects `name` without a country, in each of `countries`, and with
    /// smart detection.
    pub fn compare_countries(&self, name: &str, countries: &[&str]) -> CountryComparison {
        CountryComparison {
            name: name.to_owned(),
            default: self.detect(name, None),
            countries: countries
                .iter()
                .map(|&country| (country.to_owned(), self.detect(name, Some(country))))
                .collect(),
            smart: self.detect_smart(name),
        }
    }

    /// Resolves the gender of an avatar request.
    ///
    /// A valid `explicit` gender is used verbatim and an invalid one becomes
    /// `Random`. Without one, smart detection runs and a country-specific
    /// answer overrides it unless that answer is `Random`.
    pub fn resolve(
        &self,
        name: &str,
        explicit: Option<&str>,
        country: Option<&str>,
    ) -> Resolution {
        let detected = self.detect_smart(name);

        if let Some(explicit) = explicit {
            return match explicit.parse::<Gender>() {
                Ok(gender) => Resolution {
                    gender,
                    method: DetectionMethod::Explicit,
                    detected,
                },
                Err(_) => Resolution {
                    gender: Gender::Random,
                    method: DetectionMethod::Fallback,
                    detected,
                },
            };
        }

        if let Some(country) = country {
            let gender = self.detect(name, Some(country));
            if gender != Gender::Random {
                return Resolution {
                    gender,
                    method: DetectionMethod::Country,
                    detected,
                };
            }
        }

        Resolution {
            gender: detected,
            method: DetectionMethod::Smart,
            detected,
        }
    }

    fn raw(&self, name: &str, country: Option<&str>) -> Option<RawGender> {
        let first_name = Self::extract_first_name(name);
        if first_name.is_empty() {
            return None;
        }
        self.lookup.lookup(&first_name, country)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic()
        || ('\u{00C0}'..='\u{00FF}').contains(&c)
        || ('\u{0100}'..='\u{017E}').contains(&c)
        || ('\u{0410}'..='\u{044F}').contains(&c)
}

/// Most frequent vote, counted in first-seen order. `None` unless the top
/// count exceeds one and no other gender reaches it.
fn consensus(votes: &[Gender]) -> Option<Gender> {
    let mut counts: Vec<(Gender, usize)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(gender, _)| gender == vote) {
            Some((_, count)) => *count += 1,
            None => counts.push((*vote, 1)),
        }
    }

    let top = counts.iter().map(|(_, count)| *count).max()?;
    let mut leaders = counts.iter().filter(|(_, count)| *count == top);
    let (gender, _) = leaders.next()?;
    if top > 1 && leaders.next().is_none() {
        Some(*gender)
    } else {
        None
    }
}
