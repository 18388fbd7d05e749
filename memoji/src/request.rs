use gender_detect::Gender;

use crate::Palette;

/// Length of generated names
pub const RANDOM_NAME_LEN: usize = 6;

/// Longest country code kept from a request
const MAX_COUNTRY_LEN: usize = 8;

/// Normalised avatar request.
///
/// Optional parameters never fail: malformed values are dropped here or by
/// the selector and the defaults apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarRequest {
    /// Never empty
    pub name: String,
    /// Explicit gender as given by the caller, validated during resolution
    pub gender: Option<String>,
    /// Colour index as given by the caller, range-checked by the selector
    pub color: Option<i64>,
    pub palette: Palette,
    /// ASCII alphanumeric, never empty
    pub country: Option<String>,
}

impl AvatarRequest {
    /// Request for `name`; an empty name gets a random one
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            return Self::random();
        }
        Self {
            name,
            gender: None,
            color: None,
            palette: Palette::Default,
            country: None,
        }
    }

    /// Request for a freshly generated name with the mixed asset set
    pub fn random() -> Self {
        Self {
            name: random_name(),
            gender: Some(Gender::Random.to_string()),
            color: None,
            palette: Palette::Default,
            country: None,
        }
    }

    /// Builds a request from raw query values
    pub fn from_params(
        name: Option<&str>,
        gender: Option<&str>,
        color: Option<&str>,
        palette: Option<&str>,
        country: Option<&str>,
    ) -> Self {
        let mut request = match name.filter(|n| !n.is_empty()) {
            Some(name) => Self::new(name),
            None => Self::random(),
        };
        if let Some(gender) = gender {
            request.gender = Some(gender.to_owned());
        }
        request.color = parse_color(color);
        request.palette = Palette::parse_or_default(palette);
        request.country = normalize_country(country);
        request
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_color(mut self, color: i64) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = normalize_country(Some(country));
        self
    }
}

pub fn random_name() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(RANDOM_NAME_LEN)
        .collect()
}

/// Integer colour index, `None` when absent or not a number
pub fn parse_color(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|raw| raw.trim().parse().ok())
}

/// Keeps the ASCII alphanumeric part of a country code
pub fn normalize_country(raw: Option<&str>) -> Option<String> {
    let country: String = raw?
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_COUNTRY_LEN)
        .collect();
    if country.is_empty() {
        None
    } else {
        Some(country)
    }
}
