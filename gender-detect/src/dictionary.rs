use std::{collections::HashMap, fs, path::Path};

use data_error::{MemojiError, Result};

use crate::{GenderLookup, RawGender};

const BUILTIN_NAMES: &str = include_str!("../data/names.tsv");

#[derive(Debug, Default, Clone)]
struct DictionaryEntry {
    default: Option<RawGender>,
    countries: HashMap<String, RawGender>,
}

/// Tab separated name dictionary.
///
/// One name per line:
/// ```text
/// andrea	?	US:F,GB:F,IT:M
/// ```
/// The second column is the locale-agnostic code, the optional third column
/// lists per-country codes. `-` stands for "not listed". Lines starting with
/// `#` are comments.
#[derive(Debug, Default, Clone)]
pub struct NameDictionary {
    entries: HashMap<String, DictionaryEntry>,
}

impl NameDictionary {
    /// The small dictionary bundled with the crate
    pub fn builtin() -> Self {
        // bundled data is covered by tests, a parse failure here is a bug
        Self::parse(BUILTIN_NAMES).unwrap_or_default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::debug!("dictionary: loading names from {:?}", path.as_ref());

        let content = fs::read_to_string(path.as_ref())?;
        let dictionary = Self::parse(&content)?;
        log::info!(
            "dictionary: loaded {} names from {}",
            dictionary.len(),
            path.as_ref().display()
        );
        Ok(dictionary)
    }

    /// Parses dictionary text. Malformed codes are skipped with a warning,
    /// a line without a code column is a parse error.
    pub fn parse(content: &str) -> Result<Self> {
        let mut entries = HashMap::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let mut columns = line.split('\t');
            let name = columns.next().unwrap_or_default().trim();
            let code = columns.next().ok_or_else(|| {
                log::warn!("dictionary: line {} has no gender code", number + 1);
                MemojiError::Parse
            })?;
            if name.is_empty() {
                return Err(MemojiError::Parse);
            }

            let mut entry = DictionaryEntry {
                default: parse_code(code.trim(), number),
                countries: HashMap::new(),
            };

            if let Some(countries) = columns.next() {
                for pair in countries
                    .split(',')
                    .filter(|p| !p.trim().is_empty() && p.trim() != "-")
                {
                    match pair.trim().split_once(':') {
                        Some((country, code)) => {
                            if let Some(raw) = parse_code(code, number) {
                                entry
                                    .countries
                                    .insert(country.to_uppercase(), raw);
                            }
                        }
                        None => log::warn!(
                            "dictionary: line {}: invalid country pair {}",
                            number + 1,
                            pair
                        ),
                    }
                }
            }

            entries.insert(name.to_lowercase(), entry);
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_code(code: &str, number: usize) -> Option<RawGender> {
    if code == "-" {
        return None;
    }
    let raw = RawGender::from_code(code);
    if raw.is_none() {
        log::warn!("dictionary: line {}: unknown code {}", number + 1, code);
    }
    raw
}

impl GenderLookup for NameDictionary {
    fn lookup(&self, first_name: &str, country: Option<&str>) -> Option<RawGender> {
        let entry = self.entries.get(&first_name.to_lowercase())?;
        match country {
            Some(country) => entry.countries.get(&country.to_uppercase()).copied(),
            None => entry.default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn builtin_dictionary_parses() {
        let dictionary = NameDictionary::parse(BUILTIN_NAMES)
            .expect("bundled dictionary must parse");
        assert!(dictionary.len() > 30);
        assert_eq!(dictionary.lookup("john", None), Some(RawGender::Male));
        assert_eq!(dictionary.lookup("Sarah", None), Some(RawGender::Female));
        assert_eq!(dictionary.lookup("ОЛЬГА", None), Some(RawGender::Female));
    }

    #[test]
    fn country_lookup_is_scoped() {
        let dictionary = NameDictionary::parse(
            "andrea\t?\tUS:F,it:M\njean\t?\tFR:M,DE:-\n",
        )
        .unwrap();

        assert_eq!(dictionary.lookup("andrea", None), Some(RawGender::Unisex));
        assert_eq!(dictionary.lookup("andrea", Some("us")), Some(RawGender::Female));
        assert_eq!(dictionary.lookup("andrea", Some("IT")), Some(RawGender::Male));
        assert_eq!(dictionary.lookup("andrea", Some("FR")), None);
        assert_eq!(dictionary.lookup("jean", Some("DE")), None);
        assert_eq!(dictionary.lookup("nobody", None), None);
    }

    #[test]
    fn skips_comments_and_bad_codes() {
        let dictionary =
            NameDictionary::parse("# header\n\nbob\tX\tUS:M,GB:Q\n").unwrap();
        assert_eq!(dictionary.len(), 1);
        assert_eq!(dictionary.lookup("bob", None), None);
        assert_eq!(dictionary.lookup("bob", Some("US")), Some(RawGender::Male));
        assert_eq!(dictionary.lookup("bob", Some("GB")), None);
    }

    #[test]
    fn missing_code_column_is_error() {
        assert!(NameDictionary::parse("bob\n").is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = TempDir::new("gender_detect").unwrap();
        let path = dir.path().join("names.tsv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "kim\t?\tUS:F").unwrap();

        let dictionary = NameDictionary::load(&path).unwrap();
        assert_eq!(dictionary.lookup("Kim", Some("US")), Some(RawGender::Female));
    }
}
