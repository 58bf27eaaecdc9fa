//! Supported languages and the phone table each one uses.
//!
//! The engine's acoustic models are Finnish; other languages are aligned
//! through a table mapping their phones onto Finnish ones.

use std::fmt;
use std::str::FromStr;

/// Phone table used for any code without a dedicated mapping.
pub const DEFAULT_PHONE_TABLE: &str = "phone-finnish-finnish.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Finnish,
    English,
    NorthernSami,
    Estonian,
    Komi,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Finnish,
        Language::English,
        Language::NorthernSami,
        Language::Estonian,
        Language::Komi,
    ];

    /// The code used in the `/process/{lang_code}` path.
    pub fn code(self) -> &'static str {
        match self {
            Language::Finnish => "fi",
            Language::English => "en",
            Language::NorthernSami => "se",
            Language::Estonian => "et",
            Language::Komi => "kv",
        }
    }

    pub fn phone_table(self) -> &'static str {
        phone_table_for(self.code())
    }
}

/// Resolve the phone table file for a language code.
pub fn phone_table_for(code: &str) -> &'static str {
    match code {
        "en" => "phone-english-finnish.csv",
        "se" => "phone-sami-finnish.csv",
        "et" => "phone-estonian-finnish.csv",
        "kv" => "phone-komi-finnish.csv",
        _ => DEFAULT_PHONE_TABLE,
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.code() == s)
            .ok_or_else(|| format!("Unsupported language: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_codes_round_trip() {
        for code in ["fi", "en", "se", "et", "kv"] {
            let language: Language = code.parse().unwrap();
            assert_eq!(language.code(), code);
        }
    }

    #[test]
    fn test_unknown_and_near_miss_codes_are_rejected() {
        for code in ["fini", "FI", "en-GB", "", "sv"] {
            assert!(code.parse::<Language>().is_err(), "{} should be rejected", code);
        }
    }

    #[test]
    fn test_phone_tables() {
        assert_eq!(Language::Finnish.phone_table(), "phone-finnish-finnish.csv");
        assert_eq!(Language::English.phone_table(), "phone-english-finnish.csv");
        assert_eq!(Language::NorthernSami.phone_table(), "phone-sami-finnish.csv");
        assert_eq!(Language::Estonian.phone_table(), "phone-estonian-finnish.csv");
        assert_eq!(Language::Komi.phone_table(), "phone-komi-finnish.csv");
        assert_eq!(phone_table_for("sv"), DEFAULT_PHONE_TABLE);
    }
}
