//! Localised validation messages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Message catalogue language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Hr,
}

impl Locale {
    #[must_use]
    pub const fn messages(self) -> &'static Messages {
        match self {
            Self::En => &EN,
            Self::Hr => &HR,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hr => "hr",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "hr" => Ok(Self::Hr),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// Message catalogue. Entries ending in a colon or "is" take a trailing
/// argument, formatted by the helpers below.
#[derive(Debug)]
pub struct Messages {
    pub bad_format: &'static str,
    pub not_integer: &'static str,
    pub min_value: &'static str,
    pub max_value: &'static str,
    pub email_min: &'static str,
    pub email_missing: &'static str,
    pub url_start: &'static str,
    pub point_format: &'static str,
    pub min_date: &'static str,
    pub max_date: &'static str,
    pub not_in_range: &'static str,
    pub argument_missing: &'static str,
    pub wrong_checksum: &'static str,
    pub unsupported_boolean: &'static str,
}

impl Messages {
    #[must_use]
    pub fn min_value(&self, bound: impl fmt::Display) -> String {
        format!("{} {bound}", self.min_value)
    }

    #[must_use]
    pub fn max_value(&self, bound: impl fmt::Display) -> String {
        format!("{} {bound}", self.max_value)
    }

    #[must_use]
    pub fn min_date(&self, bound: impl fmt::Display) -> String {
        format!("{} {bound}", self.min_date)
    }

    #[must_use]
    pub fn max_date(&self, bound: impl fmt::Display) -> String {
        format!("{} {bound}", self.max_date)
    }

    #[must_use]
    pub fn unsupported_boolean(&self, raw: impl fmt::Display) -> String {
        format!("{} {raw}", self.unsupported_boolean)
    }
}

pub static EN: Messages = Messages {
    bad_format: "Bad value format",
    not_integer: "Not an integer",
    min_value: "Minimal allowed value is:",
    max_value: "Maximal allowed value is:",
    email_min: "Email requires min of 8 characters",
    email_missing: "Email is missing @",
    url_start: "URL is not starting with http or https",
    point_format: "Point should be in format 1.2345678,1.2345678",
    min_date: "Minimal allow date is",
    max_date: "Maximal allow date is",
    not_in_range: "Value not in range of values",
    argument_missing: "Argument missing",
    wrong_checksum: "Wrong checksum",
    unsupported_boolean: "Unsupported boolean param value:",
};

pub static HR: Messages = Messages {
    bad_format: "Format vrijednosti ne zadovoljava",
    not_integer: "Nije cijeli broj",
    min_value: "Minimalna dozvoljena vrijednost je:",
    max_value: "Maksimalna dozvoljena vrijednost je:",
    email_min: "Email zahtijeva minimalno 8 znakova",
    email_missing: "U email-u nedostaje @",
    url_start: "URL ne započinje sa http ili https",
    point_format: "Geo točka bi trebala biti u formatu 1.2345678,1.2345678",
    min_date: "Minimalni dozvoljeni datum je",
    max_date: "Maksimalni dozvoljeni datum je",
    not_in_range: "Podatak nije u listi dozvoljenih podataka",
    argument_missing: "Argument nedostaje",
    wrong_checksum: "Pogrešan kontrolni broj",
    unsupported_boolean: "Nepodržana boolean vrijednost:",
};
