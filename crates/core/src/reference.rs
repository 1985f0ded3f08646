//! Static reference tables: grade multipliers, currency conversion, set codes.

use crate::types::Money;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Grade abbreviation to price multiplier.
///
/// Keys are stored lower-case; lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct GradeTable {
    multipliers: HashMap<String, f64>,
}

impl GradeTable {
    /// Build a table from (abbreviation, multiplier) pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let multipliers = entries
            .into_iter()
            .map(|(abbr, m)| (abbr.as_ref().trim().to_lowercase(), m))
            .collect();
        Self { multipliers }
    }

    /// Multiplier for a grade code.
    pub fn lookup(&self, grade: &str) -> Option<f64> {
        self.multipliers.get(&grade.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.multipliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multipliers.is_empty()
    }
}

/// Currency code to reference-currency multiplier.
#[derive(Debug, Clone, Default)]
pub struct CurrencyTable {
    multipliers: HashMap<String, f64>,
    reference: Option<String>,
}

impl CurrencyTable {
    /// Build a table from (currency, multiplier) pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let multipliers = entries
            .into_iter()
            .map(|(code, m)| (code.as_ref().trim().to_uppercase(), m))
            .collect();
        Self {
            multipliers,
            reference: None,
        }
    }

    /// Name the currency the multipliers convert into.
    pub fn with_reference(mut self, code: impl AsRef<str>) -> Self {
        self.reference = Some(code.as_ref().trim().to_uppercase());
        self
    }

    /// The currency the multipliers convert into, if known.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Multiplier converting one unit of `currency` to the reference currency.
    pub fn multiplier(&self, currency: &str) -> Option<f64> {
        self.multipliers.get(&currency.trim().to_uppercase()).copied()
    }

    /// Convert an amount to the reference currency.
    pub fn to_reference(&self, money: &Money) -> Option<f64> {
        self.multiplier(&money.currency).map(|m| money.amount * m)
    }

    pub fn len(&self) -> usize {
        self.multipliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multipliers.is_empty()
    }
}

/// Set name (as shown on the auction site) to price-source set code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetCatalog {
    codes: BTreeMap<String, String>,
}

impl SetCatalog {
    /// Build a catalogue from (set name, code) pairs.
    pub fn new<I, S, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: Into<String>,
    {
        Self {
            codes: entries.into_iter().map(|(s, c)| (s.into(), c.into())).collect(),
        }
    }

    /// Set code for a set name, matched case-insensitively.
    pub fn code_for(&self, set_name: &str) -> Option<&str> {
        let wanted = set_name.trim();
        self.codes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, code)| code.as_str())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for SetCatalog {
    fn default() -> Self {
        Self::new([
            ("Alpha", "LEA"),
            ("Beta", "LEB"),
            ("Unlimited", "2ED"),
            ("Revised", "3ED"),
            ("Legends", "LEG"),
            ("Arabian Nights", "ARN"),
            ("Antiquities", "ATQ"),
            ("The Dark", "DRK"),
            ("Fallen Empires", "FEM"),
            ("Ice Age", "ICE"),
            ("Alliances", "ALL"),
            ("Homelands", "HML"),
            ("4th Edition", "4ED"),
            ("5th Edition", "5ED"),
            ("Mirage", "MI"),
            ("Weatherlight", "WL"),
            ("Visions", "VI"),
            ("Tempest", "TE"),
            ("Stronghold", "ST"),
            ("Exodus", "EX"),
            ("Urza's Destiny", "UD"),
            ("Urza's Legacy", "UL"),
            ("Urza's Saga", "UZ"),
        ])
    }
}
