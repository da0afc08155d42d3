use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::schema::{QueryType, StructuredResult};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("valid word pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMode {
    Flight,
    Drive,
    Train,
    Bus,
}

impl TransportMode {
    /// Detection order, which is also the order modes are reported in.
    pub const ALL: [TransportMode; 4] = [
        TransportMode::Flight,
        TransportMode::Drive,
        TransportMode::Train,
        TransportMode::Bus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Flight => "flight",
            TransportMode::Drive => "drive",
            TransportMode::Train => "train",
            TransportMode::Bus => "bus",
        }
    }
}

/// Maps normalized city names to airport codes.
pub struct AirportCodes {
    codes: HashMap<String, &'static str>,
}

impl AirportCodes {
    pub fn new() -> Self {
        Self {
            codes: HashMap::new(),
        }
    }

    pub fn insert(&mut self, city: &str, code: &'static str) {
        self.codes.insert(normalize_city(city), code);
    }

    pub fn lookup(&self, city: &str) -> Option<&'static str> {
        self.codes.get(&normalize_city(city)).copied()
    }
}

impl Default for AirportCodes {
    fn default() -> Self {
        let mut table = Self::new();
        table.insert("sf", "SFO");
        table.insert("san francisco", "SFO");
        table.insert("fresno", "FAT");
        table.insert("fres", "FAT");
        table
    }
}

fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

/// Word-level rules for spotting "which way should I travel" questions.
///
/// Matching is on whole words of the lowercased query, never substrings, so
/// only the forms listed in the tables count. "driver", "drives" and "flew"
/// name no mode, and "driving" counts as a travel verb next to "drive".
pub struct TransportRules {
    keywords: HashMap<&'static str, TransportMode>,
    comparison_words: Vec<&'static str>,
    alternative_words: Vec<&'static str>,
    travel_verbs: Vec<&'static str>,
}

impl Default for TransportRules {
    fn default() -> Self {
        let keywords = [
            ("fly", TransportMode::Flight),
            ("flying", TransportMode::Flight),
            ("flight", TransportMode::Flight),
            ("flights", TransportMode::Flight),
            ("drive", TransportMode::Drive),
            ("driving", TransportMode::Drive),
            ("car", TransportMode::Drive),
            ("train", TransportMode::Train),
            ("trains", TransportMode::Train),
            ("bus", TransportMode::Bus),
            ("buses", TransportMode::Bus),
        ]
        .into_iter()
        .collect();

        Self {
            keywords,
            comparison_words: vec!["vs", "versus"],
            alternative_words: vec!["or"],
            // Needed next to "or"; "vs"/"versus" need nothing else
            travel_verbs: vec!["fly", "flying", "drive", "driving"],
        }
    }
}

impl TransportRules {
    /// True for "X vs Y" queries and for "X or Y" queries that mention
    /// flying or driving.
    pub fn is_comparison(&self, query: &str) -> bool {
        let words = words(query);

        if words.iter().any(|w| self.comparison_words.contains(&w.as_str())) {
            return true;
        }

        let has_alternative = words.iter().any(|w| self.alternative_words.contains(&w.as_str()));
        let has_travel_verb = words.iter().any(|w| self.travel_verbs.contains(&w.as_str()));

        has_alternative && has_travel_verb
    }

    /// Modes mentioned in the query, in detection order, without duplicates.
    pub fn detect_modes(&self, query: &str) -> Vec<TransportMode> {
        let found: Vec<TransportMode> = words(query)
            .iter()
            .filter_map(|w| self.keywords.get(w.as_str()).copied())
            .collect();

        TransportMode::ALL
            .into_iter()
            .filter(|mode| found.contains(mode))
            .collect()
    }
}

fn words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

/// Deterministic corrections layered on top of whatever the model returned.
#[derive(Default)]
pub struct RuleSet {
    pub airports: AirportCodes,
    pub transport: TransportRules,
}

impl RuleSet {
    /// Comparison queries get their type forced and their modes recomputed
    /// from the query, replacing whatever the model listed (possibly with an
    /// empty list). Known cities get airport codes.
    pub fn apply(&self, query: &str, result: &mut StructuredResult) {
        if self.transport.is_comparison(query) {
            result.query_type = QueryType::TransportComparison;
            result.transport_modes = Some(
                self.transport
                    .detect_modes(query)
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            );
        }

        if let Some(code) = result.origin.as_deref().and_then(|c| self.airports.lookup(c)) {
            result.origin_code = Some(code.to_string());
        }
        if let Some(code) = result.destination.as_deref().and_then(|c| self.airports.lookup(c)) {
            result.destination_code = Some(code.to_string());
        }
    }
}
