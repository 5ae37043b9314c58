/// The normalize module turns messy folder names, filenames and tag values into canonical
/// artist/album/title strings.
///
/// Filler phrases and release noise (disc markers, episode numbers, language hints) differ from one
/// collection to the next, so they are carried as data in [`NormalizationRules`] rather than baked
/// into the algorithm.
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Literal fillers that never belong in a canonical name.
pub const DEFAULT_FILLER_PHRASES: &[&str] = &["various artists", "various"];

/// Release-noise patterns applied after punctuation has been dropped.
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    r"(?i)\b(?:cd|dis[ck])\s*\d+\b",
    r"(?i)\b(?:folge|episode|ep)\s*\d+\b",
    r"(?i)\b(?:deutsch|german|english)\b",
];

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DEFAULT_NORMALIZER: Lazy<Normalizer> = Lazy::new(|| Normalizer::new(&NormalizationRules::default()));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationRules {
    #[serde(default = "default_filler_phrases")]
    pub filler_phrases: Vec<String>,
    #[serde(default = "default_noise_patterns", with = "serde_regex")]
    pub noise_patterns: Vec<Regex>,
}

fn default_filler_phrases() -> Vec<String> {
    DEFAULT_FILLER_PHRASES.iter().map(|s| s.to_string()).collect()
}

fn default_noise_patterns() -> Vec<Regex> {
    DEFAULT_NOISE_PATTERNS.iter().map(|p| Regex::new(p).unwrap()).collect()
}

impl Default for NormalizationRules {
    fn default() -> Self {
        Self::new(default_filler_phrases(), default_noise_patterns())
    }
}

impl NormalizationRules {
    pub fn new(filler_phrases: Vec<String>, noise_patterns: Vec<Regex>) -> Self {
        Self {
            filler_phrases,
            noise_patterns,
        }
    }

    /// Rules that only collapse whitespace and fix casing.
    pub fn empty() -> Self {
        Self::new(vec![], vec![])
    }

    fn compiled(&self) -> Vec<Regex> {
        let mut fillers: Vec<&String> = self.filler_phrases.iter().filter(|f| !f.trim().is_empty()).collect();
        // "various artists" must win over "various".
        fillers.sort_by_key(|f| std::cmp::Reverse(f.len()));

        let mut compiled: Vec<Regex> = fillers
            .into_iter()
            .filter_map(|f| RegexBuilder::new(&regex::escape(f)).case_insensitive(true).build().ok())
            .collect();
        for pattern in &self.noise_patterns {
            if pattern.is_match("") {
                tracing::warn!("Ignoring noise pattern {:?}: it matches the empty string", pattern.as_str());
                continue;
            }
            compiled.push(pattern.clone());
        }
        compiled
    }
}

/// Normalize with the default rules.
pub fn normalize(raw: &str) -> String {
    DEFAULT_NORMALIZER.normalize(raw)
}

/// Normalize once with ad-hoc rules. Callers normalizing many strings should build a
/// [`Normalizer`] instead.
pub fn normalize_with(rules: &NormalizationRules, raw: &str) -> String {
    Normalizer::new(rules).normalize(raw)
}

/// A rule set compiled into the regexes applied on every pass.
#[derive(Debug, Clone)]
pub struct Normalizer {
    patterns: Vec<Regex>,
}

impl Normalizer {
    pub fn new(rules: &NormalizationRules) -> Self {
        Self {
            patterns: rules.compiled(),
        }
    }

    /// Repeat until the output no longer changes, so that `normalize(normalize(x)) == normalize(x)`.
    /// Every pass only drops characters or turns them into spaces, which bounds the loop.
    pub fn normalize(&self, raw: &str) -> String {
        let mut current = raw.nfc().collect::<String>();
        loop {
            let next = _normalize_once(&self.patterns, &current);
            if next == current {
                return current;
            }
            current = next;
        }
    }
}

fn _normalize_once(rules: &[Regex], raw: &str) -> String {
    let mut s: String = raw.chars().filter(|c| c.is_alphanumeric() || c.is_whitespace()).collect();

    // Removing one phrase can expose another, so repeat until nothing matches.
    loop {
        let mut changed = false;
        for rule in rules {
            if let std::borrow::Cow::Owned(replaced) = rule.replace_all(&s, " ") {
                changed |= replaced != s;
                s = replaced;
            }
        }
        if !changed {
            break;
        }
    }

    let collapsed = WHITESPACE_REGEX.replace_all(&s, " ");
    collapsed.trim().split(' ').filter(|w| !w.is_empty()).map(_title_case_word).collect::<Vec<_>>().join(" ")
}

fn _title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut out = String::with_capacity(word.len());
    let mut upper = first.to_uppercase();
    match (upper.next(), upper.next()) {
        // Keep characters like 'ß' whose uppercase form is more than one character.
        (Some(u), None) => out.push(u),
        _ => out.push(first),
    }
    for c in chars {
        let mut lower = c.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) => out.push(l),
            _ => out.push(c),
        }
    }
    out
}
