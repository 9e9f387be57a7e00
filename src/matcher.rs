use regex::{Regex, RegexBuilder};
use serde::Serialize;

/// Whole-word, case-insensitive literal matcher over a fixed phrase list.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    patterns: Vec<(String, Regex)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhraseMatch {
    pub phrase: String,
    pub mentioned: bool,
}

/// Per-phrase results for one document, in phrase order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MatchResult(Vec<PhraseMatch>);

impl PhraseMatcher {
    pub fn new<I, S>(phrases: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = phrases
            .into_iter()
            .map(|p| {
                let phrase = p.as_ref().to_string();
                let re = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(&phrase)))
                    .case_insensitive(true)
                    .build()?;
                Ok((phrase, re))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { patterns })
    }

    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(p, _)| p.as_str())
    }

    pub fn check(&self, text: &str) -> MatchResult {
        let empty = text.trim().is_empty();
        MatchResult(
            self.patterns
                .iter()
                .map(|(phrase, re)| PhraseMatch {
                    phrase: phrase.clone(),
                    mentioned: !empty && re.is_match(text),
                })
                .collect(),
        )
    }
}

impl MatchResult {
    /// `None` when the phrase was not part of the check.
    pub fn get(&self, phrase: &str) -> Option<bool> {
        self.0.iter().find(|m| m.phrase == phrase).map(|m| m.mentioned)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhraseMatch> {
        self.0.iter()
    }
}

// ── Tests ──
