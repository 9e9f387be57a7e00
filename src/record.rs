use std::fmt;

use serde::Serialize;

use crate::matcher::MatchResult;

/// Spreadsheet marker for one phrase on one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Yes,
    No,
    NotAvailable,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::Yes => "Y",
            Flag::No => "N",
            Flag::NotAvailable => "NA",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Checked { matches: MatchResult },
    /// No content from any candidate page, or the URL itself was unusable.
    Unavailable { reason: String },
}

/// Result for one input URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    /// As read from the source, unnormalised.
    pub url: String,
    /// Page whose text was matched.
    pub policy_url: Option<String>,
    pub outcome: Outcome,
}

impl ResultRecord {
    pub fn checked(url: &str, policy_url: String, matches: MatchResult) -> Self {
        Self {
            url: url.to_string(),
            policy_url: Some(policy_url),
            outcome: Outcome::Checked { matches },
        }
    }

    pub fn unavailable(url: &str, reason: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            policy_url: None,
            outcome: Outcome::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.outcome, Outcome::Checked { .. })
    }

    /// Why the site has no result, for unavailable records.
    pub fn reason(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Checked { .. } => None,
            Outcome::Unavailable { reason } => Some(reason),
        }
    }

    pub fn flag(&self, phrase: &str) -> Flag {
        match &self.outcome {
            Outcome::Checked { matches } => match matches.get(phrase) {
                Some(true) => Flag::Yes,
                Some(false) => Flag::No,
                None => Flag::NotAvailable,
            },
            Outcome::Unavailable { .. } => Flag::NotAvailable,
        }
    }

    /// "Phrase: Mentioned, Other: Not Mentioned", or exactly "NA".
    pub fn status(&self) -> String {
        match &self.outcome {
            Outcome::Checked { matches } => matches
                .iter()
                .map(|m| {
                    let label = if m.mentioned { "Mentioned" } else { "Not Mentioned" };
                    format!("{}: {}", m.phrase, label)
                })
                .collect::<Vec<_>>()
                .join(", "),
            Outcome::Unavailable { .. } => Flag::NotAvailable.to_string(),
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::PhraseMatcher;

    #[test]
    fn checked_status_and_flags() {
        let m = PhraseMatcher::new(["Social Security Number", "Credit Card"]).unwrap();
        let r = ResultRecord::checked(
            "https://a.com",
            "https://a.com/privacy".into(),
            m.check("We store your Social Security Number."),
        );
        assert_eq!(r.status(), "Social Security Number: Mentioned, Credit Card: Not Mentioned");
        assert_eq!(r.reason(), None);
        assert_eq!(r.flag("Social Security Number"), Flag::Yes);
        assert_eq!(r.flag("Credit Card"), Flag::No);
        assert_eq!(r.flag("Passport"), Flag::NotAvailable);
    }

    #[test]
    fn unavailable_is_na_everywhere() {
        let r = ResultRecord::unavailable("https://b.com", "no content");
        assert_eq!(r.status(), "NA");
        assert_eq!(r.flag("Social Security Number").to_string(), "NA");
        assert!(!r.is_available());
        assert_eq!(r.policy_url, None);
        assert_eq!(r.reason(), Some("no content"));
    }
}
