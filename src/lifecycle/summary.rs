//! Best-effort extraction of completion details from a free-text summary.
//!
//! Recognises itemized lists under headings that look like
//! "accomplishments", "implementation" or "challenges", in markdown
//! (`## Key Accomplishments`), colon (`Challenges:`) or bold
//! (`**Implementation:**`) form. A colon heading with text after it
//! (`Challenges: flaky CI`) contributes that text as a single item.
//!
//! Never fails and never returns an empty list: sections with no items
//! get a fixed default sentence.

use std::sync::LazyLock;

use regex::Regex;

/// Used when no accomplishments could be extracted.
pub const DEFAULT_ACCOMPLISHMENT: &str = "Task completed successfully";
/// Used when no implementation details could be extracted.
pub const DEFAULT_IMPLEMENTATION: &str = "Implemented as described in the task summary";
/// Used when no challenges could be extracted.
pub const DEFAULT_CHALLENGE: &str = "No significant technical challenges reported";

static MARKDOWN_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#{1,6}\s+(?P<title>.+?)\s*#*\s*$").expect("valid heading regex")
});

static COLON_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\*\*|__)?(?P<title>[A-Za-z][A-Za-z /&-]{0,48}?)\s*:\s*(?:\*\*|__)?\s*(?P<rest>.*)$")
        .expect("valid colon heading regex")
});

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+•]|\d{1,3}[.)])\s+(?P<item>.+?)\s*$").expect("valid list item regex")
});

/// Which completion field a heading feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Accomplishments,
    Implementation,
    Challenges,
}

impl Section {
    fn classify(title: &str) -> Option<Self> {
        let title = title.to_ascii_lowercase();
        if title.contains("accomplish") || title.contains("achievement") {
            Some(Self::Accomplishments)
        } else if title.contains("implementation") || title.contains("approach") {
            Some(Self::Implementation)
        } else if title.contains("challenge") || title.contains("difficult") {
            Some(Self::Challenges)
        } else {
            None
        }
    }
}

/// Completion lists derived from a summary; every list has at least one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSummary {
    /// Main outcomes.
    pub key_accomplishments: Vec<String>,
    /// How the work was carried out.
    pub implementation_details: Vec<String>,
    /// Problems met along the way.
    pub technical_challenges: Vec<String>,
}

/// Parses `summary` into completion lists, falling back to defaults.
#[must_use]
pub fn parse_summary(summary: &str) -> ParsedSummary {
    let mut accomplishments = Vec::new();
    let mut implementation = Vec::new();
    let mut challenges = Vec::new();
    let mut current: Option<Section> = None;

    for line in summary.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(item) = LIST_ITEM.captures(line).map(|c| clean(&c["item"])) {
            if let (Some(section), false) = (current, item.is_empty()) {
                bucket(section, &mut accomplishments, &mut implementation, &mut challenges).push(item);
            }
            continue;
        }

        if let Some(caps) = MARKDOWN_HEADING.captures(line) {
            current = Section::classify(&clean(&caps["title"]));
            continue;
        }

        if let Some(caps) = COLON_HEADING.captures(line) {
            let section = Section::classify(&caps["title"]);
            let rest = clean(&caps["rest"]);
            match (section, rest.is_empty()) {
                (Some(section), false) => {
                    bucket(section, &mut accomplishments, &mut implementation, &mut challenges)
                        .push(rest);
                    current = Some(section);
                }
                (section, true) => current = section,
                (None, false) => {}
            }
        }
    }

    ParsedSummary {
        key_accomplishments: or_default(accomplishments, DEFAULT_ACCOMPLISHMENT),
        implementation_details: or_default(implementation, DEFAULT_IMPLEMENTATION),
        technical_challenges: or_default(challenges, DEFAULT_CHALLENGE),
    }
}

fn bucket<'v>(
    section: Section,
    accomplishments: &'v mut Vec<String>,
    implementation: &'v mut Vec<String>,
    challenges: &'v mut Vec<String>,
) -> &'v mut Vec<String> {
    match section {
        Section::Accomplishments => accomplishments,
        Section::Implementation => implementation,
        Section::Challenges => challenges,
    }
}

fn clean(text: &str) -> String {
    text.trim().trim_matches(|c| c == '*' || c == '_').trim().to_string()
}

fn or_default(items: Vec<String>, default: &str) -> Vec<String> {
    if items.is_empty() {
        vec![default.to_string()]
    } else {
        items
    }
}
