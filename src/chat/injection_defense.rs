//! Prompt injection defense for visitor messages.
//!
//! A message is flagged when it matches a known injection phrasing (English or
//! French), when it is longer than the configured limit, or when too many of
//! its characters fall outside ordinary text. The blocklist is deliberately
//! coarse: a legitimate question that happens to say "bypass" is redirected too.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Share of unusual characters above which a message is treated as obfuscated.
pub const MAX_UNUSUAL_CHAR_RATIO: f64 = 0.3;

/// Punctuation accepted as ordinary text on top of letters, digits and whitespace.
const ACCEPTED_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '\'', '"', '(', ')', '-', '_',
    // French typography
    '’', '‘', '“', '”', '«', '»', '–', '—', '…',
];

/// Intent behind a blocklisted phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionCategory {
    /// "ignore previous instructions", "oublie tout"
    InstructionOverride,
    /// "you are now", "act as", "joue le rôle"
    RoleReassignment,
    /// Literal chat-protocol markers such as `[system]` or `<|im_start|>`.
    FakeRoleMarker,
    /// "system:", "role: system"
    SystemDeclaration,
    /// "new instructions", "nouvelles instructions"
    NewInstructions,
    /// "disregard", "ne tiens pas compte"
    Dismissal,
    /// "jailbreak", "bypass", "contourner"
    Jailbreak,
}

impl fmt::Display for InjectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstructionOverride => write!(f, "instruction_override"),
            Self::RoleReassignment => write!(f, "role_reassignment"),
            Self::FakeRoleMarker => write!(f, "fake_role_marker"),
            Self::SystemDeclaration => write!(f, "system_declaration"),
            Self::NewInstructions => write!(f, "new_instructions"),
            Self::Dismissal => write!(f, "dismissal"),
            Self::Jailbreak => write!(f, "jailbreak"),
        }
    }
}

use InjectionCategory::*;

/// Known injection phrasings. Matched case-insensitively against the lower-cased message.
pub const INJECTION_PATTERNS: &[(InjectionCategory, &str)] = &[
    (
        InstructionOverride,
        r"ignore\s+(?:all\s+|the\s+)?(?:previous|prior|all|above)\s+instructions?",
    ),
    (InstructionOverride, r"oublie\s+tout"),
    (RoleReassignment, r"you\s+are\s+now"),
    (RoleReassignment, r"tu\s+es\s+maintenant"),
    (RoleReassignment, r"from\s+now\s+on"),
    (RoleReassignment, r"act\s+as"),
    (RoleReassignment, r"pretend\s+to\s+be"),
    (RoleReassignment, r"joue\s+le\s+r[oô]le"),
    (FakeRoleMarker, r"\[(?:system|assistant|user)\]"),
    (FakeRoleMarker, r"<\|(?:im_start|im_end|system|assistant|user)\|>"),
    (FakeRoleMarker, r"\[/?inst\]"),
    (SystemDeclaration, r"system\s*:"),
    (SystemDeclaration, r"role\s*:\s*system"),
    (NewInstructions, r"new\s+instructions?"),
    (NewInstructions, r"nouvelles?\s+instructions?"),
    (Dismissal, r"disregard"),
    (Dismissal, r"ne\s+tiens?\s+pas\s+compte"),
    (Jailbreak, r"hack"),
    (Jailbreak, r"jailbreak"),
    (Jailbreak, r"bypass"),
    (Jailbreak, r"contourner"),
];

static COMPILED_PATTERNS: LazyLock<Vec<(InjectionCategory, Regex)>> = LazyLock::new(|| {
    INJECTION_PATTERNS
        .iter()
        .map(|(category, pattern)| {
            let re = Regex::new(&format!("(?i){}", pattern)).expect("valid injection pattern");
            (*category, re)
        })
        .collect()
});

/// Why a message was flagged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagReason {
    Pattern(InjectionCategory),
    TooLong { length: usize, max: usize },
    Garbled { ratio: f64 },
}

impl fmt::Display for FlagReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(category) => write!(f, "pattern:{}", category),
            Self::TooLong { length, max } => write!(f, "too_long:{}>{}", length, max),
            Self::Garbled { ratio } => write!(f, "garbled:{:.2}", ratio),
        }
    }
}

/// Outcome of screening one message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Clear,
    Flagged(FlagReason),
}

impl Verdict {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged(_))
    }
}

/// Screen a visitor message. Pure: the same input always yields the same verdict.
pub fn inspect(message: &str, max_length: usize) -> Verdict {
    if let Some(category) = matched_category(message) {
        return Verdict::Flagged(FlagReason::Pattern(category));
    }

    let length = message.chars().count();
    if length > max_length {
        return Verdict::Flagged(FlagReason::TooLong {
            length,
            max: max_length,
        });
    }

    let ratio = unusual_char_ratio(message);
    if ratio > MAX_UNUSUAL_CHAR_RATIO {
        return Verdict::Flagged(FlagReason::Garbled { ratio });
    }

    Verdict::Clear
}

/// Boolean form of [`inspect`].
pub fn is_suspicious(message: &str, max_length: usize) -> bool {
    inspect(message, max_length).is_flagged()
}

/// First blocklist category the message matches, if any.
pub fn matched_category(message: &str) -> Option<InjectionCategory> {
    let lowered = message.to_lowercase();
    COMPILED_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&lowered))
        .map(|(category, _)| *category)
}

/// Share of characters that are neither alphanumeric, whitespace, nor accepted punctuation.
///
/// Accented letters count as alphanumeric. An empty message has ratio 0.
pub fn unusual_char_ratio(message: &str) -> f64 {
    let mut total = 0usize;
    let mut unusual = 0usize;
    for c in message.chars() {
        total += 1;
        if !is_ordinary_char(c) {
            unusual += 1;
        }
    }
    unusual as f64 / total.max(1) as f64
}

fn is_ordinary_char(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || ACCEPTED_PUNCTUATION.contains(&c)
}
