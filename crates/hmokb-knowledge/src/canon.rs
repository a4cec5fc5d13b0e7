//! Attribute canonicalization.
//!
//! Table headers and user profiles spell the same organization or tier in
//! several ways (Hebrew, English, transliterated, any case). Each attribute
//! kind is a closed enum with a documented set of accepted spellings; the
//! canonical label is the Hebrew name used by the source documents.
//! Strict filtering compares canonical labels with exact equality.

use hmokb_core::types::CellContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Organization,
    Tier,
}

/// Health-maintenance organizations covered by the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Organization {
    Maccabi,
    Meuhedet,
    Clalit,
}

impl Organization {
    pub const ALL: [Organization; 3] = [
        Organization::Maccabi,
        Organization::Meuhedet,
        Organization::Clalit,
    ];

    /// Canonical label.
    pub fn label(&self) -> &'static str {
        match self {
            Organization::Maccabi => "מכבי",
            Organization::Meuhedet => "מאוחדת",
            Organization::Clalit => "כללית",
        }
    }

    /// Accepted external spellings, compared after lower-casing.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            Organization::Maccabi => &["maccabi", "makabi", "macabi"],
            Organization::Meuhedet => &["meuhedet", "meuchedet"],
            Organization::Clalit => &["clalit", "klalit"],
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        lookup(raw, &Self::ALL, |o| o.label(), |o| o.spellings())
    }
}

/// Membership tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Gold,
    Silver,
    Bronze,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Gold, Tier::Silver, Tier::Bronze];

    /// Canonical label.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Gold => "זהב",
            Tier::Silver => "כסף",
            Tier::Bronze => "ארד",
        }
    }

    /// Accepted external spellings, compared after lower-casing.
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            Tier::Gold => &["gold", "zahav"],
            Tier::Silver => &["silver", "kesef"],
            Tier::Bronze => &["bronze", "arad"],
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        lookup(raw, &Self::ALL, |t| t.label(), |t| t.spellings())
    }
}

fn lookup<T: Copy>(
    raw: &str,
    all: &[T],
    label: impl Fn(&T) -> &'static str,
    spellings: impl Fn(&T) -> &'static [&'static str],
) -> Option<T> {
    let raw = raw.trim();
    let folded = raw.to_lowercase();
    all.iter().copied().find(|v| {
        label(v) == raw || spellings(v).iter().any(|s| *s == raw || *s == folded)
    })
}

/// Map a free-text label to its canonical form.
///
/// Unknown labels come back trimmed but otherwise unchanged; empty input
/// yields an empty string.
pub fn canonicalize(kind: AttributeKind, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let label = match kind {
        AttributeKind::Organization => Organization::parse(trimmed).map(|o| o.label()),
        AttributeKind::Tier => Tier::parse(trimmed).map(|t| t.label()),
    };
    label.map(str::to_string).unwrap_or_else(|| trimmed.to_string())
}

/// Strict (organization, tier) filter, canonicalized at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    organization: String,
    tier: String,
}

impl AttributeFilter {
    pub fn new(organization: &str, tier: &str) -> Self {
        Self {
            organization: canonicalize(AttributeKind::Organization, organization),
            tier: canonicalize(AttributeKind::Tier, tier),
        }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn tier(&self) -> &str {
        &self.tier
    }

    /// A filter with an empty side can never match anything.
    pub fn is_empty(&self) -> bool {
        self.organization.is_empty() || self.tier.is_empty()
    }

    /// Exact match of the cell's canonical column (organization) and level (tier).
    pub fn matches(&self, cell: &CellContext) -> bool {
        if self.is_empty() {
            return false;
        }
        let organization = canonicalize(AttributeKind::Organization, &cell.column);
        let tier = canonicalize(AttributeKind::Tier, &cell.level);
        !organization.is_empty()
            && !tier.is_empty()
            && organization == self.organization
            && tier == self.tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(column: &str, level: &str) -> CellContext {
        CellContext {
            row: "Checkup".into(),
            column: column.into(),
            level: level.into(),
        }
    }

    #[test]
    fn test_canonicalize_variants() {
        let (org, tier) = (AttributeKind::Organization, AttributeKind::Tier);
        assert_eq!(canonicalize(org, "Maccabi"), "מכבי");
        assert_eq!(canonicalize(org, "  MACCABI "), "מכבי");
        assert_eq!(canonicalize(org, "מכבי"), "מכבי");
        assert_eq!(canonicalize(tier, "Gold"), "זהב");
        assert_eq!(canonicalize(tier, "zahav"), "זהב");
        assert_eq!(canonicalize(tier, "ארד"), "ארד");
    }

    #[test]
    fn test_unknown_and_empty_pass_through() {
        assert_eq!(canonicalize(AttributeKind::Organization, "  Leumit "), "Leumit");
        assert_eq!(canonicalize(AttributeKind::Tier, ""), "");
        assert_eq!(canonicalize(AttributeKind::Tier, "   "), "");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let samples = [
            "Maccabi", "מכבי", "clalit", "KLALIT", " meuhedet ", "gold", "Zahav", "כסף",
            "Bronze", "unknown", "  Mixed Case  ", "", "זהב:", "Column 3",
        ];
        for kind in [AttributeKind::Organization, AttributeKind::Tier] {
            for raw in samples {
                let once = canonicalize(kind, raw);
                assert_eq!(canonicalize(kind, &once), once, "kind={kind:?} raw={raw:?}");
            }
        }
    }

    #[test]
    fn test_cross_script_filter_match() {
        let filter = AttributeFilter::new("maccabi", "zahav");
        assert!(filter.matches(&cell("Maccabi", "Gold")));
        assert!(filter.matches(&cell("מכבי", "זהב")));
        assert!(filter.matches(&cell("מכבי", "gold")));
        assert!(!filter.matches(&cell("Clalit", "Gold")));
        assert!(!filter.matches(&cell("Maccabi", "Silver")));
    }

    #[test]
    fn test_empty_never_matches() {
        let filter = AttributeFilter::new("", "gold");
        assert!(filter.is_empty());
        assert!(!filter.matches(&cell("", "Gold")));

        let filter = AttributeFilter::new("maccabi", "gold");
        assert!(!filter.matches(&cell("Maccabi", "")));
    }

    #[test]
    fn test_enum_labels_round_trip() {
        for org in Organization::ALL {
            assert_eq!(Organization::parse(org.label()), Some(org));
        }
        for tier in Tier::ALL {
            assert_eq!(Tier::parse(tier.label()), Some(tier));
        }
    }
}
