use std::collections::HashSet;

use crate::models::{PreferenceProfile, SpiceLevel};

/// Default quality band for the rating clause.
pub const DEFAULT_MIN_RATING: f64 = 3.5;
pub const DEFAULT_MAX_RATING: f64 = 5.0;

/// How a set of label tokens must match a book's labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every token must match at least one label.
    All,
    /// At least one token must match.
    Any,
    /// The clause is omitted entirely.
    None,
}

/// Position in the predicate ladder, strictest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderTier {
    Strict,
    Relaxed,
    Lenient,
}

impl LadderTier {
    pub const ALL: [LadderTier; 3] = [LadderTier::Strict, LadderTier::Relaxed, LadderTier::Lenient];

    /// True for the last-resort tier.
    pub fn is_final(self) -> bool {
        self == LadderTier::Lenient
    }
}

/// A composable filter over the book catalog.
///
/// All three ladder tiers are structurally identical values of this type;
/// only the match modes and token lists differ.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub tier: LadderTier,
    pub min_rating: f64,
    pub max_rating: f64,
    /// Allowed spice levels; `None` leaves the clause out.
    pub spice_levels: Option<Vec<SpiceLevel>>,
    pub genres: Vec<String>,
    pub genre_mode: MatchMode,
    pub warnings: Vec<String>,
    pub warning_mode: MatchMode,
    /// Books carrying any of these warnings are rejected at every tier.
    pub excluded_warnings: Vec<String>,
    pub excluded_ids: Vec<String>,
}

impl Predicate {
    /// A filter that only removes the given IDs; everything else passes.
    pub fn unconstrained(excluded_ids: Vec<String>) -> Self {
        Self {
            tier: LadderTier::Lenient,
            min_rating: 0.0,
            max_rating: DEFAULT_MAX_RATING,
            spice_levels: None,
            genres: Vec::new(),
            genre_mode: MatchMode::None,
            warnings: Vec::new(),
            warning_mode: MatchMode::None,
            excluded_warnings: Vec::new(),
            excluded_ids,
        }
    }
}

/// Normalizes a label token for matching: lowercased, trimmed, trailing
/// parenthetical occurrence counts stripped ("romance (412)" -> "romance").
pub fn normalize_token(raw: &str) -> String {
    let mut token = raw.trim().to_lowercase();
    if let Some(open) = token.rfind(" (") {
        let inner = &token[open + 2..];
        if inner.len() > 1
            && inner.ends_with(')')
            && inner[..inner.len() - 1].chars().all(|c| c.is_ascii_digit())
        {
            token.truncate(open);
        }
    }
    token.trim_end().to_string()
}

/// Case-insensitive mutual-substring match between a profile token and a
/// catalog label.
pub fn tokens_match(token: &str, label: &str) -> bool {
    let token = normalize_token(token);
    let label = normalize_token(label);
    if token.is_empty() || label.is_empty() {
        return false;
    }
    token == label || label.contains(&token) || token.contains(&label)
}

/// Builds the strict -> relaxed -> lenient predicate sequence for one
/// profile. Each tier is a valid standalone filter; the caller walks the
/// sequence until a tier yields candidates.
pub fn predicate_ladder(profile: &PreferenceProfile, exclusions: &HashSet<String>) -> Vec<Predicate> {
    LadderTier::ALL
        .iter()
        .map(|tier| predicate_for_tier(*tier, profile, exclusions))
        .collect()
}

fn predicate_for_tier(
    tier: LadderTier,
    profile: &PreferenceProfile,
    exclusions: &HashSet<String>,
) -> Predicate {
    let min_rating = profile
        .minimum_rating
        .map(|r| r.clamp(0.0, DEFAULT_MAX_RATING))
        .unwrap_or(DEFAULT_MIN_RATING);

    let genres = normalized_tokens(&profile.genres);
    let warnings = normalized_tokens(&profile.content_warnings);
    let excluded_warnings = normalized_tokens(&profile.excluded_warnings);

    let (genre_mode, warning_mode) = match tier {
        LadderTier::Strict => (MatchMode::All, MatchMode::All),
        LadderTier::Relaxed => (MatchMode::Any, MatchMode::Any),
        LadderTier::Lenient => (MatchMode::None, MatchMode::None),
    };

    // An empty token list is an omitted clause, not an unsatisfiable one.
    let (genres, genre_mode) = clause(genres, genre_mode);
    let (warnings, warning_mode) = clause(warnings, warning_mode);

    let mut excluded_ids: Vec<String> = exclusions.iter().cloned().collect();
    excluded_ids.sort();

    Predicate {
        tier,
        min_rating,
        max_rating: DEFAULT_MAX_RATING,
        // Band-inclusive downward: a ceiling request never surfaces
        // anything spicier than asked for.
        spice_levels: profile.spice_level.map(SpiceLevel::band_through),
        genres,
        genre_mode,
        warnings,
        warning_mode,
        excluded_warnings,
        excluded_ids,
    }
}

fn normalized_tokens(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|token| normalize_token(token))
        .filter(|token| !token.is_empty())
        .collect()
}

fn clause(tokens: Vec<String>, mode: MatchMode) -> (Vec<String>, MatchMode) {
    if tokens.is_empty() || mode == MatchMode::None {
        (Vec::new(), MatchMode::None)
    } else {
        (tokens, mode)
    }
}
