//! Pure next-tier selection.

use crate::models::TierHealth;

/// What the selector needs to know about one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierView {
    /// Tier rank.
    pub rank: usize,
    /// Current health.
    pub health: TierHealth,
    /// Whether this request already tried the tier.
    pub tried: bool,
}

/// The next tier to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Rank of the selected tier.
    pub rank: usize,
    /// Whether the tier is degraded and tried only as a last resort.
    pub last_resort: bool,
}

/// Picks the next tier for one request.
///
/// 1. The untried AVAILABLE tier with the lowest rank.
/// 2. Otherwise, if no last resort was taken yet, the untried degraded tier
///    with the highest rank (the least preferred remaining tier).
/// 3. Otherwise nothing: the cascade is exhausted.
///
/// Every tier is therefore tried at most once per request, and at most one
/// degraded tier is tried.
#[must_use]
pub fn select_next(tiers: &[TierView], last_resort_taken: bool) -> Option<Selection> {
    let available = tiers
        .iter()
        .filter(|t| !t.tried && t.health == TierHealth::Available)
        .min_by_key(|t| t.rank);
    if let Some(tier) = available {
        return Some(Selection {
            rank: tier.rank,
            last_resort: false,
        });
    }
    if last_resort_taken {
        return None;
    }
    tiers
        .iter()
        .filter(|t| !t.tried)
        .max_by_key(|t| t.rank)
        .map(|t| Selection {
            rank: t.rank,
            last_resort: true,
        })
}
