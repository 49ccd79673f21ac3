// ---------------------------------------------------------------------------
// Recommendation — neighbour similarity and candidate ranking
// ---------------------------------------------------------------------------
//
// Pure reads over the two stores. Similarity is the approximated Pearson
// estimate B / (sqrt(C) * sqrt(D)), rounded for presentation. Estimates that
// cannot be computed (non-positive C or D) or that exceed the configured
// magnitude are accumulator drift: the neighbour is dropped and the query
// carries on.
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::error::IcfError;
use crate::pairs::{PairStat, PairStatsStore};
use crate::profiles::UserProfileStore;
use crate::types::ItemId;

/// Per-query thresholds. Unset fields fall back to the engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecommendOptions {
	pub top_n: usize,
	pub corr_threshold: Option<f64>,
	pub high_rating: Option<f64>,
}

impl RecommendOptions {
	pub fn top(top_n: usize) -> Self {
		Self {
			top_n,
			..Default::default()
		}
	}
}

/// Round `value` to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
	let factor = 10f64.powi(decimals as i32);
	(value * factor).round() / factor
}

/// Approximated Pearson correlation of a pair, rounded to `decimals`.
pub fn pearson(stat: &PairStat, decimals: u32) -> Result<f64, IcfError> {
	if stat.c <= 0.0 || stat.d <= 0.0 {
		return Err(IcfError::NumericallyInvalidSimilarity(format!(
			"non-positive deviation sum (C={}, D={})",
			stat.c, stat.d
		)));
	}
	let raw = stat.b / (stat.c.sqrt() * stat.d.sqrt());
	if !raw.is_finite() {
		return Err(IcfError::NumericallyInvalidSimilarity(format!(
			"non-finite estimate {}",
			raw
		)));
	}
	let score = round_to(raw, decimals);
	if !score.is_finite() {
		return Err(IcfError::NumericallyInvalidSimilarity(format!(
			"non-finite estimate {} after rounding to {} places",
			score, decimals
		)));
	}
	Ok(score)
}

/// `pearson` plus the drift guard: magnitudes above the cutoff are invalid.
pub fn guarded_similarity(stat: &PairStat, config: &EngineConfig) -> Result<f64, IcfError> {
	let score = pearson(stat, config.similarity_decimals)?;
	if score.abs() > config.max_similarity_magnitude {
		return Err(IcfError::NumericallyInvalidSimilarity(format!(
			"magnitude {} exceeds {}",
			score, config.max_similarity_magnitude
		)));
	}
	Ok(score)
}

/// Rank items that similar neighbours rated highly and `user` has not rated.
pub fn recommend(
	profiles: &UserProfileStore,
	pairs: &PairStatsStore,
	config: &EngineConfig,
	user: &str,
	options: &RecommendOptions,
) -> Result<Vec<ItemId>, IcfError> {
	let active = profiles.get(user)?;
	let corr_threshold = options.corr_threshold.unwrap_or(config.corr_threshold);
	let high_rating = options.high_rating.unwrap_or(config.high_rating);

	// Support counts in first-encounter order.
	let mut support: Vec<(&str, usize)> = Vec::new();
	let mut position: HashMap<&str, usize> = HashMap::new();

	for (neighbour, profile) in profiles.iter() {
		if neighbour == user {
			continue;
		}
		let Ok(stat) = pairs.get(user, neighbour) else {
			continue;
		};
		let score = match guarded_similarity(stat, config) {
			Ok(score) => score,
			Err(e) => {
				tracing::debug!(user, neighbour, "Skipping neighbour: {}", e);
				continue;
			}
		};
		if score < corr_threshold {
			continue;
		}
		for (item, rating) in profile.ratings() {
			if rating < high_rating || active.has_rated(item) {
				continue;
			}
			match position.get(item) {
				Some(&idx) => support[idx].1 += 1,
				None => {
					position.insert(item, support.len());
					support.push((item, 1));
				}
			}
		}
	}

	// Stable sort keeps first-encounter order among equal counts.
	support.sort_by(|a, b| b.1.cmp(&a.1));
	Ok(support
		.into_iter()
		.take(options.top_n)
		.map(|(item, _)| item.to_string())
		.collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
