use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::IcfError;

pub const DEFAULT_CORR_THRESHOLD: f64 = 0.65;
pub const DEFAULT_HIGH_RATING: f64 = 4.0;
pub const DEFAULT_MAX_SIMILARITY_MAGNITUDE: f64 = 1.5;
pub const DEFAULT_SIMILARITY_DECIMALS: u32 = 2;
/// Beyond this, `10^decimals` no longer rounds an f64 meaningfully.
pub const MAX_SIMILARITY_DECIMALS: u32 = 15;

#[derive(Parser, Debug)]
#[command(
	name = "icf-engine",
	about = "Incremental collaborative filtering engine over JSON-RPC 2.0 / NDJSON stdio"
)]
pub struct CliArgs {
	/// Minimum similarity for a user to count as a neighbour
	#[arg(long, default_value_t = DEFAULT_CORR_THRESHOLD, env = "ICF_CORR_THRESHOLD")]
	pub corr_threshold: f64,

	/// Minimum rating for a neighbour's item to be recommended
	#[arg(long, default_value_t = DEFAULT_HIGH_RATING, env = "ICF_HIGH_RATING")]
	pub high_rating: f64,

	/// Similarity estimates beyond this magnitude are treated as accumulator drift
	#[arg(
		long,
		default_value_t = DEFAULT_MAX_SIMILARITY_MAGNITUDE,
		env = "ICF_MAX_SIMILARITY_MAGNITUDE"
	)]
	pub max_similarity_magnitude: f64,

	/// Decimal places kept when rounding similarity estimates
	#[arg(
		long,
		default_value_t = DEFAULT_SIMILARITY_DECIMALS,
		env = "ICF_SIMILARITY_DECIMALS",
		value_parser = clap::value_parser!(u32).range(0..=MAX_SIMILARITY_DECIMALS as i64)
	)]
	pub similarity_decimals: u32,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, default_value = "info", env = "ICF_LOG_LEVEL")]
	pub log_level: String,
}

impl CliArgs {
	pub fn engine_config(&self) -> Result<EngineConfig, IcfError> {
		let config = EngineConfig {
			corr_threshold: self.corr_threshold,
			high_rating: self.high_rating,
			max_similarity_magnitude: self.max_similarity_magnitude,
			similarity_decimals: self.similarity_decimals,
		};
		config.validate()?;
		Ok(config)
	}
}

/// Thresholds used by the recommendation query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
	pub corr_threshold: f64,
	pub high_rating: f64,
	pub max_similarity_magnitude: f64,
	pub similarity_decimals: u32,
}

impl EngineConfig {
	/// Reject settings under which similarity estimates stop being comparable.
	pub fn validate(&self) -> Result<(), IcfError> {
		if self.similarity_decimals > MAX_SIMILARITY_DECIMALS {
			return Err(IcfError::InvalidParam(format!(
				"similarityDecimals must be at most {}, got {}",
				MAX_SIMILARITY_DECIMALS, self.similarity_decimals
			)));
		}
		let thresholds = [
			("corrThreshold", self.corr_threshold),
			("highRating", self.high_rating),
			("maxSimilarityMagnitude", self.max_similarity_magnitude),
		];
		for (name, value) in thresholds {
			if !value.is_finite() {
				return Err(IcfError::InvalidParam(format!(
					"{} must be finite, got {}",
					name, value
				)));
			}
		}
		Ok(())
	}
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			corr_threshold: DEFAULT_CORR_THRESHOLD,
			high_rating: DEFAULT_HIGH_RATING,
			max_similarity_magnitude: DEFAULT_MAX_SIMILARITY_MAGNITUDE,
			similarity_decimals: DEFAULT_SIMILARITY_DECIMALS,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_cli_defaults() {
		let args = CliArgs::parse_from(["icf-engine"]);
		assert_eq!(args.engine_config().unwrap(), EngineConfig::default());
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn cli_overrides_thresholds() {
		let args = CliArgs::parse_from([
			"icf-engine",
			"--corr-threshold",
			"0.5",
			"--max-similarity-magnitude",
			"3",
		]);
		let config = args.engine_config().unwrap();
		assert_eq!(config.corr_threshold, 0.5);
		assert_eq!(config.max_similarity_magnitude, 3.0);
		assert_eq!(config.high_rating, DEFAULT_HIGH_RATING);
	}

	#[test]
	fn cli_rejects_excessive_decimals() {
		assert!(CliArgs::try_parse_from(["icf-engine", "--similarity-decimals", "15"]).is_ok());
		assert!(CliArgs::try_parse_from(["icf-engine", "--similarity-decimals", "400"]).is_err());
		assert!(
			CliArgs::try_parse_from(["icf-engine", "--similarity-decimals", "3000000000"]).is_err()
		);
	}

	#[test]
	fn cli_rejects_non_finite_thresholds() {
		let args = CliArgs::parse_from(["icf-engine", "--corr-threshold", "NaN"]);
		assert!(matches!(args.engine_config(), Err(IcfError::InvalidParam(_))));
	}

	#[test]
	fn validate_bounds_decimals() {
		let config = EngineConfig {
			similarity_decimals: 400,
			..EngineConfig::default()
		};
		assert!(matches!(config.validate(), Err(IcfError::InvalidParam(_))));
		assert!(EngineConfig::default().validate().is_ok());
	}
}
