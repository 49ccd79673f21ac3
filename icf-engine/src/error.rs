use thiserror::Error;

/// Typed error variants for the collaborative filtering engine and its collaborators.
#[derive(Debug, Error)]
pub enum IcfError {
	#[error("Engine not initialized: call engine/initialize first")]
	NotInitialized,
	#[error("User not found: {0}")]
	UserNotFound(String),
	#[error("Rating not found: user {user} has not rated {item}")]
	RatingNotFound { user: String, item: String },
	#[error("Pair not found: ({0}, {1})")]
	PairNotFound(String, String),
	#[error("Invalid pair: a user cannot be paired with itself ({0})")]
	InvalidPair(String),
	#[error("Invalid rating: {0}")]
	InvalidRating(f64),
	#[error("Numerically invalid similarity: {0}")]
	NumericallyInvalidSimilarity(String),
	#[error("Invariant violated: {0}")]
	Invariant(String),
	#[error("Description not found for item: {0}")]
	DescriptionNotFound(String),
	#[error("Missing column: {0}")]
	MissingColumn(String),
	#[error("Invalid record at line {line}: {message}")]
	InvalidRecord { line: u64, message: String },
	#[error("Ingestion stopped after {applied} events: {source}")]
	PartialIngest {
		applied: usize,
		#[source]
		source: Box<IcfError>,
	},
	#[error("Invalid parameter: {0}")]
	InvalidParam(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("CSV error: {0}")]
	Csv(#[from] csv::Error),
	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl IcfError {
	pub fn code(&self) -> &str {
		match self {
			Self::NotInitialized => "ICF_NOT_INITIALIZED",
			Self::UserNotFound(_) => "ICF_USER_NOT_FOUND",
			Self::RatingNotFound { .. } => "ICF_RATING_NOT_FOUND",
			Self::PairNotFound(..) => "ICF_PAIR_NOT_FOUND",
			Self::InvalidPair(_) => "ICF_INVALID_PAIR",
			Self::InvalidRating(_) => "ICF_INVALID_RATING",
			Self::NumericallyInvalidSimilarity(_) => "ICF_INVALID_SIMILARITY",
			Self::Invariant(_) => "ICF_INVARIANT",
			Self::DescriptionNotFound(_) => "ICF_DESCRIPTION_NOT_FOUND",
			Self::MissingColumn(_) => "ICF_MISSING_COLUMN",
			Self::InvalidRecord { .. } => "ICF_INVALID_RECORD",
			Self::PartialIngest { .. } => "ICF_PARTIAL_INGEST",
			Self::InvalidParam(_) => "ICF_INVALID_PARAM",
			Self::Io(_) => "ICF_IO",
			Self::Csv(_) => "ICF_CSV",
			Self::Serialization(_) => "ICF_SERIALIZATION",
		}
	}

	/// Error data for JSON-RPC responses. Record errors carry their line;
	/// partial ingests carry the applied count and the underlying cause.
	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		let mut data = serde_json::json!({
			"icfCode": self.code(),
			"message": self.to_string(),
		});
		match self {
			Self::InvalidRecord { line, .. } => {
				data["line"] = serde_json::json!(line);
			}
			Self::PartialIngest { applied, source } => {
				data["applied"] = serde_json::json!(applied);
				data["cause"] = source.to_json_rpc_error();
			}
			_ => {}
		}
		data
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn codes_are_stable() {
		assert_eq!(IcfError::NotInitialized.code(), "ICF_NOT_INITIALIZED");
		assert_eq!(IcfError::UserNotFound("u".into()).code(), "ICF_USER_NOT_FOUND");
		assert_eq!(
			IcfError::PairNotFound("a".into(), "b".into()).code(),
			"ICF_PAIR_NOT_FOUND"
		);
	}

	#[test]
	fn partial_ingest_payload_nests_the_cause() {
		let err = IcfError::PartialIngest {
			applied: 2,
			source: Box::new(IcfError::InvalidRecord {
				line: 4,
				message: "invalid rating \"inf\"".into(),
			}),
		};
		let payload = err.to_json_rpc_error();
		assert_eq!(payload["icfCode"], "ICF_PARTIAL_INGEST");
		assert_eq!(payload["applied"], 2);
		assert_eq!(payload["cause"]["icfCode"], "ICF_INVALID_RECORD");
		assert_eq!(payload["cause"]["line"], 4);
	}

	#[test]
	fn json_rpc_payload_carries_code_and_message() {
		let err = IcfError::UserNotFound("alice".into());
		let payload = err.to_json_rpc_error();
		assert_eq!(payload["icfCode"], "ICF_USER_NOT_FOUND");
		assert_eq!(payload["message"], "User not found: alice");
	}
}
