use serde::Deserialize;

use crate::types::RatingEvent;

// ── JSON-RPC 2.0 error codes ────────────────────────────────────────────────

pub const INTERNAL_ERROR: i32 = -32603;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const ICF_ERROR: i32 = -32000;

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_FAVORITES: usize = 10;

// ── Incoming request ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
	pub id: u64,
	pub method: String,
	#[serde(default)]
	pub params: serde_json::Value,
}

// ── Params ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
	pub corr_threshold: Option<f64>,
	pub high_rating: Option<f64>,
	pub max_similarity_magnitude: Option<f64>,
	pub similarity_decimals: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestParams {
	pub user: String,
	pub item: String,
	pub rating: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestBatchParams {
	pub events: Vec<RatingEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFileParams {
	pub path: String,
	pub delimiter: Option<String>,
	pub max_cases: Option<usize>,
	pub user_column: Option<String>,
	pub item_column: Option<String>,
	pub rating_column: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogLoadParams {
	pub path: String,
	pub delimiter: Option<String>,
	pub item_column: Option<String>,
	pub description_column: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendParams {
	pub user: String,
	pub top_n: Option<usize>,
	pub corr_threshold: Option<f64>,
	pub high_rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserParams {
	pub user: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesParams {
	pub user: String,
	pub n: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairParams {
	pub user: String,
	pub other: String,
}
