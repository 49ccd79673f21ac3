use serde::{Deserialize, Serialize};

/// Opaque, stable user key.
pub type UserId = String;

/// Opaque, stable item key.
pub type ItemId = String;

/// One (user, item, rating) event from the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEvent {
	pub user: UserId,
	pub item: ItemId,
	pub rating: f64,
}

impl RatingEvent {
	pub fn new(user: impl Into<UserId>, item: impl Into<ItemId>, rating: f64) -> Self {
		Self {
			user: user.into(),
			item: item.into(),
			rating,
		}
	}
}

/// How an ingested event was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IngestKind {
	/// First rating of this item by this user.
	New,
	/// Replacement of an existing rating.
	Revision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedItem {
	pub item: ItemId,
	pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
	pub user: UserId,
	pub rating_count: usize,
	pub average_rating: f64,
	pub ratings: Vec<RatedItem>,
}

/// Pair statistics oriented towards the pair member that asked for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairSnapshot {
	pub user: UserId,
	pub other: UserId,
	pub b: f64,
	pub c: f64,
	pub d: f64,
	pub n: usize,
	pub user_sum: f64,
	pub other_sum: f64,
	pub similarity: Option<f64>,
}
