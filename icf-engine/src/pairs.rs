// ---------------------------------------------------------------------------
// PairStatsStore — correlation accumulators per user pair
// ---------------------------------------------------------------------------
//
// Every unordered pair of known users owns three running accumulators
// (B, C, D) and the co-rating bookkeeping: one running sum per member of
// that member's ratings on co-rated items, and the co-rated item count.
//
// Pairs are keyed canonically: the lexicographically smaller user id comes
// first. Every lookup goes through `PairKey::new`, so callers may pass the
// two users in either order. Co-rating reads are returned oriented towards
// the caller's first argument.
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use crate::error::IcfError;
use crate::types::UserId;

// ---------------------------------------------------------------------------
// PairKey
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
	first: UserId,
	second: UserId,
}

impl PairKey {
	pub fn new(a: &str, b: &str) -> Self {
		let (first, second) = if a <= b { (a, b) } else { (b, a) };
		Self {
			first: first.to_string(),
			second: second.to_string(),
		}
	}

	pub fn first(&self) -> &str {
		&self.first
	}

	pub fn second(&self) -> &str {
		&self.second
	}

	fn is_first(&self, user: &str) -> bool {
		self.first == user
	}
}

// ---------------------------------------------------------------------------
// PairStat
// ---------------------------------------------------------------------------

/// Co-rating sums stored in canonical member order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoRatingSums {
	pub first: f64,
	pub second: f64,
	pub n: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairStat {
	pub b: f64,
	pub c: f64,
	pub d: f64,
	pub co_ratings: CoRatingSums,
}

impl PairStat {
	pub fn is_zero(&self) -> bool {
		*self == Self::default()
	}
}

/// Co-rating sums seen from one member of the pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoRatingView {
	/// Sum of the viewing user's ratings on co-rated items.
	pub user_sum: f64,
	/// Sum of the partner's ratings on co-rated items.
	pub partner_sum: f64,
	pub n: usize,
}

impl CoRatingView {
	fn oriented(key: &PairKey, sums: &CoRatingSums, user: &str) -> Self {
		if key.is_first(user) {
			Self {
				user_sum: sums.first,
				partner_sum: sums.second,
				n: sums.n,
			}
		} else {
			Self {
				user_sum: sums.second,
				partner_sum: sums.first,
				n: sums.n,
			}
		}
	}
}

// ---------------------------------------------------------------------------
// PairStatsStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct PairStatsStore {
	pairs: HashMap<PairKey, PairStat>,
}

impl PairStatsStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a zeroed pair for `existing` and `incoming` if it is absent.
	/// Returns `true` when a new pair was created.
	pub fn ensure_pair(&mut self, existing: &str, incoming: &str) -> Result<bool, IcfError> {
		if existing == incoming {
			return Err(IcfError::InvalidPair(existing.to_string()));
		}
		let key = PairKey::new(existing, incoming);
		if self.pairs.contains_key(&key) {
			return Ok(false);
		}
		self.pairs.insert(key, PairStat::default());
		Ok(true)
	}

	pub fn get(&self, u: &str, v: &str) -> Result<&PairStat, IcfError> {
		self.pairs
			.get(&PairKey::new(u, v))
			.ok_or_else(|| IcfError::PairNotFound(u.to_string(), v.to_string()))
	}

	fn entry_mut(&mut self, u: &str, v: &str) -> Result<(PairKey, &mut PairStat), IcfError> {
		let key = PairKey::new(u, v);
		match self.pairs.get_mut(&key) {
			Some(stat) => Ok((key, stat)),
			None => Err(IcfError::PairNotFound(u.to_string(), v.to_string())),
		}
	}

	/// Add deltas to B, C and D. The deltas land on the same accumulators
	/// whichever member is canonically first.
	pub fn add_to_accumulators(
		&mut self,
		u: &str,
		v: &str,
		delta_b: f64,
		delta_c: f64,
		delta_d: f64,
	) -> Result<(), IcfError> {
		let (_, stat) = self.entry_mut(u, v)?;
		stat.b += delta_b;
		stat.c += delta_c;
		stat.d += delta_d;
		Ok(())
	}

	/// Record a newly co-rated item: add each member's rating to its sum and
	/// bump the co-rated count. Returns the post-update sums oriented to `u`.
	pub fn update_co_rating_on_new_co_rating(
		&mut self,
		u: &str,
		v: &str,
		u_contribution: f64,
		v_contribution: f64,
	) -> Result<CoRatingView, IcfError> {
		let (key, stat) = self.entry_mut(u, v)?;
		let sums = &mut stat.co_ratings;
		if key.is_first(u) {
			sums.first += u_contribution;
			sums.second += v_contribution;
		} else {
			sums.second += u_contribution;
			sums.first += v_contribution;
		}
		sums.n += 1;
		Ok(CoRatingView::oriented(&key, sums, u))
	}

	/// `u` revised a rating on an item already co-rated with `v`. Only u's sum
	/// moves; the co-rated item set is unchanged.
	pub fn adjust_co_rating_for_revision(
		&mut self,
		u: &str,
		v: &str,
		delta_rating: f64,
	) -> Result<CoRatingView, IcfError> {
		let (key, stat) = self.entry_mut(u, v)?;
		let sums = &mut stat.co_ratings;
		if key.is_first(u) {
			sums.first += delta_rating;
		} else {
			sums.second += delta_rating;
		}
		Ok(CoRatingView::oriented(&key, sums, u))
	}

	pub fn read_co_rating(&self, u: &str, v: &str) -> Result<CoRatingView, IcfError> {
		let key = PairKey::new(u, v);
		let stat = self
			.pairs
			.get(&key)
			.ok_or_else(|| IcfError::PairNotFound(u.to_string(), v.to_string()))?;
		Ok(CoRatingView::oriented(&key, &stat.co_ratings, u))
	}

	pub fn len(&self) -> usize {
		self.pairs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pair_key_is_order_independent() {
		let a = PairKey::new("bob", "alice");
		let b = PairKey::new("alice", "bob");
		assert_eq!(a, b);
		assert_eq!(a.first(), "alice");
		assert_eq!(a.second(), "bob");
	}

	#[test]
	fn ensure_pair_is_zeroed_and_created_once() {
		let mut store = PairStatsStore::new();
		assert!(store.ensure_pair("alice", "bob").unwrap());
		assert!(!store.ensure_pair("bob", "alice").unwrap());
		assert_eq!(store.len(), 1);
		assert!(store.get("bob", "alice").unwrap().is_zero());
	}

	#[test]
	fn ensure_pair_rejects_self_pair() {
		let mut store = PairStatsStore::new();
		assert!(matches!(
			store.ensure_pair("alice", "alice"),
			Err(IcfError::InvalidPair(_))
		));
		assert!(store.is_empty());
	}

	#[test]
	fn get_missing_pair_is_not_found() {
		let store = PairStatsStore::new();
		let err = store.get("alice", "bob").unwrap_err();
		assert!(matches!(err, IcfError::PairNotFound(..)));
	}

	#[test]
	fn accumulators_ignore_argument_order() {
		let mut store = PairStatsStore::new();
		store.ensure_pair("alice", "bob").unwrap();
		store.add_to_accumulators("bob", "alice", 1.0, 2.0, 3.0).unwrap();
		store.add_to_accumulators("alice", "bob", 0.5, 0.5, 0.5).unwrap();
		let stat = store.get("alice", "bob").unwrap();
		assert_eq!((stat.b, stat.c, stat.d), (1.5, 2.5, 3.5));
	}

	#[test]
	fn new_co_rating_routes_sums_to_members() {
		let mut store = PairStatsStore::new();
		store.ensure_pair("alice", "bob").unwrap();

		let view = store
			.update_co_rating_on_new_co_rating("bob", "alice", 4.0, 2.0)
			.unwrap();
		assert_eq!(view.user_sum, 4.0);
		assert_eq!(view.partner_sum, 2.0);
		assert_eq!(view.n, 1);

		let stat = store.get("alice", "bob").unwrap();
		assert_eq!(stat.co_ratings.first, 2.0);
		assert_eq!(stat.co_ratings.second, 4.0);

		let from_alice = store.read_co_rating("alice", "bob").unwrap();
		assert_eq!(from_alice.user_sum, 2.0);
		assert_eq!(from_alice.partner_sum, 4.0);
	}

	#[test]
	fn revision_moves_only_the_revising_users_sum() {
		let mut store = PairStatsStore::new();
		store.ensure_pair("alice", "bob").unwrap();
		store
			.update_co_rating_on_new_co_rating("alice", "bob", 3.0, 5.0)
			.unwrap();

		let view = store
			.adjust_co_rating_for_revision("alice", "bob", -1.0)
			.unwrap();
		assert_eq!(view.user_sum, 2.0);
		assert_eq!(view.partner_sum, 5.0);
		assert_eq!(view.n, 1);
	}

	#[test]
	fn mutations_on_missing_pair_fail() {
		let mut store = PairStatsStore::new();
		assert!(store.add_to_accumulators("a", "b", 1.0, 1.0, 1.0).is_err());
		assert!(store
			.update_co_rating_on_new_co_rating("a", "b", 1.0, 1.0)
			.is_err());
		assert!(store.adjust_co_rating_for_revision("a", "b", 1.0).is_err());
		assert!(store.read_co_rating("a", "b").is_err());
	}
}
