// ---------------------------------------------------------------------------
// UserProfileStore — per-user rating state
// ---------------------------------------------------------------------------
//
// Holds every user's rated items together with the running rating count and
// mean. The store only records ratings; count and mean are committed by the
// update engine in the same step as the pair statistics that depend on them.
//
// Users are iterated in registration order and each user's items in the
// order they were first rated. Recommendation ranking relies on both orders
// for its tie-breaking.
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use crate::error::IcfError;
use crate::types::{ItemId, RatedItem, UserId, UserSummary};

// ---------------------------------------------------------------------------
// UserProfile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct UserProfile {
	rating_count: usize,
	average_rating: f64,
	ratings: HashMap<ItemId, f64>,
	/// Items in the order they were first rated.
	rated_order: Vec<ItemId>,
}

impl UserProfile {
	pub fn rating_count(&self) -> usize {
		self.rating_count
	}

	pub fn average_rating(&self) -> f64 {
		self.average_rating
	}

	pub fn has_rated(&self, item: &str) -> bool {
		self.ratings.contains_key(item)
	}

	pub fn rating(&self, item: &str) -> Option<f64> {
		self.ratings.get(item).copied()
	}

	/// Rated items in first-rated order.
	pub fn ratings(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
		self.rated_order
			.iter()
			.map(move |item| (item.as_str(), self.ratings[item]))
	}

	pub fn len(&self) -> usize {
		self.ratings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ratings.is_empty()
	}

	/// Insert or overwrite a rating, returning the previous value.
	pub(crate) fn set_rating(&mut self, item: &str, value: f64) -> Option<f64> {
		let previous = self.ratings.insert(item.to_string(), value);
		if previous.is_none() {
			self.rated_order.push(item.to_string());
		}
		previous
	}

	pub(crate) fn commit_mean(&mut self, rating_count: usize, average_rating: f64) {
		self.rating_count = rating_count;
		self.average_rating = average_rating;
	}

	/// Up to `n` items ordered by descending rating; ties keep first-rated order.
	pub fn top_rated(&self, n: usize) -> Vec<RatedItem> {
		let mut items: Vec<RatedItem> = self
			.ratings()
			.map(|(item, rating)| RatedItem {
				item: item.to_string(),
				rating,
			})
			.collect();
		items.sort_by(|a, b| b.rating.total_cmp(&a.rating));
		items.truncate(n);
		items
	}
}

// ---------------------------------------------------------------------------
// UserProfileStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct UserProfileStore {
	profiles: HashMap<UserId, UserProfile>,
	registration_order: Vec<UserId>,
}

impl UserProfileStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Return the profile for `user`, creating an empty one on first sight.
	pub fn ensure_user(&mut self, user: &str) -> &mut UserProfile {
		if !self.profiles.contains_key(user) {
			self.registration_order.push(user.to_string());
		}
		self.profiles.entry(user.to_string()).or_default()
	}

	pub fn contains(&self, user: &str) -> bool {
		self.profiles.contains_key(user)
	}

	pub fn get(&self, user: &str) -> Result<&UserProfile, IcfError> {
		self.profiles
			.get(user)
			.ok_or_else(|| IcfError::UserNotFound(user.to_string()))
	}

	pub(crate) fn get_mut(&mut self, user: &str) -> Result<&mut UserProfile, IcfError> {
		self.profiles
			.get_mut(user)
			.ok_or_else(|| IcfError::UserNotFound(user.to_string()))
	}

	pub fn has_rated(&self, user: &str, item: &str) -> bool {
		self.profiles
			.get(user)
			.is_some_and(|profile| profile.has_rated(item))
	}

	pub fn get_rating(&self, user: &str, item: &str) -> Result<f64, IcfError> {
		self.get(user)?
			.rating(item)
			.ok_or_else(|| IcfError::RatingNotFound {
				user: user.to_string(),
				item: item.to_string(),
			})
	}

	/// Insert or overwrite a rating. Count and mean are left untouched.
	pub fn set_rating(&mut self, user: &str, item: &str, value: f64) -> Result<(), IcfError> {
		self.get_mut(user)?.set_rating(item, value);
		Ok(())
	}

	/// Users in registration order.
	pub fn users(&self) -> impl Iterator<Item = &str> + '_ {
		self.registration_order.iter().map(String::as_str)
	}

	/// Users in registration order, paired with their profiles.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &UserProfile)> + '_ {
		self.registration_order
			.iter()
			.map(move |user| (user.as_str(), &self.profiles[user]))
	}

	pub fn len(&self) -> usize {
		self.profiles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.profiles.is_empty()
	}

	pub fn summary(&self, user: &str) -> Result<UserSummary, IcfError> {
		let profile = self.get(user)?;
		Ok(UserSummary {
			user: user.to_string(),
			rating_count: profile.rating_count(),
			average_rating: profile.average_rating(),
			ratings: profile
				.ratings()
				.map(|(item, rating)| RatedItem {
					item: item.to_string(),
					rating,
				})
				.collect(),
		})
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ensure_user_creates_empty_profile_once() {
		let mut store = UserProfileStore::new();
		{
			let profile = store.ensure_user("alice");
			assert_eq!(profile.rating_count(), 0);
			assert_eq!(profile.average_rating(), 0.0);
			assert!(profile.is_empty());
			profile.set_rating("x", 3.0);
		}
		let again = store.ensure_user("alice");
		assert_eq!(again.rating("x"), Some(3.0));
		assert_eq!(store.len(), 1);
	}

	#[test]
	fn users_iterate_in_registration_order() {
		let mut store = UserProfileStore::new();
		for user in ["carol", "alice", "bob", "alice"] {
			store.ensure_user(user);
		}
		let users: Vec<&str> = store.users().collect();
		assert_eq!(users, vec!["carol", "alice", "bob"]);
	}

	#[test]
	fn get_rating_reports_missing_user_and_item() {
		let mut store = UserProfileStore::new();
		store.ensure_user("alice");
		store.set_rating("alice", "x", 4.0).unwrap();

		assert_eq!(store.get_rating("alice", "x").unwrap(), 4.0);
		assert!(matches!(
			store.get_rating("alice", "y"),
			Err(IcfError::RatingNotFound { .. })
		));
		assert!(matches!(
			store.get_rating("bob", "x"),
			Err(IcfError::UserNotFound(_))
		));
	}

	#[test]
	fn has_rated_is_false_for_unknown_user() {
		let store = UserProfileStore::new();
		assert!(!store.has_rated("nobody", "x"));
	}

	#[test]
	fn set_rating_does_not_touch_mean() {
		let mut store = UserProfileStore::new();
		store.ensure_user("alice");
		store.set_rating("alice", "x", 5.0).unwrap();
		let profile = store.get("alice").unwrap();
		assert_eq!(profile.rating_count(), 0);
		assert_eq!(profile.average_rating(), 0.0);
	}

	#[test]
	fn overwrite_keeps_first_rated_position() {
		let mut profile = UserProfile::default();
		assert_eq!(profile.set_rating("x", 1.0), None);
		assert_eq!(profile.set_rating("y", 2.0), None);
		assert_eq!(profile.set_rating("x", 5.0), Some(1.0));
		let items: Vec<(&str, f64)> = profile.ratings().collect();
		assert_eq!(items, vec![("x", 5.0), ("y", 2.0)]);
	}

	#[test]
	fn top_rated_orders_by_rating_then_first_rated() {
		let mut profile = UserProfile::default();
		profile.set_rating("a", 3.0);
		profile.set_rating("b", 5.0);
		profile.set_rating("c", 4.0);
		profile.set_rating("d", 5.0);
		let top: Vec<String> = profile.top_rated(3).into_iter().map(|r| r.item).collect();
		assert_eq!(top, vec!["b", "d", "c"]);
	}
}
