// ---------------------------------------------------------------------------
// IncrementalEngine — single-pass update of user and pair statistics
// ---------------------------------------------------------------------------
//
// Applies one (user, item, rating) event at a time, in arrival order. Each
// event registers the user if needed, then updates the B, C and D
// accumulators of every pair the user belongs to using closed-form deltas
// derived from the incremental mean, and finally commits the rating, count
// and mean to the user's profile.
//
// The accumulators drift from an exact recomputation because earlier
// contributions were made against averages that have since moved. That drift
// is the price of O(1) work per pair and is not corrected here; the
// recommendation query guards against its worst symptoms instead.
//
// Known gap: on the revision path the partner-side accumulator D is never
// adjusted, and the C delta has a different shape from the new-rating path.
// ---------------------------------------------------------------------------

use crate::config::EngineConfig;
use crate::error::IcfError;
use crate::pairs::{CoRatingView, PairStatsStore};
use crate::profiles::UserProfileStore;
use crate::recommend::{self, RecommendOptions};
use crate::types::{IngestKind, ItemId, PairSnapshot, RatedItem, RatingEvent, UserSummary};

// ---------------------------------------------------------------------------
// Deltas
// ---------------------------------------------------------------------------

/// Increments for the three accumulators of one pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Deltas {
	pub b: f64,
	pub c: f64,
	pub d: f64,
}

/// Mean movement of the active user caused by the current event.
#[derive(Debug, Clone, Copy)]
struct MeanShift {
	old_avg: f64,
	new_avg: f64,
}

impl MeanShift {
	fn delta(&self) -> f64 {
		self.new_avg - self.old_avg
	}
}

/// Partner terms shared by every branch.
#[derive(Debug, Clone, Copy)]
struct Partner {
	avg: f64,
	/// Partner's rating of the event item, when co-rated.
	rating: Option<f64>,
}

/// Pair not co-rated on the event item: only the mean shift propagates.
fn drift_deltas(shift: MeanShift, partner: Partner, co: CoRatingView) -> Deltas {
	let n = co.n as f64;
	let delta_avg = shift.delta();
	Deltas {
		b: -delta_avg * (co.partner_sum - n * partner.avg),
		c: n * delta_avg * delta_avg - 2.0 * delta_avg * (co.user_sum - n * shift.old_avg),
		d: 0.0,
	}
}

/// First co-rating of the event item for this pair. `co` already includes it.
fn new_co_rating_deltas(
	rating: f64,
	partner_rating: f64,
	shift: MeanShift,
	partner: Partner,
	co: CoRatingView,
) -> Deltas {
	let n = co.n as f64;
	let delta_avg = shift.delta();
	let own_dev = rating - shift.new_avg;
	let partner_dev = partner_rating - partner.avg;
	Deltas {
		b: own_dev * partner_dev - delta_avg * (co.partner_sum - n * partner.avg),
		c: own_dev * own_dev + n * delta_avg * delta_avg
			- 2.0 * delta_avg * (co.user_sum - n * shift.old_avg),
		d: partner_dev * partner_dev,
	}
}

/// Revised rating on an item already co-rated with the partner. `co` already
/// includes the rating delta in the active user's sum.
fn revised_co_rating_deltas(
	new_rating: f64,
	delta_rating: f64,
	partner_rating: f64,
	shift: MeanShift,
	partner: Partner,
	co: CoRatingView,
) -> Deltas {
	let n = co.n as f64;
	let delta_avg = shift.delta();
	Deltas {
		b: delta_rating * (partner_rating - partner.avg)
			- delta_avg * (co.partner_sum - n * partner.avg),
		c: delta_rating * delta_rating
			+ 2.0 * delta_rating * (new_rating - shift.new_avg)
			+ n * delta_avg * delta_avg
			- 2.0 * delta_avg * (co.user_sum - n * shift.old_avg),
		d: 0.0,
	}
}

// ---------------------------------------------------------------------------
// IncrementalEngine
// ---------------------------------------------------------------------------

/// Owns both stores. `&mut self` on `ingest` is the single-writer guarantee;
/// hosts sharing an engine across threads must wrap it in a lock.
#[derive(Debug, Default)]
pub struct IncrementalEngine {
	profiles: UserProfileStore,
	pairs: PairStatsStore,
	config: EngineConfig,
}

impl IncrementalEngine {
	pub fn new(config: EngineConfig) -> Self {
		Self {
			profiles: UserProfileStore::new(),
			pairs: PairStatsStore::new(),
			config,
		}
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn profiles(&self) -> &UserProfileStore {
		&self.profiles
	}

	pub fn pairs(&self) -> &PairStatsStore {
		&self.pairs
	}

	// ── Ingestion ─────────────────────────────────────────────────────────

	/// Apply one rating event.
	pub fn ingest(&mut self, user: &str, item: &str, rating: f64) -> Result<IngestKind, IcfError> {
		if !rating.is_finite() {
			return Err(IcfError::InvalidRating(rating));
		}

		if !self.profiles.contains(user) {
			self.register_user(user)?;
		}

		let profile = self.profiles.get(user)?;
		let count = profile.rating_count();
		let avg = profile.average_rating();
		let previous = profile.rating(item);

		tracing::trace!(user, item, rating, "Ingesting rating");

		match previous {
			None => {
				self.apply_new_rating(user, item, rating, count, avg)?;
				Ok(IngestKind::New)
			}
			Some(old) => {
				self.apply_revision(user, item, old, rating, count, avg)?;
				Ok(IngestKind::Revision)
			}
		}
	}

	pub fn ingest_event(&mut self, event: &RatingEvent) -> Result<IngestKind, IcfError> {
		self.ingest(&event.user, &event.item, event.rating)
	}

	/// Apply events in order, stopping at the first error. Returns the number
	/// of events applied. Applied events stay committed on failure; the error
	/// is wrapped in `PartialIngest` with that count.
	pub fn ingest_all<I>(&mut self, events: I) -> Result<usize, IcfError>
	where
		I: IntoIterator<Item = Result<RatingEvent, IcfError>>,
	{
		let mut applied = 0;
		for event in events {
			if let Err(e) = event.and_then(|event| self.ingest_event(&event)) {
				tracing::warn!(applied, "Ingestion stopped: {}", e);
				return Err(IcfError::PartialIngest {
					applied,
					source: Box::new(e),
				});
			}
			applied += 1;
		}
		Ok(applied)
	}

	fn register_user(&mut self, user: &str) -> Result<(), IcfError> {
		self.profiles.ensure_user(user);
		let mut created = 0usize;
		for existing in self.profiles.users() {
			if existing == user {
				continue;
			}
			if self.pairs.ensure_pair(existing, user)? {
				created += 1;
			}
		}
		tracing::debug!(user, pairs_created = created, "Registered user");
		Ok(())
	}

	fn apply_new_rating(
		&mut self,
		user: &str,
		item: &str,
		rating: f64,
		count: usize,
		avg: f64,
	) -> Result<(), IcfError> {
		let q = count as f64;
		let shift = MeanShift {
			old_avg: avg,
			new_avg: rating / (q + 1.0) + (q / (q + 1.0)) * avg,
		};

		for (other, profile) in self.profiles.iter() {
			if other == user {
				continue;
			}
			let partner = Partner {
				avg: profile.average_rating(),
				rating: profile.rating(item),
			};
			let deltas = match partner.rating {
				Some(partner_rating) => {
					let co = self
						.pairs
						.update_co_rating_on_new_co_rating(user, other, rating, partner_rating)?;
					new_co_rating_deltas(rating, partner_rating, shift, partner, co)
				}
				None => {
					let co = self.pairs.read_co_rating(user, other)?;
					drift_deltas(shift, partner, co)
				}
			};
			self.pairs
				.add_to_accumulators(user, other, deltas.b, deltas.c, deltas.d)?;
		}

		let profile = self.profiles.get_mut(user)?;
		profile.set_rating(item, rating);
		profile.commit_mean(count + 1, shift.new_avg);
		Ok(())
	}

	fn apply_revision(
		&mut self,
		user: &str,
		item: &str,
		old_rating: f64,
		new_rating: f64,
		count: usize,
		avg: f64,
	) -> Result<(), IcfError> {
		if count == 0 {
			return Err(IcfError::Invariant(format!(
				"revision of {} by {} with no recorded ratings",
				item, user
			)));
		}
		let delta_rating = new_rating - old_rating;
		let shift = MeanShift {
			old_avg: avg,
			new_avg: avg + delta_rating / count as f64,
		};

		for (other, profile) in self.profiles.iter() {
			if other == user {
				continue;
			}
			let partner = Partner {
				avg: profile.average_rating(),
				rating: profile.rating(item),
			};
			let deltas = match partner.rating {
				Some(partner_rating) => {
					let co = self
						.pairs
						.adjust_co_rating_for_revision(user, other, delta_rating)?;
					revised_co_rating_deltas(
						new_rating,
						delta_rating,
						partner_rating,
						shift,
						partner,
						co,
					)
				}
				None => {
					let co = self.pairs.read_co_rating(user, other)?;
					drift_deltas(shift, partner, co)
				}
			};
			self.pairs
				.add_to_accumulators(user, other, deltas.b, deltas.c, deltas.d)?;
		}

		let profile = self.profiles.get_mut(user)?;
		profile.set_rating(item, new_rating);
		profile.commit_mean(count, shift.new_avg);
		Ok(())
	}

	// ── Queries ───────────────────────────────────────────────────────────

	/// Items recommended to `user`, at most `options.top_n`.
	pub fn recommend(&self, user: &str, options: &RecommendOptions) -> Result<Vec<ItemId>, IcfError> {
		recommend::recommend(&self.profiles, &self.pairs, &self.config, user, options)
	}

	/// Guarded similarity estimate between two registered users.
	pub fn similarity(&self, u: &str, v: &str) -> Result<f64, IcfError> {
		let stat = self.pairs.get(u, v)?;
		recommend::guarded_similarity(stat, &self.config)
	}

	/// The user's `n` highest-rated items.
	pub fn favorites(&self, user: &str, n: usize) -> Result<Vec<RatedItem>, IcfError> {
		Ok(self.profiles.get(user)?.top_rated(n))
	}

	pub fn user_summary(&self, user: &str) -> Result<UserSummary, IcfError> {
		self.profiles.summary(user)
	}

	pub fn pair_snapshot(&self, user: &str, other: &str) -> Result<PairSnapshot, IcfError> {
		let stat = self.pairs.get(user, other)?;
		let co = self.pairs.read_co_rating(user, other)?;
		Ok(PairSnapshot {
			user: user.to_string(),
			other: other.to_string(),
			b: stat.b,
			c: stat.c,
			d: stat.d,
			n: co.n,
			user_sum: co.user_sum,
			other_sum: co.partner_sum,
			similarity: recommend::guarded_similarity(stat, &self.config).ok(),
		})
	}

	pub fn user_count(&self) -> usize {
		self.profiles.len()
	}

	pub fn pair_count(&self) -> usize {
		self.pairs.len()
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
