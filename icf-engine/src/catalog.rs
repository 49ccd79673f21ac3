// ---------------------------------------------------------------------------
// ItemCatalog — human-readable item descriptions
// ---------------------------------------------------------------------------
//
// Maps item keys to display strings (movie titles, product names) loaded
// from the same kind of delimited file the rating stream reads. Only used to
// present engine results; the engine itself never consults it.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::engine::IncrementalEngine;
use crate::error::IcfError;
use crate::recommend::RecommendOptions;
use crate::stream::column_index;
use crate::types::ItemId;

#[derive(Debug, Clone)]
pub struct CatalogOptions {
	pub delimiter: u8,
	pub item_column: String,
	pub description_column: String,
}

impl Default for CatalogOptions {
	fn default() -> Self {
		Self {
			delimiter: b'\t',
			item_column: "item".into(),
			description_column: "title".into(),
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
	descriptions: HashMap<ItemId, String>,
}

impl ItemCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn load(path: impl AsRef<Path>, options: &CatalogOptions) -> Result<Self, IcfError> {
		let file = std::fs::File::open(path.as_ref())?;
		let catalog = Self::from_reader(file, options)?;
		tracing::info!(
			path = %path.as_ref().display(),
			items = catalog.len(),
			"Loaded item catalog"
		);
		Ok(catalog)
	}

	/// Read item/description columns. Later rows overwrite earlier ones.
	pub fn from_reader<R: Read>(reader: R, options: &CatalogOptions) -> Result<Self, IcfError> {
		let mut reader = ReaderBuilder::new()
			.delimiter(options.delimiter)
			.has_headers(true)
			.flexible(true)
			.from_reader(reader);

		let headers = reader.headers()?.clone();
		let item_idx = column_index(&headers, &options.item_column)?;
		let description_idx = column_index(&headers, &options.description_column)?;

		let mut catalog = Self::new();
		for record in reader.records() {
			let record = record?;
			if let (Some(item), Some(description)) =
				(record.get(item_idx), record.get(description_idx))
			{
				catalog.insert(item, description);
			}
		}
		Ok(catalog)
	}

	pub fn insert(&mut self, item: impl Into<ItemId>, description: impl Into<String>) {
		self.descriptions.insert(item.into(), description.into());
	}

	pub fn describe(&self, item: &str) -> Option<&str> {
		self.descriptions.get(item).map(String::as_str)
	}

	/// Describe every item, failing on the first one without a description.
	pub fn describe_all<S: AsRef<str>>(&self, items: &[S]) -> Result<Vec<String>, IcfError> {
		items
			.iter()
			.map(|item| {
				let item = item.as_ref();
				self.describe(item)
					.map(str::to_string)
					.ok_or_else(|| IcfError::DescriptionNotFound(item.to_string()))
			})
			.collect()
	}

	/// Descriptions of the user's `n` highest-rated items.
	pub fn favorite_descriptions(
		&self,
		engine: &IncrementalEngine,
		user: &str,
		n: usize,
	) -> Result<Vec<String>, IcfError> {
		let items: Vec<ItemId> = engine
			.favorites(user, n)?
			.into_iter()
			.map(|rated| rated.item)
			.collect();
		self.describe_all(&items)
	}

	/// Descriptions of the items recommended to `user`.
	pub fn recommended_descriptions(
		&self,
		engine: &IncrementalEngine,
		user: &str,
		options: &RecommendOptions,
	) -> Result<Vec<String>, IcfError> {
		let items = engine.recommend(user, options)?;
		self.describe_all(&items)
	}

	pub fn len(&self) -> usize {
		self.descriptions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.descriptions.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	const DATA: &str = "user\titem\trating\ttitle\n\
		a\tp\t4\tHeat (1995)\n\
		b\tq\t4\tAlien (1979)\n\
		a\tw\t3\tFargo (1996)\n\
		b\tw\t4\tFargo (1996)\n\
		b\tz\t5\tBrazil (1985)\n";

	fn catalog() -> ItemCatalog {
		ItemCatalog::from_reader(DATA.as_bytes(), &CatalogOptions::default()).unwrap()
	}

	#[test]
	fn loads_unique_items() {
		let catalog = catalog();
		assert_eq!(catalog.len(), 4);
		assert_eq!(catalog.describe("w"), Some("Fargo (1996)"));
		assert_eq!(catalog.describe("missing"), None);
	}

	#[test]
	fn describe_all_fails_on_unknown_item() {
		let catalog = catalog();
		assert_eq!(
			catalog.describe_all(&["p", "z"]).unwrap(),
			vec!["Heat (1995)", "Brazil (1985)"]
		);
		let err = catalog.describe_all(&["p", "nope"]).unwrap_err();
		assert!(matches!(err, IcfError::DescriptionNotFound(ref i) if i == "nope"));
	}

	#[test]
	fn missing_description_column_is_reported() {
		let options = CatalogOptions {
			description_column: "name".into(),
			..Default::default()
		};
		let err = ItemCatalog::from_reader(DATA.as_bytes(), &options).unwrap_err();
		assert!(matches!(err, IcfError::MissingColumn(_)));
	}

	#[test]
	fn translates_engine_results() {
		let mut engine = IncrementalEngine::default();
		let events = crate::stream::RatingStream::from_reader(
			DATA.as_bytes(),
			&crate::stream::StreamOptions::default(),
		)
		.unwrap();
		assert_eq!(engine.ingest_all(events).unwrap(), 5);

		let catalog = catalog();
		assert_eq!(
			catalog
				.recommended_descriptions(&engine, "a", &RecommendOptions::top(5))
				.unwrap(),
			vec!["Alien (1979)", "Brazil (1985)"]
		);
		assert_eq!(
			catalog.favorite_descriptions(&engine, "b", 2).unwrap(),
			vec!["Brazil (1985)", "Alien (1979)"]
		);
	}

	#[test]
	fn loads_from_disk() {
		let mut file = NamedTempFile::new().expect("temp file");
		write!(file, "{}", DATA).expect("write data");
		let catalog = ItemCatalog::load(file.path(), &CatalogOptions::default()).unwrap();
		assert_eq!(catalog.describe("q"), Some("Alien (1979)"));
	}
}
