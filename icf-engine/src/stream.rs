// ---------------------------------------------------------------------------
// RatingStream — lazily read rating events from delimited text
// ---------------------------------------------------------------------------
//
// Reads a header row, locates the user/item/rating columns by name, then
// yields one `RatingEvent` per record on demand. Nothing is materialised up
// front, so the stream can feed the engine straight from disk.
// ---------------------------------------------------------------------------

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecordsIntoIter};

use crate::error::IcfError;
use crate::types::RatingEvent;

#[derive(Debug, Clone)]
pub struct StreamOptions {
	pub delimiter: u8,
	/// Stop after this many events.
	pub max_cases: Option<usize>,
	pub user_column: String,
	pub item_column: String,
	pub rating_column: String,
}

impl Default for StreamOptions {
	fn default() -> Self {
		Self {
			delimiter: b'\t',
			max_cases: None,
			user_column: "user".into(),
			item_column: "item".into(),
			rating_column: "rating".into(),
		}
	}
}

/// Parse a single-character delimiter such as `"\t"` or `","`.
pub fn parse_delimiter(delimiter: &str) -> Result<u8, IcfError> {
	match delimiter.as_bytes() {
		[byte] => Ok(*byte),
		_ => Err(IcfError::InvalidParam(format!(
			"Delimiter must be a single byte, got {:?}",
			delimiter
		))),
	}
}

/// Find a named column in a header record.
pub(crate) fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, IcfError> {
	headers
		.iter()
		.position(|h| h.trim() == name)
		.ok_or_else(|| IcfError::MissingColumn(name.to_string()))
}

pub struct RatingStream<R: Read> {
	records: StringRecordsIntoIter<R>,
	user_idx: usize,
	item_idx: usize,
	rating_idx: usize,
	remaining: Option<usize>,
}

impl RatingStream<File> {
	pub fn open(path: impl AsRef<Path>, options: &StreamOptions) -> Result<Self, IcfError> {
		let file = File::open(path.as_ref())?;
		Self::from_reader(file, options)
	}
}

impl<R: Read> RatingStream<R> {
	pub fn from_reader(reader: R, options: &StreamOptions) -> Result<Self, IcfError> {
		let mut reader = ReaderBuilder::new()
			.delimiter(options.delimiter)
			.has_headers(true)
			.flexible(true)
			.from_reader(reader);

		let headers = reader.headers()?.clone();
		let user_idx = column_index(&headers, &options.user_column)?;
		let item_idx = column_index(&headers, &options.item_column)?;
		let rating_idx = column_index(&headers, &options.rating_column)?;

		Ok(Self {
			records: reader.into_records(),
			user_idx,
			item_idx,
			rating_idx,
			remaining: options.max_cases,
		})
	}

	fn parse(&self, record: &csv::StringRecord) -> Result<RatingEvent, IcfError> {
		let line = record.position().map(|p| p.line()).unwrap_or(0);
		let field = |idx: usize, name: &str| {
			record.get(idx).ok_or_else(|| IcfError::InvalidRecord {
				line,
				message: format!("missing {} field", name),
			})
		};

		let user = field(self.user_idx, "user")?;
		let item = field(self.item_idx, "item")?;
		let raw_rating = field(self.rating_idx, "rating")?;
		let rating: f64 = raw_rating
			.trim()
			.parse()
			.map_err(|_| IcfError::InvalidRecord {
				line,
				message: format!("invalid rating {:?}", raw_rating),
			})?;
		if !rating.is_finite() {
			return Err(IcfError::InvalidRecord {
				line,
				message: format!("non-finite rating {:?}", raw_rating),
			});
		}

		Ok(RatingEvent::new(user, item, rating))
	}
}

impl<R: Read> Iterator for RatingStream<R> {
	type Item = Result<RatingEvent, IcfError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.remaining == Some(0) {
			return None;
		}
		let record = match self.records.next()? {
			Ok(record) => record,
			Err(e) => return Some(Err(e.into())),
		};
		if let Some(remaining) = self.remaining.as_mut() {
			*remaining -= 1;
		}
		Some(self.parse(&record))
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
