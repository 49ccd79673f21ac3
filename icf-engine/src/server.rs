// ---------------------------------------------------------------------------
// IcfServer — JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes incoming JSON-RPC 2.0 requests (NDJSON over stdin) to the
// incremental engine and the item catalog. A main `run()` loop, a
// `dispatch()` match, `with_engine` / `with_engine_mut` helpers, and
// free-standing handler functions for each method.
//
// Requests are handled strictly one at a time in arrival order, which is
// what the incremental update formulas require.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead, Write};

use crate::catalog::{CatalogOptions, ItemCatalog};
use crate::config::EngineConfig;
use crate::engine::IncrementalEngine;
use crate::error::IcfError;
use crate::protocol::*;
use crate::recommend::RecommendOptions;
use crate::stream::{parse_delimiter, RatingStream, StreamOptions};
use crate::transport::NdjsonTransport;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct IcfServer<W: Write = io::Stdout> {
	transport: NdjsonTransport<W>,
	defaults: EngineConfig,
	engine: Option<IncrementalEngine>,
	catalog: Option<ItemCatalog>,
}

impl<W: Write> IcfServer<W> {
	/// Create a server. The engine is created when `engine/initialize` is
	/// called, starting from `defaults`.
	pub fn new(transport: NdjsonTransport<W>, defaults: EngineConfig) -> Self {
		Self {
			transport,
			defaults,
			engine: None,
			catalog: None,
		}
	}

	/// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
	pub fn run(&mut self) -> Result<(), IcfError> {
		let stdin = io::stdin();
		self.serve(stdin.lock())
	}

	/// Serve requests from any line-oriented reader until EOF.
	pub fn serve<R: BufRead>(&mut self, reader: R) -> Result<(), IcfError> {
		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::error!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	pub fn into_transport(self) -> NdjsonTransport<W> {
		self.transport
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		let result = match req.method.as_str() {
			// -- Lifecycle -----------------------------------------------
			"engine/initialize" => self.handle_initialize(req.params),
			"engine/stats" => self.with_engine(|e| {
				Ok(serde_json::json!({
					"users": e.user_count(),
					"pairs": e.pair_count(),
					"config": e.config(),
				}))
			}),

			// -- Ingestion -----------------------------------------------
			"ratings/ingest" => self.with_engine_mut(|e| handle_ingest(e, req.params)),
			"ratings/ingestBatch" => {
				self.with_engine_mut(|e| handle_ingest_batch(e, req.params))
			}
			"ratings/loadFile" => self.with_engine_mut(|e| handle_load_file(e, req.params)),

			// -- Catalog -------------------------------------------------
			"catalog/load" => self.handle_catalog_load(req.params),

			// -- Queries -------------------------------------------------
			"recommend/items" => self.with_engine(|e| handle_recommend(e, req.params)),
			"recommend/descriptions" => self.handle_recommend_descriptions(req.params),
			"users/profile" => self.with_engine(|e| handle_profile(e, req.params)),
			"users/favorites" => self.with_engine(|e| handle_favorites(e, req.params)),
			"users/favoriteDescriptions" => {
				self.handle_favorite_descriptions(req.params)
			}
			"pairs/get" => self.with_engine(|e| handle_pair(e, req.params)),

			// -- Unknown -------------------------------------------------
			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(e) => {
				let code = match e {
					IcfError::InvalidParam(_) => INVALID_PARAMS,
					IcfError::Invariant(_) | IcfError::Serialization(_) => INTERNAL_ERROR,
					_ => ICF_ERROR,
				};
				self.transport
					.write_error(id, code, e.to_string(), Some(e.to_json_rpc_error()))
			}
		}
	}

	// ── Engine accessors ──────────────────────────────────────────────────

	fn with_engine<F>(&self, f: F) -> Result<serde_json::Value, IcfError>
	where
		F: FnOnce(&IncrementalEngine) -> Result<serde_json::Value, IcfError>,
	{
		match &self.engine {
			Some(e) => f(e),
			None => Err(IcfError::NotInitialized),
		}
	}

	fn with_engine_mut<F>(&mut self, f: F) -> Result<serde_json::Value, IcfError>
	where
		F: FnOnce(&mut IncrementalEngine) -> Result<serde_json::Value, IcfError>,
	{
		match &mut self.engine {
			Some(e) => f(e),
			None => Err(IcfError::NotInitialized),
		}
	}

	// ── Stateful handlers ─────────────────────────────────────────────────

	fn handle_initialize(
		&mut self,
		params: serde_json::Value,
	) -> Result<serde_json::Value, IcfError> {
		let p: InitializeParams = if params.is_null() {
			InitializeParams::default()
		} else {
			parse_params(params)?
		};

		let config = EngineConfig {
			corr_threshold: p.corr_threshold.unwrap_or(self.defaults.corr_threshold),
			high_rating: p.high_rating.unwrap_or(self.defaults.high_rating),
			max_similarity_magnitude: p
				.max_similarity_magnitude
				.unwrap_or(self.defaults.max_similarity_magnitude),
			similarity_decimals: p
				.similarity_decimals
				.unwrap_or(self.defaults.similarity_decimals),
		};

		config.validate()?;

		tracing::info!(?config, "Engine initialized");
		self.engine = Some(IncrementalEngine::new(config));
		Ok(serde_json::json!({}))
	}

	fn handle_catalog_load(
		&mut self,
		params: serde_json::Value,
	) -> Result<serde_json::Value, IcfError> {
		let p: CatalogLoadParams = parse_params(params)?;
		let defaults = CatalogOptions::default();
		let options = CatalogOptions {
			delimiter: match p.delimiter.as_deref() {
				Some(d) => parse_delimiter(d)?,
				None => defaults.delimiter,
			},
			item_column: p.item_column.unwrap_or(defaults.item_column),
			description_column: p.description_column.unwrap_or(defaults.description_column),
		};
		let catalog = ItemCatalog::load(&p.path, &options)?;
		let items = catalog.len();
		self.catalog = Some(catalog);
		Ok(serde_json::json!({ "items": items }))
	}

	fn with_catalog<F>(&self, f: F) -> Result<serde_json::Value, IcfError>
	where
		F: FnOnce(&IncrementalEngine, &ItemCatalog) -> Result<serde_json::Value, IcfError>,
	{
		let engine = self.engine.as_ref().ok_or(IcfError::NotInitialized)?;
		// No catalog loaded yet is reported the same as no engine.
		let catalog = self.catalog.as_ref().ok_or(IcfError::NotInitialized)?;
		f(engine, catalog)
	}

	fn handle_recommend_descriptions(
		&self,
		params: serde_json::Value,
	) -> Result<serde_json::Value, IcfError> {
		let p: RecommendParams = parse_params(params)?;
		let options = recommend_options(&p);
		self.with_catalog(|engine, catalog| {
			let descriptions = catalog.recommended_descriptions(engine, &p.user, &options)?;
			Ok(serde_json::json!({ "descriptions": descriptions }))
		})
	}

	fn handle_favorite_descriptions(
		&self,
		params: serde_json::Value,
	) -> Result<serde_json::Value, IcfError> {
		let p: FavoritesParams = parse_params(params)?;
		let n = p.n.unwrap_or(DEFAULT_FAVORITES);
		self.with_catalog(|engine, catalog| {
			let descriptions = catalog.favorite_descriptions(engine, &p.user, n)?;
			Ok(serde_json::json!({ "descriptions": descriptions }))
		})
	}
}

// ---------------------------------------------------------------------------
// Param parsing
// ---------------------------------------------------------------------------

fn parse_params<T: serde::de::DeserializeOwned>(
	params: serde_json::Value,
) -> Result<T, IcfError> {
	serde_json::from_value(params)
		.map_err(|e| IcfError::InvalidParam(format!("Invalid params: {}", e)))
}

fn recommend_options(p: &RecommendParams) -> RecommendOptions {
	RecommendOptions {
		top_n: p.top_n.unwrap_or(DEFAULT_TOP_N),
		corr_threshold: p.corr_threshold,
		high_rating: p.high_rating,
	}
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_ingest(
	engine: &mut IncrementalEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, IcfError> {
	let p: IngestParams = parse_params(params)?;
	let kind = engine.ingest(&p.user, &p.item, p.rating)?;
	Ok(serde_json::json!({ "kind": kind }))
}

fn handle_ingest_batch(
	engine: &mut IncrementalEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, IcfError> {
	let p: IngestBatchParams = parse_params(params)?;
	let ingested = engine.ingest_all(p.events.into_iter().map(Ok))?;
	Ok(serde_json::json!({ "ingested": ingested }))
}

fn handle_load_file(
	engine: &mut IncrementalEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, IcfError> {
	let p: LoadFileParams = parse_params(params)?;
	let defaults = StreamOptions::default();
	let options = StreamOptions {
		delimiter: match p.delimiter.as_deref() {
			Some(d) => parse_delimiter(d)?,
			None => defaults.delimiter,
		},
		max_cases: p.max_cases,
		user_column: p.user_column.unwrap_or(defaults.user_column),
		item_column: p.item_column.unwrap_or(defaults.item_column),
		rating_column: p.rating_column.unwrap_or(defaults.rating_column),
	};
	let stream = RatingStream::open(&p.path, &options)?;
	let ingested = engine.ingest_all(stream)?;
	tracing::info!(path = %p.path, ingested, "Loaded rating file");
	Ok(serde_json::json!({ "ingested": ingested }))
}

fn handle_recommend(
	engine: &IncrementalEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, IcfError> {
	let p: RecommendParams = parse_params(params)?;
	let items = engine.recommend(&p.user, &recommend_options(&p))?;
	Ok(serde_json::json!({ "items": items }))
}

fn handle_profile(
	engine: &IncrementalEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, IcfError> {
	let p: UserParams = parse_params(params)?;
	let summary = engine.user_summary(&p.user)?;
	serde_json::to_value(summary).map_err(|e| IcfError::Serialization(e.to_string()))
}

fn handle_favorites(
	engine: &IncrementalEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, IcfError> {
	let p: FavoritesParams = parse_params(params)?;
	let items = engine.favorites(&p.user, p.n.unwrap_or(DEFAULT_FAVORITES))?;
	Ok(serde_json::json!({ "items": items }))
}

fn handle_pair(
	engine: &IncrementalEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, IcfError> {
	let p: PairParams = parse_params(params)?;
	let snapshot = engine.pair_snapshot(&p.user, &p.other)?;
	serde_json::to_value(snapshot).map_err(|e| IcfError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
