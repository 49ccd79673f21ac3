use std::io::{self, Write};

use serde::Serialize;

#[derive(Serialize)]
struct JsonRpcResponse<'a> {
	jsonrpc: &'a str,
	id: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	result: Option<serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<JsonRpcErrorBody>,
}

#[derive(Serialize)]
struct JsonRpcErrorBody {
	code: i32,
	message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	data: Option<serde_json::Value>,
}

/// Writes newline-delimited JSON-RPC 2.0 responses. Stdout in the binary,
/// any `Write` sink in tests.
pub struct NdjsonTransport<W: Write = io::Stdout> {
	out: W,
}

impl Default for NdjsonTransport {
	fn default() -> Self {
		Self::new()
	}
}

impl NdjsonTransport {
	pub fn new() -> Self {
		Self { out: io::stdout() }
	}
}

impl<W: Write> NdjsonTransport<W> {
	pub fn with_writer(out: W) -> Self {
		Self { out }
	}

	pub fn into_inner(self) -> W {
		self.out
	}

	pub fn write_response(&mut self, id: u64, result: serde_json::Value) {
		self.write_line(&JsonRpcResponse {
			jsonrpc: "2.0",
			id,
			result: Some(result),
			error: None,
		});
	}

	pub fn write_error(
		&mut self,
		id: u64,
		code: i32,
		message: impl Into<String>,
		data: Option<serde_json::Value>,
	) {
		self.write_line(&JsonRpcResponse {
			jsonrpc: "2.0",
			id,
			result: None,
			error: Some(JsonRpcErrorBody {
				code,
				message: message.into(),
				data,
			}),
		});
	}

	fn write_line(&mut self, value: &impl Serialize) {
		if let Err(e) = serde_json::to_writer(&mut self.out, value) {
			tracing::error!("Failed to serialize response: {}", e);
			return;
		}
		let _ = writeln!(self.out);
		let _ = self.out.flush();
	}
}
