use crate::{
	config::{Config, MAX_RETRIES, RETRY_DELAY, TIMEOUT},
	error::{Error, Result},
	field::{describe, FieldDescriptor},
	mapping::{parse_column_mapping, ColumnMapping},
};

const MAX_SAMPLE_ROWS: usize = 10;

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
	role: &'a str,
	content: String,
}

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
	model: &'a str,
	messages: Vec<ChatMessage<'a>>,
	temperature: f32,
	max_tokens: u32,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
	message: ChatMessageContent,
}

#[derive(serde::Deserialize)]
struct ChatMessageContent {
	content: String,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
	choices: Vec<ChatChoice>,
}

/// Client for the single capability this crate provides: turning a sheet's
/// sample rows and a project's field list into a Column-Mapping Artifact.
pub struct Client {
	http: reqwest::Client,
	config: Config,
}

impl Client {
	pub fn new(config: Config) -> Self {
		let http = reqwest::Client::builder()
			.timeout(TIMEOUT)
			.build()
			.expect("reqwest client builds with static config");

		Self { http, config }
	}

	/// First 10 rows + active field list -> Column-Mapping Artifact, via one
	/// HTTP request with bounded retry and backoff.
	#[tracing::instrument(level = "debug", skip(self, sample_rows, fields))]
	pub async fn analyze_column_mapping(
		&self,
		sample_rows: &[Vec<String>],
		fields: &[FieldDescriptor],
	) -> Result<ColumnMapping> {
		let prompt = build_prompt(sample_rows, fields);
		let response = self.call_with_retry(&prompt).await?;
		parse_column_mapping(&response)
	}

	pub(crate) async fn call_with_retry(&self, prompt: &str) -> Result<String> {
		let mut last_error = None;

		for attempt in 1..=MAX_RETRIES {
			match self.call_api(prompt).await {
				Ok(response) => return Ok(response),
				Err(error) => {
					tracing::warn!(attempt, reason = %error, "language model call failed");
					last_error = Some(error);
					if attempt < MAX_RETRIES {
						tokio::time::sleep(RETRY_DELAY).await;
					}
				}
			}
		}

		Err(last_error.unwrap_or(Error::Timeout(MAX_RETRIES)))
	}

	async fn call_api(&self, prompt: &str) -> Result<String> {
		let request = ChatRequest {
			model: &self.config.model_name,
			messages: vec![
				ChatMessage {
					role: "system",
					content: "You are a data-processing expert. Reply strictly in the requested format.".to_string(),
				},
				ChatMessage {
					role: "user",
					content: prompt.to_string(),
				},
			],
			temperature: self.config.temperature,
			max_tokens: self.config.max_tokens,
		};

		let response = self
			.http
			.post(&self.config.api_url)
			.bearer_auth(&self.config.api_key)
			.json(&request)
			.send()
			.await?
			.error_for_status()?
			.json::<ChatResponse>()
			.await?;

		let content = response
			.choices
			.into_iter()
			.next()
			.ok_or_else(|| Error::MalformedResponse("no choices in response".to_string()))?
			.message
			.content;

		Ok(content.trim().to_string())
	}
}

fn build_prompt(sample_rows: &[Vec<String>], fields: &[FieldDescriptor]) -> String {
	let rows_text = sample_rows
		.iter()
		.take(MAX_SAMPLE_ROWS)
		.enumerate()
		.map(|(index, row)| {
			let row_str = row
				.iter()
				.filter(|cell| !cell.is_empty())
				.cloned()
				.collect::<Vec<_>>()
				.join(" | ");
			let row_str = if row_str.is_empty() {
				"(empty row)".to_string()
			} else {
				row_str
			};
			format!("[row {}] {row_str}", index + 1)
		})
		.collect::<Vec<_>>()
		.join("\n");

	let field_descriptions = fields.iter().map(describe).collect::<Vec<_>>().join("\n");

	format!(
		"You are a spreadsheet analysis expert. Here are the first {} rows of an Excel sheet:\n\n\
		{rows_text}\n\n\
		Target fields to extract:\n{field_descriptions}\n\n\
		Analyze:\n\
		1. Which row is the header? (1-{}, or 0 if there is none)\n\
		2. Which field does each column correspond to? (return column index -> field name)\n\n\
		Notes:\n\
		- Column indices start at 0\n\
		- Only map columns you can confidently identify\n\
		- Put any column that matches no field into unmatched_columns\n\
		- confidence expresses overall mapping confidence, 0-1\n\n\
		Respond in JSON:\n\
		{{\n  \"header_row\": 1,\n  \"column_mappings\": {{\"0\": \"name\", \"2\": \"phone\"}},\n  \
		\"confidence\": 0.95,\n  \"unmatched_columns\": [1]\n}}\n\n\
		Return only the JSON, nothing else.",
		sample_rows.len().min(MAX_SAMPLE_ROWS),
		MAX_SAMPLE_ROWS,
	)
}
