pub mod error;
pub mod json;
pub mod llm;
pub mod prompt;
pub mod rules;
pub mod schema;

pub use error::PreprocessError;
pub use llm::{CompletionClient, GeminiClient};
pub use rules::{AirportCodes, RuleSet, TransportMode, TransportRules};
pub use schema::{DateInfo, QueryType, StructuredResult, TravelInfo};

use chrono::{Local, NaiveDate};
use serde_json::Value;

/// Turns free-text travel queries into [`StructuredResult`]s.
pub struct QueryPreprocessor<C = GeminiClient> {
    llm_client: C,
    rules: RuleSet,
    reference_date: Option<NaiveDate>,
}

impl<C: CompletionClient> QueryPreprocessor<C> {
    pub fn new(llm_client: C) -> Self {
        Self {
            llm_client,
            rules: RuleSet::default(),
            reference_date: None,
        }
    }

    /// Pin the date relative expressions ("this weekend") are resolved against.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Swap in different lookup tables, e.g. an airport table with more cities.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn client(&self) -> &C {
        &self.llm_client
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    /// Structure a query, surfacing failures as typed errors.
    ///
    /// `context` is accepted for callers that carry conversation state but
    /// is not sent to the model.
    pub async fn try_preprocess(
        &self,
        query: &str,
        _context: Option<&Value>,
    ) -> Result<StructuredResult, PreprocessError> {
        tracing::info!(query, "Preprocessing query");

        // Step 1: Build prompt
        let system_prompt = prompt::build_system_prompt(self.reference_date());

        // Step 2: Ask the model
        let response = self.llm_client.complete(&system_prompt, query).await?;

        // Step 3: Pull the JSON object out of the reply
        let object = json::extract_json_object(&response)
            .ok_or(PreprocessError::Extraction { response })?;

        let mut result = StructuredResult::from_object(object);

        tracing::debug!(structured = ?result, "Structured data");

        // Step 4: Post-processing
        result.original_query = query.to_string();
        self.rules.apply(query, &mut result);

        Ok(result)
    }

    /// Structure a query, never failing.
    ///
    /// Errors are logged and folded into a `general` result that carries the
    /// error message.
    pub async fn preprocess(&self, query: &str, context: Option<&Value>) -> StructuredResult {
        match self.try_preprocess(query, context).await {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    PreprocessError::Extraction { response } => {
                        tracing::error!(query, response = %response, "Failed to extract JSON from model response")
                    }
                    other => {
                        tracing::error!(query, kind = other.kind(), error = ?other, "Error preprocessing query")
                    }
                }
                self.degrade(query, &e)
            }
        }
    }

    /// The best-effort record for a failed call.
    ///
    /// When the model did answer but without usable JSON, the query rules
    /// still run, so a comparison question keeps its type and modes.
    pub fn degrade(&self, query: &str, error: &PreprocessError) -> StructuredResult {
        let mut result = StructuredResult::degraded(query, error.to_string());

        if let PreprocessError::Extraction { .. } = error {
            self.rules.apply(query, &mut result);
        }

        result
    }

    /// Origin, destination and start date of a query.
    pub async fn extract_travel_info(&self, query: &str) -> TravelInfo {
        let structured = self.preprocess(query, None).await;
        TravelInfo::from(&structured)
    }

    /// The search-ready rewrite of a query, or the query itself when the model
    /// did not produce one.
    pub async fn get_optimized_query(&self, query: &str, tool_name: &str) -> String {
        tracing::debug!(tool = tool_name, "Optimizing query");

        let structured = self.preprocess(query, None).await;
        structured.optimized_query().to_string()
    }
}
