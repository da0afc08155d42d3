use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Flight,
    Poi,
    Directions,
    Recommendations,
    TransportComparison,
    #[default]
    #[serde(other)]
    General,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Flight => "flight",
            QueryType::Poi => "poi",
            QueryType::Directions => "directions",
            QueryType::Recommendations => "recommendations",
            QueryType::TransportComparison => "transport_comparison",
            QueryType::General => "general",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DateInfo {
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        Self {
            start_date: take_typed(&mut object, "start_date"),
            end_date: take_typed(&mut object, "end_date"),
            duration: take_typed(&mut object, "duration"),
            extra: object,
        }
    }
}

impl<'de> Deserialize<'de> for DateInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_object)
    }
}

/// Structured form of a travel query.
///
/// Only the keys the model actually sent are written back out. Keys beyond
/// the known ones, and known keys whose value has an unexpected type, are
/// kept in `extra` exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredResult {
    pub query_type: QueryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_info: Option<DateInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_modes: Option<Vec<String>>,

    // Filled in after the model answers
    pub original_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StructuredResult {
    /// Read a model reply object. Never fails: a field that does not fit its
    /// type stays in `extra` under its own key.
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        // An unusable query_type cannot go to `extra` without clashing with
        // the typed key on output, so it falls back to `general`.
        let query_type = object
            .remove("query_type")
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        Self {
            query_type,
            origin: take_typed(&mut object, "origin"),
            destination: take_typed(&mut object, "destination"),
            date_info: take_typed(&mut object, "date_info"),
            preferences: take_typed(&mut object, "preferences"),
            structured_query: take_typed(&mut object, "structured_query"),
            transport_modes: take_typed(&mut object, "transport_modes"),
            original_query: take_typed(&mut object, "original_query").unwrap_or_default(),
            origin_code: take_typed(&mut object, "origin_code"),
            destination_code: take_typed(&mut object, "destination_code"),
            error: take_typed(&mut object, "error"),
            extra: object,
        }
    }

    /// The record handed back when a call fails and the caller asked for a
    /// best-effort answer.
    pub fn degraded(query: &str, error: impl Into<String>) -> Self {
        Self {
            query_type: QueryType::General,
            original_query: query.to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// The search-ready rewrite, or the original query when there is none.
    pub fn optimized_query(&self) -> &str {
        self.structured_query.as_deref().unwrap_or(&self.original_query)
    }
}

impl<'de> Deserialize<'de> for StructuredResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_object)
    }
}

/// Origin, destination and start date pulled out of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelInfo {
    pub origin: String,
    pub destination: String,
    pub date: String,
}

impl From<&StructuredResult> for TravelInfo {
    fn from(result: &StructuredResult) -> Self {
        Self {
            origin: result.origin.clone().unwrap_or_default(),
            destination: result.destination.clone().unwrap_or_default(),
            date: result
                .date_info
                .as_ref()
                .and_then(|d| d.start_date.clone())
                .unwrap_or_default(),
        }
    }
}

// Models are loose about types ("duration": 2, "origin": null). Such values
// go back into the map untouched.
fn take_typed<T: DeserializeOwned>(object: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = object.remove(key)?;

    match serde_json::from_value(value.clone()) {
        Ok(typed) => Some(typed),
        Err(_) => {
            object.insert(key.to_string(), value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_full_record() {
        let value = json!({
            "query_type": "flight",
            "origin": "New York",
            "destination": "Paris",
            "date_info": {"start_date": "2025-05-10", "end_date": "2025-05-11", "duration": "2"},
            "preferences": ["nonstop"],
            "structured_query": "flights from New York to Paris departing May 10, 2025"
        });

        let result: StructuredResult = serde_json::from_value(value).unwrap();
        assert_eq!(result.query_type, QueryType::Flight);
        assert_eq!(result.origin.as_deref(), Some("New York"));
        assert_eq!(
            result.date_info.unwrap().start_date.as_deref(),
            Some("2025-05-10")
        );
        assert_eq!(result.preferences, Some(vec!["nonstop".to_string()]));
        assert!(result.transport_modes.is_none());
        assert!(result.extra.is_empty());
    }

    #[test]
    fn test_query_type_names() {
        let parse = |name: &str| serde_json::from_value::<QueryType>(json!(name)).unwrap();

        assert_eq!(parse("transport_comparison"), QueryType::TransportComparison);
        assert_eq!(parse("recommendations"), QueryType::Recommendations);
        assert_eq!(parse("sightseeing"), QueryType::General);
        assert_eq!(
            serde_json::to_value(QueryType::TransportComparison).unwrap(),
            json!("transport_comparison")
        );
        assert_eq!(QueryType::TransportComparison.as_str(), "transport_comparison");
    }

    #[test]
    fn test_sparse_reply_adds_no_keys() {
        let value = json!({"query_type": "poi", "destination": "Yosemite"});

        let result = StructuredResult::from_object(value.as_object().unwrap().clone());
        let back = serde_json::to_value(&result).unwrap();

        assert_eq!(back, json!({"query_type": "poi", "destination": "Yosemite", "original_query": ""}));
    }

    #[test]
    fn test_mistyped_values_are_kept_verbatim() {
        let value = json!({
            "query_type": "sightseeing",
            "origin": null,
            "destination": "Fresno",
            "date_info": {"start_date": "2025-05-03", "duration": 3, "flexible": true},
            "preferences": "window seat"
        });

        let result = StructuredResult::from_object(value.as_object().unwrap().clone());
        assert_eq!(result.query_type, QueryType::General);
        assert!(result.origin.is_none());
        assert_eq!(result.destination.as_deref(), Some("Fresno"));
        assert!(result.preferences.is_none());

        let date_info = result.date_info.as_ref().unwrap();
        assert_eq!(date_info.start_date.as_deref(), Some("2025-05-03"));
        assert!(date_info.duration.is_none());

        let back = serde_json::to_value(&result).unwrap();
        assert_eq!(back["origin"], Value::Null);
        assert_eq!(back["preferences"], "window seat");
        assert_eq!(
            back["date_info"],
            json!({"start_date": "2025-05-03", "duration": 3, "flexible": true})
        );
    }

    #[test]
    fn test_unknown_keys_survive_serialization() {
        let value = json!({
            "query_type": "poi",
            "destination": "Yosemite",
            "budget": "low"
        });

        let result: StructuredResult = serde_json::from_value(value).unwrap();
        assert_eq!(result.extra.get("budget"), Some(&json!("low")));

        let back = serde_json::to_value(&result).unwrap();
        assert_eq!(back["budget"], "low");
        assert_eq!(back["query_type"], "poi");
        assert!(back.get("origin_code").is_none());
        assert!(back.get("error").is_none());
    }

    #[test]
    fn test_degraded_shape() {
        let result = StructuredResult::degraded("weekend in Fresno", "boom");
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(
            value,
            json!({"query_type": "general", "original_query": "weekend in Fresno", "error": "boom"})
        );
        assert!(result.is_degraded());
        assert_eq!(result.optimized_query(), "weekend in Fresno");
    }

    #[test]
    fn test_travel_info_projection() {
        let result = StructuredResult {
            origin: Some("San Francisco".into()),
            destination: Some("Fresno".into()),
            date_info: Some(DateInfo {
                start_date: Some("2025-05-03".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let info = TravelInfo::from(&result);
        assert_eq!(info.origin, "San Francisco");
        assert_eq!(info.destination, "Fresno");
        assert_eq!(info.date, "2025-05-03");

        assert_eq!(TravelInfo::from(&StructuredResult::default()), TravelInfo::default());
    }
}
