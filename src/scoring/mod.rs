//! Client for a remote scoring endpoint.
//!
//! Posts `{"data": [[...], ...]}` and pairs each input vector with the
//! prediction returned for it. Endpoints differ in how they wrap the
//! prediction list, so the expected shape is chosen up front with
//! [`ResponseFormat`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::http_client;

/// Feature vectors sent when none are supplied.
pub const DEFAULT_DATA: &str = "[[0.1,2.3,4.1,2.0],[0.2,1.8,3.9,2.1]]";

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid scoring url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid response format {0:?} (expected \"string\" or \"object\")")]
    InvalidFormat(String),
    #[error("invalid input data: {0}")]
    InvalidData(String),
    #[error("scoring endpoint returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("malformed scoring response: {0}")]
    Malformed(String),
    #[error("scoring response has {predictions} predictions for {inputs} inputs")]
    CountMismatch { inputs: usize, predictions: usize },
}

/// Shape of a successful scoring response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// A JSON string whose content is a JSON list: `"[0, 1]"`.
    #[default]
    StringEncodedPredictions,
    /// An object holding the list under `predict`: `{"predict": [0, 1]}`.
    ObjectWithPredictKey,
}

impl FromStr for ResponseFormat {
    type Err = ScoringError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(Self::StringEncodedPredictions),
            "object" => Ok(Self::ObjectWithPredictKey),
            _ => Err(ScoringError::InvalidFormat(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringRequest {
    pub data: Vec<Vec<f64>>,
}

impl ScoringRequest {
    /// Parse a JSON list of feature vectors such as [`DEFAULT_DATA`].
    pub fn from_json(text: &str) -> Result<Self, ScoringError> {
        let data: Vec<Vec<f64>> =
            serde_json::from_str(text).map_err(|err| ScoringError::InvalidData(err.to_string()))?;
        if data.is_empty() {
            return Err(ScoringError::InvalidData("no feature vectors".to_string()));
        }
        Ok(Self { data })
    }
}

/// A single prediction as returned by the endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    Index(i64),
    Number(f64),
    Label(String),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(value) => write!(f, "{value}"),
            Self::Number(value) => f.write_str(&format_float(*value)),
            Self::Label(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictObject {
    predict: Vec<Prediction>,
}

/// Posts feature vectors to one scoring endpoint.
#[derive(Debug, Clone)]
pub struct ScoringClient {
    url: Url,
    primary_key: Option<String>,
    format: ResponseFormat,
}

impl ScoringClient {
    /// A key that is empty or only whitespace is treated as absent; any other
    /// key is sent exactly as given.
    pub fn new(
        url: &str,
        primary_key: Option<String>,
        format: ResponseFormat,
    ) -> Result<Self, ScoringError> {
        let parsed = Url::parse(url).map_err(|err| ScoringError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScoringError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        let primary_key = primary_key.filter(|key| !key.trim().is_empty());
        Ok(Self {
            url: parsed,
            primary_key,
            format,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send one request and return predictions in input order.
    pub fn score(&self, request: &ScoringRequest) -> Result<Vec<Prediction>, ScoringError> {
        let mut req = http_client::agent()
            .post(self.url.as_str())
            .set("Content-Type", "application/json");
        if let Some(key) = &self.primary_key {
            req = req.set("Authorization", &format!("Bearer {key}"));
        }
        tracing::info!(url = %self.url, inputs = request.data.len(), "posting scoring request");

        let response = match req.send_json(request) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body =
                    http_client::read_response_bytes(response, http_client::MAX_RESPONSE_BYTES)
                        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_else(|err| err.to_string());
                return Err(ScoringError::Status { code, body });
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(ScoringError::Transport(err.to_string()));
            }
        };
        let body = http_client::read_response_bytes(response, http_client::MAX_RESPONSE_BYTES)
            .map_err(|err| ScoringError::Transport(err.to_string()))?;
        let predictions = parse_predictions(&body, self.format)?;
        if predictions.len() != request.data.len() {
            return Err(ScoringError::CountMismatch {
                inputs: request.data.len(),
                predictions: predictions.len(),
            });
        }
        Ok(predictions)
    }
}

/// Decode a response body according to `format`.
pub fn parse_predictions(
    body: &[u8],
    format: ResponseFormat,
) -> Result<Vec<Prediction>, ScoringError> {
    let malformed = |err: serde_json::Error| ScoringError::Malformed(err.to_string());
    match format {
        ResponseFormat::StringEncodedPredictions => {
            let inner: String = serde_json::from_slice(body).map_err(malformed)?;
            serde_json::from_str(&inner).map_err(malformed)
        }
        ResponseFormat::ObjectWithPredictKey => {
            let object: PredictObject = serde_json::from_slice(body).map_err(malformed)?;
            Ok(object.predict)
        }
    }
}

/// One `<input vector> <prediction>` line per input, in input order.
pub fn format_prediction_lines(inputs: &[Vec<f64>], predictions: &[Prediction]) -> Vec<String> {
    inputs
        .iter()
        .zip(predictions)
        .map(|(input, prediction)| format!("{} {prediction}", format_vector(input)))
        .collect()
}

fn format_vector(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|value| format_float(*value)).collect();
    format!("[{}]", parts.join(", "))
}

/// Whole numbers keep one decimal place (`2.0`), others use the shortest
/// round-trip form.
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_encoded_list() {
        let predictions =
            parse_predictions(br#""[1, 2]""#, ResponseFormat::StringEncodedPredictions).unwrap();
        assert_eq!(predictions, vec![Prediction::Index(1), Prediction::Index(2)]);
    }

    #[test]
    fn parses_predict_object_with_labels() {
        let predictions = parse_predictions(
            br#"{"predict": ["Iris-setosa", 2]}"#,
            ResponseFormat::ObjectWithPredictKey,
        )
        .unwrap();
        assert_eq!(
            predictions,
            vec![Prediction::Label("Iris-setosa".into()), Prediction::Index(2)]
        );
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let err =
            parse_predictions(br#"{"predict": [1]}"#, ResponseFormat::StringEncodedPredictions)
                .unwrap_err();
        assert!(matches!(err, ScoringError::Malformed(_)));
        let err = parse_predictions(br#""[1]""#, ResponseFormat::ObjectWithPredictKey).unwrap_err();
        assert!(matches!(err, ScoringError::Malformed(_)));
    }

    #[test]
    fn lines_pair_inputs_with_predictions() {
        let request = ScoringRequest::from_json(DEFAULT_DATA).unwrap();
        let lines = format_prediction_lines(
            &request.data,
            &[Prediction::Index(1), Prediction::Number(2.0)],
        );
        assert_eq!(
            lines,
            vec![
                "[0.1, 2.3, 4.1, 2.0] 1".to_string(),
                "[0.2, 1.8, 3.9, 2.1] 2.0".to_string(),
            ]
        );
    }

    #[test]
    fn response_format_names() {
        assert_eq!(
            "string".parse::<ResponseFormat>().unwrap(),
            ResponseFormat::StringEncodedPredictions
        );
        assert_eq!(
            "Object".parse::<ResponseFormat>().unwrap(),
            ResponseFormat::ObjectWithPredictKey
        );
        assert!("xml".parse::<ResponseFormat>().is_err());
    }

    #[test]
    fn rejects_non_http_urls_and_blank_keys() {
        assert!(matches!(
            ScoringClient::new("ftp://host/score", None, ResponseFormat::default()),
            Err(ScoringError::InvalidUrl { .. })
        ));
        assert!(matches!(
            ScoringClient::new("not a url", None, ResponseFormat::default()),
            Err(ScoringError::InvalidUrl { .. })
        ));
        let client = ScoringClient::new(
            "http://127.0.0.1:1/score",
            Some("   ".into()),
            ResponseFormat::default(),
        )
        .unwrap();
        assert!(client.primary_key.is_none());
    }

    #[test]
    fn keys_keep_surrounding_whitespace() {
        let client = ScoringClient::new(
            "http://127.0.0.1:1/score",
            Some(" padded-key\t".into()),
            ResponseFormat::default(),
        )
        .unwrap();
        assert_eq!(client.primary_key.as_deref(), Some(" padded-key\t"));
    }

    #[test]
    fn request_data_must_be_non_empty_list() {
        assert!(ScoringRequest::from_json("[]").is_err());
        assert!(ScoringRequest::from_json("{\"data\": 1}").is_err());
    }
}
