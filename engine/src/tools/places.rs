//! Google Places adapter
//!
//! Text Search supplies the candidate list; Place Details supplies reviews,
//! opening hours and the canonical map link for one candidate.

use async_trait::async_trait;
use reqwest::Client;
use sdk::collaborators::{PlaceDetailsLookup, PlaceSearch};
use sdk::errors::EngineError;
use sdk::types::{Candidate, OpeningHours, PlaceDetails};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::PlacesConfig;
use crate::secrets::{scrub, SecretString};

const TEXT_SEARCH_PATH: &str = "/maps/api/place/textsearch/json";
const DETAILS_PATH: &str = "/maps/api/place/details/json";
const DETAIL_FIELDS: &str = "name,review,opening_hours,url";

#[derive(Debug, Clone)]
pub struct GooglePlacesTool {
    base_url: String,
    language: String,
    place_type: String,
    max_candidates: usize,
    max_reviews: usize,
    api_key: SecretString,
    client: Client,
}

impl GooglePlacesTool {
    pub fn new(config: &PlacesConfig, api_key: SecretString) -> Result<Self, EngineError> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            place_type: config.place_type.clone(),
            max_candidates: config.max_candidates,
            max_reviews: config.max_reviews,
            api_key,
            client: super::build_client(config.timeout_secs)?,
        })
    }

    /// GET a Places endpoint and decode its JSON body.
    ///
    /// `wrap` picks the error variant for the calling operation.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        wrap: fn(String) -> EngineError,
    ) -> Result<T, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        let start = std::time::Instant::now();

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.unsecure())])
            .send()
            .await
            .map_err(|e| wrap(scrub(&e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(wrap(format!("HTTP {}: {}", status, scrub(&body))));
        }

        let decoded = response
            .json::<T>()
            .await
            .map_err(|e| wrap(format!("Malformed response: {}", scrub(&e.to_string()))))?;

        debug!("{} answered in {:?}", path, start.elapsed());
        Ok(decoded)
    }
}

/// Places API status other than OK / ZERO_RESULTS is a failure
fn check_status(
    status: &str,
    error_message: Option<&str>,
    wrap: fn(String) -> EngineError,
) -> Result<(), EngineError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(wrap(match error_message {
            Some(message) => format!("{}: {}", other, scrub(message)),
            None => other.to_string(),
        })),
    }
}

#[async_trait]
impl PlaceSearch for GooglePlacesTool {
    async fn search_places(&self, query: &str) -> Result<Vec<Candidate>, EngineError> {
        let body: TextSearchResponse = self
            .get_json(
                TEXT_SEARCH_PATH,
                &[
                    ("query", query),
                    ("language", self.language.as_str()),
                    ("type", self.place_type.as_str()),
                ],
                EngineError::PlaceSearch,
            )
            .await?;

        check_status(
            &body.status,
            body.error_message.as_deref(),
            EngineError::PlaceSearch,
        )?;

        let candidates: Vec<Candidate> = body
            .results
            .into_iter()
            .take(self.max_candidates)
            .map(|r| Candidate::new(r.place_id, r.name, r.rating, r.formatted_address))
            .collect();

        info!("Place search '{}' returned {} candidates", query, candidates.len());
        Ok(candidates)
    }
}

#[async_trait]
impl PlaceDetailsLookup for GooglePlacesTool {
    async fn get_place_details(&self, id: &str) -> Result<PlaceDetails, EngineError> {
        let body: DetailsResponse = self
            .get_json(
                DETAILS_PATH,
                &[
                    ("place_id", id),
                    ("fields", DETAIL_FIELDS),
                    ("language", self.language.as_str()),
                ],
                EngineError::PlaceDetails,
            )
            .await?;

        check_status(
            &body.status,
            body.error_message.as_deref(),
            EngineError::PlaceDetails,
        )?;

        let result = body.result.unwrap_or_default();

        Ok(PlaceDetails {
            name: result.name,
            reviews: result
                .reviews
                .into_iter()
                .map(|r| r.text)
                .take(self.max_reviews)
                .collect(),
            opening_hours: result
                .opening_hours
                .map(|h| OpeningHours::from_lines(h.weekday_text))
                .unwrap_or_default(),
            map_url: result.url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<TextSearchResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextSearchResult {
    place_id: String,
    name: String,
    rating: Option<f64>,
    #[serde(default)]
    formatted_address: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<DetailsResult>,
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailsResult {
    name: Option<String>,
    #[serde(default)]
    reviews: Vec<Review>,
    opening_hours: Option<WeekdayHours>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Review {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WeekdayHours {
    #[serde(default)]
    weekday_text: Vec<String>,
}
