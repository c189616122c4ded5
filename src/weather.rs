//! Weather providers: a fixed one for tests and an HTTP client.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::model::Location;
use crate::traits::{Weather, WeatherProvider};

/// Always reports the same conditions.
#[derive(Debug, Clone, Default)]
pub struct FixedWeather(pub Weather);

impl FixedWeather {
    pub fn new(conditions: &str, temperature: f64) -> Self {
        Self(Weather {
            conditions: conditions.to_string(),
            temperature,
            ..Weather::default()
        })
    }
}

impl WeatherProvider for FixedWeather {
    fn weather_at(&self, _location: &Location, _time: NaiveDateTime) -> Result<Weather, ProviderError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct WeatherClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for WeatherClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_secs: 5,
        }
    }
}

/// Blocking HTTP weather client.
///
/// Issues `GET {base_url}/weather?lat=..&lon=..&time=..` and expects a JSON
/// body with `conditions`, `temperature`, `windSpeed` and `precipitation`.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    config: WeatherClientConfig,
    client: reqwest::blocking::Client,
}

impl WeatherClient {
    pub fn new(config: WeatherClientConfig) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl WeatherProvider for WeatherClient {
    fn weather_at(&self, location: &Location, time: NaiveDateTime) -> Result<Weather, ProviderError> {
        let url = format!("{}/weather", self.config.base_url.trim_end_matches('/'));
        let mut query = vec![
            ("lat", format!("{:.6}", location.latitude)),
            ("lon", format!("{:.6}", location.longitude)),
            ("time", time.format("%Y-%m-%dT%H:%M:%S").to_string()),
        ];
        if let Some(key) = &self.config.api_key {
            query.push(("key", key.clone()));
        }

        let body = self
            .client
            .get(url)
            .query(&query)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<WeatherResponse>())?;

        body.into_weather()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeatherResponse {
    conditions: Option<String>,
    temperature: Option<f64>,
    wind_speed: Option<f64>,
    precipitation: Option<f64>,
}

impl WeatherResponse {
    fn into_weather(self) -> Result<Weather, ProviderError> {
        let (Some(conditions), Some(temperature)) = (self.conditions, self.temperature) else {
            return Err(ProviderError::Malformed(
                "weather response lacks conditions or temperature".into(),
            ));
        };
        Ok(Weather {
            conditions,
            temperature,
            wind_speed: self.wind_speed.unwrap_or_default(),
            precipitation: self.precipitation.unwrap_or_default(),
        })
    }
}
