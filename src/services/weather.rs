//! Current conditions via the OpenWeatherMap API.

use serde::Deserialize;
use tracing::instrument;

use super::fetch_json;
use crate::error::UpstreamError;

const PROVIDER: &str = "Weather";

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainReadings,
    weather: Vec<Condition>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

/// Client for the weather provider.
#[derive(Clone)]
pub struct WeatherService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch current conditions for `location` as one spoken sentence.
    #[instrument(skip(self))]
    pub async fn current(&self, location: &str) -> Result<String, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::NotConfigured(PROVIDER))?;

        let request = self.client.get(&self.base_url).query(&[
            ("q", location),
            ("appid", api_key),
            ("units", "metric"),
        ]);

        let report: CurrentWeather = fetch_json(PROVIDER, request).await?;
        let condition = report
            .weather
            .first()
            .map(|c| c.description.as_str())
            .ok_or_else(|| UpstreamError::Decode {
                provider: PROVIDER,
                detail: "response has no weather conditions".to_string(),
            })?;

        Ok(format_weather(&report.name, condition, report.main.temp))
    }
}

/// Format a weather report. Temperature is in degrees Celsius.
pub fn format_weather(city: &str, condition: &str, temperature: f64) -> String {
    format!(
        "The current weather in {city} is {condition} with a temperature of {temperature} degrees Celsius."
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_weather() {
        assert_eq!(
            format_weather("London", "light rain", 12.5),
            "The current weather in London is light rain with a temperature of 12.5 degrees Celsius."
        );
    }

    #[test]
    fn test_whole_temperatures_have_no_fraction() {
        assert!(format_weather("Oslo", "clear sky", -3.0).contains("of -3 degrees"));
    }

    #[test]
    fn test_provider_payload_deserializes() {
        let json = r#"{
            "coord": {"lon": -0.13, "lat": 51.51},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
            "main": {"temp": 12.5, "feels_like": 11.9, "humidity": 81},
            "name": "London",
            "cod": 200
        }"#;
        let report: CurrentWeather = serde_json::from_str(json).unwrap();
        assert_eq!(report.name, "London");
        assert_eq!(report.weather[0].description, "light rain");
        assert!((report.main.temp - 12.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_any_request() {
        let service = WeatherService::new(reqwest::Client::new(), "http://127.0.0.1:9", None);
        assert!(!service.is_configured());

        let err = service.current("London").await.unwrap_err();
        assert_eq!(err.to_string(), "Weather API key not configured");
    }
}
