use super::types::*;
use crate::config::Config;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenWeatherError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("API error: HTTP {status}")]
    Status {
        status: reqwest::StatusCode,
        /// Error body, when the provider sent JSON.
        payload: Option<Value>,
    },
}

pub struct OpenWeatherClient {
    client: Client,
    config: Config,
}

impl OpenWeatherClient {
    pub fn new(config: Config) -> Result<Self, OpenWeatherError> {
        let client = Client::builder()
            .user_agent("WeatherDashboard/1.0")
            .timeout(config.fetch_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Raw current-weather payload for `location`. Non-2xx answers are errors
    /// that still carry the provider's JSON body.
    pub async fn get_current(&self, location: Location<'_>) -> Result<Value, OpenWeatherError> {
        let url = format!(
            "{}{}",
            self.config.openweather_base_url, self.config.openweather_weather_path
        );

        let mut params: Vec<(&str, String)> = match location {
            Location::City { name, country } => vec![("q", format!("{},{}", name, country))],
            Location::Coords { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        };
        params.push(("appid", self.config.openweather_api_key.clone()));
        params.push(("units", "metric".to_string()));
        params.push(("lang", self.config.weather_lang.clone()));

        let response = self.client.get(&url).query(&params).send().await?;

        match response.status() {
            status if status.is_success() => {
                let json: Value = response.json().await?;
                Ok(json)
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                tracing::warn!("OpenWeather answered HTTP {}: {}", status, error_text);
                Err(OpenWeatherError::Status {
                    status,
                    payload: serde_json::from_str(&error_text).ok(),
                })
            }
        }
    }
}

/// Extract the dashboard fields from a current-weather payload.
pub fn format_reading(payload: &Value) -> Result<WeatherReading, OpenWeatherError> {
    let current = CurrentWeatherResponse::deserialize(payload)?;
    let description = current
        .weather
        .into_iter()
        .next()
        .map(|w| w.description)
        .ok_or_else(|| OpenWeatherError::ApiError("payload has no weather conditions".into()))?;

    Ok(WeatherReading {
        city: current.name,
        temp: Some(current.main.temp),
        feels_like: Some(current.main.feels_like),
        description,
        humidity: Some(current.main.humidity.round() as i64),
        updated_at: clock_now(),
    })
}

/// City to report when a payload could not be formatted: the payload's own
/// name if the provider sent anything, the configured city otherwise.
pub fn fallback_city(payload: Option<&Value>, default_city: &str) -> Option<String> {
    match payload {
        Some(Value::Object(map)) if !map.is_empty() => {
            map.get("name").and_then(Value::as_str).map(str::to_string)
        }
        _ => Some(default_city.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn valid_payload() -> Value {
        json!({
            "main": {"temp": 25.0, "feels_like": 26.0, "humidity": 80},
            "weather": [{"description": "cloudy"}],
            "name": "TestCity"
        })
    }

    #[test]
    fn test_format_valid_payload() {
        let reading = format_reading(&valid_payload()).unwrap();
        assert_eq!(reading.city.as_deref(), Some("TestCity"));
        assert_eq!(reading.temp, Some(25.0));
        assert_eq!(reading.feels_like, Some(26.0));
        assert_eq!(reading.humidity, Some(80));
        assert_eq!(reading.description, "cloudy");
        assert!(chrono::NaiveTime::parse_from_str(&reading.updated_at, "%H:%M:%S").is_ok());
    }

    #[test]
    fn test_format_rejects_malformed_payloads() {
        let cases = vec![
            json!({}),
            json!({"name": "X"}),
            json!({"main": {"temp": 25.0, "humidity": 80}, "weather": [{"description": "x"}]}),
            json!({"main": {"temp": 25.0, "feels_like": 26.0, "humidity": 80}, "weather": []}),
            json!({"main": {"temp": "hot", "feels_like": 26.0, "humidity": 80}, "weather": [{"description": "x"}]}),
            json!({"cod": 401, "message": "Invalid API key"}),
            json!([1, 2, 3]),
            Value::Null,
        ];

        for payload in cases {
            assert!(format_reading(&payload).is_err(), "expected error for {}", payload);
        }
    }

    #[test]
    fn test_fallback_city() {
        assert_eq!(fallback_city(None, "Pontianak").as_deref(), Some("Pontianak"));
        assert_eq!(fallback_city(Some(&json!({})), "Pontianak").as_deref(), Some("Pontianak"));
        assert_eq!(
            fallback_city(Some(&json!({"name": "Elsewhere", "main": {}})), "Pontianak").as_deref(),
            Some("Elsewhere")
        );
        assert_eq!(fallback_city(Some(&json!({"cod": "404"})), "Pontianak"), None);
    }

    #[test]
    fn test_fallback_reading_shape() {
        let reading = WeatherReading::fallback(Some("Pontianak".to_string()));
        assert!(reading.is_fallback());
        assert_eq!(reading.feels_like, None);
        assert_eq!(reading.humidity, None);
        assert_eq!(reading.description, FALLBACK_DESCRIPTION);
        assert!(!reading.updated_at.is_empty());
    }

    #[tokio::test]
    async fn test_city_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Pontianak,ID"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(valid_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(test_config(&server.uri())).unwrap();
        let payload = client
            .get_current(Location::City { name: "Pontianak", country: "ID" })
            .await
            .unwrap();
        assert_eq!(payload["name"], "TestCity");
    }

    #[tokio::test]
    async fn test_coordinate_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "-0.03"))
            .and(query_param("lon", "109.33"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(valid_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(test_config(&server.uri())).unwrap();
        let result = client
            .get_current(Location::Coords { lat: -0.03, lon: 109.33 })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "cod": 401,
                "message": "Invalid API key"
            })))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(test_config(&server.uri())).unwrap();
        let err = client
            .get_current(Location::Coords { lat: 0.0, lon: 0.0 })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"), "unexpected error: {}", err);
        match err {
            OpenWeatherError::Status { payload: Some(payload), .. } => {
                assert_eq!(payload["message"], "Invalid API key");
            }
            other => panic!("expected status error with body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_without_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(test_config(&server.uri())).unwrap();
        let err = client
            .get_current(Location::Coords { lat: 0.0, lon: 0.0 })
            .await
            .unwrap_err();
        assert!(matches!(err, OpenWeatherError::Status { payload: None, .. }));
    }

    #[test]
    fn test_format_accepts_fractional_humidity() {
        let payload = json!({
            "main": {"temp": 27.5, "feels_like": 30.1, "humidity": 79.6},
            "weather": [{"description": "kabut"}],
            "name": "Pontianak"
        });
        let reading = format_reading(&payload).unwrap();
        assert_eq!(reading.humidity, Some(80));

        let payload = json!({
            "main": {"temp": 27.5, "feels_like": 30.1, "humidity": 80.0},
            "weather": [{"description": "kabut"}],
            "name": "Pontianak"
        });
        assert_eq!(format_reading(&payload).unwrap().humidity, Some(80));
    }

    fn numerics_all_or_nothing(reading: &WeatherReading) -> bool {
        let present = [
            reading.temp.is_some(),
            reading.feels_like.is_some(),
            reading.humidity.is_some(),
        ];
        present.iter().all(|p| *p) || present.iter().all(|p| !*p)
    }

    #[test]
    fn test_numerics_present_together() {
        let formatted = format_reading(&valid_payload()).unwrap();
        assert!(numerics_all_or_nothing(&formatted));
        assert!(!formatted.is_fallback());

        let fallback = WeatherReading::fallback(None);
        assert!(numerics_all_or_nothing(&fallback));
        assert!(fallback.is_fallback());

        let partial = WeatherReading {
            humidity: Some(80),
            ..WeatherReading::fallback(None)
        };
        assert!(!partial.is_fallback());
    }
}
