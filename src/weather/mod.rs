pub mod openweather;
pub mod types;

use crate::config::Config;
use crate::database::{Database, NewWeatherLog};
use openweather::{fallback_city, format_reading, OpenWeatherClient, OpenWeatherError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use types::*;

/// Fetches readings, records successful ones in the history store, and
/// degrades every provider failure to a fallback reading.
pub struct WeatherService {
    client: OpenWeatherClient,
    database: Arc<Database>,
    default_city: String,
    default_country: String,
    persist_failures: AtomicU64,
}

impl WeatherService {
    pub fn new(config: &Config, database: Arc<Database>) -> Result<Self, OpenWeatherError> {
        Ok(Self {
            client: OpenWeatherClient::new(config.clone())?,
            database,
            default_city: config.default_city.clone(),
            default_country: config.default_country.clone(),
            persist_failures: AtomicU64::new(0),
        })
    }

    pub async fn current_default(&self) -> WeatherReading {
        self.current_for_city(&self.default_city, &self.default_country)
            .await
    }

    pub async fn current_for_city(&self, city: &str, country: &str) -> WeatherReading {
        self.current(Location::City { name: city, country }).await
    }

    pub async fn current_by_coords(&self, lat: f64, lon: f64) -> WeatherReading {
        self.current(Location::Coords { lat, lon }).await
    }

    /// Number of successful fetches whose history write failed.
    pub fn persist_failures(&self) -> u64 {
        self.persist_failures.load(Ordering::Relaxed)
    }

    async fn current(&self, location: Location<'_>) -> WeatherReading {
        let payload = match self.client.get_current(location).await {
            Ok(payload) => payload,
            Err(OpenWeatherError::Status {
                status,
                payload: Some(payload),
            }) => {
                tracing::warn!("Weather fetch for {:?} rejected with HTTP {}", location, status);
                return WeatherReading::fallback(fallback_city(Some(&payload), &self.default_city));
            }
            Err(e) => {
                tracing::warn!("Weather fetch for {:?} failed: {}", location, e);
                return WeatherReading::fallback(fallback_city(None, &self.default_city));
            }
        };
        tracing::debug!("Weather payload for {:?}: {}", location, payload);

        match format_reading(&payload) {
            Ok(reading) => {
                self.persist(&reading).await;
                reading
            }
            Err(e) => {
                tracing::warn!("Could not format weather payload for {:?}: {}", location, e);
                WeatherReading::fallback(fallback_city(Some(&payload), &self.default_city))
            }
        }
    }

    async fn persist(&self, reading: &WeatherReading) {
        let record = NewWeatherLog {
            city: reading.city.clone(),
            temp: reading.temp,
            feels_like: reading.feels_like,
            humidity: reading.humidity,
            description: Some(reading.description.clone()),
            logged_at: None,
        };

        match self.database.append(record).await {
            Ok(row) => tracing::debug!("Weather log #{} saved for {:?}", row.id, row.city),
            Err(e) => {
                let failures = self.persist_failures.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::error!(
                    "Failed to save weather log ({} failures so far): {}",
                    failures,
                    e
                );
            }
        }
    }
}
