use serde::{Deserialize, Serialize};

pub const FALLBACK_DESCRIPTION: &str = "Tidak bisa ambil data";

/// Flattened current-weather snapshot sent to dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub city: Option<String>,
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub description: String,
    pub humidity: Option<i64>,
    pub updated_at: String,
}

impl WeatherReading {
    pub fn fallback(city: Option<String>) -> Self {
        Self {
            city,
            temp: None,
            feels_like: None,
            description: FALLBACK_DESCRIPTION.to_string(),
            humidity: None,
            updated_at: clock_now(),
        }
    }

    /// True when no measurement is present at all.
    pub fn is_fallback(&self) -> bool {
        self.temp.is_none() && self.feels_like.is_none() && self.humidity.is_none()
    }
}

pub fn clock_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Where to ask the provider for current conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location<'a> {
    City { name: &'a str, country: &'a str },
    Coords { lat: f64, lon: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeatherResponse {
    pub main: CurrentWeatherMain,
    pub weather: Vec<CurrentWeatherCondition>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeatherMain {
    pub temp: f64,
    pub feels_like: f64,
    /// Percent; some stations report it with a fractional part.
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeatherCondition {
    pub description: String,
}
