//! 当前天气工具（Open-Meteo）
//!
//! 先地理编码城市名（取第一条结果），再查询 current=temperature_2m,wind_speed_10m,weather_code；
//! 天气代码映射为英文描述，未知代码为 "Unknown conditions"。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::schema::{args_schema, parse_args};
use crate::tools::{Tool, ToolOutput, WEATHER_CURRENT};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WeatherArgs {
    /// 城市名，如 Mumbai
    pub city: String,
}

/// 地理编码结果
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPlace {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPlace {
    pub fn label(&self) -> String {
        [self.name.as_str(), self.country.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// WMO 天气代码 → 描述
pub fn weather_summary(code: Option<i64>) -> &'static str {
    match code {
        Some(0) => "Clear sky",
        Some(1) => "Mainly clear",
        Some(2) => "Partly cloudy",
        Some(3) => "Overcast",
        Some(45) => "Fog",
        Some(48) => "Depositing rime fog",
        Some(51) => "Light drizzle",
        Some(53) => "Moderate drizzle",
        Some(55) => "Dense drizzle",
        Some(61) => "Slight rain",
        Some(63) => "Moderate rain",
        Some(65) => "Heavy rain",
        Some(71) => "Slight snow fall",
        Some(73) => "Moderate snow fall",
        Some(75) => "Heavy snow fall",
        Some(80) => "Rain showers",
        Some(81) => "Heavy rain showers",
        Some(95) => "Thunderstorm",
        _ => "Unknown conditions",
    }
}

/// 取地理编码响应的第一条结果
pub fn first_geocoding_result(city: &str, data: &Value) -> Result<GeoPlace, String> {
    let first = data
        .get("results")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
        .ok_or_else(|| format!("No geocoding results for city: {}", city))?;
    let text = |key: &str| {
        first
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let coord = |key: &str| {
        first
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| format!("Geocoding result for {} has no {}", city, key))
    };
    Ok(GeoPlace {
        name: text("name"),
        country: text("country"),
        latitude: coord("latitude")?,
        longitude: coord("longitude")?,
    })
}

/// 将 forecast 响应整理为工具输出
pub fn weather_output(place: &GeoPlace, data: &Value, source_url: &str) -> ToolOutput {
    let current = data.get("current").cloned().unwrap_or(Value::Null);
    let field = |key: &str| current.get(key).cloned().unwrap_or(Value::Null);
    let code = field("weather_code");

    let mut output = ToolOutput::new();
    output.insert("location".into(), Value::String(place.label()));
    output.insert("temperature_c".into(), field("temperature_2m"));
    output.insert("wind_kph".into(), field("wind_speed_10m"));
    output.insert(
        "weather_summary".into(),
        Value::String(weather_summary(code.as_i64()).to_string()),
    );
    output.insert("weather_code".into(), code);
    output.insert("source_url".into(), Value::String(source_url.to_string()));
    output
}

pub struct WeatherTool {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl WeatherTool {
    pub fn new(
        geocoding_url: impl Into<String>,
        forecast_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            geocoding_url: geocoding_url.into(),
            forecast_url: forecast_url.into(),
        }
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<(Value, String), String> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        let final_url = resp.url().to_string();
        if !resp.status().is_success() {
            return Err(format!("HTTP {} from {}", resp.status(), final_url));
        }
        let data = resp
            .json()
            .await
            .map_err(|e| format!("Read body: {}", e))?;
        Ok((data, final_url))
    }

    async fn geocode(&self, city: &str) -> Result<GeoPlace, String> {
        let params = [
            ("name", city.to_string()),
            ("count", "1".to_string()),
            ("language", "en".to_string()),
            ("format", "json".to_string()),
        ];
        let (data, _) = self.get_json(&self.geocoding_url, &params).await?;
        first_geocoding_result(city, &data)
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        WEATHER_CURRENT
    }

    fn description(&self) -> &str {
        "Get current weather by city name. Args: {\"city\": \"string city name, e.g. Mumbai\"}."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<WeatherArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: WeatherArgs = parse_args(WEATHER_CURRENT, args).map_err(|e| e.to_string())?;
        let city = args.city.trim();
        if city.is_empty() {
            return Err("Missing city".to_string());
        }
        tracing::info!(city = %city, "weather lookup");

        let place = self.geocode(city).await?;
        let params = [
            ("latitude", place.latitude.to_string()),
            ("longitude", place.longitude.to_string()),
            (
                "current",
                "temperature_2m,wind_speed_10m,weather_code".to_string(),
            ),
        ];
        let (data, source_url) = self.get_json(&self.forecast_url, &params).await?;
        Ok(weather_output(&place, &data, &source_url))
    }
}
