//! Tool: getWeather (mock forecast with simulated network latency)

use crate::error::{HandlerResult, ToolError};
use crate::protocol::{CallToolResult, Tool};
use crate::registry::ToolHandler;
use crate::tools::parse_args;
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const CONDITIONS: [&str; 6] = ["sunny", "cloudy", "light rain", "heavy rain", "snow", "haze"];

/// Latency applied before answering, standing in for an upstream API call.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(150);

const MAX_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct WeatherArgs {
    pub city: String,
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    1
}

pub struct GetWeatherTool {
    latency: Duration,
}

impl GetWeatherTool {
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_LATENCY)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn definition() -> Tool {
        crate::define_tool! {
            name: "getWeather",
            description: "Get the weather forecast for a city",
            schema: {
                "type": "object",
                "properties": {
                    "city": { "type": "string", "description": "City name" },
                    "days": {
                        "type": "integer",
                        "description": "Forecast length in days (1-7)",
                        "minimum": 1,
                        "maximum": 7
                    }
                },
                "required": ["city"]
            }
        }
    }
}

impl Default for GetWeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

fn forecast(city: &str, days: u32) -> String {
    let mut rng = rand::rng();
    let condition = CONDITIONS[rng.random_range(0..CONDITIONS.len())];
    let temperature: i32 = rng.random_range(5..=35);
    format!(
        "{} forecast for the next {} day(s): {}, {}°C",
        city, days, condition, temperature
    )
}

#[async_trait]
impl ToolHandler for GetWeatherTool {
    async fn call(&self, arguments: Value) -> HandlerResult<CallToolResult> {
        let args: WeatherArgs = parse_args(arguments)?;
        if !(1..=MAX_DAYS).contains(&args.days) {
            return Err(ToolError::InvalidArguments(format!(
                "days must be between 1 and {}, got {}",
                MAX_DAYS, args.days
            )));
        }

        debug!(city = %args.city, days = args.days, "Fetching mock forecast");
        tokio::time::sleep(self.latency).await;

        Ok(CallToolResult::text(forecast(&args.city, args.days)))
    }
}
