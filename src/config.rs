//! Configuration management

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{self, Context, Result};

use crate::services::metrics::{MetricSource, MetricsConfig, DEFAULT_COST_PER_KM, DEFAULT_EMISSIONS_PER_KM};
use crate::services::resolver::{ResolverConfig, TransportFailurePolicy};
use crate::services::routing::{
    GeometryFormat, MapboxConfig, Overview, ProviderSettings, RoutingBackend, ValhallaConfig,
};
use crate::services::scenario::{BuilderConfig, ToBeStrategy};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Routing backend and its client settings
    pub provider: ProviderSettings,
    pub resolver: ResolverConfig,
    pub builder: BuilderConfig,
    pub metrics: MetricsConfig,

    /// Stop points as currently driven
    pub as_is_path: PathBuf,

    /// Stop points of the consolidated plan
    pub to_be_path: PathBuf,
}

/// Parse an optional variable, `default` when unset or empty
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid {}='{}'", key, raw)),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got '{}'", other)),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mapbox_token = lookup("MAPBOX_TOKEN").unwrap_or_default();
        let valhalla_url = lookup("VALHALLA_URL").filter(|v| !v.trim().is_empty());

        // Without an explicit choice, use whichever backend is configured
        let inferred = if !mapbox_token.trim().is_empty() {
            RoutingBackend::Mapbox
        } else if valhalla_url.is_some() {
            RoutingBackend::Valhalla
        } else {
            RoutingBackend::Mock
        };
        let backend = parse_or(&lookup, "ROUTING_BACKEND", inferred)?;

        let timeout_seconds: u64 = parse_or(&lookup, "ROUTING_TIMEOUT_SECS", 30)?;
        let steps = match lookup("ROUTE_STEPS").filter(|v| !v.trim().is_empty()) {
            Some(raw) => parse_flag(raw.trim())
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("invalid ROUTE_STEPS='{}'", raw))?,
            None => false,
        };

        let provider = match backend {
            RoutingBackend::Mapbox => {
                let defaults = MapboxConfig::default();
                ProviderSettings::Mapbox(MapboxConfig {
                    base_url: lookup("MAPBOX_BASE_URL").unwrap_or(defaults.base_url),
                    profile: lookup("MAPBOX_PROFILE").unwrap_or(defaults.profile),
                    access_token: mapbox_token,
                    geometries: parse_or(&lookup, "ROUTE_GEOMETRIES", GeometryFormat::GeoJson)?,
                    overview: parse_or(&lookup, "ROUTE_OVERVIEW", Overview::Simplified)?,
                    steps,
                    timeout_seconds,
                })
            }
            RoutingBackend::Valhalla => ProviderSettings::Valhalla(ValhallaConfig {
                base_url: valhalla_url.unwrap_or_else(|| ValhallaConfig::default().base_url),
                timeout_seconds,
                steps,
            }),
            RoutingBackend::Mock => ProviderSettings::Mock,
        };

        let resolver = ResolverConfig {
            fallback_speed_kmh: parse_or(&lookup, "FALLBACK_SPEED_KMH", ResolverConfig::default().fallback_speed_kmh)?,
            transport_failure_policy: parse_or(&lookup, "TRANSPORT_FAILURE_POLICY", TransportFailurePolicy::Propagate)?,
            cache_legs: true,
        };
        if !resolver.fallback_speed_kmh.is_finite() || resolver.fallback_speed_kmh <= 0.0 {
            anyhow::bail!("FALLBACK_SPEED_KMH must be positive (got {})", resolver.fallback_speed_kmh);
        }

        let builder = BuilderConfig {
            to_be_strategy: parse_or(&lookup, "TOBE_STRATEGY", ToBeStrategy::Chained)?,
            max_concurrent_legs: parse_or(&lookup, "MAX_CONCURRENT_LEGS", BuilderConfig::default().max_concurrent_legs)?,
        };
        if builder.max_concurrent_legs == 0 {
            anyhow::bail!("MAX_CONCURRENT_LEGS must be at least 1");
        }

        let metrics = MetricsConfig {
            cost_per_km: parse_or(&lookup, "COST_PER_KM", DEFAULT_COST_PER_KM)?,
            emissions_per_km: parse_or(&lookup, "EMISSIONS_PER_KM", DEFAULT_EMISSIONS_PER_KM)?,
            source: parse_or(&lookup, "METRIC_SOURCE", MetricSource::Provider)?,
        };

        let as_is_path = lookup("AS_IS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/as_is.csv"));
        let to_be_path = lookup("TO_BE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/to_be.csv"));

        Ok(Self {
            provider,
            resolver,
            builder,
            metrics,
            as_is_path,
            to_be_path,
        })
    }
}
