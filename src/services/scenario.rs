//! Scenario construction for AS-IS and TO-BE routing
//!
//! AS-IS pairs every pickup with its nearest drop. TO-BE visits every pickup
//! in `sequence_index` order and ends at one shared drop, either chained leg
//! by leg or as a single optimized trip. Leg lookups are independent of each
//! other and run concurrently; the leg order in the scenario is the plan
//! order, not completion order.

use std::str::FromStr;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::services::geo;
use crate::services::resolver::LegResolver;
use crate::services::routing::RoutingError;
use crate::types::{Leg, Scenario, ScenarioKind, StopPoint};

/// How the TO-BE scenario is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToBeStrategy {
    /// n legs: pickup i -> pickup i+1, last pickup -> drop
    #[default]
    Chained,
    /// 1 combined leg from the provider's trip optimizer
    Optimized,
}

impl FromStr for ToBeStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chained" | "chain" => Ok(ToBeStrategy::Chained),
            "optimized" | "optimised" | "trip" => Ok(ToBeStrategy::Optimized),
            other => anyhow::bail!("unknown TO-BE strategy '{}' (expected chained or optimized)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub to_be_strategy: ToBeStrategy,
    /// Upper bound on in-flight provider requests per scenario
    pub max_concurrent_legs: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            to_be_strategy: ToBeStrategy::Chained,
            max_concurrent_legs: 4,
        }
    }
}

/// Drop with the smallest planar distance to `pickup`; first wins on ties
pub fn nearest_drop<'a>(pickup: &StopPoint, drops: &[&'a StopPoint]) -> Option<&'a StopPoint> {
    let from = pickup.coordinates();
    let mut best: Option<(&'a StopPoint, f64)> = None;

    for &drop in drops {
        let d = geo::planar_distance_squared(&from, &drop.coordinates());
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((drop, d)),
        }
    }

    best.map(|(drop, _)| drop)
}

/// AS-IS plan: one (pickup, nearest drop) pair per pickup, in input order.
/// Empty when there are no drops.
pub fn as_is_pairs(points: &[StopPoint]) -> Vec<(StopPoint, StopPoint)> {
    let drops: Vec<&StopPoint> = points.iter().filter(|p| p.is_drop()).collect();

    points
        .iter()
        .filter(|p| p.is_pickup())
        .filter_map(|pickup| nearest_drop(pickup, &drops).map(|drop| (pickup.clone(), drop.clone())))
        .collect()
}

/// Pickups ordered by `sequence_index` ascending. Pickups without an index
/// keep their input order after the indexed ones.
pub fn sequenced_pickups(points: &[StopPoint]) -> Vec<StopPoint> {
    let mut pickups: Vec<StopPoint> = points.iter().filter(|p| p.is_pickup()).cloned().collect();
    pickups.sort_by_key(|p| (p.sequence_index().is_none(), p.sequence_index()));
    pickups
}

/// The drop every TO-BE trip ends at: the first drop in input order
pub fn shared_drop(points: &[StopPoint]) -> Option<&StopPoint> {
    let mut drops = points.iter().filter(|p| p.is_drop());
    let first = drops.next();
    let extra = drops.count();
    if extra > 0 {
        warn!("{} additional drop points ignored for TO-BE, using the first", extra);
    }
    first
}

/// TO-BE chained plan: consecutive pickups, then last pickup to the shared drop
pub fn to_be_chain(points: &[StopPoint]) -> Vec<(StopPoint, StopPoint)> {
    let Some(drop) = shared_drop(points) else {
        return vec![];
    };
    let pickups = sequenced_pickups(points);
    let Some(last) = pickups.last() else {
        return vec![];
    };

    let mut pairs: Vec<(StopPoint, StopPoint)> = pickups
        .windows(2)
        .map(|w| (w[0].clone(), w[1].clone()))
        .collect();
    pairs.push((last.clone(), drop.clone()));
    pairs
}

/// Builds scenarios for one group of stop points
pub struct ScenarioBuilder {
    resolver: Arc<LegResolver>,
    config: BuilderConfig,
}

impl ScenarioBuilder {
    pub fn new(resolver: Arc<LegResolver>, config: BuilderConfig) -> Self {
        Self { resolver, config }
    }

    /// Build the scenario of `kind` from the group's stop points.
    /// A group without pickups or without drops yields an empty scenario.
    pub async fn build(&self, kind: ScenarioKind, points: &[StopPoint]) -> Result<Scenario, RoutingError> {
        let scenario = match kind {
            ScenarioKind::AsIs => self.build_as_is(points).await?,
            ScenarioKind::ToBe => self.build_to_be(points).await?,
        };

        info!(
            "{} scenario built: {} legs ({} unresolved) via {}",
            kind,
            scenario.legs.len(),
            scenario.unresolved_count(),
            self.resolver.provider_name()
        );
        Ok(scenario)
    }

    async fn build_as_is(&self, points: &[StopPoint]) -> Result<Scenario, RoutingError> {
        let pairs = as_is_pairs(points);
        if pairs.is_empty() {
            debug!("AS-IS: no pickup/drop pairs in {} points", points.len());
            return Ok(Scenario::empty(ScenarioKind::AsIs));
        }

        let mut legs = self.resolve_pairs(&pairs).await?;
        for leg in &mut legs {
            leg.recorded_distance_meters = leg.origin.recorded_distance_meters();
        }

        Ok(Scenario { kind: ScenarioKind::AsIs, legs })
    }

    async fn build_to_be(&self, points: &[StopPoint]) -> Result<Scenario, RoutingError> {
        match self.config.to_be_strategy {
            ToBeStrategy::Chained => {
                let pairs = to_be_chain(points);
                if pairs.is_empty() {
                    debug!("TO-BE: nothing to chain in {} points", points.len());
                    return Ok(Scenario::empty(ScenarioKind::ToBe));
                }
                let legs = self.resolve_pairs(&pairs).await?;
                Ok(Scenario { kind: ScenarioKind::ToBe, legs })
            }
            ToBeStrategy::Optimized => {
                let pickups = sequenced_pickups(points);
                let (Some(first), Some(drop)) = (pickups.first(), shared_drop(points)) else {
                    debug!("TO-BE: nothing to optimize in {} points", points.len());
                    return Ok(Scenario::empty(ScenarioKind::ToBe));
                };
                let leg = self.resolver.resolve_trip(first, &pickups[1..], drop).await?;
                Ok(Scenario { kind: ScenarioKind::ToBe, legs: vec![leg] })
            }
        }
    }

    /// Resolve every pair concurrently, keeping plan order
    async fn resolve_pairs(&self, pairs: &[(StopPoint, StopPoint)]) -> Result<Vec<Leg>, RoutingError> {
        let resolver: &LegResolver = &self.resolver;
        stream::iter(pairs)
            .map(move |(origin, destination)| resolver.resolve(origin, destination))
            .buffered(self.config.max_concurrent_legs.max(1))
            .try_collect::<Vec<Leg>>()
            .await
    }
}
