//! Poll coordinator
//!
//! Orchestrates one polling cycle: fetch fresh data for every tracked
//! station and every location group, merge the results into the price store,
//! recompute cheapest rankings, and publish a full entity snapshot.
//!
//! The coordinator exclusively owns the store and the last published
//! snapshot; the resolver and ranking engine are pure functions over inputs
//! handed to them. Publishing is the final non-await step of a cycle, so a
//! host that drops the `run_cycle` future mid-flight abandons the cycle
//! without ever exposing a partial snapshot.

use crate::api::FuelApiClient;
use crate::config::Config;
use crate::entity::{EntitySnapshot, EntityState, cheapest_entity_key};
use crate::error::{BowserError, Result};
use crate::fuel::{FuelType, StationKey, StationPrice};
use crate::groups::{Group, resolve_groups};
use crate::logging::get_logger;
use crate::ranking::{CHEAPEST_SLOTS, E10_SHORTLIST, RankedEntry, merge_slots, top_cheapest};
use crate::store::PriceStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Stages of one polling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// No cycle has run yet, or the previous one finished
    Idle,
    Fetching,
    Merging,
    Ranking,
    /// Snapshot handed to the presentation layer
    Published,
    /// Zero successful requests; previous snapshot preserved
    Failed,
}

/// Summary of one completed cycle, for host logging
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub requests: usize,
    pub successes: usize,
    pub failures: usize,
    pub rate_limited: usize,
    pub records_stored: usize,
    pub entities: usize,
}

/// One independent outbound request of the fetch stage
#[derive(Debug, Clone)]
enum FetchTarget {
    Station {
        station: StationKey,
    },
    Group {
        nickname: String,
        latitude: f64,
        longitude: f64,
        fuel_type: FuelType,
    },
}

impl FetchTarget {
    fn describe(&self) -> String {
        match self {
            Self::Station { station } => format!("station {}", station),
            Self::Group {
                nickname,
                fuel_type,
                ..
            } => format!("group '{}' {}", nickname, fuel_type),
        }
    }

    /// Stable ordering key so merge order is deterministic across cycles
    fn sort_key(&self) -> String {
        match self {
            Self::Station { station } => format!("a_{}", station),
            Self::Group {
                nickname,
                fuel_type,
                ..
            } => format!("b_{}_{}", nickname.to_lowercase(), fuel_type),
        }
    }
}

struct FetchOutcome {
    target: FetchTarget,
    result: Result<Vec<StationPrice>>,
}

/// Orchestrates polling cycles and owns all mutable state
pub struct PollCoordinator {
    client: Arc<dyn FuelApiClient>,
    store: PriceStore,
    state: CycleState,
    total_cycles: u64,
    failed_cycles: u64,
    snapshot_tx: watch::Sender<Arc<EntitySnapshot>>,
    snapshot_rx: watch::Receiver<Arc<EntitySnapshot>>,
    logger: crate::logging::StructuredLogger,
}

impl PollCoordinator {
    /// Create a coordinator around an API client collaborator
    pub fn new(client: Arc<dyn FuelApiClient>) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(EntitySnapshot::default()));
        Self {
            client,
            store: PriceStore::new(),
            state: CycleState::Idle,
            total_cycles: 0,
            failed_cycles: 0,
            snapshot_tx,
            snapshot_rx,
            logger: get_logger("coordinator"),
        }
    }

    /// Subscribe to published entity snapshots
    pub fn subscribe_snapshot(&self) -> watch::Receiver<Arc<EntitySnapshot>> {
        self.snapshot_rx.clone()
    }

    /// The last published snapshot (empty until the first successful cycle)
    pub fn last_snapshot(&self) -> Arc<EntitySnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Stage the coordinator is currently in (or finished in)
    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn failed_cycles(&self) -> u64 {
        self.failed_cycles
    }

    /// Read access to the price store (the coordinator owns all writes)
    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    /// External "user removed a station from configuration" event. Polling
    /// itself never deletes store entries.
    pub fn remove_station(&mut self, station: StationKey) -> usize {
        self.store.remove_station(station)
    }

    /// Run one complete fetch-merge-rank-publish cycle.
    ///
    /// The configuration snapshot is passed in per cycle; reconfiguration is
    /// picked up on the next call, never mid-cycle.
    pub async fn run_cycle(&mut self, config: &Config) -> Result<CycleReport> {
        self.total_cycles += 1;
        let cycle = self.total_cycles;
        self.logger.debug(&format!("Starting poll cycle {}", cycle));

        let groups = resolve_groups(&config.locations);
        let plan = build_fetch_plan(&groups);

        let mut report = CycleReport {
            requests: plan.len(),
            ..CycleReport::default()
        };

        // Candidate lists supplied by this cycle's group queries, and
        // per-group request tallies for carry-over decisions.
        let mut candidates: BTreeMap<(String, FuelType), Vec<StationPrice>> = BTreeMap::new();
        let mut group_requests: BTreeMap<String, (usize, usize)> = BTreeMap::new();

        if !plan.is_empty() {
            self.state = CycleState::Fetching;
            let outcomes = self.fetch_all(plan, config).await;

            self.state = CycleState::Merging;
            self.merge_outcomes(
                outcomes,
                config,
                &mut report,
                &mut candidates,
                &mut group_requests,
            );

            if report.successes == 0 {
                self.state = CycleState::Failed;
                self.failed_cycles += 1;
                let message = format!(
                    "cycle {}: all {} requests failed; keeping previous snapshot",
                    cycle, report.failures
                );
                self.logger.error(&message);
                return Err(BowserError::cycle(message));
            }
        }

        self.state = CycleState::Ranking;
        let entities = self.build_entities(&groups, &candidates, &group_requests);

        self.state = CycleState::Published;
        let snapshot = Arc::new(EntitySnapshot {
            published_at: Some(chrono::Utc::now()),
            cycle,
            entities,
        });
        report.entities = snapshot.len();
        let _ = self.snapshot_tx.send(snapshot);

        self.logger.info(&format!(
            "Cycle {} published: {}/{} requests ok, {} records stored, {} entities",
            cycle, report.successes, report.requests, report.records_stored, report.entities
        ));
        Ok(report)
    }

    /// Issue every planned request concurrently; each request is independent
    /// and individually bounded, so one failure never aborts the others.
    async fn fetch_all(&self, plan: Vec<FetchTarget>, config: &Config) -> Vec<FetchOutcome> {
        // The HTTP client enforces its own timeout; this outer bound covers
        // trait implementations that do not.
        let bound = Duration::from_secs(config.api.request_timeout_secs + 5);
        let radius_km = config.polling.radius_km;

        let mut set: JoinSet<FetchOutcome> = JoinSet::new();
        for target in plan {
            let client = Arc::clone(&self.client);
            set.spawn(async move {
                let result = fetch_one(client, &target, radius_km, bound).await;
                FetchOutcome { target, result }
            });
        }

        let mut outcomes = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => self.logger.error(&format!("fetch task panicked: {}", e)),
            }
        }
        outcomes.sort_by_key(|o| o.target.sort_key());
        outcomes
    }

    /// Single-threaded merge of fetch results into the store
    fn merge_outcomes(
        &mut self,
        outcomes: Vec<FetchOutcome>,
        config: &Config,
        report: &mut CycleReport,
        candidates: &mut BTreeMap<(String, FuelType), Vec<StationPrice>>,
        group_requests: &mut BTreeMap<String, (usize, usize)>,
    ) {
        for outcome in outcomes {
            if let FetchTarget::Group { nickname, .. } = &outcome.target {
                let tally = group_requests.entry(nickname.to_lowercase()).or_default();
                tally.0 += 1;
                if outcome.result.is_ok() {
                    tally.1 += 1;
                }
            }

            match outcome.result {
                Ok(records) => {
                    report.successes += 1;
                    self.merge_records(records, &outcome.target, config, report, candidates);
                }
                Err(err) => {
                    report.failures += 1;
                    if matches!(err, BowserError::RateLimit { .. }) {
                        report.rate_limited += 1;
                    }
                    let message =
                        format!("request failed ({}): {}", outcome.target.describe(), err);
                    // Auth failures need user action; everything else is
                    // expected to self-heal on a later cycle.
                    if err.needs_user_action() {
                        self.logger.error(&message);
                    } else {
                        self.logger.warn(&message);
                    }
                }
            }
        }
    }

    fn merge_records(
        &mut self,
        records: Vec<StationPrice>,
        target: &FetchTarget,
        config: &Config,
        report: &mut CycleReport,
        candidates: &mut BTreeMap<(String, FuelType), Vec<StationPrice>>,
    ) {
        let candidate_cap = match target {
            FetchTarget::Group {
                fuel_type: FuelType::E10,
                ..
            } => E10_SHORTLIST,
            _ => config.polling.station_list_limit,
        };
        let mut accepted_for_group = 0usize;

        for record in records {
            if !record.is_valid() {
                self.logger.debug(&format!(
                    "dropping invalid record for {} {}",
                    record.station, record.fuel_type
                ));
                continue;
            }

            if let FetchTarget::Group {
                nickname,
                fuel_type,
                ..
            } = target
                && record.fuel_type == *fuel_type
                && accepted_for_group < candidate_cap
            {
                accepted_for_group += 1;
                candidates
                    .entry((nickname.to_lowercase(), *fuel_type))
                    .or_default()
                    .push(record.clone());
            }

            if self.store.upsert(record) {
                report.records_stored += 1;
            }
        }
    }

    /// Combine resolver output, store contents, and this cycle's candidates
    /// into the full entity map.
    fn build_entities(
        &self,
        groups: &[Group],
        candidates: &BTreeMap<(String, FuelType), Vec<StationPrice>>,
        group_requests: &BTreeMap<String, (usize, usize)>,
    ) -> BTreeMap<String, EntityState> {
        let previous = self.snapshot_rx.borrow().clone();
        let mut entities = BTreeMap::new();

        for group in groups {
            for selection in &group.stations {
                for fuel_type in &selection.fuel_types {
                    let record = self.store.get(selection.key, *fuel_type);
                    let entity =
                        EntityState::for_station(&selection.name, selection.key, *fuel_type, record);
                    entities.insert(entity.entity_key.clone(), entity);
                }
            }

            let (attempted, succeeded) = group_requests
                .get(&group.nickname.to_lowercase())
                .copied()
                .unwrap_or((0, 0));
            if attempted > 0 && succeeded == 0 {
                // Every query for this group failed: its slots keep their
                // prior-cycle state instead of being recomputed from nothing.
                for slot in 1..=CHEAPEST_SLOTS {
                    let key = cheapest_entity_key(&group.nickname, slot);
                    let entity = previous.get(&key).cloned().unwrap_or_else(|| {
                        EntityState::for_cheapest_slot(&group.nickname, slot, None)
                    });
                    entities.insert(key, entity);
                }
                continue;
            }

            let per_fuel: Vec<Vec<RankedEntry>> = group
                .fuel_types
                .iter()
                .map(|fuel_type| {
                    let list = candidates
                        .get(&(group.nickname.to_lowercase(), *fuel_type))
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    top_cheapest(list, CHEAPEST_SLOTS)
                })
                .collect();
            let slots = merge_slots(per_fuel);

            for slot in 1..=CHEAPEST_SLOTS {
                let entity =
                    EntityState::for_cheapest_slot(&group.nickname, slot, slots.get(slot - 1));
                entities.insert(entity.entity_key.clone(), entity);
            }
        }

        entities
    }
}

/// One request per distinct selected station, one per (group, fuel type)
fn build_fetch_plan(groups: &[Group]) -> Vec<FetchTarget> {
    let mut stations = std::collections::BTreeSet::new();
    let mut plan = Vec::new();

    for group in groups {
        for selection in &group.stations {
            if stations.insert(selection.key) {
                plan.push(FetchTarget::Station {
                    station: selection.key,
                });
            }
        }
        for fuel_type in &group.fuel_types {
            plan.push(FetchTarget::Group {
                nickname: group.nickname.clone(),
                latitude: group.latitude,
                longitude: group.longitude,
                fuel_type: *fuel_type,
            });
        }
    }

    plan
}

/// Execute one fetch with a hard time bound and a single retry for
/// transient failures. Rate-limit and auth responses are never retried.
/// An explicit empty result from upstream counts as success with no records.
async fn fetch_one(
    client: Arc<dyn FuelApiClient>,
    target: &FetchTarget,
    radius_km: f64,
    bound: Duration,
) -> Result<Vec<StationPrice>> {
    let first = attempt_fetch(&client, target, radius_km, bound).await;
    let result = match first {
        Err(BowserError::Transport { .. }) | Err(BowserError::Timeout { .. }) => {
            attempt_fetch(&client, target, radius_km, bound).await
        }
        other => other,
    };

    match result {
        Err(BowserError::EmptyResult { .. }) => Ok(Vec::new()),
        other => other,
    }
}

async fn attempt_fetch(
    client: &Arc<dyn FuelApiClient>,
    target: &FetchTarget,
    radius_km: f64,
    bound: Duration,
) -> Result<Vec<StationPrice>> {
    let request = async {
        match target {
            FetchTarget::Station { station } => client.station_prices(*station).await,
            FetchTarget::Group {
                latitude,
                longitude,
                fuel_type,
                ..
            } => {
                client
                    .prices_within_radius(*latitude, *longitude, radius_km, *fuel_type)
                    .await
            }
        }
    };

    match tokio::time::timeout(bound, request).await {
        Ok(result) => result,
        Err(_) => Err(BowserError::timeout(format!(
            "{} exceeded {:?}",
            target.describe(),
            bound
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverCalledClient;

    #[async_trait::async_trait]
    impl FuelApiClient for NeverCalledClient {
        async fn station_prices(&self, _station: StationKey) -> Result<Vec<StationPrice>> {
            panic!("no requests expected");
        }

        async fn prices_within_radius(
            &self,
            _latitude: f64,
            _longitude: f64,
            _radius_km: f64,
            _fuel_type: FuelType,
        ) -> Result<Vec<StationPrice>> {
            panic!("no requests expected");
        }
    }

    #[tokio::test]
    async fn empty_configuration_publishes_empty_snapshot() {
        let mut coordinator = PollCoordinator::new(Arc::new(NeverCalledClient));
        assert_eq!(coordinator.state(), CycleState::Idle);

        let config = Config::default();
        let report = coordinator.run_cycle(&config).await.unwrap();
        assert_eq!(report.requests, 0);
        assert_eq!(report.entities, 0);
        assert_eq!(coordinator.state(), CycleState::Published);
        assert!(coordinator.last_snapshot().is_empty());
        assert_eq!(coordinator.last_snapshot().cycle, 1);
    }
}
