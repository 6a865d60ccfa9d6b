//! Consumes one `RaceRequested` at a time, drives a `RaceExecutor` run, and
//! keeps the durable `RaceRequest` row in lock-step with the outcome.
use std::collections::HashMap;
use std::sync::Arc;

use racing_core::error::Error;
use racing_core::error::Result;
use racing_core::horse::Horse;
use racing_core::id::ID;
use racing_core::id::Unique;
use racing_core::request::RaceRequest;
use racing_core::request::RequestStatus;
use racing_rng::RandomSource;
use racing_sim::CancellationToken;
use racing_sim::RaceExecutor;

use crate::dto::RaceCompletedMessage;
use crate::dto::RaceRequestedMessage;
use crate::store::HorseStore;
use crate::store::RaceStore;
use crate::store::RequestLifecycleStore;

/// How a request's RNG seed is derived. `PerRequest` is the default: the
/// seed is a deterministic function of `correlationId`, so retries of the
/// same request reproduce the same race.
#[derive(Debug, Clone, Copy)]
pub enum SeedStrategy {
    PerRequest,
    Fixed(u64),
    OsEntropy,
}

impl SeedStrategy {
    pub fn seed_for(&self, correlation_id: ID<RaceRequest>) -> u64 {
        match self {
            SeedStrategy::PerRequest => {
                let bytes = correlation_id.inner().as_u64_pair();
                bytes.0 ^ bytes.1
            }
            SeedStrategy::Fixed(seed) => *seed,
            SeedStrategy::OsEntropy => rand::random(),
        }
    }
}

/// Per-message context the consumer hands to the processor: the
/// cancellation signal for this delivery and how many times it has been
/// attempted.
#[derive(Clone)]
pub struct ProcessingContext {
    pub cancel: CancellationToken,
    pub delivery_count: u32,
}

impl ProcessingContext {
    pub fn first_delivery() -> Self {
        Self {
            cancel: CancellationToken::new(),
            delivery_count: 1,
        }
    }
}

/// What the processor did with one message, and what the consumer should do
/// next.
#[derive(Debug)]
pub enum ProcessOutcome {
    Succeeded,
    Failed { requeue: bool, reason: String },
}

/// Publishes a finished race's completion notification. The processor is
/// agnostic to how this reaches the `race-completions` destination.
#[async_trait::async_trait]
pub trait CompletionPublisher: Send + Sync {
    async fn publish(&self, message: RaceCompletedMessage) -> Result<()>;
}

/// Drives exactly one `RaceRequested` message through lifecycle transition,
/// simulation, and completion notification.
pub struct RequestProcessor<RS: ?Sized, HS: ?Sized, LS: ?Sized> {
    races: Arc<RS>,
    horses: Arc<HS>,
    requests: Arc<LS>,
    seeds: SeedStrategy,
    opponent_tolerance: u32,
}

impl<RS, HS, LS> RequestProcessor<RS, HS, LS>
where
    RS: RaceStore + ?Sized,
    HS: HorseStore + ?Sized,
    LS: RequestLifecycleStore + ?Sized,
{
    pub fn new(races: Arc<RS>, horses: Arc<HS>, requests: Arc<LS>, seeds: SeedStrategy) -> Self {
        Self {
            races,
            horses,
            requests,
            seeds,
            opponent_tolerance: 8,
        }
    }

    pub async fn process(&self, msg: RaceRequestedMessage, ctx: &ProcessingContext, publisher: &dyn CompletionPublisher) -> ProcessOutcome {
        let now = chrono::Utc::now();

        let existing = match self.requests.find(msg.correlation_id).await {
            Ok(v) => v,
            Err(e) => return Self::store_failure(e),
        };

        let mut request = match existing {
            Some(request) if request.status == RequestStatus::Completed => {
                return self.republish_completed(request, msg.correlation_id, publisher).await;
            }
            Some(request) => request,
            None => RaceRequest::new(msg.correlation_id, msg.race_id, msg.horse_id, msg.requested_by, now),
        };

        if self.requests.create(request.clone()).await.is_err() {
            // Another worker already owns this correlationId's row; our
            // in-memory copy still reflects the caller's intent and we keep
            // going, relying on `update` to serialise the final state.
        }

        request.mark_in_progress(now);
        if let Err(e) = self.requests.update(request.clone()).await {
            return Self::store_failure(e);
        }

        match self.simulate(&msg, &request, ctx).await {
            Ok((run, result, updated_horses)) => {
                if let Err(e) = self.races.save_race_run(&run).await {
                    return Self::store_failure(e);
                }
                if let Err(e) = self.horses.update_career_counters(&updated_horses).await {
                    return Self::store_failure(e);
                }

                let completed_at = chrono::Utc::now();
                request.mark_completed(run.id(), completed_at);
                if let Err(e) = self.requests.update(request).await {
                    return Self::store_failure(e);
                }

                let message = RaceCompletedMessage::from_result(msg.correlation_id, msg.race_id, &result);
                match publisher.publish(message).await {
                    Ok(()) => ProcessOutcome::Succeeded,
                    Err(e) => Self::store_failure(e),
                }
            }
            Err(Error::Cancelled) => ProcessOutcome::Failed {
                requeue: true,
                reason: "cancelled".to_string(),
            },
            Err(e) => {
                let reason = e.to_string();
                request.mark_failed(reason.clone(), chrono::Utc::now());
                let _ = self.requests.update(request).await;
                ProcessOutcome::Failed { requeue: false, reason }
            }
        }
    }

    async fn republish_completed(&self, request: RaceRequest, correlation_id: ID<RaceRequest>, publisher: &dyn CompletionPublisher) -> ProcessOutcome {
        let Some(race_run_id) = request.race_run_id else {
            return ProcessOutcome::Failed {
                requeue: false,
                reason: "completed request is missing its race_run_id".to_string(),
            };
        };
        let run = match self.races.get_race_run(race_run_id).await {
            Ok(run) => run,
            Err(e) => return Self::store_failure(e),
        };
        let race = match self.races.get_race(request.race_id).await {
            Ok(race) => race,
            Err(e) => return Self::store_failure(e),
        };

        let mut names: HashMap<ID<Horse>, String> = HashMap::new();
        for rh in &run.horses {
            if let Ok(horse) = self.horses.get_horse(rh.horse_id).await {
                names.insert(rh.horse_id, horse.name);
            }
        }

        let result = racing_sim::rebuild_result(&race, &run, &names);
        let message = RaceCompletedMessage::from_result(correlation_id, request.race_id, &result);
        match publisher.publish(message).await {
            Ok(()) => ProcessOutcome::Succeeded,
            Err(e) => Self::store_failure(e),
        }
    }

    async fn simulate(
        &self,
        msg: &RaceRequestedMessage,
        request: &RaceRequest,
        ctx: &ProcessingContext,
    ) -> Result<(racing_core::run::RaceRun, racing_core::run::RaceRunResult, Vec<Horse>)> {
        let race = self.races.get_race(msg.race_id).await?;
        let player = self.horses.get_horse(msg.horse_id).await?;

        let candidates = self.horses.list_cpu_candidates(player.career.starts, self.opponent_tolerance, usize::MAX).await?;

        let seed = self.seeds.seed_for(msg.correlation_id);
        let mut rng = RandomSource::new(seed);
        let opponents = racing_sim::select_opponents(&candidates, &mut rng);

        let mut field = Vec::with_capacity(1 + opponents.len());
        field.push(player);
        field.extend(opponents);

        let executor = RaceExecutor::new(race.clone(), field, seed).with_cancellation(ctx.cancel.clone());
        let (run, _result, updated_horses) = executor.run()?;

        let run = run.with_id(request.id().cast());
        let names: HashMap<ID<Horse>, String> = updated_horses.iter().map(|h| (h.id(), h.name.clone())).collect();
        let result = racing_sim::rebuild_result(&race, &run, &names);

        Ok((run, result, updated_horses))
    }

    fn store_failure(e: Error) -> ProcessOutcome {
        ProcessOutcome::Failed {
            requeue: e.is_retryable(),
            reason: e.to_string(),
        }
    }
}
