//! Round orchestration.
//!
//! Pending round indices are queued on a channel drained by a fixed pool of
//! worker tasks. Each worker writes only the slot of the index it claimed, so
//! the final aggregation does not depend on completion order. The first fatal
//! error wins: it is recorded, the cancel flag is raised, and no worker claims
//! another round afterwards.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, instrument, warn, Instrument};
use uuid::Uuid;

use codebench_state::{CheckpointStore, PipelineCheckpoint};

use crate::config::PipelineConfig;
use crate::domain::error::{PipelineError, Result};
use crate::domain::run::{
    Phase, PhaseWindow, RoundResult, RoundStatus, RoundTimeline, RunRecord, TokenUsage,
};
use crate::evaluation::{EvaluationPanel, JudgeRoster};
use crate::execution::ExecutionEngine;
use crate::metrics::METRICS;
use crate::obs::{self, RunSpan};
use crate::provider::{ProviderHandle, ProviderResolver};
use crate::scoring::ScoringEngine;

use super::aggregate::{aggregate_rounds, RunMeta};
use super::collaborators::{
    GenerationInput, ProgressEvent, ProgressSink, ProgressState, RequirementGenerator,
    SandboxContext, SandboxRunner, TracingProgressSink,
};

/// Input to [`PipelineOrchestrator::run`].
#[derive(Debug, Clone)]
pub struct RunInput {
    pub config: PipelineConfig,
    /// Checkpoint key. Defaults to [`PipelineConfig::checkpoint_key`] when a
    /// checkpoint store is attached.
    pub checkpoint_key: Option<String>,
    /// Base time for mixed complexity. A fixed value makes tier selection
    /// reproducible; the recorded start time is always the wall clock.
    pub now: Option<DateTime<Utc>>,
}

impl RunInput {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            checkpoint_key: None,
            now: None,
        }
    }

    pub fn with_checkpoint_key(mut self, key: impl Into<String>) -> Self {
        self.checkpoint_key = Some(key.into());
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Drives every round of a run through generate → execute → (sandbox) →
/// evaluate → score and folds the results into a [`RunRecord`].
pub struct PipelineOrchestrator {
    resolver: Arc<dyn ProviderResolver>,
    generator: Arc<dyn RequirementGenerator>,
    checkpoint_store: Option<Arc<dyn CheckpointStore>>,
    sandbox: Option<Arc<dyn SandboxRunner>>,
    progress: Arc<dyn ProgressSink>,
    panel: EvaluationPanel,
    engine: ExecutionEngine,
}

impl PipelineOrchestrator {
    pub fn new(resolver: Arc<dyn ProviderResolver>, generator: Arc<dyn RequirementGenerator>) -> Self {
        Self {
            resolver,
            generator,
            checkpoint_store: None,
            sandbox: None,
            progress: Arc::new(TracingProgressSink),
            panel: EvaluationPanel::default(),
            engine: ExecutionEngine::new(),
        }
    }

    pub fn with_checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint_store = Some(store);
        self
    }

    /// Sandbox runner used when `config.sandbox.enabled` is set.
    pub fn with_sandbox(mut self, runner: Arc<dyn SandboxRunner>) -> Self {
        self.sandbox = Some(runner);
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn with_panel(mut self, panel: EvaluationPanel) -> Self {
        self.panel = panel;
        self
    }

    /// Run every configured round and aggregate the outcome.
    ///
    /// Fatal errors abort the run and no partial record is returned. The
    /// checkpoint, if any, is left in place so the run can be resumed.
    pub async fn run(&self, input: RunInput) -> Result<RunRecord> {
        let run_id = Uuid::new_v4();
        let span = RunSpan::span(&run_id.to_string());
        self.run_inner(run_id, input).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, input: RunInput) -> Result<RunRecord> {
        let RunInput {
            config,
            checkpoint_key,
            now,
        } = input;
        config.validate()?;
        let started_at = Utc::now();
        let base_time = now.unwrap_or(started_at);
        let total_rounds = config.rounds;

        if config.sandbox.enabled && self.sandbox.is_none() {
            return Err(PipelineError::Configuration(
                "sandbox is enabled but no sandbox runner was supplied".to_string(),
            ));
        }

        // Handles are resolved once and only read by the workers.
        let system = self
            .resolver
            .resolve(&config.system_model.provider, &config.system_model.model)?;
        let target = self
            .resolver
            .resolve(&config.target_model.provider, &config.target_model.model)?;
        let roster = JudgeRoster::resolve(&config.judges, self.resolver.as_ref())?;

        obs::emit_run_started(
            &run_id.to_string(),
            &target.id(),
            total_rounds,
            roster.len(),
        );

        let checkpoint = self.checkpoint_store.clone().map(|store| {
            let key = checkpoint_key
                .clone()
                .unwrap_or_else(|| config.checkpoint_key());
            (store, key)
        });

        let mut slots: Vec<Option<RoundResult>> = vec![None; total_rounds];
        let mut resumed_rounds = 0;
        if let Some((store, key)) = &checkpoint {
            if let Some(saved) = store.load(key).await? {
                if saved.total_rounds != total_rounds {
                    return Err(PipelineError::CheckpointMismatch {
                        expected: total_rounds,
                        found: saved.total_rounds,
                    });
                }
                for snapshot in &saved.completed_rounds {
                    if let Some(slot) = slots.get_mut(snapshot.index) {
                        *slot = Some(RoundResult::from_snapshot(snapshot, saved.created_at));
                    }
                }
                resumed_rounds = slots.iter().filter(|s| s.is_some()).count();
                obs::emit_checkpoint_resumed(key, resumed_rounds, total_rounds);
            }
        }

        let pending: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(index, _)| index)
            .collect();

        let shared = Arc::new(RoundContext {
            generator: Arc::clone(&self.generator),
            sandbox: self.sandbox.clone().filter(|_| config.sandbox.enabled),
            sandbox_strict: config.sandbox.strict,
            progress: Arc::clone(&self.progress),
            panel: self.panel.clone(),
            engine: self.engine,
            scoring: ScoringEngine::new(config.dimension_weights),
            system,
            target: target.clone(),
            target_temperature: config.target_model.temperature,
            roster: roster.clone(),
            complexity: config.complexity,
            domain: config.domain.clone(),
            base_time_ms: base_time.timestamp_millis(),
            total_rounds,
            slots: Mutex::new(slots),
            fatal: Mutex::new(None),
            checkpoint,
        });

        let workers = config.concurrency.max(1).min(pending.len());
        debug!(pending = pending.len(), workers, "scheduling rounds");

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        for index in pending {
            // The receiver is alive until the workers finish.
            let _ = queue_tx.send(index);
        }
        drop(queue_tx);
        let queue = Arc::new(Mutex::new(queue_rx));
        let (cancel_tx, _cancel_rx) = watch::channel(false);
        let cancel = Arc::new(cancel_tx);

        let mut tasks = Vec::with_capacity(workers);
        for worker in 0..workers {
            let shared = Arc::clone(&shared);
            let queue = Arc::clone(&queue);
            let cancel = Arc::clone(&cancel);
            let span = tracing::debug_span!("worker", worker);
            tasks.push(tokio::spawn(
                async move { shared.drain(queue, cancel).await }.instrument(span),
            ));
        }
        for task in tasks {
            if let Err(e) = task.await {
                shared
                    .record_fatal(PipelineError::WorkerPanicked(e.to_string()), &cancel)
                    .await;
            }
        }

        let completed_at = Utc::now().max(started_at);
        if let Some(err) = shared.fatal.lock().await.take() {
            obs::emit_run_finished(
                &run_id.to_string(),
                elapsed_ms(started_at, completed_at),
                0.0,
                0,
                false,
            );
            METRICS.flush();
            return Err(err);
        }

        if let Some((store, key)) = &shared.checkpoint {
            if let Err(e) = store.clear(key).await {
                obs::emit_checkpoint_clear_failed(key, &e);
            }
        }

        let rounds: Vec<RoundResult> = shared.slots.lock().await.iter().flatten().cloned().collect();
        if rounds.len() != total_rounds {
            return Err(PipelineError::WorkerPanicked(format!(
                "{} of {total_rounds} rounds produced no result",
                total_rounds - rounds.len()
            )));
        }

        let record = aggregate_rounds(
            rounds,
            RunMeta {
                run_id,
                started_at,
                completed_at,
                target_model: target.id(),
                system_model: config.system_model.id(),
                judge_ids: roster.judge_ids(),
                concurrency: config.concurrency.max(1),
                resumed_rounds,
            },
        );

        obs::emit_run_finished(
            &run_id.to_string(),
            record.duration_ms,
            record.overall_score,
            record.failed_rounds,
            true,
        );
        METRICS.flush();
        Ok(record)
    }
}

fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_milliseconds().max(0) as u64
}

/// Everything a worker needs, shared read-only except for the result slots
/// and the fatal-error cell.
struct RoundContext {
    generator: Arc<dyn RequirementGenerator>,
    sandbox: Option<Arc<dyn SandboxRunner>>,
    sandbox_strict: bool,
    progress: Arc<dyn ProgressSink>,
    panel: EvaluationPanel,
    engine: ExecutionEngine,
    scoring: ScoringEngine,
    system: ProviderHandle,
    target: ProviderHandle,
    target_temperature: Option<f32>,
    roster: JudgeRoster,
    complexity: crate::domain::requirement::ComplexitySetting,
    domain: Option<String>,
    base_time_ms: i64,
    total_rounds: usize,
    slots: Mutex<Vec<Option<RoundResult>>>,
    fatal: Mutex<Option<PipelineError>>,
    checkpoint: Option<(Arc<dyn CheckpointStore>, String)>,
}

/// Partial state of a round, kept so a recoverable failure can still report
/// the title, timings and tokens gathered before it.
#[derive(Default)]
struct RoundTrace {
    title: Option<String>,
    timeline: RoundTimeline,
    usage: TokenUsage,
}

impl RoundContext {
    async fn drain(
        &self,
        queue: Arc<Mutex<mpsc::UnboundedReceiver<usize>>>,
        cancel: Arc<watch::Sender<bool>>,
    ) {
        let cancelled = cancel.subscribe();
        loop {
            if *cancelled.borrow() {
                break;
            }
            let next = queue.lock().await.recv().await;
            let Some(index) = next else { break };
            // A fatal error may have landed while waiting on the queue.
            if *cancelled.borrow() {
                break;
            }

            match self.run_round(index).await {
                Ok(round) => self.record_round(round).await,
                Err(e) => {
                    self.record_fatal(e, &cancel).await;
                    break;
                }
            }
        }
    }

    async fn record_fatal(&self, err: PipelineError, cancel: &watch::Sender<bool>) {
        let mut fatal = self.fatal.lock().await;
        if fatal.is_none() {
            warn!(error = %err, "fatal round error; cancelling remaining rounds");
            *fatal = Some(err);
        } else {
            debug!(error = %err, "additional fatal error after cancellation");
        }
        let _ = cancel.send(true);
    }

    /// Store `round` in its slot and persist a checkpoint of every completed
    /// round so far.
    async fn record_round(&self, round: RoundResult) {
        let snapshots = {
            let mut slots = self.slots.lock().await;
            let index = round.index;
            slots[index] = Some(round);
            slots
                .iter()
                .flatten()
                .map(RoundResult::to_snapshot)
                .collect::<Vec<_>>()
        };

        if let Some((store, key)) = &self.checkpoint {
            let checkpoint = PipelineCheckpoint::new(self.total_rounds, snapshots);
            match store.save(key, &checkpoint).await {
                Ok(()) => METRICS.inc_checkpoints_saved(),
                Err(e) => obs::emit_checkpoint_save_failed(key, &e),
            }
        }
    }

    /// One round, with recoverable failures converted into a placeholder.
    #[instrument(skip(self), fields(round = index + 1))]
    async fn run_round(&self, index: usize) -> Result<RoundResult> {
        let mut trace = RoundTrace::default();
        match self.execute_round(index, &mut trace).await {
            Ok(round) => {
                METRICS.inc_rounds_completed();
                obs::emit_round_finished(
                    index,
                    round.overall_score,
                    round.ija,
                    self.roster.len() - round.dropped_judges.len(),
                );
                Ok(round)
            }
            Err(e) if e.is_recoverable() => {
                METRICS.inc_rounds_recovered();
                obs::emit_round_recovered(index, &e);
                Ok(RoundResult::failed_placeholder(
                    index,
                    trace.title.as_deref(),
                    e.to_string(),
                    trace.timeline,
                    trace.usage,
                ))
            }
            Err(e) => Err(e),
        }
    }

    async fn execute_round(&self, index: usize, trace: &mut RoundTrace) -> Result<RoundResult> {
        let complexity = self.complexity.resolve(self.base_time_ms, index);

        let input = GenerationInput {
            round_index: index,
            complexity,
            domain: self.domain.clone(),
        };
        let generated = self
            .phase(index, Phase::Generate, trace, self.generator.generate(&input, &self.system))
            .await?;
        trace.usage += generated.usage;
        let mut requirement = generated.requirement;
        // The tier is decided here, not by the generator.
        requirement.complexity = complexity;
        trace.title = Some(requirement.title.clone());

        let execution = self
            .phase(
                index,
                Phase::Execute,
                trace,
                self.engine
                    .execute(&requirement, &self.target, self.target_temperature),
            )
            .await?;
        trace.usage += execution.usage;
        let execution = execution.result;

        if let Some(sandbox) = &self.sandbox {
            let context = SandboxContext {
                round_index: index,
                requirement_title: requirement.title.clone(),
                language: execution.language.clone(),
            };
            let strict = self.sandbox_strict;
            let validation = async {
                match sandbox.run(&execution.code, &context).await {
                    Ok(()) => Ok(()),
                    Err(e) if strict => Err(PipelineError::SandboxValidation {
                        round_index: index,
                        reason: format!("{e:#}"),
                    }),
                    Err(e) => {
                        let reason = format!("{e:#}");
                        obs::emit_sandbox_warning(index, &reason);
                        self.emit(index, Phase::Sandbox, ProgressState::Warning, Some(reason))
                            .await;
                        Ok(())
                    }
                }
            };
            self.phase(index, Phase::Sandbox, trace, validation).await?;
        }

        let panel = self
            .phase(
                index,
                Phase::Evaluate,
                trace,
                self.panel
                    .evaluate_with_ija(&requirement, &execution, &self.roster),
            )
            .await?;
        trace.usage += panel.outcome.usage;
        METRICS.add_judges_dropped(panel.outcome.dropped_judges.len() as u64);

        let score = self
            .phase(index, Phase::Score, trace, async {
                Ok(self.scoring.score(&panel.outcome.results))
            })
            .await?;

        info!(
            overall = score.overall_score,
            agreement = %score.agreement_level,
            judges = score.judge_count,
            trimmed = score.trimmed,
            "round scored"
        );

        Ok(RoundResult {
            index,
            status: RoundStatus::Completed,
            complexity: Some(complexity),
            requirement_title: requirement.title.clone(),
            requirement_text: Some(requirement.render()),
            code_submission: Some(execution.code),
            language: Some(execution.language),
            overall_score: score.overall_score,
            dimension_scores: score.dimension_scores,
            ija: panel.ija,
            ci95: Some(score.ci95),
            agreement_level: Some(score.agreement_level),
            warnings: score.warnings,
            dropped_judges: panel.outcome.dropped_judges,
            timeline: trace.timeline,
            usage: trace.usage,
        })
    }

    /// Await `fut` between started and completed/failed progress events and
    /// record the phase window.
    async fn phase<T, F>(
        &self,
        index: usize,
        phase: Phase,
        trace: &mut RoundTrace,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.emit(index, phase, ProgressState::Started, None).await;
        let started_at = Utc::now();
        let outcome = fut.await;
        let completed_at = Utc::now().max(started_at);
        trace.timeline.set(phase, PhaseWindow::new(started_at, completed_at));

        match &outcome {
            Ok(_) => self.emit(index, phase, ProgressState::Completed, None).await,
            Err(e) => {
                self.emit(index, phase, ProgressState::Failed, Some(e.to_string()))
                    .await
            }
        }
        outcome
    }

    async fn emit(
        &self,
        index: usize,
        phase: Phase,
        state: ProgressState,
        message: Option<String>,
    ) {
        self.progress
            .on_progress(ProgressEvent {
                timestamp: Utc::now(),
                round_index: index,
                total_rounds: self.total_rounds,
                phase,
                state,
                message,
            })
            .await;
    }
}
