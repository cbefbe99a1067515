//! The mission state machine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use petquest_core::{
    EngineError, Evidence, MissionDefinition, MissionProgress, MissionStatus, ProgressId, Result,
    RewardEvent, StepId, TransitionEvent, TransitionKind,
};
use petquest_dda::{PerformanceSignal, StepSignal, FAILURE_STREAK};
use petquest_storage::ProgressStore;
use petquest_verify::{verify_step, FailReason, StepVerdict, TagExtractor};

use crate::sink::EventSink;

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time budget for external photo tag extraction
    pub extraction_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extraction_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of a step submission.
///
/// Legitimate verification failures are reported here as a value so the
/// caller can resubmit; `Err` is reserved for caller faults and races.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The step passed and the mission advanced to the next step
    StepCompleted {
        /// The completed step
        step_id: StepId,
        /// Quality of the passing submission
        quality_score: f32,
        /// The step's reward emission
        rewards: RewardEvent,
    },

    /// The step passed and it was the last one
    MissionCompleted {
        /// The final step
        step_id: StepId,
        /// Quality of the passing submission
        quality_score: f32,
        /// The final step's reward emission
        step_rewards: RewardEvent,
        /// The mission-level reward emission
        mission_rewards: RewardEvent,
    },

    /// The submission did not satisfy the step's requirements
    VerificationFailed {
        /// Diagnostics for the caller
        reasons: Vec<FailReason>,
        /// Failed submissions so far on this step
        retry_count: u32,
    },
}

// One registered mission instance: the immutable template plus the mutable
// progress behind its own lock, so all mutating operations on the same
// instance are serialized.
struct Instance {
    def: MissionDefinition,
    progress: Mutex<MissionProgress>,
}

/// The orchestrating state machine over mission instances.
pub struct MissionEngine<S: ProgressStore> {
    store: Arc<S>,
    sink: Arc<dyn EventSink>,
    extractor: Option<Arc<dyn TagExtractor>>,
    config: EngineConfig,
    instances: Mutex<HashMap<ProgressId, Arc<Instance>>>,
}

impl<S: ProgressStore> MissionEngine<S> {
    /// Create an engine over a store and an event sink.
    pub fn new(store: S, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store: Arc::new(store),
            sink,
            extractor: None,
            config: EngineConfig::default(),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a photo tag extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TagExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Override the default tunables.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Start a mission for a user: step 0 goes active at the mission's
    /// default tier and the fresh snapshot is persisted.
    pub async fn start(
        &self,
        def: MissionDefinition,
        user_id: impl Into<String>,
    ) -> Result<MissionProgress> {
        if def.steps.is_empty() {
            return Err(EngineError::Validation(format!(
                "mission {} has no steps",
                def.id
            )));
        }

        let mut progress = MissionProgress::start(&def, user_id);
        self.persist(&mut progress).await?;
        let snapshot = progress.clone();

        tracing::info!(mission_id = %def.id, progress_id = %snapshot.id, "mission started");
        self.instances.lock().await.insert(
            snapshot.id,
            Arc::new(Instance {
                def,
                progress: Mutex::new(progress),
            }),
        );
        Ok(snapshot)
    }

    /// Register a previously persisted snapshot, e.g. after a restart.
    pub async fn attach(&self, def: MissionDefinition, progress: MissionProgress) -> Result<()> {
        if def.id != progress.mission_id {
            return Err(EngineError::Validation(format!(
                "snapshot {} belongs to mission {}, not {}",
                progress.id, progress.mission_id, def.id
            )));
        }
        if def.steps.len() != progress.step_progress.len() {
            return Err(EngineError::Validation(format!(
                "snapshot {} tracks {} steps, definition has {}",
                progress.id,
                progress.step_progress.len(),
                def.steps.len()
            )));
        }
        self.instances.lock().await.insert(
            progress.id,
            Arc::new(Instance {
                def,
                progress: Mutex::new(progress),
            }),
        );
        Ok(())
    }

    /// Submit evidence for the currently active step.
    pub async fn submit_step(
        &self,
        progress_id: ProgressId,
        step_id: StepId,
        evidence: Vec<Evidence>,
        time_spent_secs: u64,
    ) -> Result<SubmitOutcome> {
        let instance = self.instance(progress_id).await?;
        let mut guard = instance.progress.lock().await;

        if guard.status != MissionStatus::Active {
            return Err(EngineError::StateConflict(format!(
                "mission is {}, submissions are not accepted",
                guard.status
            )));
        }

        if let Some(minutes) = instance.def.deadline_minutes {
            let deadline = guard.started_at + chrono::Duration::minutes(minutes as i64);
            if chrono::Utc::now() > deadline {
                return Err(EngineError::DeadlineExceeded(format!(
                    "mission deadline passed at {}",
                    deadline
                )));
            }
        }

        let idx = guard.current_step_index;
        let step_def = &instance.def.steps[idx];
        if step_def.id != step_id {
            return Err(EngineError::StateConflict(format!(
                "step {} is not the active step",
                step_id
            )));
        }

        // Photo tags may need the external extractor; a timeout resolves to
        // a failed verification instead of blocking the state machine.
        let (verdict, evidence) = match self.enrich_photo_tags(evidence).await {
            Ok(evidence) => (verify_step(&step_def.requirements, &evidence), evidence),
            Err(reason) => (
                StepVerdict {
                    passed: false,
                    quality_score: 0.0,
                    reasons: vec![reason],
                },
                Vec::new(),
            ),
        };

        // Mutate a working copy; the locked instance only advances and the
        // sink only hears about it once the write-back has landed.
        let mut p = guard.clone();

        let submitted = evidence.into_iter().last();
        let sp = &mut p.step_progress[idx];
        sp.time_spent_secs += time_spent_secs;
        if submitted.is_some() {
            sp.verification = submitted;
        }

        if !verdict.passed {
            sp.retry_count += 1;
            let retry_count = sp.retry_count;
            tracing::debug!(
                progress_id = %p.id,
                step_id = %step_id,
                retry_count,
                reasons = ?verdict.reasons,
                "step verification failed"
            );

            let mut transitions = Vec::new();
            if instance.def.dda_enabled && retry_count >= FAILURE_STREAK {
                self.run_dda(&instance.def, &mut p, Some(step_id), retry_count, &mut transitions);
            }
            p.touch();
            self.persist(&mut p).await?;
            *guard = p;
            self.notify(&[], &transitions);
            return Ok(SubmitOutcome::VerificationFailed {
                reasons: verdict.reasons,
                retry_count,
            });
        }

        // Step completion
        let sp = &mut p.step_progress[idx];
        sp.status = petquest_core::StepStatus::Completed;
        sp.completed_at = Some(chrono::Utc::now());
        sp.rating = Some(verdict.quality_score);
        let tier_at_activation = sp.tier_at_activation;
        let step_efficiency = sp.efficiency(step_def.estimated_minutes_for(tier_at_activation));

        p.completed_steps += 1;
        p.fold_step_scores(step_efficiency, verdict.quality_score);
        p.touch();

        let mut transitions = Vec::new();
        if instance.def.dda_enabled {
            self.run_dda(&instance.def, &mut p, Some(step_id), 0, &mut transitions);
        }

        let mut rewards = Vec::new();
        let step_rewards = petquest_rewards::step_reward_event(p.id, step_def, tier_at_activation);
        if self.stage_reward(&mut p, step_rewards.clone()) {
            rewards.push(step_rewards.clone());
        }
        transitions.push(TransitionEvent::new(
            TransitionKind::StepCompleted,
            instance.def.id,
            p.id,
            Some(step_id),
            tier_at_activation,
        ));

        if p.completed_steps == p.total_steps() {
            p.status = MissionStatus::Completed;
            let mission_rewards = petquest_rewards::mission_reward_event(&instance.def, &p);
            if self.stage_reward(&mut p, mission_rewards.clone()) {
                rewards.push(mission_rewards.clone());
            }
            transitions.push(TransitionEvent::new(
                TransitionKind::MissionCompleted,
                instance.def.id,
                p.id,
                None,
                p.current_difficulty,
            ));

            self.persist(&mut p).await?;
            *guard = p;
            self.notify(&rewards, &transitions);
            tracing::info!(progress_id = %guard.id, "mission completed");
            return Ok(SubmitOutcome::MissionCompleted {
                step_id,
                quality_score: verdict.quality_score,
                step_rewards,
                mission_rewards,
            });
        }

        // Advance: the next step activates at whatever tier is in force now.
        p.current_step_index += 1;
        let tier = p.current_difficulty;
        p.step_progress[p.current_step_index].activate(tier);

        self.persist(&mut p).await?;
        *guard = p;
        self.notify(&rewards, &transitions);
        Ok(SubmitOutcome::StepCompleted {
            step_id,
            quality_score: verdict.quality_score,
            rewards: step_rewards,
        })
    }

    /// Suspend an active mission.
    pub async fn pause(&self, progress_id: ProgressId) -> Result<MissionProgress> {
        self.transition_status(progress_id, |status| match status {
            MissionStatus::Active => Ok(MissionStatus::Paused),
            other => Err(EngineError::StateConflict(format!(
                "cannot pause a {} mission",
                other
            ))),
        })
        .await
    }

    /// Resume a paused mission.
    pub async fn resume(&self, progress_id: ProgressId) -> Result<MissionProgress> {
        self.transition_status(progress_id, |status| match status {
            MissionStatus::Paused => Ok(MissionStatus::Active),
            other => Err(EngineError::StateConflict(format!(
                "cannot resume a {} mission",
                other
            ))),
        })
        .await
    }

    /// Give up: any non-terminal state becomes abandoned.
    pub async fn abandon(&self, progress_id: ProgressId) -> Result<MissionProgress> {
        let instance = self.instance(progress_id).await?;
        let mut guard = instance.progress.lock().await;

        if guard.status.is_terminal() {
            return Err(EngineError::StateConflict(format!(
                "mission is already {}",
                guard.status
            )));
        }
        let mut p = guard.clone();
        p.status = MissionStatus::Abandoned;
        p.touch();
        let transition = TransitionEvent::new(
            TransitionKind::MissionAbandoned,
            instance.def.id,
            p.id,
            None,
            p.current_difficulty,
        );
        self.persist(&mut p).await?;
        *guard = p;
        self.notify(&[], &[transition]);
        Ok(guard.clone())
    }

    /// Deadline passed, invoked by the external scheduler. Idempotent on
    /// already-terminal instances.
    pub async fn expire(&self, progress_id: ProgressId) -> Result<MissionProgress> {
        let instance = self.instance(progress_id).await?;
        let mut guard = instance.progress.lock().await;

        if guard.status.is_terminal() {
            return Ok(guard.clone());
        }
        let mut p = guard.clone();
        p.status = MissionStatus::Expired;
        p.touch();
        let transition = TransitionEvent::new(
            TransitionKind::MissionExpired,
            instance.def.id,
            p.id,
            None,
            p.current_difficulty,
        );
        self.persist(&mut p).await?;
        *guard = p;
        self.notify(&[], &[transition]);
        Ok(guard.clone())
    }

    /// The external ledger confirmed a reward emission: move it from
    /// pending to earned.
    pub async fn acknowledge_rewards(
        &self,
        progress_id: ProgressId,
        key: petquest_core::RewardKey,
    ) -> Result<MissionProgress> {
        let instance = self.instance(progress_id).await?;
        let mut guard = instance.progress.lock().await;

        let Some(pos) = guard.pending_rewards.iter().position(|e| e.key == key) else {
            return Err(EngineError::NotFound(format!("pending reward {}", key)));
        };
        let mut p = guard.clone();
        let event = p.pending_rewards.remove(pos);
        p.earned_rewards.push(event);
        p.updated_at = chrono::Utc::now();
        self.persist(&mut p).await?;
        *guard = p;
        Ok(guard.clone())
    }

    /// Read-only snapshot of an instance.
    pub async fn snapshot(&self, progress_id: ProgressId) -> Result<MissionProgress> {
        let instance = self.instance(progress_id).await?;
        let guard = instance.progress.lock().await;
        Ok(guard.clone())
    }

    /// Drop a finished instance from the in-process registry. The stored
    /// snapshot remains; [`attach`](Self::attach) brings it back if needed.
    pub async fn release(&self, progress_id: ProgressId) -> Result<()> {
        let instance = self.instance(progress_id).await?;
        let guard = instance.progress.lock().await;
        if !guard.status.is_terminal() {
            return Err(EngineError::StateConflict(format!(
                "mission is {}, only finished instances can be released",
                guard.status
            )));
        }
        drop(guard);
        self.instances.lock().await.remove(&progress_id);
        Ok(())
    }

    async fn instance(&self, progress_id: ProgressId) -> Result<Arc<Instance>> {
        self.instances
            .lock()
            .await
            .get(&progress_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(progress_id.to_string()))
    }

    async fn transition_status(
        &self,
        progress_id: ProgressId,
        next: impl FnOnce(MissionStatus) -> Result<MissionStatus>,
    ) -> Result<MissionProgress> {
        let instance = self.instance(progress_id).await?;
        let mut guard = instance.progress.lock().await;

        let mut p = guard.clone();
        p.status = next(p.status)?;
        p.touch();
        self.persist(&mut p).await?;
        *guard = p;
        Ok(guard.clone())
    }

    // Run the difficulty adjuster and record a change. Only steps that
    // activate from now on see the new tier; the step active right now
    // keeps its recorded one.
    fn run_dda(
        &self,
        def: &MissionDefinition,
        p: &mut MissionProgress,
        step_id: Option<StepId>,
        consecutive_failures: u32,
        transitions: &mut Vec<TransitionEvent>,
    ) {
        let signal = PerformanceSignal {
            recent_steps: completed_signals(def, p),
            consecutive_failures,
        };
        let decision = petquest_dda::adjust(&signal, p.current_difficulty);
        if let Some(adjustment) = decision.adjustment {
            p.current_difficulty = decision.tier;
            p.dda_adjustments.push(adjustment);
            transitions.push(TransitionEvent::new(
                TransitionKind::DifficultyAdjusted,
                def.id,
                p.id,
                step_id,
                decision.tier,
            ));
        }
    }

    // Record a reward in the pending ledger unless its key already went
    // out; re-processing a completion must not double-award. Returns
    // whether the event is new.
    fn stage_reward(&self, p: &mut MissionProgress, event: RewardEvent) -> bool {
        if p.reward_key_emitted(&event.key) {
            tracing::warn!(key = %event.key, "reward key already emitted, skipping");
            return false;
        }
        p.pending_rewards.push(event);
        true
    }

    // Deliver staged events. Callers invoke this only after the write-back
    // has landed, so a failed save never reaches external consumers.
    fn notify(&self, rewards: &[RewardEvent], transitions: &[TransitionEvent]) {
        for event in rewards {
            self.sink.reward_emitted(event);
        }
        for event in transitions {
            self.sink.transition(event);
        }
    }

    // Callers mutate a working copy, so a failed save leaves the locked
    // instance at the last stored version.
    async fn persist(&self, p: &mut MissionProgress) -> Result<()> {
        p.version += 1;
        self.store.save(p).await?;
        Ok(())
    }

    // Merge extractor-detected tags into photo payloads, bounded by the
    // configured timeout.
    async fn enrich_photo_tags(
        &self,
        mut evidence: Vec<Evidence>,
    ) -> std::result::Result<Vec<Evidence>, FailReason> {
        let Some(extractor) = &self.extractor else {
            return Ok(evidence);
        };

        for payload in evidence.iter_mut() {
            if let Evidence::Photo { reference, tags } = payload {
                if reference.is_empty() {
                    continue;
                }
                match tokio::time::timeout(
                    self.config.extraction_timeout,
                    extractor.extract_tags(reference),
                )
                .await
                {
                    Ok(Ok(detected)) => {
                        for tag in detected {
                            if !tags.contains(&tag) {
                                tags.push(tag);
                            }
                        }
                    }
                    Ok(Err(err)) => {
                        // Extraction failed outright; declared tags still count.
                        tracing::warn!(reference = %reference, error = %err, "tag extraction failed");
                    }
                    Err(_) => {
                        tracing::warn!(reference = %reference, "tag extraction timed out");
                        return Err(FailReason::EvidenceTimeout);
                    }
                }
            }
        }
        Ok(evidence)
    }
}

// Efficiency/quality signals of the completed steps, mission order.
fn completed_signals(def: &MissionDefinition, p: &MissionProgress) -> Vec<StepSignal> {
    p.step_progress
        .iter()
        .zip(&def.steps)
        .filter(|(sp, _)| sp.status == petquest_core::StepStatus::Completed)
        .map(|(sp, sd)| StepSignal {
            efficiency: sp.efficiency(sd.estimated_minutes_for(sp.tier_at_activation)),
            quality: sp.rating.unwrap_or(0.0),
        })
        .collect()
}
