//! The experiment state machine.

use crate::error::{ExperimentError, ExperimentResult};
use crate::fleet::{Fleet, Role, TeardownReport};
use crate::session::{Completion, Decision, TestSession, decide};
use loadrig_core::{Credentials, RigConfig};
use loadrig_harness::{AddOutcome, HarnessClient, RetryPolicy};
use loadrig_monitor::LogMonitor;
use loadrig_provider::{
    ComputeProvider, IngressRule, LaunchSpec, SecurityGroupSpec, ensure_security_group,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Where the experiment currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentPhase {
    Bootstrapping,
    AwaitingReady,
    Authenticating,
    TestRunning,
    ScalingUp,
    Completed,
    TearingDown,
    Done,
}

impl std::fmt::Display for ExperimentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExperimentPhase::Bootstrapping => "bootstrapping",
            ExperimentPhase::AwaitingReady => "awaiting-ready",
            ExperimentPhase::Authenticating => "authenticating",
            ExperimentPhase::TestRunning => "test-running",
            ExperimentPhase::ScalingUp => "scaling-up",
            ExperimentPhase::Completed => "completed",
            ExperimentPhase::TearingDown => "tearing-down",
            ExperimentPhase::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Why the run ended.
#[derive(Debug)]
pub enum Outcome {
    Completed(Completion),
    Cancelled,
    Failed(ExperimentError),
}

/// Everything a finished run reports back.
#[derive(Debug)]
pub struct ExperimentReport {
    pub outcome: Outcome,
    pub session_id: Option<String>,
    pub scale_ups: u32,
    pub teardown: TeardownReport,
}

impl ExperimentReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Outcome::Completed(_))
    }
}

/// Owns every resource a run creates and drives the whole lifecycle.
pub struct Experiment {
    provider: Arc<dyn ComputeProvider>,
    http: reqwest::Client,
    config: RigConfig,
    credentials: Credentials,
    fleet: Fleet,
    phase: ExperimentPhase,
    session_id: Option<String>,
    scale_ups: u32,
}

impl Experiment {
    pub fn new(
        provider: Arc<dyn ComputeProvider>,
        http: reqwest::Client,
        config: RigConfig,
        credentials: Credentials,
    ) -> Self {
        Experiment {
            provider,
            http,
            config,
            credentials,
            fleet: Fleet::new(),
            phase: ExperimentPhase::Bootstrapping,
            session_id: None,
            scale_ups: 0,
        }
    }

    /// Drive the experiment to an outcome, then sweep every resource it
    /// created. Flipping `shutdown` to `true` cancels at the next await
    /// point; teardown still runs.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ExperimentReport {
        let outcome = match self.drive(&mut shutdown).await {
            Ok(completion) => {
                info!(%completion, scale_ups = self.scale_ups, "experiment completed");
                Outcome::Completed(completion)
            }
            Err(ExperimentError::Cancelled) => {
                warn!("experiment cancelled; winding down");
                Outcome::Cancelled
            }
            Err(e) => {
                warn!(error = %e, "experiment failed; winding down");
                Outcome::Failed(e)
            }
        };

        self.transition(ExperimentPhase::TearingDown);
        let teardown = self.fleet.teardown(self.provider.as_ref()).await;
        if teardown.clean() {
            info!(
                instances = teardown.terminated.len(),
                groups = teardown.deleted_groups.len(),
                "teardown complete"
            );
        } else {
            warn!(
                instances_left = teardown.failed_instances.len(),
                groups_left = teardown.failed_groups.len(),
                "teardown left resources behind"
            );
        }
        self.transition(ExperimentPhase::Done);

        ExperimentReport {
            outcome,
            session_id: self.session_id,
            scale_ups: self.scale_ups,
            teardown,
        }
    }

    fn transition(&mut self, next: ExperimentPhase) {
        debug!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }

    fn launch_spec_for(&self, role: Role) -> LaunchSpec {
        let p = &self.config.provider;
        match role {
            Role::LoadGenerator => LaunchSpec {
                image_id: p.load_generator_image.clone(),
                instance_type: p.instance_type.clone(),
                key_name: p.key_name.clone(),
                security_group: p.generator_group.clone(),
            },
            Role::ServiceNode => LaunchSpec {
                image_id: p.service_image.clone(),
                instance_type: p.instance_type.clone(),
                key_name: p.key_name.clone(),
                security_group: p.service_group.clone(),
            },
        }
    }

    async fn drive(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ExperimentResult<Completion> {
        info!(provider = self.provider.name(), "bootstrapping experiment resources");

        let vpc_id = self.config.provider.vpc_id.clone();
        let groups = [
            (
                self.config.provider.generator_group.clone(),
                "loadrig load generator",
            ),
            (
                self.config.provider.service_group.clone(),
                "loadrig service instances",
            ),
        ];
        for (name, description) in groups {
            let spec = SecurityGroupSpec::new(
                name.clone(),
                description,
                vpc_id.clone(),
                IngressRule::tcp_open(22, 80),
            );
            ensure_security_group(self.provider.as_ref(), &spec).await?;
            self.fleet.track_group(name);
        }

        let generator_id = self.launch(Role::LoadGenerator).await?;
        let service_id = self.launch(Role::ServiceNode).await?;

        self.transition(ExperimentPhase::AwaitingReady);
        let generator_addr = self.await_ready(&generator_id, shutdown).await?;
        let service_addr = self.await_ready(&service_id, shutdown).await?;
        self.tag(&generator_id).await?;
        self.tag(&service_id).await?;
        info!(generator = %generator_addr, service = %service_addr, "instances ready");

        self.transition(ExperimentPhase::Authenticating);
        let retry = RetryPolicy::from(&self.config.retry);
        let harness = HarnessClient::new(self.http.clone(), generator_addr.clone(), retry);
        harness.authenticate(&self.credentials).await?;

        let session_id = harness.start_test(&service_addr).await?;
        self.session_id = Some(session_id.clone());
        let monitor = LogMonitor::new(
            self.http.clone(),
            generator_addr,
            session_id.clone(),
            &self.config.run.data_dir,
        );
        let mut session = TestSession::new(session_id);

        self.transition(ExperimentPhase::TestRunning);
        let completion = self
            .control_loop(&harness, &monitor, &mut session, shutdown)
            .await?;
        self.transition(ExperimentPhase::Completed);
        Ok(completion)
    }

    /// The scaling control loop: one sample per tick, one decision per
    /// sample. The cooldown clock only restarts on successful capacity
    /// actions, so a string of failed polls can never mask a due scale-up.
    async fn control_loop(
        &mut self,
        harness: &HarnessClient,
        monitor: &LogMonitor,
        session: &mut TestSession,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ExperimentResult<Completion> {
        let cfg = self.config.experiment.clone();
        let deadline = Instant::now() + cfg.session_timeout;
        let mut ticker = tokio::time::interval(cfg.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => return Err(ExperimentError::Cancelled),
            }

            if Instant::now() >= deadline {
                return Err(ExperimentError::SessionTimeout {
                    limit: cfg.session_timeout,
                });
            }

            let sample = match monitor.sample().await {
                Ok(sample) => sample,
                Err(e) => {
                    warn!(error = %e, "log poll failed; skipping sample");
                    continue;
                }
            };

            match decide(&sample, session.since_last_scale(), cfg.cooldown, cfg.rps_target) {
                Decision::Wait => {
                    debug!(
                        rps = sample.throughput,
                        since_scale = ?session.since_last_scale(),
                        "holding"
                    );
                }
                Decision::Complete(completion) => {
                    if matches!(completion, Completion::MarkerSeen) {
                        session.mark_completed();
                    }
                    info!(
                        rps = sample.throughput,
                        session_id = %session.id(),
                        age = ?session.age(),
                        "test session over"
                    );
                    return Ok(completion);
                }
                Decision::ScaleUp => {
                    info!(
                        rps = sample.throughput,
                        target = cfg.rps_target,
                        "throughput below target; adding capacity"
                    );
                    self.transition(ExperimentPhase::ScalingUp);
                    self.scale_up(harness, monitor, session, shutdown).await?;
                    self.transition(ExperimentPhase::TestRunning);
                }
            }
        }
    }

    /// Launch, await, tag, and register one more service instance, then
    /// tell the generator about it. Only a finished action (including an
    /// add the generator no longer needs) restarts the cooldown clock.
    async fn scale_up(
        &mut self,
        harness: &HarnessClient,
        monitor: &LogMonitor,
        session: &mut TestSession,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ExperimentResult<()> {
        let id = self.launch(Role::ServiceNode).await?;
        let address = self.await_ready(&id, shutdown).await?;
        self.tag(&id).await?;

        match harness.add_capacity(&address, monitor).await? {
            AddOutcome::Added => {
                info!(
                    %id,
                    %address,
                    services = self.fleet.service_count(),
                    "service capacity added"
                );
            }
            AddOutcome::Abandoned => {
                info!(%id, "generator finished before the new backend joined");
            }
        }
        session.record_scale();
        self.scale_ups += 1;
        Ok(())
    }

    async fn launch(&mut self, role: Role) -> ExperimentResult<String> {
        let spec = self.launch_spec_for(role);
        let id = self.provider.run_instance(&spec).await?;
        info!(%id, %role, image = %spec.image_id, "instance launched");
        self.fleet.track_instance(id.clone(), role);
        Ok(id)
    }

    async fn tag(&self, instance_id: &str) -> ExperimentResult<()> {
        self.provider
            .tag_instance(instance_id, "Project", &self.config.provider.project_tag)
            .await?;
        Ok(())
    }

    /// Poll an instance until it is running with a published address.
    /// Transient describe failures (not-found just after launch included)
    /// are re-polled, never escalated; only the deadline ends the wait.
    async fn await_ready(
        &self,
        instance_id: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ExperimentResult<String> {
        let started = Instant::now();
        let deadline = started + self.config.experiment.ready_timeout;
        loop {
            match self.provider.describe_instance(instance_id).await {
                Ok(desc) => {
                    if let Some(address) = desc.ready_address() {
                        debug!(
                            %instance_id,
                            %address,
                            waited = ?started.elapsed(),
                            "instance ready"
                        );
                        return Ok(address.to_string());
                    }
                    debug!(%instance_id, state = %desc.state, "instance not ready yet");
                }
                Err(e) if e.is_transient() => {
                    debug!(%instance_id, error = %e, "describe failed; will re-poll");
                }
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                return Err(ExperimentError::ReadyTimeout {
                    instance_id: instance_id.to_string(),
                    waited: started.elapsed(),
                });
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.experiment.ready_poll_interval) => {}
                _ = shutdown.changed() => return Err(ExperimentError::Cancelled),
            }
        }
    }
}
