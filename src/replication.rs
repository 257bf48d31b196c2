//! Replications: repeated independent runs of one model.
//!
//! Each replication resets the executive, lets the model seed itself,
//! runs through an optional warm-up boundary and stops at a fixed length.
//! Observers are told about every phase. A replication whose loop fails is
//! recorded as failed and never mixed into the completed results.

use tracing::{info, warn};

use crate::config::ExperimentConfig;
use crate::error::{SimError, SimResult};
use crate::executive::Executive;
use crate::model::Model;
use crate::time::SimTime;

/// How an experiment is run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationSettings {
    pub replications: u32,
    /// Length of each replication in simulated time.
    pub length: f64,
    /// Warm-up period; `0.0` disables the boundary.
    pub warm_up: f64,
    /// Record a failed replication and carry on instead of aborting.
    pub continue_on_failure: bool,
    /// Per-replication event limit.
    pub max_events: Option<u64>,
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        ReplicationSettings {
            replications: 1,
            length: 100.0,
            warm_up: 0.0,
            continue_on_failure: false,
            max_events: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationOutcome {
    Completed { end_time: SimTime, events: u64 },
    Failed { error: SimError, at: SimTime },
}

/// Result of one replication.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationReport {
    /// One-based replication number.
    pub number: u32,
    pub outcome: ReplicationOutcome,
    /// Whether the warm-up boundary was crossed.
    pub warmed_up: bool,
}

impl ReplicationReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, ReplicationOutcome::Completed { .. })
    }
}

impl std::fmt::Display for ReplicationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            ReplicationOutcome::Completed { end_time, events } => write!(
                f,
                "replication {}: completed at {} after {} events",
                self.number, end_time, events
            ),
            ReplicationOutcome::Failed { error, at } => {
                write!(f, "replication {}: failed at {}: {}", self.number, at, error)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentReport {
    pub name: String,
    pub replications: Vec<ReplicationReport>,
}

impl ExperimentReport {
    pub fn completed(&self) -> impl Iterator<Item = &ReplicationReport> {
        self.replications.iter().filter(|r| r.is_completed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReplicationReport> {
        self.replications.iter().filter(|r| !r.is_completed())
    }

    pub fn all_completed(&self) -> bool {
        self.replications.iter().all(|r| r.is_completed())
    }
}

/// Hooks into the replication lifecycle. Every method defaults to a no-op.
pub trait ReplicationObserver {
    fn on_replication_started(&mut self, _number: u32) {}

    fn on_warm_up(&mut self, _number: u32, _time: SimTime) {}

    fn on_replication_ended(&mut self, _report: &ReplicationReport) {}
}

/// Drives replications of a model on one executive.
pub struct ReplicationController {
    name: String,
    settings: ReplicationSettings,
    observers: Vec<Box<dyn ReplicationObserver>>,
    next_number: u32,
}

impl ReplicationController {
    pub fn new(settings: ReplicationSettings) -> Self {
        ReplicationController {
            name: String::from("experiment"),
            settings,
            observers: Vec::new(),
            next_number: 1,
        }
    }

    pub fn from_config(config: &ExperimentConfig) -> Self {
        let mut controller = Self::new(config.settings());
        controller.name = config.name.clone();
        controller
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn settings(&self) -> &ReplicationSettings {
        &self.settings
    }

    pub fn add_observer(&mut self, observer: Box<dyn ReplicationObserver>) {
        self.observers.push(observer);
    }

    /// Run one replication of `length`, with a warm-up boundary at
    /// `warm_up` when it is positive.
    ///
    /// Loop errors don't escape; they come back as a
    /// [`ReplicationOutcome::Failed`] report.
    pub fn run_replication<M: Model>(
        &mut self,
        exec: &mut Executive<M>,
        model: &mut M,
        length: f64,
        warm_up: f64,
    ) -> ReplicationReport {
        let number = self.next_number;
        self.next_number += 1;

        exec.reset();
        exec.set_event_limit(self.settings.max_events);
        info!(replication = number, length, warm_up, "replication started");
        for observer in &mut self.observers {
            observer.on_replication_started(number);
        }

        let outcome = match self.drive(exec, model, number, length, warm_up) {
            Ok(()) => ReplicationOutcome::Completed {
                end_time: exec.now(),
                events: exec.events_processed(),
            },
            Err(error) => ReplicationOutcome::Failed {
                error,
                at: exec.now(),
            },
        };
        let report = ReplicationReport {
            number,
            outcome,
            warmed_up: exec.warmed_up(),
        };
        info!(replication = number, events = exec.events_processed(), "replication ended");
        for observer in &mut self.observers {
            observer.on_replication_ended(&report);
        }
        report
    }

    fn drive<M: Model>(
        &mut self,
        exec: &mut Executive<M>,
        model: &mut M,
        number: u32,
        length: f64,
        warm_up: f64,
    ) -> SimResult<()> {
        let end = SimTime::try_new(length)
            .filter(|t| t.as_f64() > 0.0)
            .ok_or(SimError::InvalidDelay { delay: length })?;
        let boundary = if warm_up > 0.0 {
            Some(SimTime::try_new(warm_up).ok_or(SimError::InvalidDelay { delay: warm_up })?)
        } else {
            None
        };

        model.initialize(exec)?;
        if let Some(boundary) = boundary {
            exec.schedule_warm_up(boundary);
        }
        exec.schedule_end(end);

        if boundary.is_some() {
            exec.run_until(model, |e| e.warmed_up())?;
            if exec.warmed_up() {
                let now = exec.now();
                for observer in &mut self.observers {
                    observer.on_warm_up(number, now);
                }
            }
        }
        exec.run(model)?;
        if !exec.reached_end() {
            return Err(SimError::ReplicationTruncated {
                at: exec.now().as_f64(),
                events: exec.events_processed(),
            });
        }
        model.replication_ended(exec)
    }

    /// Run every configured replication in sequence.
    ///
    /// A failed replication aborts the experiment with its error, unless
    /// `continue_on_failure` is set, in which case it is recorded as failed
    /// and the next one starts.
    pub fn run<M: Model>(
        &mut self,
        exec: &mut Executive<M>,
        model: &mut M,
    ) -> SimResult<ExperimentReport> {
        let mut report = ExperimentReport {
            name: self.name.clone(),
            replications: Vec::with_capacity(self.settings.replications as usize),
        };
        let (length, warm_up) = (self.settings.length, self.settings.warm_up);
        info!(experiment = %self.name, replications = self.settings.replications, "experiment started");
        for _ in 0..self.settings.replications {
            let replication = self.run_replication(exec, model, length, warm_up);
            if let ReplicationOutcome::Failed { error, at } = &replication.outcome {
                warn!(replication = replication.number, time = at.as_f64(), %error, "replication failed");
                if !self.settings.continue_on_failure {
                    return Err(error.clone());
                }
            }
            report.replications.push(replication);
        }
        Ok(report)
    }
}
