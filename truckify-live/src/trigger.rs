//! Debounced, per-plan re-optimization.
//!
//! The first deviation signal for a plan arms a debounce timer; further
//! signals inside the window are coalesced into it. When the timer fires a new
//! run starts with the next generation number and the optimizer runs on a
//! blocking worker. A run only commits if it is still the newest run started
//! for its plan; anything older is discarded as superseded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use truckify_core::PlanId;

use crate::{ReplanSignal, Replanner};

/// Re-optimization counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerStats {
    /// Deviation signals received.
    pub signals: u64,
    /// Signals folded into an already armed run.
    pub coalesced: u64,
    /// Optimizer runs started.
    pub runs_started: u64,
    /// Runs whose plan was committed.
    pub commits: u64,
    /// Runs discarded because a newer run started or the plan moved on.
    pub superseded: u64,
    /// Runs that ended in an optimizer error.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    signals: AtomicU64,
    coalesced: AtomicU64,
    runs_started: AtomicU64,
    commits: AtomicU64,
    superseded: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TriggerStats {
        TriggerStats {
            signals: self.signals.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            runs_started: self.runs_started.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct PlanState {
    armed: bool,
    generation: u64,
}

#[derive(Debug)]
struct Shared {
    replanner: Replanner,
    debounce: Duration,
    plans: Mutex<HashMap<PlanId, PlanState>>,
    counters: Counters,
    pending: watch::Sender<usize>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HashMap<PlanId, PlanState>> {
        self.plans.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Coalescing re-optimization scheduler keyed by plan.
///
/// Cloning yields another handle to the same scheduler.
#[derive(Debug, Clone)]
pub struct ReoptimizationTrigger {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl ReoptimizationTrigger {
    /// Schedule runs of `replanner` on `runtime`, debounced by `debounce`.
    #[must_use]
    pub fn new(replanner: Replanner, debounce: Duration, runtime: Handle) -> Self {
        let (pending, _) = watch::channel(0_usize);
        Self {
            shared: Arc::new(Shared {
                replanner,
                debounce,
                plans: Mutex::new(HashMap::new()),
                counters: Counters::default(),
                pending,
            }),
            runtime,
        }
    }

    /// Debounce window in effect.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        self.shared.debounce
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> TriggerStats {
        self.shared.counters.snapshot()
    }

    pub(crate) fn replanner(&self) -> &Replanner {
        &self.shared.replanner
    }

    /// Request a re-optimization of `plan_id`.
    ///
    /// Never blocks: the run happens on the runtime after the debounce
    /// window.
    pub fn signal(&self, plan_id: &PlanId) {
        Counters::bump(&self.shared.counters.signals);
        {
            let mut plans = self.shared.lock();
            let state = plans.entry(plan_id.clone()).or_default();
            if state.armed {
                Counters::bump(&self.shared.counters.coalesced);
                log::debug!("coalesced re-optimization signal for plan {plan_id}");
                return;
            }
            state.armed = true;
        }
        self.shared
            .pending
            .send_modify(|count| *count = count.saturating_add(1));

        let trigger = self.clone();
        let target = plan_id.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(trigger.shared.debounce).await;
            trigger.run(target).await;
            trigger
                .shared
                .pending
                .send_modify(|count| *count = count.saturating_sub(1));
        });
    }

    /// Wait until no run is armed or in flight.
    pub async fn wait_idle(&self) {
        let mut pending = self.shared.pending.subscribe();
        if let Err(err) = pending.wait_for(|count| *count == 0).await {
            log::debug!("re-optimization scheduler closed: {err}");
        }
    }

    /// Drop scheduling state for a plan that is no longer active.
    ///
    /// State for a plan with a run still armed is kept; that run clears it
    /// once it finds the plan gone.
    pub(crate) fn forget(&self, plan_id: &PlanId) {
        let mut plans = self.shared.lock();
        if plans.get(plan_id).is_some_and(|state| !state.armed) {
            plans.remove(plan_id);
        }
    }

    async fn run(&self, plan_id: PlanId) {
        let generation = {
            let mut plans = self.shared.lock();
            let state = plans.entry(plan_id.clone()).or_default();
            state.armed = false;
            state.generation = state.generation.saturating_add(1);
            state.generation
        };
        let Some(prepared) = self.shared.replanner.prepare(&plan_id) else {
            self.forget(&plan_id);
            return;
        };
        Counters::bump(&self.shared.counters.runs_started);
        log::debug!("re-optimizing plan {plan_id} (run {generation})");

        let shared = Arc::clone(&self.shared);
        let joined = tokio::task::spawn_blocking(move || {
            let result = shared.replanner.run(&prepared);
            (prepared, result)
        })
        .await;
        let (prepared, result) = match joined {
            Ok(finished) => finished,
            Err(err) => {
                Counters::bump(&self.shared.counters.failed);
                log::error!("re-optimization of plan {plan_id} aborted: {err}");
                return;
            }
        };

        let plans = self.shared.lock();
        let newest = plans
            .get(&plan_id)
            .is_some_and(|state| state.generation == generation);
        if !newest {
            Counters::bump(&self.shared.counters.superseded);
            log::warn!("discarding superseded run {generation} for plan {plan_id}");
            return;
        }
        match result {
            Ok(response) => {
                if self.shared.replanner.apply(prepared, response).is_some() {
                    Counters::bump(&self.shared.counters.commits);
                } else {
                    Counters::bump(&self.shared.counters.superseded);
                    drop(plans);
                    self.signal(&plan_id);
                }
            }
            Err(err) => {
                drop(plans);
                Counters::bump(&self.shared.counters.failed);
                self.shared.replanner.report_failure(&plan_id, &err);
            }
        }
    }
}

impl ReplanSignal for ReoptimizationTrigger {
    fn on_deviation(&self, plan_id: &PlanId) {
        self.signal(plan_id);
    }
}
