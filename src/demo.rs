//! A bank with a pool of tellers: the classic single-queue model.
//!
//! Customers arrive with exponential inter-arrival times, queue FIFO for a
//! teller, are served for an exponential time and leave. Statistics
//! collected before the warm-up boundary are discarded.
//!
//! Variates come from a seeded ChaCha generator, so a given seed always
//! reproduces the same run.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::DemoConfig;
use crate::element::ElementId;
use crate::error::SimResult;
use crate::executive::Executive;
use crate::model::Model;
use crate::process::{Process, ProcessContext, Step};
use crate::queue::Discipline;
use crate::resource::ResourceId;
use crate::time::SimTime;

/// Per-replication statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankStats {
    pub arrivals: u64,
    pub served: u64,
    /// Customers that started service.
    pub started: u64,
    pub total_wait: f64,
    pub max_wait: f64,
}

impl BankStats {
    pub fn mean_wait(&self) -> f64 {
        if self.started == 0 {
            0.0
        } else {
            self.total_wait / self.started as f64
        }
    }

    fn record_wait(&mut self, wait: f64) {
        self.started += 1;
        self.total_wait += wait;
        self.max_wait = self.max_wait.max(wait);
    }
}

impl std::fmt::Display for BankStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "arrivals={} served={} mean_wait={:.3} max_wait={:.3}",
            self.arrivals,
            self.served,
            self.mean_wait(),
            self.max_wait
        )
    }
}

pub struct BankModel {
    config: DemoConfig,
    rng: ChaCha8Rng,
    tellers: ResourceId,
    pub stats: BankStats,
    /// Statistics of every finished replication, in order.
    pub history: Vec<BankStats>,
}

impl BankModel {
    /// Register the bank's elements on `exec` and build the model.
    pub fn build(exec: &mut Executive<BankModel>, config: &DemoConfig) -> SimResult<Self> {
        let bank = exec.add_group("bank", ElementId::ROOT);
        let tellers =
            exec.create_resource_in(bank, "tellers", f64::from(config.servers), Discipline::Fifo)?;
        Ok(BankModel {
            config: config.clone(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            tellers,
            stats: BankStats::default(),
            history: Vec::new(),
        })
    }

    pub fn tellers(&self) -> ResourceId {
        self.tellers
    }

    fn exponential(&mut self, mean: f64) -> f64 {
        // 1 - u lies in (0, 1], so the log is finite.
        let u: f64 = self.rng.gen();
        -mean * (1.0 - u).ln()
    }
}

impl Model for BankModel {
    type Message = ();

    fn initialize(&mut self, exec: &mut Executive<Self>) -> SimResult<()> {
        self.stats = BankStats::default();
        let mut arrivals = 0u64;
        exec.activate(
            "arrivals",
            move |bank: &mut BankModel, cx: &mut ProcessContext<'_, BankModel>| -> SimResult<Step> {
                arrivals += 1;
                cx.activate(format!("customer-{}", arrivals), Customer::new(), 0.0)?;
                let gap = bank.exponential(bank.config.arrival_mean);
                Ok(Step::Delay(gap))
            },
            0.0,
        )?;
        Ok(())
    }

    fn warm_up(&mut self, _exec: &mut Executive<Self>) -> SimResult<()> {
        self.stats = BankStats::default();
        Ok(())
    }

    fn replication_ended(&mut self, _exec: &mut Executive<Self>) -> SimResult<()> {
        self.history.push(self.stats.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Arrive,
    Seized,
    Served,
}

/// One customer's visit.
struct Customer {
    stage: Stage,
    arrived: SimTime,
}

impl Customer {
    fn new() -> Self {
        Customer {
            stage: Stage::Arrive,
            arrived: SimTime::ZERO,
        }
    }
}

impl Process<BankModel> for Customer {
    fn resume(
        &mut self,
        bank: &mut BankModel,
        cx: &mut ProcessContext<'_, BankModel>,
    ) -> SimResult<Step> {
        match self.stage {
            Stage::Arrive => {
                self.arrived = cx.now();
                bank.stats.arrivals += 1;
                self.stage = Stage::Seized;
                Ok(Step::Seize {
                    resource: bank.tellers,
                    amount: 1.0,
                })
            }
            Stage::Seized => {
                let wait = cx.now().duration_since(self.arrived).unwrap_or(0.0);
                bank.stats.record_wait(wait);
                self.stage = Stage::Served;
                let service = bank.exponential(bank.config.service_mean);
                Ok(Step::Delay(service))
            }
            Stage::Served => {
                cx.release(bank.tellers, 1.0)?;
                bank.stats.served += 1;
                Ok(Step::Done)
            }
        }
    }
}
