// Process interaction: resources, signals, timeouts and interrupts.

use chronos::{
    Discipline, ElementId, Executive, Model, Process, ProcessContext, ProcessId, ProcessState,
    ResourceId, SignalId, SimError, SimResult, SimTime, Step, SuspendReason,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Default)]
struct Shop {
    log: Vec<String>,
}

impl Model for Shop {
    type Message = ();
}

type Cx<'a> = ProcessContext<'a, Shop>;

/// Seize `amount` of `resource`, hold it for `hold`, release, finish.
struct Visit {
    resource: ResourceId,
    amount: f64,
    hold: f64,
    stage: u8,
}

impl Visit {
    fn new(resource: ResourceId, amount: f64, hold: f64) -> Self {
        Visit {
            resource,
            amount,
            hold,
            stage: 0,
        }
    }
}

impl Process<Shop> for Visit {
    fn resume(&mut self, shop: &mut Shop, cx: &mut Cx<'_>) -> SimResult<Step> {
        match self.stage {
            0 => {
                self.stage = 1;
                Ok(Step::Seize {
                    resource: self.resource,
                    amount: self.amount,
                })
            }
            1 => {
                shop.log
                    .push(format!("{} granted at {}", cx.name(), cx.now().as_f64()));
                self.stage = 2;
                Ok(Step::Delay(self.hold))
            }
            _ => {
                cx.release(self.resource, self.amount)?;
                Ok(Step::Done)
            }
        }
    }
}

/// Wait on `signal` (optionally with a timeout), log how it ended, finish.
fn waiter(
    signal: SignalId,
    timeout: Option<f64>,
) -> impl FnMut(&mut Shop, &mut ProcessContext<'_, Shop>) -> SimResult<Step> {
    let mut waiting = false;
    move |shop: &mut Shop, cx: &mut ProcessContext<'_, Shop>| {
        if !waiting {
            waiting = true;
            return Ok(match timeout {
                Some(timeout) => Step::WaitForWithin { signal, timeout },
                None => Step::WaitFor(signal),
            });
        }
        shop.log
            .push(format!("{} {:?} at {}", cx.name(), cx.wake(), cx.now().as_f64()));
        Ok(Step::Done)
    }
}

fn seize_lines(exec: &Executive<Shop>) -> Vec<(f64, String, String)> {
    exec.trace()
        .map(|t| t.summary())
        .unwrap_or_default()
        .into_iter()
        .filter(|(_, _, kind)| {
            kind.starts_with("seize-granted") || kind.starts_with("enqueued") || kind.starts_with("release")
        })
        .collect()
}

fn line(time: f64, who: &str, what: &str) -> (f64, String, String) {
    (time, who.to_string(), what.to_string())
}

#[test]
fn single_server_trace() {
    let mut exec: Executive<Shop> = Executive::new();
    exec.enable_trace();
    let mut shop = Shop::default();
    let teller = exec.create_resource("teller", 1.0).unwrap();

    exec.activate("A", Visit::new(teller, 1.0, 5.0), 0.0).unwrap();
    exec.activate("B", Visit::new(teller, 1.0, 5.0), 1.0).unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(
        seize_lines(&exec),
        vec![
            line(0.0, "A", "seize-granted R0 x1"),
            line(1.0, "B", "enqueued R0 x1"),
            line(5.0, "A", "release R0 x1"),
            line(5.0, "B", "seize-granted R0 x1"),
            line(10.0, "B", "release R0 x1"),
        ]
    );
    assert_eq!(shop.log, vec!["A granted at 0", "B granted at 5"]);
    assert_eq!(exec.now(), SimTime::new(10.0));
}

#[test]
fn same_instant_arrivals_are_served_in_order() {
    let mut exec: Executive<Shop> = Executive::new();
    exec.enable_trace();
    let mut shop = Shop::default();
    let teller = exec.create_resource("teller", 1.0).unwrap();

    exec.activate("A", Visit::new(teller, 1.0, 5.0), 0.0).unwrap();
    exec.activate("B", Visit::new(teller, 1.0, 5.0), 0.0).unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(
        seize_lines(&exec),
        vec![
            line(0.0, "A", "seize-granted R0 x1"),
            line(0.0, "B", "enqueued R0 x1"),
            line(5.0, "A", "release R0 x1"),
            line(5.0, "B", "seize-granted R0 x1"),
            line(10.0, "B", "release R0 x1"),
        ]
    );
    assert_eq!(shop.log, vec!["A granted at 0", "B granted at 5"]);
}

#[test]
fn fractional_amounts_fill_capacity_exactly() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let belt = exec.create_resource("belt", 0.3).unwrap();

    exec.activate("a", Visit::new(belt, 0.1, 10.0), 0.0).unwrap();
    exec.activate("b", Visit::new(belt, 0.2, 10.0), 0.0).unwrap();
    // Nothing is left once a and b hold their share.
    exec.activate("c", Visit::new(belt, 0.05, 1.0), 1.0).unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(
        shop.log,
        vec!["a granted at 0", "b granted at 0", "c granted at 10"]
    );
    assert_eq!(exec.resource(belt).unwrap().allocated(), 0.0);
    assert_eq!(exec.total_held(belt), 0.0);
}

#[test]
fn head_of_line_blocks_smaller_requests() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let pool = exec.create_resource("pool", 3.0).unwrap();

    exec.activate("A", Visit::new(pool, 2.0, 5.0), 0.0).unwrap();
    exec.activate("B", Visit::new(pool, 2.0, 5.0), 1.0).unwrap();
    // One unit is free when C arrives, but B is ahead of it.
    exec.activate("C", Visit::new(pool, 1.0, 1.0), 2.0).unwrap();
    exec.run_until(&mut shop, |e| e.next_event_time() > Some(SimTime::new(3.0)))
        .unwrap();
    assert_eq!(exec.resource(pool).unwrap().queue().len(), 2);

    exec.run(&mut shop).unwrap();
    assert_eq!(
        shop.log,
        vec!["A granted at 0", "B granted at 5", "C granted at 5"]
    );
    let resource = exec.resource(pool).unwrap();
    assert_eq!(resource.allocated(), 0.0);
    assert_eq!(resource.grants(), 3);
}

#[test]
fn release_grants_several_waiters_in_order() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let pool = exec.create_resource("pool", 3.0).unwrap();

    exec.activate("big", Visit::new(pool, 3.0, 4.0), 0.0).unwrap();
    exec.activate("x", Visit::new(pool, 1.0, 1.0), 1.0).unwrap();
    exec.activate("y", Visit::new(pool, 2.0, 1.0), 1.0).unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(
        shop.log,
        vec!["big granted at 0", "x granted at 4", "y granted at 4"]
    );
}

#[test]
fn allocation_is_conserved() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let pool = exec.create_resource("pool", 3.0).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    for i in 0..60 {
        let amount = rng.gen_range(1..=3) as f64;
        let hold = rng.gen_range(1..6) as f64;
        let arrive = rng.gen_range(0..40) as f64;
        exec.activate(format!("v{}", i), Visit::new(pool, amount, hold), arrive)
            .unwrap();
    }

    while exec.step(&mut shop).unwrap().is_some() {
        let resource = exec.resource(pool).unwrap();
        assert!(resource.allocated() <= resource.capacity());
        assert_eq!(resource.allocated(), exec.total_held(pool));
    }
    assert_eq!(shop.log.len(), 60);
    assert_eq!(exec.resource(pool).unwrap().allocated(), 0.0);
}

#[test]
fn capacity_increase_grants_waiters() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let pool = exec.create_resource("pool", 1.0).unwrap();

    exec.activate("A", Visit::new(pool, 1.0, 10.0), 0.0).unwrap();
    exec.activate("B", Visit::new(pool, 1.0, 1.0), 0.0).unwrap();
    exec.schedule_after(3.0, move |_s: &mut Shop, e: &mut Executive<Shop>| {
        e.set_capacity(pool, 2.0)
    })
    .unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(shop.log, vec!["A granted at 0", "B granted at 3"]);
}

#[test]
fn over_release_is_an_error() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let pool = exec.create_resource("pool", 2.0).unwrap();

    let mut seized = false;
    let pid = exec
        .activate(
            "greedy",
            move |_s: &mut Shop, cx: &mut Cx<'_>| -> SimResult<Step> {
                if !seized {
                    seized = true;
                    return Ok(Step::Seize {
                        resource: pool,
                        amount: 1.0,
                    });
                }
                cx.release(pool, 2.0)?;
                Ok(Step::Done)
            },
            0.0,
        )
        .unwrap();

    let err = exec.run(&mut shop).unwrap_err();
    assert_eq!(
        err,
        SimError::OverRelease {
            process: pid,
            resource: pool,
            requested: 2.0,
            held: 1.0,
        }
    );
}

#[test]
fn terminating_while_holding_is_an_error() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let pool = exec.create_resource("pool", 1.0).unwrap();

    let mut seized = false;
    let pid = exec
        .activate(
            "forgetful",
            move |_s: &mut Shop, _cx: &mut Cx<'_>| -> SimResult<Step> {
                if !seized {
                    seized = true;
                    return Ok(Step::Seize {
                        resource: pool,
                        amount: 1.0,
                    });
                }
                Ok(Step::Done)
            },
            0.0,
        )
        .unwrap();

    let err = exec.run(&mut shop).unwrap_err();
    assert_eq!(
        err,
        SimError::UnreleasedResourcesAtTermination {
            process: pid,
            held: vec![(pool, 1.0)],
        }
    );
}

#[test]
fn seize_larger_than_capacity_is_rejected() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let pool = exec.create_resource("pool", 1.0).unwrap();
    exec.activate("huge", Visit::new(pool, 5.0, 1.0), 0.0).unwrap();

    let err = exec.run(&mut shop).unwrap_err();
    assert!(matches!(err, SimError::InvalidAmount { .. }));
}

#[test]
fn signal_release_range_is_ordered() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let gate = exec.create_signal("gate");

    exec.activate("P1", waiter(gate, None), 0.0).unwrap();
    exec.activate("P2", waiter(gate, None), 0.0).unwrap();
    let p3 = exec.activate("P3", waiter(gate, None), 0.0).unwrap();
    exec.schedule_after(1.0, move |_s: &mut Shop, e: &mut Executive<Shop>| {
        let released = e.signal_release(gate, 0..=1)?;
        assert_eq!(released, 2);
        Ok(())
    })
    .unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(shop.log, vec!["P1 Signaled at 1", "P2 Signaled at 1"]);
    assert_eq!(exec.signal(gate).unwrap().waiting(), &[p3]);
    assert_eq!(
        exec.process_state(p3),
        Some(ProcessState::Suspended(SuspendReason::Signal(gate)))
    );
}

#[test]
fn signal_release_out_of_range_is_a_noop() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let gate = exec.create_signal("gate");
    exec.activate("P1", waiter(gate, None), 0.0).unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(exec.signal_release(gate, 5..9).unwrap(), 0);
    assert_eq!(exec.signal_release(gate, 0..0).unwrap(), 0);
    assert_eq!(exec.signal(gate).unwrap().waiting_count(), 1);
}

#[test]
fn signal_release_from_a_process() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let gate = exec.create_signal("gate");
    exec.activate("P1", waiter(gate, None), 0.0).unwrap();
    exec.activate("P2", waiter(gate, None), 0.0).unwrap();

    let mut slept = false;
    exec.activate(
        "opener",
        move |_s: &mut Shop, cx: &mut Cx<'_>| -> SimResult<Step> {
            if !slept {
                slept = true;
                return Ok(Step::Delay(2.0));
            }
            cx.signal_release_all(gate)?;
            Ok(Step::Done)
        },
        0.0,
    )
    .unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(shop.log, vec!["P1 Signaled at 2", "P2 Signaled at 2"]);
    assert_eq!(exec.signal(gate).unwrap().releases(), 1);
}

#[test]
fn wait_times_out() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let gate = exec.create_signal("gate");
    exec.activate("P", waiter(gate, Some(5.0)), 0.0).unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(shop.log, vec!["P TimedOut at 5"]);
    assert_eq!(exec.signal(gate).unwrap().waiting_count(), 0);
}

#[test]
fn release_beats_timeout() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let gate = exec.create_signal("gate");
    exec.activate("P", waiter(gate, Some(5.0)), 0.0).unwrap();
    exec.schedule_after(2.0, move |_s: &mut Shop, e: &mut Executive<Shop>| {
        e.signal_release(gate, ..)?;
        Ok(())
    })
    .unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(shop.log, vec!["P Signaled at 2"]);
    // The timeout was cancelled, so nothing ran at t=5.
    assert_eq!(exec.now(), SimTime::new(2.0));
}

#[test]
fn interrupt_cuts_a_delay_short() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();

    let mut slept = false;
    let pid = exec
        .activate(
            "sleeper",
            move |shop: &mut Shop, cx: &mut Cx<'_>| -> SimResult<Step> {
                if !slept {
                    slept = true;
                    return Ok(Step::Delay(10.0));
                }
                shop.log.push(format!("{:?} at {}", cx.wake(), cx.now().as_f64()));
                Ok(Step::Done)
            },
            0.0,
        )
        .unwrap();
    exec.schedule_after(3.0, move |_s: &mut Shop, e: &mut Executive<Shop>| {
        assert!(e.interrupt(pid)?);
        assert!(!e.interrupt(pid)?);
        Ok(())
    })
    .unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(shop.log, vec!["Interrupted at 3"]);
    assert_eq!(exec.now(), SimTime::new(3.0));
    assert_eq!(exec.process_state(pid), Some(ProcessState::Terminated));
}

#[test]
fn interrupt_withdraws_from_resource_queue() {
    let mut exec: Executive<Shop> = Executive::new();
    exec.enable_trace();
    let mut shop = Shop::default();
    let pool = exec.create_resource("pool", 1.0).unwrap();

    exec.activate("A", Visit::new(pool, 1.0, 10.0), 0.0).unwrap();
    let mut asked = false;
    let b = exec
        .activate(
            "B",
            move |shop: &mut Shop, cx: &mut Cx<'_>| -> SimResult<Step> {
                if !asked {
                    asked = true;
                    return Ok(Step::Seize {
                        resource: pool,
                        amount: 1.0,
                    });
                }
                shop.log.push(format!("B {:?} holding {}", cx.wake(), cx.held(pool)));
                Ok(Step::Done)
            },
            1.0,
        )
        .unwrap();
    exec.schedule_after(2.0, move |_s: &mut Shop, e: &mut Executive<Shop>| {
        assert_eq!(e.resource(pool).map(|r| r.queue().len()), Some(1));
        e.interrupt(b)?;
        assert_eq!(e.resource(pool).map(|r| r.queue().len()), Some(0));
        Ok(())
    })
    .unwrap();
    exec.run(&mut shop).unwrap();

    assert_eq!(shop.log, vec!["A granted at 0", "B Interrupted holding 0"]);
    let interrupted = exec
        .trace()
        .unwrap()
        .summary()
        .into_iter()
        .any(|(t, who, kind)| t == 2.0 && who == "B" && kind == "interrupted");
    assert!(interrupted);
}

#[test]
fn interrupting_an_unstarted_process_does_nothing() {
    let mut exec: Executive<Shop> = Executive::new();
    let pool = exec.create_resource("pool", 1.0).unwrap();
    let pid = exec.activate("late", Visit::new(pool, 1.0, 1.0), 5.0).unwrap();
    assert!(!exec.interrupt(pid).unwrap());
    assert_eq!(exec.process_state(pid), Some(ProcessState::NotStarted));
    assert!(matches!(
        exec.interrupt(ProcessId::new(42)),
        Err(SimError::UnknownProcess(_))
    ));
}

#[test]
fn wake_reasons_follow_the_suspension() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let pool = exec.create_resource("pool", 1.0).unwrap();

    let mut stage = 0;
    exec.activate(
        "observer",
        move |shop: &mut Shop, cx: &mut Cx<'_>| -> SimResult<Step> {
            shop.log.push(format!("{:?}", cx.wake()));
            stage += 1;
            match stage {
                1 => Ok(Step::Delay(1.0)),
                2 => Ok(Step::Seize {
                    resource: pool,
                    amount: 1.0,
                }),
                _ => {
                    cx.release_all(pool)?;
                    Ok(Step::Done)
                }
            }
        },
        0.0,
    )
    .unwrap();
    exec.run(&mut shop).unwrap();

    // An immediate grant re-enters the process without a calendar trip.
    assert_eq!(shop.log, vec!["Activated", "Elapsed", "Granted"]);
    assert_eq!(exec.now(), SimTime::new(1.0));
}

#[test]
fn ranked_queue_serves_lowest_rank_first() {
    let mut exec: Executive<Shop> = Executive::new();
    let mut shop = Shop::default();
    let desk = exec
        .create_resource_in(ElementId::ROOT, "desk", 1.0, Discipline::Ranked)
        .unwrap();
    exec.activate("first", Visit::new(desk, 1.0, 5.0), 0.0).unwrap();

    for (name, rank) in [("low", 1), ("urgent", -1), ("also-low", 1)] {
        let mut visit = Visit::new(desk, 1.0, 1.0);
        let mut ranked = false;
        exec.activate(
            name,
            move |shop: &mut Shop, cx: &mut Cx<'_>| -> SimResult<Step> {
                if !ranked {
                    ranked = true;
                    cx.set_rank(rank);
                }
                visit.resume(shop, cx)
            },
            1.0,
        )
        .unwrap();
    }
    exec.run(&mut shop).unwrap();

    assert_eq!(
        shop.log,
        vec![
            "first granted at 0",
            "urgent granted at 5",
            "low granted at 6",
            "also-low granted at 7",
        ]
    );
}
