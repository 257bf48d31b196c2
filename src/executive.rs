//! The executive: owns the calendar and the clock and drives the loop.
//!
//! The loop pops the minimal event, advances the clock to its time and
//! dispatches it. It is purely synchronous and single-threaded; process
//! "concurrency" is nothing more than the interleaving of resumption
//! events on the calendar.
//!
//! Besides plain scheduling, the executive is where the process layer
//! lives: it owns the process table and the resource and signal arenas,
//! because granting a resource or firing a signal means scheduling
//! resumptions on its own calendar.

use std::ops::RangeBounds;

use tracing::{debug, trace};

use crate::calendar::{Calendar, CalendarKind};
use crate::element::{ElementId, ElementKind, ElementRegistry};
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventHandle, EventId, EventIdGen, Priority};
use crate::model::Model;
use crate::process::{
    Process, ProcessContext, ProcessId, ProcessSlot, ProcessState, Step, SuspendReason, Wake,
};
use crate::queue::Discipline;
use crate::resource::{Request, Resource, ResourceId, AMOUNT_EPSILON};
use crate::signal::{Signal, SignalId};
use crate::time::SimTime;
use crate::trace::{Trace, TraceEntry, TraceKind};

/// A scheduled action. Receives the model, the executive and the optional
/// message it was scheduled with.
pub type Action<M> =
    Box<dyn FnOnce(&mut M, &mut Executive<M>, Option<<M as Model>::Message>) -> SimResult<()>>;

/// What the executive does when an event comes off the calendar.
pub(crate) enum EventKind<M: Model> {
    Action {
        action: Action<M>,
        message: Option<M::Message>,
    },
    Resume {
        process: ProcessId,
        wake: Wake,
    },
    WarmUp,
    EndReplication,
}

impl<M: Model> EventKind<M> {
    fn label(&self) -> &'static str {
        match self {
            EventKind::Action { .. } => "action",
            EventKind::Resume { .. } => "resume",
            EventKind::WarmUp => "warm-up",
            EventKind::EndReplication => "end-replication",
        }
    }
}

/// The identity of the event currently (or last) dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventInfo {
    pub id: EventId,
    pub time: SimTime,
    pub priority: Priority,
}

// ── Executive ─────────────────────────────────────────────────────────

/// Top-level simulation driver.
///
/// Owns one calendar and the simulated clock. Model state is borrowed per
/// call, never owned, so one executive can be reset and reused across
/// replications.
pub struct Executive<M: Model> {
    calendar: Box<dyn Calendar<EventKind<M>>>,
    ids: EventIdGen,
    clock: SimTime,
    events_processed: u64,
    stopping: bool,
    end_time: Option<SimTime>,
    max_events: Option<u64>,
    warmed_up: bool,
    reached_end: bool,
    current: Option<EventInfo>,
    processes: Vec<ProcessSlot<M>>,
    resources: Vec<Resource>,
    signals: Vec<Signal>,
    elements: ElementRegistry,
    trace: Option<Trace>,
}

impl<M: Model> Executive<M> {
    /// Create an executive at time zero, backed by a binary-heap calendar.
    pub fn new() -> Self {
        Self::with_calendar(CalendarKind::Heap)
    }

    /// Create an executive backed by the given calendar kind.
    pub fn with_calendar(kind: CalendarKind) -> Self {
        Executive {
            calendar: kind.build(),
            ids: EventIdGen::new(),
            clock: SimTime::ZERO,
            events_processed: 0,
            stopping: false,
            end_time: None,
            max_events: None,
            warmed_up: false,
            reached_end: false,
            current: None,
            processes: Vec::new(),
            resources: Vec::new(),
            signals: Vec::new(),
            elements: ElementRegistry::new(),
            trace: None,
        }
    }

    // ── Configuration ─────────────────────────────────────────

    /// Start recording an execution trace.
    pub fn enable_trace(&mut self) {
        if self.trace.is_none() {
            self.trace = Some(Trace::new());
        }
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    /// Never dispatch events scheduled after `end`. The clock is moved to
    /// `end` when the loop stops there.
    pub fn set_end_time(&mut self, end: Option<SimTime>) {
        self.end_time = end;
    }

    /// Stop after this many dispatched events (counted since the last reset).
    pub fn set_event_limit(&mut self, limit: Option<u64>) {
        self.max_events = limit;
    }

    pub fn calendar_kind(&self) -> CalendarKind {
        self.calendar.kind()
    }

    // ── Clock and counters ────────────────────────────────────

    /// Current simulated time.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.clock
    }

    /// Events dispatched since the last reset. Cancelled events don't count.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Events in the calendar, cancelled-but-unpopped ones included.
    pub fn pending_count(&self) -> usize {
        self.calendar.len()
    }

    /// Time of the next event in the calendar, if any.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.calendar.peek_min().map(|e| e.time())
    }

    /// The event being dispatched, while inside an action.
    pub fn current_event(&self) -> Option<EventInfo> {
        self.current
    }

    /// Returns `true` if there are no more events to process.
    pub fn is_finished(&self) -> bool {
        self.calendar.is_empty()
    }

    /// Ask the loop to stop once the current event completes. Sticky until
    /// the next `reset`.
    pub fn stop(&mut self) {
        self.stopping = true;
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    /// Whether the warm-up boundary has been crossed in this replication.
    pub fn warmed_up(&self) -> bool {
        self.warmed_up
    }

    /// Whether the end-of-replication marker has been dispatched.
    pub fn reached_end(&self) -> bool {
        self.reached_end
    }

    // ── Scheduling ────────────────────────────────────────────

    /// Schedule `action` to run `delay` from now.
    ///
    /// Fails with [`SimError::InvalidDelay`] for negative or non-finite
    /// delays; nothing is queued in that case.
    pub fn schedule<F>(
        &mut self,
        action: F,
        delay: f64,
        priority: Priority,
        message: Option<M::Message>,
    ) -> SimResult<EventHandle>
    where
        F: FnOnce(&mut M, &mut Executive<M>, Option<M::Message>) -> SimResult<()> + 'static,
    {
        let time = self.time_after(delay)?;
        Ok(self.post(
            time,
            priority,
            EventKind::Action {
                action: Box::new(action),
                message,
            },
        ))
    }

    /// Schedule `action` at default priority, with no message.
    pub fn schedule_after<F>(&mut self, delay: f64, action: F) -> SimResult<EventHandle>
    where
        F: FnOnce(&mut M, &mut Executive<M>) -> SimResult<()> + 'static,
    {
        self.schedule(
            move |model, exec, _message| action(model, exec),
            delay,
            Priority::DEFAULT,
            None,
        )
    }

    /// Schedule `action` at an absolute time.
    pub fn schedule_at<F>(
        &mut self,
        at: SimTime,
        priority: Priority,
        action: F,
        message: Option<M::Message>,
    ) -> SimResult<EventHandle>
    where
        F: FnOnce(&mut M, &mut Executive<M>, Option<M::Message>) -> SimResult<()> + 'static,
    {
        if at < self.clock {
            return Err(SimError::NonCausalEvent {
                requested: at.as_f64(),
                current: self.clock.as_f64(),
            });
        }
        Ok(self.post(
            at,
            priority,
            EventKind::Action {
                action: Box::new(action),
                message,
            },
        ))
    }

    /// Cancel a pending event. A no-op (returning `false`) if the event has
    /// already run or was already cancelled.
    pub fn cancel(&mut self, handle: &EventHandle) -> bool {
        let cancelled = self.calendar.cancel(handle);
        if cancelled {
            trace!(event = %handle.id(), "cancelled event");
        }
        cancelled
    }

    pub(crate) fn schedule_warm_up(&mut self, at: SimTime) -> EventHandle {
        self.post(at, Priority::WARM_UP, EventKind::WarmUp)
    }

    pub(crate) fn schedule_end(&mut self, at: SimTime) -> EventHandle {
        self.post(at, Priority::END_REPLICATION, EventKind::EndReplication)
    }

    fn time_after(&self, delay: f64) -> SimResult<SimTime> {
        self.clock
            .plus(delay)
            .ok_or(SimError::InvalidDelay { delay })
    }

    fn post(&mut self, time: SimTime, priority: Priority, kind: EventKind<M>) -> EventHandle {
        let id = self.ids.next_id();
        trace!(
            event = %id,
            time = time.as_f64(),
            priority = priority.value(),
            kind = kind.label(),
            "scheduled event"
        );
        let event = Event::new(id, time, priority, kind);
        let handle = event.handle();
        self.calendar.insert(event);
        handle
    }

    // ── Loop ──────────────────────────────────────────────────

    /// Execute a single event: pop, advance time, dispatch.
    ///
    /// Cancelled events on top of the calendar are discarded first.
    /// Returns `Ok(None)` if the calendar is empty.
    pub fn step(&mut self, model: &mut M) -> SimResult<Option<EventInfo>> {
        self.skip_cancelled();
        if self.calendar.is_empty() {
            return Ok(None);
        }
        let event = self.pop_live()?;

        // Simulated time must never go backward.
        assert!(
            event.time() >= self.clock,
            "time went backward: clock={}, event={}",
            self.clock,
            event.time()
        );
        self.clock = event.time();
        self.events_processed += 1;

        let info = EventInfo {
            id: event.id(),
            time: event.time(),
            priority: event.priority(),
        };
        self.current = Some(info);
        trace!(event = %info.id, time = info.time.as_f64(), "dispatching event");
        let result = self.dispatch(model, event.into_payload());
        self.current = None;
        result.map(|_| Some(info))
    }

    /// The central loop.
    ///
    /// Runs until the calendar is empty, `stop` returns `true`, the model
    /// called [`Executive::stop`], the next event lies beyond the end time,
    /// or the event limit is reached. The predicate is checked before
    /// every event. An error from any action aborts the loop and is
    /// returned unchanged.
    ///
    /// Returns the number of events dispatched during this call.
    pub fn run_until<P>(&mut self, model: &mut M, mut stop: P) -> SimResult<u64>
    where
        P: FnMut(&Executive<M>) -> bool,
    {
        let start = self.events_processed;
        loop {
            if self.stopping || stop(self) {
                break;
            }
            if self
                .max_events
                .is_some_and(|limit| self.events_processed >= limit)
            {
                break;
            }
            self.skip_cancelled();
            let Some(next) = self.next_event_time() else {
                break;
            };
            if let Some(end) = self.end_time {
                if next > end {
                    if self.clock < end {
                        self.clock = end;
                    }
                    break;
                }
            }
            self.step(model)?;
        }
        Ok(self.events_processed - start)
    }

    /// Run until the calendar is empty (or a stop condition triggers).
    pub fn run(&mut self, model: &mut M) -> SimResult<u64> {
        self.run_until(model, |_| false)
    }

    fn skip_cancelled(&mut self) {
        while self.calendar.peek_min().is_some_and(|e| e.is_cancelled()) {
            if let Some(e) = self.calendar.pop_min() {
                trace!(event = %e.id(), "discarding cancelled event");
            }
        }
    }

    fn pop_live(&mut self) -> SimResult<Event<EventKind<M>>> {
        self.calendar.pop_min().ok_or(SimError::CalendarUnderflow)
    }

    fn dispatch(&mut self, model: &mut M, kind: EventKind<M>) -> SimResult<()> {
        match kind {
            EventKind::Action { action, message } => action(model, self, message),
            EventKind::Resume { process, wake } => self.resume_process(model, process, wake),
            EventKind::WarmUp => {
                self.warmed_up = true;
                self.record(None, TraceKind::WarmUp);
                debug!(time = self.clock.as_f64(), "warm-up boundary crossed");
                model.warm_up(self)
            }
            EventKind::EndReplication => {
                self.stopping = true;
                self.reached_end = true;
                self.record(None, TraceKind::ReplicationEnded);
                Ok(())
            }
        }
    }

    /// Return to time zero with an empty calendar.
    ///
    /// Drops every process, restores resources and signals to their
    /// initial configuration and clears the trace. Element definitions
    /// survive; the event-id counter keeps counting.
    pub fn reset(&mut self) {
        self.calendar.clear();
        self.clock = SimTime::ZERO;
        self.events_processed = 0;
        self.stopping = false;
        self.warmed_up = false;
        self.reached_end = false;
        self.current = None;
        self.processes.clear();
        for resource in &mut self.resources {
            resource.reset();
        }
        for signal in &mut self.signals {
            signal.reset();
        }
        if let Some(trace) = self.trace.as_mut() {
            trace.clear();
        }
        debug!("executive reset");
    }

    // ── Model elements ────────────────────────────────────────

    pub fn elements(&self) -> &ElementRegistry {
        &self.elements
    }

    /// Register a grouping element for organising the model tree.
    pub fn add_group(&mut self, name: impl Into<String>, parent: ElementId) -> ElementId {
        self.elements.register(name, parent, ElementKind::Group)
    }

    /// Create a FIFO resource under the root element.
    pub fn create_resource(&mut self, name: impl Into<String>, capacity: f64) -> SimResult<ResourceId> {
        self.create_resource_in(ElementId::ROOT, name, capacity, Discipline::Fifo)
    }

    pub fn create_resource_in(
        &mut self,
        parent: ElementId,
        name: impl Into<String>,
        capacity: f64,
        discipline: Discipline,
    ) -> SimResult<ResourceId> {
        let name = name.into();
        let id = ResourceId::new(self.resources.len());
        let resource = Resource::new(id, name.clone(), capacity, discipline)?;
        self.resources.push(resource);
        self.elements.register(name, parent, ElementKind::Resource(id));
        Ok(id)
    }

    pub fn create_signal(&mut self, name: impl Into<String>) -> SignalId {
        self.create_signal_in(ElementId::ROOT, name)
    }

    pub fn create_signal_in(&mut self, parent: ElementId, name: impl Into<String>) -> SignalId {
        let name = name.into();
        let id = SignalId::new(self.signals.len());
        self.signals.push(Signal::new(id, name.clone()));
        self.elements.register(name, parent, ElementKind::Signal(id));
        id
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    pub fn signal(&self, id: SignalId) -> Option<&Signal> {
        self.signals.get(id.index())
    }

    // ── Processes ─────────────────────────────────────────────

    /// Create a process and schedule its activation `delay` from now.
    pub fn activate<P>(&mut self, name: impl Into<String>, process: P, delay: f64) -> SimResult<ProcessId>
    where
        P: Process<M> + 'static,
    {
        let time = self.time_after(delay)?;
        let pid = ProcessId::new(self.processes.len());
        let name = name.into();
        debug!(process = %pid, name = %name, at = time.as_f64(), "activating process");
        self.processes.push(ProcessSlot::new(name, Box::new(process)));
        let handle = self.post(
            time,
            Priority::RESUME,
            EventKind::Resume {
                process: pid,
                wake: Wake::Activated,
            },
        );
        self.processes[pid.index()].pending = Some(handle);
        Ok(pid)
    }

    pub fn process_state(&self, pid: ProcessId) -> Option<ProcessState> {
        self.processes.get(pid.index()).map(|p| p.state)
    }

    pub fn process_name(&self, pid: ProcessId) -> Option<&str> {
        self.processes.get(pid.index()).map(|p| p.name.as_str())
    }

    /// Processes created since the last reset.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Processes currently suspended.
    pub fn suspended_count(&self) -> usize {
        self.processes
            .iter()
            .filter(|p| p.state.is_suspended())
            .count()
    }

    /// Units of `resource` held by `pid`.
    pub fn held(&self, pid: ProcessId, resource: ResourceId) -> f64 {
        self.processes
            .get(pid.index())
            .and_then(|p| p.held.get(&resource).copied())
            .unwrap_or(0.0)
    }

    /// Units of `resource` held across all processes.
    pub fn total_held(&self, resource: ResourceId) -> f64 {
        self.processes
            .iter()
            .filter_map(|p| p.held.get(&resource))
            .sum()
    }

    /// Rank used when `pid` queues on a ranked resource.
    pub fn set_process_rank(&mut self, pid: ProcessId, rank: i64) {
        if let Some(slot) = self.processes.get_mut(pid.index()) {
            slot.rank = rank;
        }
    }

    /// Release `amount` units of `resource` held by `pid`, then grant
    /// waiting requests head-of-line.
    pub fn release(&mut self, pid: ProcessId, resource: ResourceId, amount: f64) -> SimResult<()> {
        let res = self
            .resources
            .get_mut(resource.index())
            .ok_or(SimError::UnknownResource(resource))?;
        res.check_amount(amount)?;
        let slot = self
            .processes
            .get_mut(pid.index())
            .ok_or(SimError::UnknownProcess(pid))?;
        let held = slot.held.get(&resource).copied().unwrap_or(0.0);
        if amount > held + AMOUNT_EPSILON {
            return Err(SimError::OverRelease {
                process: pid,
                resource,
                requested: amount,
                held,
            });
        }
        let remaining = held - amount;
        if remaining <= AMOUNT_EPSILON {
            slot.held.remove(&resource);
        } else {
            slot.held.insert(resource, remaining);
        }
        res.deallocate(amount);
        debug!(process = %pid, resource = %resource, amount, "released");
        self.record(Some(pid), TraceKind::Released { resource, amount });
        self.grant_waiting(resource)
    }

    /// Change a resource's capacity. An increase immediately grants queued
    /// requests that now fit; a decrease never revokes a grant.
    pub fn set_capacity(&mut self, resource: ResourceId, capacity: f64) -> SimResult<()> {
        let granted = self
            .resources
            .get_mut(resource.index())
            .ok_or(SimError::UnknownResource(resource))?
            .set_capacity(capacity)?;
        debug!(resource = %resource, capacity, "capacity changed");
        self.resume_granted(resource, granted)
    }

    /// Release the waiters of `signal` at the given waitlist positions, in
    /// waitlist order, at the current instant. Returns how many were
    /// released; an empty signal or range is a no-op.
    pub fn signal_release<R: RangeBounds<usize>>(
        &mut self,
        signal: SignalId,
        range: R,
    ) -> SimResult<usize> {
        let released = self
            .signals
            .get_mut(signal.index())
            .ok_or(SimError::UnknownSignal(signal))?
            .take_range(range);
        for &pid in &released {
            if let Some(timeout) = self
                .processes
                .get_mut(pid.index())
                .and_then(|slot| slot.pending.take())
            {
                self.calendar.cancel(&timeout);
            }
            self.wake_now(pid, Wake::Signaled)?;
            self.record(Some(pid), TraceKind::SignalReleased { signal });
        }
        if !released.is_empty() {
            debug!(signal = %signal, released = released.len(), "signal released");
        }
        Ok(released.len())
    }

    /// Release every waiter of `signal`.
    pub fn signal_release_all(&mut self, signal: SignalId) -> SimResult<usize> {
        self.signal_release(signal, ..)
    }

    /// Interrupt a suspended process: withdraw it from whatever it waits on
    /// and resume it now with [`Wake::Interrupted`].
    ///
    /// Returns `false` (and does nothing) if the process is not suspended on
    /// a delay, resource or signal.
    pub fn interrupt(&mut self, pid: ProcessId) -> SimResult<bool> {
        let slot = self
            .processes
            .get_mut(pid.index())
            .ok_or(SimError::UnknownProcess(pid))?;
        let reason = match slot.state {
            ProcessState::Suspended(SuspendReason::Resuming) => return Ok(false),
            ProcessState::Suspended(reason) => reason,
            _ => return Ok(false),
        };
        if let Some(pending) = slot.pending.take() {
            self.calendar.cancel(&pending);
        }
        match reason {
            SuspendReason::Resource(resource) => {
                if let Some(res) = self.resources.get_mut(resource.index()) {
                    res.withdraw(pid);
                }
            }
            SuspendReason::Signal(signal) => {
                if let Some(sig) = self.signals.get_mut(signal.index()) {
                    sig.remove(pid);
                }
            }
            SuspendReason::Delay | SuspendReason::Resuming => {}
        }
        self.wake_now(pid, Wake::Interrupted)?;
        self.record(Some(pid), TraceKind::Interrupted);
        debug!(process = %pid, "interrupted");
        if let SuspendReason::Resource(resource) = reason {
            // The withdrawn request may have been blocking the head.
            self.grant_waiting(resource)?;
        }
        Ok(true)
    }

    fn grant_waiting(&mut self, resource: ResourceId) -> SimResult<()> {
        let granted = self
            .resources
            .get_mut(resource.index())
            .ok_or(SimError::UnknownResource(resource))?
            .grant_waiting();
        self.resume_granted(resource, granted)
    }

    fn resume_granted(&mut self, resource: ResourceId, granted: Vec<Request>) -> SimResult<()> {
        for request in granted {
            let slot = self
                .processes
                .get_mut(request.process.index())
                .ok_or(SimError::UnknownProcess(request.process))?;
            *slot.held.entry(resource).or_insert(0.0) += request.amount;
            self.wake_now(request.process, Wake::Granted)?;
            debug!(process = %request.process, resource = %resource, amount = request.amount, "seize granted from queue");
            self.record(
                Some(request.process),
                TraceKind::SeizeGranted {
                    resource,
                    amount: request.amount,
                },
            );
        }
        Ok(())
    }

    /// Schedule a zero-delay resumption for a suspended process.
    fn wake_now(&mut self, pid: ProcessId, wake: Wake) -> SimResult<()> {
        let now = self.clock;
        let handle = self.post(now, Priority::RESUME, EventKind::Resume { process: pid, wake });
        self.suspend(pid, SuspendReason::Resuming, Some(handle))
    }

    fn suspend(
        &mut self,
        pid: ProcessId,
        reason: SuspendReason,
        pending: Option<EventHandle>,
    ) -> SimResult<()> {
        let slot = self
            .processes
            .get_mut(pid.index())
            .ok_or(SimError::UnknownProcess(pid))?;
        slot.state = ProcessState::Suspended(reason);
        slot.pending = pending;
        Ok(())
    }

    fn resume_process(&mut self, model: &mut M, pid: ProcessId, wake: Wake) -> SimResult<()> {
        let slot = self
            .processes
            .get_mut(pid.index())
            .ok_or(SimError::UnknownProcess(pid))?;
        let previous = slot.state;
        if matches!(previous, ProcessState::Running | ProcessState::Terminated) {
            return Err(SimError::ProcessNotRunnable(pid));
        }
        let mut logic = slot.logic.take().ok_or(SimError::ProcessNotRunnable(pid))?;
        slot.pending = None;
        slot.state = ProcessState::Running;

        if previous == ProcessState::NotStarted {
            self.record(Some(pid), TraceKind::Activated);
        }
        if wake == Wake::TimedOut {
            if let ProcessState::Suspended(SuspendReason::Signal(signal)) = previous {
                if let Some(sig) = self.signals.get_mut(signal.index()) {
                    sig.remove(pid);
                }
                debug!(process = %pid, signal = %signal, "signal wait timed out");
                self.record(Some(pid), TraceKind::TimedOut { signal });
            }
        }

        let outcome = self.drive(model, pid, logic.as_mut(), wake);

        // Keep the continuation unless the process finished.
        if let Some(slot) = self.processes.get_mut(pid.index()) {
            if slot.state != ProcessState::Terminated {
                slot.logic = Some(logic);
            }
        }
        outcome
    }

    /// Run a process until it suspends or terminates. Immediate grants
    /// re-enter the process without touching the calendar.
    fn drive(
        &mut self,
        model: &mut M,
        pid: ProcessId,
        logic: &mut dyn Process<M>,
        mut wake: Wake,
    ) -> SimResult<()> {
        loop {
            let step = {
                let mut cx = ProcessContext {
                    exec: &mut *self,
                    pid,
                    wake,
                };
                logic.resume(model, &mut cx)?
            };
            if !self.apply_step(pid, step)? {
                return Ok(());
            }
            wake = Wake::Granted;
        }
    }

    /// Carry out a suspension request. Returns `true` if the process should
    /// continue at once.
    fn apply_step(&mut self, pid: ProcessId, step: Step) -> SimResult<bool> {
        match step {
            Step::Delay(delay) => {
                let time = self.time_after(delay)?;
                let handle = self.post(
                    time,
                    Priority::RESUME,
                    EventKind::Resume {
                        process: pid,
                        wake: Wake::Elapsed,
                    },
                );
                trace!(process = %pid, until = time.as_f64(), "delaying");
                self.suspend(pid, SuspendReason::Delay, Some(handle))?;
                Ok(false)
            }
            Step::Seize { resource, amount } => {
                let now = self.clock;
                let slot = self
                    .processes
                    .get_mut(pid.index())
                    .ok_or(SimError::UnknownProcess(pid))?;
                let res = self
                    .resources
                    .get_mut(resource.index())
                    .ok_or(SimError::UnknownResource(resource))?;
                res.check_amount(amount)?;
                if amount > res.capacity() + AMOUNT_EPSILON {
                    return Err(SimError::InvalidAmount { resource, amount });
                }
                if res.try_allocate(amount) {
                    *slot.held.entry(resource).or_insert(0.0) += amount;
                    debug!(process = %pid, resource = %resource, amount, "seize granted");
                    self.record(Some(pid), TraceKind::SeizeGranted { resource, amount });
                    Ok(true)
                } else {
                    res.enqueue(Request { process: pid, amount }, slot.rank, now);
                    debug!(process = %pid, resource = %resource, amount, queued = res.queue().len(), "seize enqueued");
                    self.record(Some(pid), TraceKind::Enqueued { resource, amount });
                    self.suspend(pid, SuspendReason::Resource(resource), None)?;
                    Ok(false)
                }
            }
            Step::WaitFor(signal) => {
                self.signals
                    .get_mut(signal.index())
                    .ok_or(SimError::UnknownSignal(signal))?
                    .wait(pid);
                self.record(Some(pid), TraceKind::Waiting { signal });
                self.suspend(pid, SuspendReason::Signal(signal), None)?;
                Ok(false)
            }
            Step::WaitForWithin { signal, timeout } => {
                let time = self.time_after(timeout)?;
                self.signals
                    .get_mut(signal.index())
                    .ok_or(SimError::UnknownSignal(signal))?
                    .wait(pid);
                let handle = self.post(
                    time,
                    Priority::RESUME,
                    EventKind::Resume {
                        process: pid,
                        wake: Wake::TimedOut,
                    },
                );
                self.record(Some(pid), TraceKind::Waiting { signal });
                self.suspend(pid, SuspendReason::Signal(signal), Some(handle))?;
                Ok(false)
            }
            Step::Done => {
                let slot = self
                    .processes
                    .get_mut(pid.index())
                    .ok_or(SimError::UnknownProcess(pid))?;
                let held = slot.held_amounts();
                if !held.is_empty() {
                    return Err(SimError::UnreleasedResourcesAtTermination { process: pid, held });
                }
                slot.state = ProcessState::Terminated;
                slot.pending = None;
                debug!(process = %pid, "terminated");
                self.record(Some(pid), TraceKind::Terminated);
                Ok(false)
            }
        }
    }

    fn record(&mut self, pid: Option<ProcessId>, kind: TraceKind) {
        let Some(trace) = self.trace.as_mut() else {
            return;
        };
        let process = pid.map(|pid| {
            let name = self
                .processes
                .get(pid.index())
                .map(|p| p.name.clone())
                .unwrap_or_default();
            (pid, name)
        });
        trace.record(TraceEntry {
            time: self.clock,
            event: self.current.map(|info| info.id),
            process,
            kind,
        });
    }
}

impl<M: Model> Default for Executive<M> {
    fn default() -> Self {
        Self::new()
    }
}
