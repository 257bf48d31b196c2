//! The `Model` trait: model-wide state and replication hooks.

use crate::error::SimResult;
use crate::executive::Executive;

/// User model state driven by an [`Executive`].
///
/// The executive never owns the model; it borrows it mutably for the
/// duration of each dispatched event. The hooks mirror the lifecycle of a
/// replication and all default to doing nothing.
///
/// # Example
///
/// ```rust
/// use chronos::{Executive, Model, SimResult};
///
/// #[derive(Default)]
/// struct Counter { ticks: u32 }
///
/// impl Model for Counter {
///     type Message = u32;
///
///     fn initialize(&mut self, exec: &mut Executive<Self>) -> SimResult<()> {
///         self.ticks = 0;
///         exec.schedule_after(1.0, |m: &mut Counter, _exec: &mut Executive<Counter>| {
///             m.ticks += 1;
///             Ok(())
///         })?;
///         Ok(())
///     }
/// }
/// ```
pub trait Model: Sized + 'static {
    /// Optional payload carried by scheduled events.
    type Message: 'static;

    /// Called at the start of every replication, after the executive has
    /// been reset. Seed initial events and activate processes here.
    fn initialize(&mut self, _exec: &mut Executive<Self>) -> SimResult<()> {
        Ok(())
    }

    /// Called when simulated time crosses the warm-up boundary.
    fn warm_up(&mut self, _exec: &mut Executive<Self>) -> SimResult<()> {
        Ok(())
    }

    /// Called once the replication has run to its end.
    fn replication_ended(&mut self, _exec: &mut Executive<Self>) -> SimResult<()> {
        Ok(())
    }
}

/// A model with no state, for kernels driven purely by closures.
impl Model for () {
    type Message = ();
}
