//! # Diagnostic Sinks
//!
//! The optimizer reports progress through a [`DiagnosticSink`] passed in by
//! the caller instead of a process-wide logger. One [`OuterIterationEvent`] is
//! emitted per outer iteration and, when enabled in the solver configuration,
//! one [`InnerIterationEvent`] per inner iteration.
//!
//! Sinks must not stall the optimizer. The provided implementations either
//! forward to `tracing`, append to memory, or send on an unbounded channel.
//!
//! ```rust
//! use seccap_core::diagnostics::{DiagnosticSink, OuterIterationEvent, RecordingSink};
//! use std::time::Duration;
//!
//! let mut sink = RecordingSink::new();
//! sink.outer_iteration(&OuterIterationEvent {
//!     iteration: 0,
//!     elapsed: Duration::from_millis(3),
//!     iteration_time: Duration::from_millis(3),
//!     objective: 0.48,
//!     objective_delta: 0.48,
//!     inner_iterations: 42,
//! });
//! assert_eq!(sink.outer_events().count(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

/// Progress of one outer iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuterIterationEvent {
    /// Outer iteration index `t`, starting at 0
    pub iteration: usize,
    /// Wall time since the solve started
    pub elapsed: Duration,
    /// Wall time spent in this iteration
    pub iteration_time: Duration,
    /// Outer surrogate after the iteration (nats)
    pub objective: f64,
    /// `|f_new − f_old|`
    pub objective_delta: f64,
    /// Inner fixed-point iterations used by this outer step
    pub inner_iterations: usize,
}

/// Progress of one inner fixed-point iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerIterationEvent {
    pub outer_iteration: usize,
    pub iteration: usize,
    /// Majorization bound after the update
    pub bound: f64,
    /// Change from the previous bound (`+inf` on the first iteration)
    pub bound_delta: f64,
}

/// Any event a sink may receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    Outer(OuterIterationEvent),
    Inner(InnerIterationEvent),
}

/// Receiver of optimizer progress records.
pub trait DiagnosticSink {
    /// Called once per completed outer iteration.
    fn outer_iteration(&mut self, event: &OuterIterationEvent);

    /// Called once per inner iteration when inner events are enabled.
    fn inner_iteration(&mut self, _event: &InnerIterationEvent) {}
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn outer_iteration(&mut self, event: &OuterIterationEvent) {
        (**self).outer_iteration(event);
    }

    fn inner_iteration(&mut self, event: &InnerIterationEvent) {
        (**self).inner_iteration(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn outer_iteration(&mut self, _event: &OuterIterationEvent) {}
}

/// Forwards events to `tracing`: outer iterations at `info`, inner at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn outer_iteration(&mut self, event: &OuterIterationEvent) {
        tracing::info!(
            iteration = event.iteration,
            iteration_ms = event.iteration_time.as_secs_f64() * 1e3,
            elapsed_ms = event.elapsed.as_secs_f64() * 1e3,
            objective = event.objective,
            objective_delta = event.objective_delta,
            inner_iterations = event.inner_iterations,
            "outer iteration complete"
        );
    }

    fn inner_iteration(&mut self, event: &InnerIterationEvent) {
        tracing::debug!(
            outer = event.outer_iteration,
            iteration = event.iteration,
            bound = event.bound,
            bound_delta = event.bound_delta,
            "inner iteration"
        );
    }
}

/// Buffers every event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Vec<DiagnosticEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in arrival order.
    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    pub fn outer_events(&self) -> impl Iterator<Item = &OuterIterationEvent> {
        self.events.iter().filter_map(|e| match e {
            DiagnosticEvent::Outer(o) => Some(o),
            DiagnosticEvent::Inner(_) => None,
        })
    }

    pub fn inner_events(&self) -> impl Iterator<Item = &InnerIterationEvent> {
        self.events.iter().filter_map(|e| match e {
            DiagnosticEvent::Inner(i) => Some(i),
            DiagnosticEvent::Outer(_) => None,
        })
    }
}

impl DiagnosticSink for RecordingSink {
    fn outer_iteration(&mut self, event: &OuterIterationEvent) {
        self.events.push(DiagnosticEvent::Outer(event.clone()));
    }

    fn inner_iteration(&mut self, event: &InnerIterationEvent) {
        self.events.push(DiagnosticEvent::Inner(event.clone()));
    }
}

/// Sends events over an unbounded channel to another thread.
///
/// Sending never blocks; events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<DiagnosticEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new() -> (Self, Receiver<DiagnosticEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl DiagnosticSink for ChannelSink {
    fn outer_iteration(&mut self, event: &OuterIterationEvent) {
        let _ = self.tx.send(DiagnosticEvent::Outer(event.clone()));
    }

    fn inner_iteration(&mut self, event: &InnerIterationEvent) {
        let _ = self.tx.send(DiagnosticEvent::Inner(event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outer(iteration: usize) -> OuterIterationEvent {
        OuterIterationEvent {
            iteration,
            elapsed: Duration::from_millis(10 * (iteration as u64 + 1)),
            iteration_time: Duration::from_millis(10),
            objective: 0.1 * iteration as f64,
            objective_delta: 0.1,
            inner_iterations: 5,
        }
    }

    fn inner(iteration: usize) -> InnerIterationEvent {
        InnerIterationEvent {
            outer_iteration: 0,
            iteration,
            bound: 3.0,
            bound_delta: f64::INFINITY,
        }
    }

    #[test]
    fn test_recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.inner_iteration(&inner(0));
        sink.outer_iteration(&outer(0));
        sink.outer_iteration(&outer(1));

        assert_eq!(sink.events().len(), 3);
        assert!(matches!(sink.events()[0], DiagnosticEvent::Inner(_)));
        let iterations: Vec<usize> = sink.outer_events().map(|e| e.iteration).collect();
        assert_eq!(iterations, vec![0, 1]);
        assert_eq!(sink.inner_events().count(), 1);
    }

    #[test]
    fn test_channel_sink_delivers_and_tolerates_dropped_receiver() {
        let (mut sink, rx) = ChannelSink::new();
        sink.outer_iteration(&outer(3));
        match rx.try_recv().unwrap() {
            DiagnosticEvent::Outer(e) => assert_eq!(e.iteration, 3),
            other => panic!("unexpected event {other:?}"),
        }

        drop(rx);
        sink.outer_iteration(&outer(4));
    }

    fn feed(mut sink: impl DiagnosticSink) {
        sink.outer_iteration(&outer(0));
        sink.inner_iteration(&inner(0));
    }

    #[test]
    fn test_mut_reference_forwards() {
        let mut sink = RecordingSink::new();
        feed(&mut sink);
        feed(&mut sink);

        // Inner events only arrive if the reference overrides the no-op default
        assert_eq!(sink.events().len(), 4);
        assert_eq!(sink.inner_events().count(), 2);
        assert_eq!(sink.outer_events().count(), 2);
    }

    #[test]
    fn test_serialized_event_is_tagged() {
        let yaml = serde_yaml::to_string(&DiagnosticEvent::Outer(outer(2))).unwrap();
        assert!(yaml.contains("kind: outer"));
        assert!(yaml.contains("iteration: 2"));

        let back: DiagnosticEvent = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, DiagnosticEvent::Outer(outer(2)));
    }
}
