//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `auth_relay.flow` with the `flow` (pipeline
//!   stage kind), `stage` (call site), and `outcome` (latest [`FlowOutcome`]) fields, plus warnings
//!   for swallowed failures.
//! - Enable `metrics` to increment the `auth_relay_flow_total` counter for every
//!   attempt/success/failure/queued outcome, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline activities observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// An ordinary backend request, including its replay.
	Request,
	/// A credential refresh cycle.
	Refresh,
	/// Session teardown after a terminal auth failure or logout.
	Termination,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Request => "request",
			FlowKind::Refresh => "refresh",
			FlowKind::Termination => "termination",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a pipeline helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Caller parked behind an in-flight refresh.
	Queued,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
			FlowOutcome::Queued => "queued",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
