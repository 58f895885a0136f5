// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span around one pipeline stage (a request, a refresh cycle, a queued wait, a teardown).
///
/// The `outcome` field starts empty and tracks the latest [`FlowOutcome`] passed to
/// [`FlowSpan::record`].
#[derive(Clone, Debug)]
pub struct FlowSpan {
	kind: FlowKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"auth_relay.flow",
				flow = kind.as_str(),
				stage,
				outcome = tracing::field::Empty
			);

			Self { kind, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self { kind }
		}
	}

	/// Flow kind this span was opened for.
	pub fn kind(&self) -> FlowKind {
		self.kind
	}

	/// Stamps `outcome` on the span and counts it under this span's flow kind.
	pub fn record(&self, outcome: FlowOutcome) {
		#[cfg(feature = "tracing")]
		self.span.record("outcome", outcome.as_str());

		obs::record_flow_outcome(self.kind, outcome);
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Emits a warning for a failure the pipeline deliberately swallows.
pub fn warn_swallowed(kind: FlowKind, what: &'static str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(flow = kind.as_str(), %error, "{what}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, what, error);
	}
}
