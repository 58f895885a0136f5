//! Single-flight credential refresh with FIFO waiter fan-out.
//!
//! [`RefreshCoordinator::handle_expired`] is entered by every request whose first response was a
//! 401. The first caller while [`RefreshState::Idle`] leads a refresh cycle; callers arriving while
//! [`RefreshState::Refreshing`] park a one-shot waiter behind it. When the cycle settles the new
//! access token (or the failure) is delivered to every waiter in enqueue order, in the same
//! critical section that returns the coordinator to `Idle`.

mod endpoint;
mod metrics;

pub use endpoint::{EndpointRefresher, RefreshFuture, Refresher};
pub use metrics::RefreshMetrics;

// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{PendingRequest, SessionTerminator, TerminationReason},
	error::RefreshError,
	obs::{FlowKind, FlowOutcome, FlowSpan},
	store::{CompareAndSwapOutcome, TokenStore},
};

type RefreshOutcome = Result<TokenSecret, RefreshError>;
type Waiter = oneshot::Sender<RefreshOutcome>;

/// Coordinator phase; one per client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshState {
	/// No refresh call is in flight.
	Idle,
	/// A refresh call is in flight and new callers queue behind it.
	Refreshing,
}

#[derive(Debug)]
struct CoordinatorState {
	phase: RefreshState,
	waiters: VecDeque<Waiter>,
	shut_down: bool,
}
impl CoordinatorState {
	/// Returns to `Idle`, settling every waiter in FIFO order.
	fn settle(&mut self, outcome: &RefreshOutcome) {
		self.phase = RefreshState::Idle;

		for waiter in self.waiters.drain(..) {
			// A dropped receiver means its caller went away.
			let _ = waiter.send(outcome.clone());
		}
	}
}

enum Role {
	Lead,
	Wait(oneshot::Receiver<RefreshOutcome>),
	Reuse(TokenSecret),
}

/// Ensures at most one refresh call is in flight and fans its outcome out to every caller.
pub struct RefreshCoordinator {
	state: Mutex<CoordinatorState>,
	tokens: Arc<TokenStore>,
	terminator: Arc<SessionTerminator>,
	refresher: Arc<dyn Refresher>,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	pub fn new(
		tokens: Arc<TokenStore>,
		terminator: Arc<SessionTerminator>,
		refresher: Arc<dyn Refresher>,
	) -> Self {
		Self {
			state: Mutex::new(CoordinatorState {
				phase: RefreshState::Idle,
				waiters: VecDeque::new(),
				shut_down: false,
			}),
			tokens,
			terminator,
			refresher,
			metrics: Default::default(),
		}
	}

	/// Current phase.
	pub fn state(&self) -> RefreshState {
		self.state.lock().phase
	}

	/// Number of callers parked behind the in-flight refresh.
	pub fn queued(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Shared refresh counters.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	/// Resolves a first-time 401 into the access token to replay `pending` with.
	///
	/// Marks `pending` as retried before anything else. On failure the session has already been
	/// terminated and the refresh failure (not the original 401) is returned.
	pub async fn handle_expired(&self, pending: &mut PendingRequest) -> RefreshOutcome {
		pending.mark_retried();

		let role = {
			let mut state = self.state.lock();

			if state.shut_down {
				return Err(RefreshError::Shutdown);
			}

			match state.phase {
				RefreshState::Refreshing => {
					let (tx, rx) = oneshot::channel();

					state.waiters.push_back(tx);

					Role::Wait(rx)
				},
				RefreshState::Idle => match self.rotated_since(pending) {
					Some(token) => Role::Reuse(token),
					None => {
						state.phase = RefreshState::Refreshing;

						Role::Lead
					},
				},
			}
		};

		match role {
			Role::Reuse(token) => Ok(token),
			Role::Wait(rx) => {
				let span = FlowSpan::new(FlowKind::Refresh, "await_refresh");

				self.metrics.record_queued();
				span.record(FlowOutcome::Queued);

				span.instrument(rx).await.unwrap_or(Err(RefreshError::Cancelled))
			},
			Role::Lead => self.lead().await,
		}
	}

	/// Rejects every queued waiter and refuses further refreshes.
	pub fn shutdown(&self) {
		let mut state = self.state.lock();

		state.shut_down = true;

		for waiter in state.waiters.drain(..) {
			let _ = waiter.send(Err(RefreshError::Shutdown));
		}
	}

	// The stored token already differs from the one the request was sent with, so an earlier
	// cycle rotated it.
	fn rotated_since(&self, pending: &PendingRequest) -> Option<TokenSecret> {
		let current = self.tokens.access_token().filter(|token| !token.is_blank())?;

		if pending.sent_with() == Some(&current) { None } else { Some(current) }
	}

	async fn lead(&self) -> RefreshOutcome {
		let span = FlowSpan::new(FlowKind::Refresh, "refresh_credentials");
		let cycle = RefreshCycle { coordinator: self, settled: false };

		self.metrics.record_attempt();
		span.record(FlowOutcome::Attempt);

		let outcome = span.instrument(self.rotate()).await;

		match &outcome {
			Ok(_) => {
				self.metrics.record_success();
				span.record(FlowOutcome::Success);
			},
			// The session the cycle started under is already gone; the current one stays.
			Err(RefreshError::Superseded) => {
				self.metrics.record_failure();
				span.record(FlowOutcome::Failure);
			},
			Err(_) => {
				self.metrics.record_failure();
				span.record(FlowOutcome::Failure);
				// Waiters wake to an already cleared session.
				self.terminator.terminate(TerminationReason::RefreshFailed);
			},
		}

		cycle.settle(&outcome);

		outcome
	}

	async fn rotate(&self) -> RefreshOutcome {
		let refresh_token = self.tokens.refresh_token().ok_or(RefreshError::MissingRefreshToken)?;
		let credentials = self.refresher.refresh(&refresh_token).await?;
		let access_token = credentials.access_token.clone();

		match self.tokens.compare_and_swap_refresh(&refresh_token, credentials)? {
			CompareAndSwapOutcome::Updated => Ok(access_token),
			CompareAndSwapOutcome::RefreshMismatch | CompareAndSwapOutcome::Missing =>
				Err(RefreshError::Superseded),
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RefreshCoordinator")
			.field("phase", &state.phase)
			.field("queued", &state.waiters.len())
			.field("shut_down", &state.shut_down)
			.finish()
	}
}

/// Settles the cycle even when the leading future is dropped mid-refresh.
struct RefreshCycle<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl RefreshCycle<'_> {
	fn settle(mut self, outcome: &RefreshOutcome) {
		self.settled = true;
		self.coordinator.state.lock().settle(outcome);
	}
}
impl Drop for RefreshCycle<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.state.lock().settle(&Err(RefreshError::Cancelled));
		}
	}
}
