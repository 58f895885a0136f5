//! Session teardown and termination events.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::TokenStore,
};

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerminationReason {
	/// A replayed request was still unauthorized.
	Unauthorized,
	/// The refresh cycle failed.
	RefreshFailed,
	/// The application signed the user out.
	Logout,
}

/// Event delivered to listeners once per teardown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionTerminated {
	/// Why the session ended.
	pub reason: TerminationReason,
	/// Sign-in boundary the application should navigate to.
	pub redirect_to: String,
	/// Instant the teardown happened.
	pub at: OffsetDateTime,
}

/// Receives [`SessionTerminated`] events; the router or UI layer decides how to navigate.
pub trait SessionListener
where
	Self: Send + Sync,
{
	/// Called once per teardown, after the store has been cleared.
	fn on_terminated(&self, event: &SessionTerminated);
}
impl<F> SessionListener for F
where
	F: Fn(&SessionTerminated) + Send + Sync,
{
	fn on_terminated(&self, event: &SessionTerminated) {
		self(event)
	}
}

/// Clears the [`TokenStore`] and announces the teardown, at most once per signed-in session.
pub struct SessionTerminator {
	tokens: Arc<TokenStore>,
	sign_in_path: String,
	terminated: AtomicBool,
	listeners: RwLock<Vec<Arc<dyn SessionListener>>>,
}
impl SessionTerminator {
	/// Creates a terminator; it starts disarmed when no session is held.
	pub fn new(tokens: Arc<TokenStore>, sign_in_path: impl Into<String>) -> Self {
		let terminated = AtomicBool::new(!tokens.is_authenticated());

		Self { tokens, sign_in_path: sign_in_path.into(), terminated, listeners: Default::default() }
	}

	/// Registers a listener for future teardowns.
	pub fn subscribe(&self, listener: Arc<dyn SessionListener>) {
		self.listeners.write().push(listener);
	}

	/// Returns `true` once the current session has been torn down.
	pub fn is_terminated(&self) -> bool {
		self.terminated.load(Ordering::Acquire)
	}

	/// Re-arms the terminator after a new login.
	pub fn rearm(&self) {
		self.terminated.store(false, Ordering::Release);
	}

	/// Tears the session down.
	///
	/// Returns `false` without side effects when the session was already terminated. Store errors
	/// are logged and swallowed; the in-memory session is always dropped.
	pub fn terminate(&self, reason: TerminationReason) -> bool {
		if self.terminated.swap(true, Ordering::AcqRel) {
			return false;
		}

		let span = FlowSpan::new(FlowKind::Termination, "terminate");
		let _guard = span.clone().entered();

		if let Err(e) = self.tokens.clear() {
			obs::warn_swallowed(FlowKind::Termination, "Failed to clear the session store.", &e);
		}

		let event = SessionTerminated {
			reason,
			redirect_to: self.sign_in_path.clone(),
			at: OffsetDateTime::now_utc(),
		};
		let listeners = self.listeners.read().clone();

		for listener in listeners {
			listener.on_terminated(&event);
		}

		span.record(FlowOutcome::Success);

		true
	}
}
impl Debug for SessionTerminator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionTerminator")
			.field("sign_in_path", &self.sign_in_path)
			.field("terminated", &self.is_terminated())
			.field("listeners", &self.listeners.read().len())
			.finish()
	}
}
