//! Optional observability helpers for API exchanges.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `api_session.exchange` with the `exchange`
//!   (original, renewal, retry) and `method` fields, plus events for renewal outcomes and store
//!   failures.
//! - Enable `metrics` to increment the `api_session_exchange_total` counter for every
//!   attempt/success/failure, labeled by `exchange` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Exchanges a single logical call may perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Exchange {
	/// The caller's request as first sent.
	Original,
	/// The refresh-endpoint call made after a `TOKEN_EXPIRED` response.
	Renewal,
	/// The caller's request re-sent with the renewed credential.
	Retry,
}
impl Exchange {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Exchange::Original => "original",
			Exchange::Renewal => "renewal",
			Exchange::Retry => "retry",
		}
	}
}
impl Display for Exchange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeOutcome {
	/// The exchange is about to be sent.
	Attempt,
	/// The backend answered `success: true`.
	Success,
	/// Transport failure, undecodable body, or `success: false`.
	Failure,
}
impl ExchangeOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ExchangeOutcome::Attempt => "attempt",
			ExchangeOutcome::Success => "success",
			ExchangeOutcome::Failure => "failure",
		}
	}
}
impl Display for ExchangeOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
