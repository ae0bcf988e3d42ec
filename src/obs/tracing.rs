// self
use crate::{_prelude::*, http::Method, obs::Exchange};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedExchange<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedExchange<F> = F;

/// A span builder used around every send.
#[derive(Clone, Debug)]
pub struct ExchangeSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl ExchangeSpan {
	/// Creates a new span tagged with the exchange kind + HTTP method.
	pub fn new(exchange: Exchange, method: Method) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"api_session.exchange",
				exchange = exchange.as_str(),
				method = method.as_str()
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (exchange, method);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedExchange<Fut>
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

/// Emits a `warn` event when tracing is enabled; compiles to nothing otherwise.
macro_rules! obs_warn {
	($($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		tracing::warn!($($arg)+);
	}};
}

/// Emits a `debug` event when tracing is enabled; compiles to nothing otherwise.
macro_rules! obs_debug {
	($($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		tracing::debug!($($arg)+);
	}};
}

pub(crate) use {obs_debug, obs_warn};
