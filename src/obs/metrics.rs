// self
use crate::obs::{Exchange, ExchangeOutcome};

/// Records an exchange outcome via the global metrics recorder (when enabled).
pub fn record_exchange(exchange: Exchange, outcome: ExchangeOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"api_session_exchange_total",
			"exchange" => exchange.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (exchange, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_exchange_noop_without_recorder() {
		record_exchange(Exchange::Renewal, ExchangeOutcome::Failure);
	}
}
