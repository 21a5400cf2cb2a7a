use std::{future::Future, time::Duration};

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
	pub(crate) max_attempts: u32,
	pub(crate) backoff: Duration,
}
impl RetryPolicy {
	pub(crate) fn from_config(cfg: &lore_config::Pipeline) -> Self {
		Self {
			max_attempts: cfg.max_attempts.max(1),
			backoff: Duration::from_millis(cfg.retry_backoff_ms),
		}
	}
}

/// Runs `call` until it succeeds or `policy.max_attempts` is exhausted, sleeping
/// `backoff * attempt` between attempts. The last error is returned.
pub(crate) async fn with_retries<T, F, Fut>(
	policy: RetryPolicy,
	operation: &'static str,
	mut call: F,
) -> color_eyre::Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = color_eyre::Result<T>>,
{
	let mut attempt = 1;

	loop {
		match call().await {
			Ok(value) => return Ok(value),
			Err(err) if attempt < policy.max_attempts => {
				tracing::warn!(
					error = %err,
					operation,
					attempt,
					max_attempts = policy.max_attempts,
					"Collaborator call failed; retrying."
				);

				tokio::time::sleep(policy.backoff.saturating_mul(attempt)).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}
