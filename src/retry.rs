use std::time::Duration;

// tokio::time::sleep is only available on non-WASM targets.
#[cfg(not(target_arch = "wasm32"))]
use tokio::time::sleep;

use crate::{metadata, HttpResponse, LogLevel, Logger, MetaValue, RetryPolicy, Transport};

/// Action label on every retry warning.
pub const RETRY_ACTION: &str = "retry";

/// Why an attempt can be retried.
enum Failure<R, E> {
    Status(R),
    Transport(E),
}

/// Result of one attempt, judged against the remaining retry budget.
enum AttemptOutcome<R, E> {
    /// Hand this response back to the caller, whatever its status.
    Success(R),
    RetryableFailure(Failure<R, E>),
    /// Transport error with no budget left.
    TerminalFailure(E),
}

fn classify<R: HttpResponse, E>(
    result: Result<R, E>,
    policy: &RetryPolicy,
    attempt: u32,
) -> AttemptOutcome<R, E> {
    let budget_left = attempt < policy.max_retries;
    match result {
        Ok(response) if budget_left && policy.is_retryable_status(response.status()) => {
            AttemptOutcome::RetryableFailure(Failure::Status(response))
        }
        Ok(response) => AttemptOutcome::Success(response),
        Err(err) if budget_left => AttemptOutcome::RetryableFailure(Failure::Transport(err)),
        Err(err) => AttemptOutcome::TerminalFailure(err),
    }
}

/// Delay before retrying after failed attempt `attempt` (0-based):
/// `base_delay_ms * 2^attempt`, saturating at `u64::MAX` milliseconds.
pub fn backoff_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    let delay_ms = 2u64
        .checked_pow(attempt)
        .map_or(u64::MAX, |multiplier| base_delay_ms.saturating_mul(multiplier));
    // A zero base stays zero no matter how large the exponent gets.
    Duration::from_millis(if base_delay_ms == 0 { 0 } else { delay_ms })
}

/// Performs `transport.send` with bounded exponential-backoff retries.
///
/// Transport errors and responses whose status is in
/// [`RetryPolicy::retryable_statuses`] are retried up to
/// [`RetryPolicy::max_retries`] times. Any other response is returned at
/// once, without delay or logging.
///
/// Once the budget is spent the two failure kinds end differently: the last
/// transport error comes back as `Err`, while the last retryable-status
/// response comes back as `Ok`. Callers must still check
/// [`HttpResponse::ok`] on a returned response.
///
/// One warning per retry goes to `logger` under the [`RETRY_ACTION`] action.
pub async fn fetch_with_retry<T: Transport>(
    transport: &T,
    target: &T::Target,
    config: Option<&T::Config>,
    policy: &RetryPolicy,
    logger: &Logger,
) -> Result<T::Response, T::Error> {
    let mut attempt = 0u32;
    loop {
        let result = transport.send(target, config).await;
        let failure = match classify(result, policy, attempt) {
            AttemptOutcome::Success(response) => return Ok(response),
            AttemptOutcome::TerminalFailure(err) => return Err(err),
            AttemptOutcome::RetryableFailure(failure) => failure,
        };

        let delay = backoff_delay(policy.base_delay_ms, attempt);
        log_retry(logger, &failure, target, attempt, policy, delay);
        // Release the failed response before sleeping.
        drop(failure);

        wait_before_retry(delay).await;
        attempt += 1;
    }
}

fn log_retry<R, E, D>(
    logger: &Logger,
    failure: &Failure<R, E>,
    target: &D,
    attempt: u32,
    policy: &RetryPolicy,
    delay: Duration,
) where
    R: HttpResponse,
    E: std::fmt::Display,
    D: std::fmt::Display + ?Sized,
{
    if !logger.enabled(LogLevel::Warn) {
        return;
    }

    let number = attempt + 1;
    let max = policy.max_retries;
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    let mut meta = metadata([
        ("attempt", MetaValue::from(number)),
        ("max_retries", max.into()),
        ("delay_ms", delay_ms.into()),
        ("target", target.to_string().into()),
    ]);

    let message = match failure {
        Failure::Status(response) => {
            let status = response.status();
            meta.insert("status".to_owned(), status.into());
            format!("HTTP {status} from {target}, retrying in {delay_ms}ms (attempt {number}/{max})")
        }
        Failure::Transport(err) => {
            meta.insert("error".to_owned(), err.to_string().into());
            format!("Network error for {target}, retrying in {delay_ms}ms (attempt {number}/{max}): {err}")
        }
    };

    logger.warn(RETRY_ACTION, &message, Some(&meta));
}

/// Waits before the next retry attempt.
///
/// On native targets: `tokio::time::sleep`.
/// On WASM targets: the host's `setTimeout`, awaited through a JS promise.
async fn wait_before_retry(delay: Duration) {
    #[cfg(not(target_arch = "wasm32"))]
    sleep(delay).await;

    #[cfg(target_arch = "wasm32")]
    js_timer::sleep(delay).await;
}

/// Largest single `setTimeout` delay; hosts fire longer timers immediately.
const MAX_TIMER_MS: u64 = i32::MAX as u64;

/// Splits off the next `setTimeout` delay from `remaining_ms`.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn next_timer_chunk(remaining_ms: u64) -> i32 {
    i32::try_from(remaining_ms.min(MAX_TIMER_MS)).unwrap_or(i32::MAX)
}

#[cfg(target_arch = "wasm32")]
mod js_timer {
    use std::time::Duration;

    use js_sys::{Function, Promise};
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;

    use super::next_timer_chunk;

    #[wasm_bindgen]
    extern "C" {
        // Global in browsers, workers and edge runtimes alike.
        #[wasm_bindgen(js_name = setTimeout)]
        fn set_timeout(handler: &Function, timeout: i32) -> JsValue;
    }

    pub(super) async fn sleep(delay: Duration) {
        let mut remaining = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        while remaining > 0 {
            let chunk = next_timer_chunk(remaining);
            let timer = Promise::new(&mut |resolve, _reject| {
                set_timeout(&resolve, chunk);
            });
            // The promise only ever resolves.
            let _ = JsFuture::from(timer).await;
            remaining -= chunk as u64;
        }
    }
}
