//! Ordered fallback over alternative endpoints.

use std::future::Future;

use gridfeed_core::FetchError;

/// Default bound on how many candidates one call may try.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Try `candidates` in order and return the first success.
///
/// At most `max_attempts` candidates are tried. A rate-limit failure stops
/// the sequence immediately, since every candidate shares the same account.
/// When all attempts fail, the last error is returned.
///
/// # Errors
/// The last candidate's error, or `Protocol` if there was nothing to try.
pub async fn first_success<C, T, F, Fut>(
    provider: &str,
    candidates: impl IntoIterator<Item = C>,
    max_attempts: usize,
    mut attempt: F,
) -> Result<T, FetchError>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut last = None;
    for candidate in candidates.into_iter().take(max_attempts) {
        match attempt(candidate).await {
            Ok(value) => return Ok(value),
            Err(err @ FetchError::RateLimit { .. }) => return Err(err),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(provider, error = %err, "candidate endpoint failed");
                last = Some(err);
            }
        }
    }
    Err(last.unwrap_or_else(|| FetchError::protocol(provider, "no candidate endpoints")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn first_success_short_circuits() {
        let tried = Cell::new(0);
        let out = first_success("p", [1, 2, 3], 3, |c| {
            tried.set(tried.get() + 1);
            async move {
                if c == 2 {
                    Ok(c * 10)
                } else {
                    Err(FetchError::network("p", format!("candidate {c}")))
                }
            }
        })
        .await;
        assert_eq!(out, Ok(20));
        assert_eq!(tried.get(), 2);
    }

    #[tokio::test]
    async fn bounded_attempts_return_last_error() {
        let out: Result<(), _> = first_success("p", 0..10, 2, |c| async move {
            Err(FetchError::network("p", format!("candidate {c}")))
        })
        .await;
        assert_eq!(out, Err(FetchError::network("p", "candidate 1")));
    }

    #[tokio::test]
    async fn rate_limit_stops_the_sequence() {
        let tried = Cell::new(0);
        let out: Result<(), _> = first_success("p", ["a", "b"], 3, |_| {
            tried.set(tried.get() + 1);
            async { Err(FetchError::rate_limit("p", None)) }
        })
        .await;
        assert!(matches!(out, Err(FetchError::RateLimit { .. })));
        assert_eq!(tried.get(), 1);
    }

    #[tokio::test]
    async fn empty_candidate_list_is_a_protocol_error() {
        let out: Result<(), _> =
            first_success("p", Vec::<u8>::new(), 3, |_| async { Ok(()) }).await;
        assert!(matches!(out, Err(FetchError::Protocol { .. })));
    }
}
