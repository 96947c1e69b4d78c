//! Ordered fallback: try candidates in order until one succeeds.
//!
//! Used for the parser chain (AI strategy, then pattern strategy) and for the
//! completion client's model list. Each candidate gets exactly one attempt.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Runs `attempt` on each candidate in order and returns the first `Ok`.
///
/// After a failure, `keep_going` decides whether the next candidate is tried;
/// returning `false` surfaces that error immediately. `Err(None)` means there
/// was nothing to try.
pub async fn first_success<I, T, E, F, Fut, C>(
    label: &str,
    candidates: I,
    mut attempt: F,
    mut keep_going: C,
) -> Result<T, Option<E>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: FnMut(&E) -> bool,
    E: Display,
{
    let mut last_error = None;

    for (index, candidate) in candidates.into_iter().enumerate() {
        match attempt(candidate).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !keep_going(&e) {
                    return Err(Some(e));
                }
                warn!("{label}: candidate {index} failed, falling back: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_first_success_in_order() {
        let mut tried = Vec::new();
        let result: Result<u32, Option<String>> = first_success(
            "test",
            [1_u32, 2, 3],
            |n| {
                tried.push(n);
                async move {
                    if n < 2 {
                        Err(format!("{n} failed"))
                    } else {
                        Ok(n * 10)
                    }
                }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Ok(20));
        assert_eq!(tried, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_stops_when_error_is_not_recoverable() {
        let mut tried = 0;
        let result: Result<u32, Option<String>> = first_success(
            "test",
            ["fatal", "never"],
            |name| {
                tried += 1;
                async move { Err(name.to_string()) }
            },
            |e: &String| e != "fatal",
        )
        .await;
        assert_eq!(result, Err(Some("fatal".to_string())));
        assert_eq!(tried, 1);
    }

    #[tokio::test]
    async fn test_exhausted_returns_last_error() {
        let result: Result<u32, Option<String>> = first_success(
            "test",
            ["a", "b"],
            |name| async move { Err(format!("{name} down")) },
            |_| true,
        )
        .await;
        assert_eq!(result, Err(Some("b down".to_string())));
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let empty: Vec<u32> = Vec::new();
        let result: Result<u32, Option<String>> =
            first_success("test", empty, |n| async move { Ok(n) }, |_| true).await;
        assert_eq!(result, Err(None));
    }
}
