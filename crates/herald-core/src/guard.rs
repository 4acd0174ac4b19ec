//! Error isolation around handler calls.
//!
//! Every command, autocomplete, and event handler runs through these
//! combinators. A returned error, a panic while building the future, and a
//! panic while polling it all come back as a [`HandlerFailure`] value instead
//! of unwinding into the caller.
//!
//! Calling a handler is split in two so the dispatcher can record rate-limit
//! timestamps between a successful start and the first poll:
//!
//! ```rust,ignore
//! let pending = initiate(|| (command.handler())(ctx))?;
//! limiter.record_global(&command, now);
//! settle(pending).await?;
//! ```

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::FutureExt;

use crate::error::{FailureKind, HandlerFailure, HandlerResult};

/// Calls `start`, catching a panic raised before it returns its future.
pub fn initiate<F, Fut>(start: F) -> Result<Fut, HandlerFailure>
where
    F: FnOnce() -> Fut,
{
    catch_unwind(AssertUnwindSafe(start))
        .map_err(|payload| HandlerFailure::from_panic(FailureKind::Initiation, payload.as_ref()))
}

/// Drives a started handler to completion, folding panics and errors into
/// a [`HandlerFailure`].
pub async fn settle<Fut, T>(pending: Fut) -> Result<T, HandlerFailure>
where
    Fut: Future<Output = HandlerResult<T>>,
{
    match AssertUnwindSafe(pending).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(HandlerFailure::from_error(err.as_ref())),
        Err(payload) => Err(HandlerFailure::from_panic(
            FailureKind::Panic,
            payload.as_ref(),
        )),
    }
}

/// [`initiate`] then [`settle`].
pub async fn isolate<F, Fut, T>(start: F) -> Result<T, HandlerFailure>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = HandlerResult<T>>,
{
    settle(initiate(start)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;

    #[tokio::test]
    async fn ok_passes_through() {
        let out = isolate(|| async { Ok::<_, BoxError>(7) }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn returned_error_is_captured() {
        let out: Result<(), _> = isolate(|| async { Err::<(), BoxError>("no rows".into()) }).await;
        let failure = out.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Error);
        assert_eq!(failure.message(), "no rows");
    }

    #[tokio::test]
    async fn panic_on_call_is_initiation_failure() {
        fn exploding() -> std::future::Ready<HandlerResult> {
            panic!("bad setup")
        }
        let failure = initiate(exploding).map(|_| ()).unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Initiation);
        assert_eq!(failure.message(), "bad setup");
    }

    #[tokio::test]
    async fn panic_while_polling_is_captured() {
        let out: Result<(), _> = isolate(|| async {
            tokio::task::yield_now().await;
            panic!("mid-flight");
            #[allow(unreachable_code)]
            Ok::<(), BoxError>(())
        })
        .await;
        let failure = out.unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Panic);
        assert_eq!(failure.message(), "mid-flight");
    }
}
