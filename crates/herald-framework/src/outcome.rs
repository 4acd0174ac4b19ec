//! Tower middleware that absorbs dispatch outcomes.
//!
//! The dispatcher already replies to the user and logs handler failures.
//! When it runs as an event subscriber those errors must not surface again
//! as event-handler failures, so [`OutcomeLayer`] logs the rejection at debug
//! level and completes with `Ok(())`.

use std::convert::Infallible;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use herald_core::DispatchError;
use tower::Service;
use tower_layer::Layer;
use tracing::debug;

/// Wraps a dispatch service so it never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeLayer;

impl<S> Layer<S> for OutcomeLayer {
    type Service = OutcomeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OutcomeService(inner)
    }
}

#[derive(Debug)]
pub struct OutcomeService<S>(S);

impl<S> Clone for OutcomeService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        OutcomeService(self.0.clone())
    }
}

impl<S, R> Service<R> for OutcomeService<S>
where
    S: Service<R, Response = (), Error = DispatchError> + Clone + Send + 'static,
    S::Future: Send + 'static,
    R: Send + 'static,
{
    type Response = ();
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<(), Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: R) -> Self::Future {
        let inner = self.0.clone();
        let mut inner = std::mem::replace(&mut self.0, inner);
        async move {
            let outcome = match futures::future::poll_fn(|cx| inner.poll_ready(cx)).await {
                Ok(()) => inner.call(request).await,
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                debug!(
                    command = %e.command_name(),
                    reason = %e,
                    "Dispatch finished with rejection"
                );
            }
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    #[tokio::test]
    async fn rejections_become_ok() {
        let failing = service_fn(|name: String| async move {
            Err::<(), _>(DispatchError::UnknownCommand { name })
        });
        let service = ServiceBuilder::new().layer(OutcomeLayer).service(failing);

        assert!(service.oneshot("nope".to_string()).await.is_ok());
    }
}
