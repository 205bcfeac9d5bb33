//! Handler seam for message delivery.

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use codecollab_core::Message;

use crate::error::HubResult;

/// A message consumer installed on the hub, either as a role handler or as
/// a broadcast observer.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one delivered message.
    ///
    /// # Errors
    ///
    /// Returns `HubError` when processing fails; the hub records the
    /// failure and moves on, it never retries.
    async fn handle(&self, message: Message) -> HubResult<()>;
}

type BoxedHandlerFn = Box<dyn Fn(Message) -> BoxFuture<'static, HubResult<()>> + Send + Sync>;

struct FnHandler(BoxedHandlerFn);

#[async_trait]
impl MessageHandler for FnHandler {
    async fn handle(&self, message: Message) -> HubResult<()> {
        (self.0)(message).await
    }
}

/// Adapt an async closure into a [`MessageHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HubResult<()>> + Send + 'static,
{
    Arc::new(FnHandler(Box::new(move |message| f(message).boxed())))
}
