use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::error;

/// Drive `fut` to completion, converting a panic into a log line.
///
/// Returns `None` when the future panicked. Whatever the future owned
/// (sockets included) has been dropped by the time this returns.
pub async fn guard<F, L>(label: L, fut: F) -> Option<F::Output>
where
    F: Future,
    L: Display,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(output) => Some(output),
        Err(payload) => {
            error!(task = %label, panic = %panic_message(&*payload), "recovered from panic");
            None
        }
    }
}

/// Spawn `fut` as a detached task behind a fault barrier.
pub fn spawn_guarded<F, L>(label: L, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
    L: Display + Send + 'static,
{
    tokio::spawn(async move {
        guard(label, fut).await;
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
