use tokio::sync::watch;
use tracing::warn;

/// Receiving side of the interrupt signal, cheap to clone into every task
#[derive(Clone, Debug)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

impl Shutdown {
    /// A signal that never fires
    pub fn never() -> Self {
        channel().1
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the trigger fired. Pending forever if the trigger was
    /// dropped without firing.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Install a Ctrl+C handler that fires the returned signal
pub fn listen_for_ctrl_c() -> Shutdown {
    let (trigger, shutdown) = channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("⚠️  Interrupted by user, finishing up...");
                trigger.trigger();
            }
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                // keep the sender alive so waiters stay pending
                std::future::pending::<()>().await;
            }
        }
    });
    shutdown
}
