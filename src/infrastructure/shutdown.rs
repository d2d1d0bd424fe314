use tokio::sync::watch;

/// Cooperative stop request shared between the control side and a run.
#[derive(Clone, Debug)]
pub struct StopSignal {
    sender: watch::Sender<bool>,
}

#[derive(Clone, Debug)]
pub struct StopListener {
    receiver: watch::Receiver<bool>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub fn listener(&self) -> StopListener {
        StopListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn stop(&self) {
        self.sender.send_replace(true);
    }
}

impl StopListener {
    /// Resolves once a stop has been requested, immediately if it already was.
    pub async fn stopped(&mut self) {
        if *self.receiver.borrow() {
            return;
        }
        while self.receiver.changed().await.is_ok() {
            if *self.receiver.borrow() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }

    pub fn is_stopped(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Ctrl+C and SIGTERM both request a stop.
pub fn install_signal_handlers(signal: StopSignal) {
    let ctrlc = signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "monitor", "interrupt received, stopping");
            ctrlc.stop();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};
        tokio::spawn(async move {
            if let Ok(mut term) = unix_signal(SignalKind::terminate()) {
                term.recv().await;
                tracing::info!(target: "monitor", "SIGTERM received, stopping");
                signal.stop();
            }
        });
    }
}
