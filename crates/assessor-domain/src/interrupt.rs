//! Cooperative interruption.
//!
//! A termination signal never tears the process down from under a running step. One listener
//! thread is installed for the life of the process. While an evaluation holds a
//! [`SignalGuard`], a signal only flips that evaluation's [`Interrupt`] flag; the evaluation
//! loop observes it between steps, stops, and runs the same cleanup path it uses on normal
//! completion. A signal that arrives while no guard is held ends the process with
//! [`EXIT_INTERRUPTED`], since there is nothing left to clean up.
//!
//! A step that never returns still blocks the evaluation, and therefore the cleanup, forever.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use assessor_types::ids::EXIT_INTERRUPTED;

/// Shared cancellation flag observed by the evaluation loop.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    triggered: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Re-arm after an interrupted evaluation was handled.
    pub fn reset(&self) {
        self.triggered.store(false, Ordering::SeqCst);
    }

    fn same_flag(&self, other: &Interrupt) -> bool {
        Arc::ptr_eq(&self.triggered, &other.triggered)
    }
}

/// What a received signal did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delivery {
    /// This many in-flight interrupts were triggered.
    Triggered(usize),
    /// Nothing was in flight.
    Idle,
}

/// Interrupts currently watched by the process-wide listener.
struct Registry {
    active: Mutex<BTreeMap<u64, Interrupt>>,
    next_id: AtomicU64,
}

impl Registry {
    const fn new() -> Self {
        Self {
            active: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<u64, Interrupt>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, interrupt: Interrupt) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries().insert(id, interrupt);
        id
    }

    fn unregister(&self, id: u64) {
        self.entries().remove(&id);
    }

    fn watches(&self, interrupt: &Interrupt) -> bool {
        self.entries().values().any(|i| i.same_flag(interrupt))
    }

    fn deliver(&self) -> Delivery {
        let entries = self.entries();
        if entries.is_empty() {
            return Delivery::Idle;
        }
        for interrupt in entries.values() {
            interrupt.trigger();
        }
        Delivery::Triggered(entries.len())
    }
}

static REGISTRY: Registry = Registry::new();
static INSTALLED: Mutex<bool> = Mutex::new(false);

/// Keeps an interrupt registered with the termination listener. Dropping it unregisters.
#[derive(Debug)]
pub struct SignalGuard {
    id: u64,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        REGISTRY.unregister(self.id);
    }
}

/// Route Ctrl-C / SIGTERM to `interrupt` until the returned guard is dropped.
///
/// The first call installs the listener thread and returns once the signal handlers are in
/// place; later calls only register.
pub fn listen_for_termination(interrupt: Interrupt) -> io::Result<SignalGuard> {
    {
        let mut installed = INSTALLED.lock().unwrap_or_else(PoisonError::into_inner);
        if !*installed {
            spawn_listener()?;
            *installed = true;
        }
    }
    Ok(SignalGuard {
        id: REGISTRY.register(interrupt),
    })
}

/// Whether a live [`SignalGuard`] currently routes signals to `interrupt`.
pub fn is_listening(interrupt: &Interrupt) -> bool {
    REGISTRY.watches(interrupt)
}

fn spawn_listener() -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<io::Result<()>>();

    std::thread::Builder::new()
        .name("assessor-signals".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let mut signals = match TerminationSignals::install() {
                    Ok(signals) => {
                        let _ = ready_tx.send(Ok(()));
                        signals
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                loop {
                    let signal = signals.recv().await;
                    match REGISTRY.deliver() {
                        Delivery::Triggered(evaluations) => tracing::warn!(
                            signal,
                            evaluations,
                            "unexpected termination; reverting changes made by the active control evaluation, do not interrupt this process"
                        ),
                        Delivery::Idle => {
                            tracing::warn!(signal, "termination requested with no evaluation in flight");
                            std::process::exit(EXIT_INTERRUPTED);
                        }
                    }
                }
            });
        })?;

    ready_rx
        .recv()
        .map_err(|_| io::Error::other("termination listener exited during startup"))?
}

#[cfg(unix)]
struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(windows)]
struct TerminationSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl TerminationSignals {
    fn install() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        let _ = self.ctrl_c.recv().await;
        "ctrl-c"
    }
}
