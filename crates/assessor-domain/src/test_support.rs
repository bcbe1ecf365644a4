use crate::assessment::Assessment;
use crate::change::{Change, ChangeError};
use crate::step::Step;
use assessor_types::Outcome;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static SIGNAL_TESTS: Mutex<()> = Mutex::new(());

/// Serializes tests that register with the process-wide termination listener.
pub fn signal_lock() -> MutexGuard<'static, ()> {
    SIGNAL_TESTS.lock().unwrap_or_else(PoisonError::into_inner)
}

pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

/// In-memory stand-in for a target environment: a bag of named settings.
#[derive(Debug, Default)]
pub struct Host {
    settings: Mutex<BTreeMap<String, String>>,
}

impl Host {
    pub fn new() -> Arc<Host> {
        Arc::new(Host::default())
    }

    pub fn with_setting(key: &str, value: &str) -> Arc<Host> {
        let host = Host::new();
        host.set(key, Some(value.to_string()));
        host
    }

    pub fn setting(&self, key: &str) -> Option<String> {
        self.settings.lock().unwrap().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: Option<String>) -> Option<String> {
        let mut settings = self.settings.lock().unwrap();
        match value {
            Some(v) => settings.insert(key.to_string(), v),
            None => settings.remove(key),
        }
    }
}

/// A change that sets `key` to `value` and restores the previous value on revert.
pub fn toggle_change(host: &Arc<Host>, key: &str, value: &str) -> Change {
    let previous: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let apply_host = host.clone();
    let apply_prev = previous.clone();
    let apply_key = key.to_string();
    let apply_value = value.to_string();

    let revert_host = host.clone();
    let revert_key = key.to_string();

    Change::new(
        key,
        format!("set {key} to {value}"),
        move || {
            let old = apply_host.set(&apply_key, Some(apply_value.clone()));
            *apply_prev.lock().unwrap() = old;
            Ok(())
        },
        move || {
            let old = previous.lock().unwrap().take();
            revert_host.set(&revert_key, old);
            Ok(())
        },
    )
    .with_target_object(host)
}

/// A change whose revert fails the first `failures` times it is attempted.
pub fn flaky_revert(host: &Arc<Host>, key: &str, failures: usize) -> Change {
    let attempts = Arc::new(AtomicUsize::new(0));
    let apply_host = host.clone();
    let revert_host = host.clone();
    let apply_key = key.to_string();
    let revert_key = key.to_string();

    Change::new(
        key,
        "flaky",
        move || {
            apply_host.set(&apply_key, Some("on".to_string()));
            Ok(())
        },
        move || {
            if attempts.fetch_add(1, Ordering::SeqCst) < failures {
                return Err(ChangeError::new(format!("{revert_key} is locked")));
            }
            revert_host.set(&revert_key, None);
            Ok(())
        },
    )
}

pub fn fixed(name: &str, outcome: Outcome) -> Step<()> {
    let message = format!("{name} says {outcome}");
    Step::new(name, move |_: &(), _| (outcome, message.clone()))
}

pub fn recording(name: &str, outcome: Outcome, log: &Trace) -> Step<()> {
    let log = log.clone();
    let label = name.to_string();
    Step::new(name, move |_: &(), _| {
        log.lock().unwrap().push(label.clone());
        (outcome, format!("{label} says {outcome}"))
    })
}

/// Step that records and applies a [`toggle_change`] on the host it is run against.
pub fn toggling_step(name: &str, key: &str, value: &str) -> Step<Arc<Host>> {
    let key = key.to_string();
    let value = value.to_string();
    let change_name = name.to_string();
    Step::new(name, move |host: &Arc<Host>, changes| {
        let change = changes.record(change_name.clone(), toggle_change(host, &key, &value));
        match change.apply() {
            Ok(()) => (Outcome::Passed, format!("{key} set to {value}")),
            Err(err) => (Outcome::Unknown, err.to_string()),
        }
    })
}

pub fn assessment_with(steps: Vec<Step<()>>) -> Assessment<()> {
    Assessment::new("REQ-1", "requirement under test", ["cloud"], steps).unwrap()
}
