//! Reversible side effects recorded by steps.
//!
//! A [`Change`] is owned by the [`ChangeRegistry`] of exactly one assessment. The registry has no
//! removal API: steps may record or overwrite changes, never drop them, so cleanup always sees
//! every mutation that was made.

use assessor_types::receipt::ChangeRecord;
use std::any::Any;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::{Arc, Weak};

/// Apply or revert procedure attached to a change.
pub type ChangeProcedure = Box<dyn FnMut() -> Result<(), ChangeError> + Send>;

/// Failure reported by an apply or revert procedure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ChangeError {
    message: String,
}

impl ChangeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any displayable error, e.g. an `io::Error` from touching a config file.
    pub fn from_error<E: fmt::Display>(err: E) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for ChangeError {
    fn from(err: std::io::Error) -> Self {
        Self::from_error(err)
    }
}

pub struct Change {
    target_name: String,
    description: String,
    target_object: Option<Weak<dyn Any + Send + Sync>>,
    apply: ChangeProcedure,
    revert: ChangeProcedure,
    applied: bool,
    reverted: bool,
    error: Option<ChangeError>,
}

impl Change {
    pub fn new<A, R>(
        target_name: impl Into<String>,
        description: impl Into<String>,
        apply: A,
        revert: R,
    ) -> Self
    where
        A: FnMut() -> Result<(), ChangeError> + Send + 'static,
        R: FnMut() -> Result<(), ChangeError> + Send + 'static,
    {
        Self {
            target_name: target_name.into(),
            description: description.into(),
            target_object: None,
            apply: Box::new(apply),
            revert: Box::new(revert),
            applied: false,
            reverted: false,
            error: None,
        }
    }

    /// Attach the mutated object for reporting. Only a weak reference is kept, so the change
    /// never extends the object's lifetime.
    #[must_use]
    pub fn with_target_object<O: Any + Send + Sync>(mut self, object: &Arc<O>) -> Self {
        let weak: Weak<O> = Arc::downgrade(object);
        self.target_object = Some(weak);
        self
    }

    /// Run the apply procedure.
    ///
    /// Applying a change that is applied and not yet reverted is a no-op. On success the change
    /// is marked applied and any earlier revert/error state is cleared; on failure the error is
    /// recorded and `applied` is left untouched.
    pub fn apply(&mut self) -> Result<(), ChangeError> {
        if self.applied && !self.reverted {
            return Ok(());
        }
        match (self.apply)() {
            Ok(()) => {
                self.applied = true;
                self.reverted = false;
                self.error = None;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Run the revert procedure unless the change is already reverted.
    ///
    /// `applied` is never modified here; it keeps recording that the mutation once happened.
    pub fn revert(&mut self) -> Result<(), ChangeError> {
        if self.reverted {
            return Ok(());
        }
        match (self.revert)() {
            Ok(()) => {
                self.reverted = true;
                self.error = None;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Only changes that were applied, or that failed somewhere along the way, are reverted.
    pub fn is_revert_eligible(&self) -> bool {
        self.applied || self.error.is_some()
    }

    /// An eligible change that did not end cleanly reverted leaves the target corrupted.
    pub fn is_corrupted(&self) -> bool {
        self.is_revert_eligible() && (self.error.is_some() || !self.reverted)
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The mutated object, if one was attached and it is still alive.
    pub fn target_object(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.target_object.as_ref().and_then(Weak::upgrade)
    }

    pub fn applied(&self) -> bool {
        self.applied
    }

    pub fn reverted(&self) -> bool {
        self.reverted
    }

    pub fn error(&self) -> Option<&ChangeError> {
        self.error.as_ref()
    }

    pub fn record(&self, name: &str) -> ChangeRecord {
        ChangeRecord {
            name: name.to_string(),
            target_name: self.target_name.clone(),
            description: self.description.clone(),
            applied: self.applied,
            reverted: self.reverted,
            error: self.error.as_ref().map(|e| e.message().to_string()),
        }
    }
}

impl fmt::Debug for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Change")
            .field("target_name", &self.target_name)
            .field("description", &self.description)
            .field("applied", &self.applied)
            .field("reverted", &self.reverted)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Changes recorded during one assessment, keyed by a step-chosen name.
#[derive(Debug, Default)]
pub struct ChangeRegistry {
    entries: BTreeMap<String, Change>,
}

impl ChangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a change under `name`, replacing whatever was recorded there before.
    pub fn record(&mut self, name: impl Into<String>, change: Change) -> &mut Change {
        match self.entries.entry(name.into()) {
            Entry::Occupied(mut slot) => {
                tracing::debug!(change = %slot.key(), "overwriting previously recorded change");
                slot.insert(change);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(change),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Change> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Change> {
        self.entries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Revert every eligible change and report whether any of them is left corrupted.
    ///
    /// The pass never stops early: a failing revert is logged and the remaining changes are
    /// still visited. Calling this again after a clean pass is a no-op.
    pub fn revert_all(&mut self) -> bool {
        let mut corrupted = false;
        for (name, change) in self.entries.iter_mut() {
            if !change.is_revert_eligible() {
                continue;
            }
            if !change.reverted() {
                match change.revert() {
                    Ok(()) => tracing::debug!(change = %name, "change reverted"),
                    Err(err) => {
                        tracing::warn!(change = %name, target = change.target_name(), error = %err, "failed to revert change");
                    }
                }
            }
            if change.is_corrupted() {
                corrupted = true;
            }
        }
        corrupted
    }

    /// Receipt records, ordered by change name.
    pub fn records(&self) -> Vec<ChangeRecord> {
        self.entries
            .iter()
            .map(|(name, change)| change.record(name))
            .collect()
    }
}
