use crate::change::ChangeRegistry;
use assessor_types::Outcome;
use std::fmt;

/// What a step reports back: its outcome and a human-readable message.
pub type StepOutput = (Outcome, String);

type StepFn<T> = dyn Fn(&T, &mut ChangeRegistry) -> StepOutput + Send + Sync;

/// A single check run against opaque target data.
///
/// Each step carries a stable symbolic name assigned at registration. Audit trails and receipts
/// serialize that name, never the function itself.
pub struct Step<T: ?Sized> {
    name: String,
    check: Box<StepFn<T>>,
}

impl<T: ?Sized> Step<T> {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&T, &mut ChangeRegistry) -> StepOutput + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the check. The step may record new changes but the registry offers no way to drop
    /// existing ones.
    pub fn invoke(&self, target: &T, changes: &mut ChangeRegistry) -> StepOutput {
        (self.check)(target, changes)
    }
}

impl<T: ?Sized> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Step").field(&self.name).finish()
    }
}

impl<T: ?Sized> fmt::Display for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
