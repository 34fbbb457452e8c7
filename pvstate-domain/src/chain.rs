use crate::steps::{self, MigrationStep, StepMeta};
use pvstate_types::{Transition, Version};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("step {key} targets {target}, which does not follow {previous}")]
    OutOfOrder {
        key: &'static str,
        target: Version,
        previous: Version,
    },
}

/// Steps ordered by strictly increasing target version.
pub struct StepChain {
    steps: Vec<Box<dyn MigrationStep>>,
}

impl Default for StepChain {
    fn default() -> Self {
        Self::new()
    }
}

impl StepChain {
    /// The built-in release chain.
    pub fn new() -> Self {
        Self {
            steps: steps::builtin_steps(),
        }
    }

    pub fn with_steps(steps: Vec<Box<dyn MigrationStep>>) -> Result<Self, ChainError> {
        let mut previous: Option<Version> = None;
        for step in &steps {
            let meta = step.meta();
            if let Some(previous) = previous
                && !previous.less_than(meta.transition.to)
            {
                return Err(ChainError::OutOfOrder {
                    key: meta.key,
                    target: meta.transition.to,
                    previous,
                });
            }
            previous = Some(meta.transition.to);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> impl Iterator<Item = &dyn MigrationStep> {
        self.steps.iter().map(|s| s.as_ref())
    }

    /// Steps whose target is newer than `current`, in application order.
    pub fn pending(&self, current: Version) -> impl Iterator<Item = &dyn MigrationStep> {
        self.steps()
            .filter(move |s| current.less_than(s.meta().transition.to))
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.steps().map(|s| s.meta().transition).collect()
    }

    /// Newest version the chain migrates to.
    pub fn latest(&self) -> Option<Version> {
        self.steps.last().map(|s| s.meta().transition.to)
    }

    pub fn metas(&self) -> Vec<StepMeta> {
        self.steps().map(|s| s.meta()).collect()
    }

    /// Look a step up by key (`pv.5_4_to_5_5`), transition label (`5.4→5.5`,
    /// `5.4->5.5`) or target version (`5.5`).
    pub fn find(&self, needle: &str) -> Option<&dyn MigrationStep> {
        let needle = needle.trim();
        let target: Option<Version> = needle.parse().ok();
        self.steps().find(|s| {
            let meta = s.meta();
            meta.key == needle
                || meta.transition.to_string() == needle
                || meta.transition.to_string().replace('→', "->") == needle
                || target == Some(meta.transition.to)
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
