//! Cleanup stack for temporaries.
//!
//! Each statement (and anything else that creates short-lived values)
//! pushes a frame; cleaners registered while it is on top run in reverse
//! order of registration when it is popped.

use crate::{CompileError, Result};

/// Deferred cleanup action.
pub type Cleaner<C> = Box<dyn FnOnce(&mut C) -> Result<()>>;

pub struct TemporaryStack<C> {
    frames: Vec<Vec<Cleaner<C>>>,
}

impl<C> TemporaryStack<C> {
    pub fn new() -> Self {
        TemporaryStack { frames: Vec::new() }
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Register a cleaner in the top frame.
    pub fn add(&mut self, cleaner: Cleaner<C>) -> Result<()> {
        self.frames
            .last_mut()
            .ok_or(CompileError::StackUnderflow {
                what: "temporaries",
            })?
            .push(cleaner);
        Ok(())
    }

    /// Remove the top frame, returning its cleaners in the order they must
    /// run (most recently registered first).
    pub fn pop(&mut self) -> Result<Vec<Cleaner<C>>> {
        let mut frame = self.frames.pop().ok_or(CompileError::StackUnderflow {
            what: "temporaries",
        })?;
        frame.reverse();
        Ok(frame)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl<C> Default for TemporaryStack<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run cleaners in the given order, stopping at the first failure.
pub fn run_cleaners<C>(cx: &mut C, cleaners: Vec<Cleaner<C>>) -> Result<()> {
    cleaners.into_iter().try_for_each(|cleaner| cleaner(cx))
}
