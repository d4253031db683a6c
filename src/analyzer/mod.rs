//! the pieces of the analyzer driver that touch memory: every backtrack point saves the memory
//! snapshot together with the reader's cursor, and going back always restores both.

pub mod reader;

pub use reader::TextReader;

use crate::errors::err::LexemErr;
use crate::memory::{BigNodeId, Memory, MemoryConfig};
use log::debug;

/// what the driver keeps per backtrack point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    node: BigNodeId,
    cursor: usize,
}

impl Checkpoint {
    pub fn node(&self) -> BigNodeId {
        self.node
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// a backtrackable alternative. `Ok(false)` is an ordinary failed match, `Err` aborts the run.
pub type Branch<'a> = &'a mut dyn FnMut(&mut Analyzer) -> Result<bool, LexemErr>;

pub struct Analyzer {
    memory: Memory,
    reader: TextReader,
}

impl Analyzer {
    pub fn new(text: &str, config: MemoryConfig) -> Self {
        Self {
            memory: Memory::new(config),
            reader: TextReader::new(text),
        }
    }

    /// starts a new run over `text` with a fresh memory baseline.
    pub fn reset(&mut self, text: &str) {
        self.memory.clear();
        self.reader = TextReader::new(text);
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn reader(&self) -> &TextReader {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut TextReader {
        &mut self.reader
    }

    pub fn freeze_memory_copy(&mut self) -> Checkpoint {
        Checkpoint {
            node: self.memory.freeze_copy(),
            cursor: self.reader.position(),
        }
    }

    pub fn restore_memory_copy(&mut self, checkpoint: &Checkpoint) -> Result<(), LexemErr> {
        self.memory.restore_copy(checkpoint.node)?;
        self.reader.set_position(checkpoint.cursor);
        Ok(())
    }

    /// single step variant of [`Analyzer::restore_memory_copy`]. the checkpoint must be the
    /// direct predecessor of the current snapshot.
    pub fn rollback_memory_copy(&mut self, checkpoint: &Checkpoint) -> Result<(), LexemErr> {
        if self.memory.last().previous() != Some(checkpoint.node) {
            return Err(LexemErr::restore_target_not_in_chain(format!(
                "{} is not the direct predecessor of {}",
                checkpoint.node,
                self.memory.last_node_id()
            )));
        }
        self.memory.rollback_copy()?;
        self.reader.set_position(checkpoint.cursor);
        Ok(())
    }

    /// tries each branch from the same state and keeps the first one that matches. failed
    /// branches leave neither memory changes nor consumed input behind.
    pub fn alternatives(&mut self, branches: &mut [Branch]) -> Result<Option<usize>, LexemErr> {
        for (i, branch) in branches.iter_mut().enumerate() {
            let checkpoint = self.freeze_memory_copy();
            if branch(self)? {
                return Ok(Some(i));
            }
            debug!("alternative {i} failed at {}, backtracking to {}", self.reader.position(), checkpoint.cursor);
            self.restore_memory_copy(&checkpoint)?;
        }
        Ok(None)
    }

    /// runs `branch` without keeping its effects. `negative` inverts the outcome.
    pub fn lookahead(&mut self, branch: Branch, negative: bool) -> Result<bool, LexemErr> {
        let checkpoint = self.freeze_memory_copy();
        let matched = branch(self)?;
        self.restore_memory_copy(&checkpoint)?;
        Ok(matched != negative)
    }

    /// keeps the effects of `branch` when it matches, drops them otherwise. always succeeds.
    pub fn optional(&mut self, branch: Branch) -> Result<bool, LexemErr> {
        let checkpoint = self.freeze_memory_copy();
        let matched = branch(self)?;
        if !matched {
            self.restore_memory_copy(&checkpoint)?;
        }
        Ok(matched)
    }

    /// possessive repetition: matches `branch` as many times as possible (up to `max`), never
    /// giving iterations back. an iteration that doesn't consume input ends the loop. fails,
    /// undoing every iteration, when fewer than `min` matched.
    pub fn repeat(&mut self, branch: Branch, min: usize, max: Option<usize>) -> Result<Option<usize>, LexemErr> {
        let start = self.freeze_memory_copy();
        let mut count = 0;
        while max.map_or(true, |max| count < max) {
            let iteration = self.freeze_memory_copy();
            if !branch(self)? || self.reader.position() == iteration.cursor {
                self.restore_memory_copy(&iteration)?;
                break;
            }
            count += 1;
        }
        if count < min {
            self.restore_memory_copy(&start)?;
            return Ok(None);
        }
        Ok(Some(count))
    }
}
