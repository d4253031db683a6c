//! the analyzer's memory: a chain of snapshots ("big nodes") over one stack and one heap.
//!
//! the analyzer freezes the current snapshot before trying a backtrackable alternative and
//! rolls back or restores to it when the alternative fails. snapshots share everything with
//! their predecessor until they write, see [`big_node::BigNode`].

pub mod big_node;
pub mod cell;
pub mod config;
pub mod gc;
pub mod stack;
mod utils;

pub use big_node::{BigNode, BigNodeId};
pub use config::MemoryConfig;
pub use gc::{GarbageCollectorFifo, GcReport};

use crate::errors::err::LexemErr;
use crate::values::{HeapValue, Primitive, Reference};
use fxhash::FxHashMap;
use log::{debug, trace};
use std::fmt::{Display, Formatter};

/// the standard library context, first cell of every run.
pub const STD_LIB_CONTEXT: Reference = Reference::new(0);
/// the analyzer's hidden context.
pub const HIDDEN_CONTEXT: Reference = Reference::new(1);

pub struct Memory {
    /// every snapshot of the current chain. ids are never reused, so destroyed snapshots stay
    /// detectably absent.
    nodes: FxHashMap<BigNodeId, BigNode>,
    last_node: BigNodeId,
    next_node_id: u64,
    config: MemoryConfig,
    pub(crate) allocations_since_gc: usize,
}

impl Memory {
    pub fn new(config: MemoryConfig) -> Self {
        let mut memory = Self {
            nodes: FxHashMap::default(),
            last_node: BigNodeId::from_raw(0),
            next_node_id: 0,
            config,
            allocations_since_gc: 0,
        };
        memory.clear();
        memory
    }

    fn fresh_id(&mut self) -> BigNodeId {
        let id = BigNodeId::from_raw(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn last_node_id(&self) -> BigNodeId {
        self.last_node
    }

    pub fn last(&self) -> &BigNode {
        &self.nodes[&self.last_node]
    }

    pub(crate) fn last_mut(&mut self) -> &mut BigNode {
        // the current snapshot is only ever replaced, never removed
        self.nodes.get_mut(&self.last_node).unwrap()
    }

    pub fn node(&self, id: BigNodeId) -> Option<&BigNode> {
        self.nodes.get(&id)
    }

    pub fn contains_node(&self, id: BigNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// snapshots from the root to the current one, both included.
    pub fn chain_len(&self) -> usize {
        std::iter::successors(Some(self.last()), |n| n.previous().map(|p| &self.nodes[&p])).count()
    }

    #[cfg(feature = "debug")]
    fn debug_check(&self) {
        if let Err(e) = self.check_invariants() {
            panic!("memory invariants broken: {e}");
        }
    }

    #[cfg(not(feature = "debug"))]
    fn debug_check(&self) {}
}

// snapshots
impl Memory {
    /// freezes the current snapshot and makes a fresh one current. returns the frozen snapshot,
    /// which is what a later [`Memory::restore_copy`] goes back to.
    pub fn freeze_copy(&mut self) -> BigNodeId {
        let frozen = self.last_node;
        let id = self.fresh_id();
        let node = BigNode::after(self.last(), id);
        self.last_mut().set_next(Some(id));
        self.nodes.insert(id, node);
        self.last_node = id;
        debug!("freeze: {frozen} -> {id}");
        self.debug_check();
        frozen
    }

    /// discards the current snapshot. returns the one that became current.
    pub fn rollback_copy(&mut self) -> Result<BigNodeId, LexemErr> {
        let current = self.last_node;
        let previous = self.last().previous().ok_or_else(|| {
            LexemErr::root_rollback(format!("{current} is the root snapshot"))
        })?;
        self.destroy(current);
        self.last_node = previous;
        self.last_mut().set_next(None);
        debug!("rollback: {current} -> {previous}");
        self.debug_check();
        Ok(previous)
    }

    /// discards every snapshot after `target`, which becomes current.
    pub fn restore_copy(&mut self, target: BigNodeId) -> Result<(), LexemErr> {
        if target == self.last_node {
            return Ok(());
        }
        let mut doomed = Vec::new();
        let mut cursor = self.last_node;
        loop {
            doomed.push(cursor);
            match self.nodes[&cursor].previous() {
                Some(previous) if previous == target => break,
                Some(previous) => cursor = previous,
                None => {
                    return Err(LexemErr::restore_target_not_in_chain(format!(
                        "{target} is not an ancestor of {}",
                        self.last_node
                    )))
                }
            }
        }
        for id in &doomed {
            self.destroy(*id);
        }
        self.last_node = target;
        self.last_mut().set_next(None);
        debug!("restore: dropped {} snapshots, back to {target}", doomed.len());
        self.debug_check();
        Ok(())
    }

    /// drops the whole history and starts over from a fresh root holding only the two contexts.
    pub fn clear(&mut self) {
        let dropped = self.nodes.len();
        self.nodes.clear();
        let root = self.fresh_id();
        self.nodes.insert(root, BigNode::root(root));
        self.last_node = root;
        for context in [STD_LIB_CONTEXT, HIDDEN_CONTEXT] {
            let value = HeapValue::object(self, FxHashMap::default());
            let reference = self.last_mut().insert_cell(value, 1);
            debug_assert_eq!(reference, context);
        }
        self.allocations_since_gc = 0;
        debug!("clear: dropped {dropped} snapshots, new root {root}");
        self.freeze_copy();
    }

    fn destroy(&mut self, id: BigNodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            trace!("destroying {id} ({} live cells)", node.live_cell_count());
        }
    }
}

// heap
impl Memory {
    fn check_owner(&self, value: &HeapValue) -> Result<(), LexemErr> {
        if value.owner() != self.last_node {
            return Err(LexemErr::cross_snapshot_allocation(format!(
                "value built against {} cannot be stored in {}",
                value.owner(),
                self.last_node
            )));
        }
        Ok(())
    }

    /// every reference `value` owns must point at a live cell before any count changes.
    fn check_children(&self, value: &HeapValue) -> Result<(), LexemErr> {
        for reference in value.references() {
            self.last().cell(reference.position())?;
        }
        Ok(())
    }

    /// stores `value` in a new cell with no references. the references `value` owns are counted.
    pub fn add(&mut self, value: HeapValue) -> Result<Reference, LexemErr> {
        self.check_owner(&value)?;
        self.check_children(&value)?;
        for reference in value.references() {
            self.increase_reference_count(reference, 1)?;
        }
        let reference = self.last_mut().alloc(value)?;
        self.allocations_since_gc += 1;
        trace!("add: {reference} in {}", self.last_node);
        Ok(reference)
    }

    pub fn get(&self, reference: Reference) -> Result<&HeapValue, LexemErr> {
        self.last().cell(reference.position()).map(|c| c.value())
    }

    /// read for write: the cell is shifted into the current snapshot first.
    pub fn get_mut(&mut self, reference: Reference) -> Result<&mut HeapValue, LexemErr> {
        self.last_mut().cell_mut(reference.position()).map(|c| c.value_mut())
    }

    /// replaces the value of a cell, keeping its reference count.
    pub fn set(&mut self, reference: Reference, value: HeapValue) -> Result<(), LexemErr> {
        self.check_owner(&value)?;
        self.last().cell(reference.position())?;
        self.check_children(&value)?;
        for child in value.references() {
            self.increase_reference_count(child, 1)?;
        }
        let old = self.last_mut().cell_mut(reference.position())?.replace_value(value);
        old.memory_dealloc(self)
    }

    /// frees a cell nobody references anymore.
    pub fn remove(&mut self, reference: Reference) -> Result<(), LexemErr> {
        let count = self.reference_count(reference)?;
        if count > 0 {
            return Err(LexemErr::referenced_cell_freed(format!(
                "{reference} is still referenced {count} times"
            )));
        }
        self.free(reference)
    }

    fn free(&mut self, reference: Reference) -> Result<(), LexemErr> {
        let cell = self.last_mut().free(reference.position())?;
        cell.value().memory_dealloc(self)
    }

    /// releases one reference per entry. cells that drop to zero are freed and what they own
    /// joins the worklist, so arbitrarily long chains never grow the call stack.
    pub(crate) fn release(&mut self, mut pending: Vec<Reference>) -> Result<(), LexemErr> {
        while let Some(reference) = pending.pop() {
            if self.last_mut().cell_mut(reference.position())?.decrease_reference_count(1)? {
                let cell = self.last_mut().free(reference.position())?;
                trace!("release: {reference} reached zero");
                pending.extend(cell.value().references());
            }
        }
        Ok(())
    }

    pub fn reference_count(&self, reference: Reference) -> Result<usize, LexemErr> {
        self.last().cell(reference.position()).map(|c| c.reference_count())
    }

    pub fn increase_reference_count(&mut self, reference: Reference, count: usize) -> Result<(), LexemErr> {
        self.last_mut().cell_mut(reference.position())?.increase_reference_count(count);
        Ok(())
    }

    /// releases `count` references, freeing the cell when none are left.
    pub fn decrease_reference_count(&mut self, reference: Reference, count: usize) -> Result<(), LexemErr> {
        if self.last_mut().cell_mut(reference.position())?.decrease_reference_count(count)? {
            self.free(reference)?;
        }
        Ok(())
    }

    /// whether `reference` points at a cell that was allocated and freed since.
    pub fn is_freed(&self, reference: Reference) -> bool {
        reference.position() < self.heap_size() && !self.last().has_cell(reference.position())
    }

    pub fn heap_size(&self) -> usize {
        self.last().next_free_cell()
    }
}

// stack
impl Memory {
    pub fn push_stack(&mut self, name: &str, value: Primitive) -> Result<(), LexemErr> {
        if let Some(reference) = value.as_reference() {
            self.increase_reference_count(reference, 1)?;
        }
        if self.last_mut().stack_mut().push(name, value) {
            trace!("push: '{name}' opened stack level {}", self.stack_level_count());
        }
        Ok(())
    }

    pub fn get_from_stack(&self, name: &str) -> Result<Primitive, LexemErr> {
        self.last().stack().get(name)
    }

    pub fn remove_from_stack(&mut self, name: &str) -> Result<Primitive, LexemErr> {
        self.get_from_stack(name)?;
        let removed = self.last_mut().stack_mut().remove(name)?;
        if let Some(reference) = removed.as_reference() {
            self.decrease_reference_count(reference, 1)?;
        }
        Ok(removed)
    }

    /// removes the most recent binding, wherever its name is.
    pub fn pop_stack(&mut self) -> Result<(String, Primitive), LexemErr> {
        if self.last().stack().primitives().next().is_none() {
            return Err(LexemErr::stack_name_not_found("the stack holds no bindings"));
        }
        let (name, popped) = self
            .last_mut()
            .stack_mut()
            .pop()
            .ok_or_else(|| LexemErr::stack_name_not_found("the stack holds no bindings"))?;
        if let Some(reference) = popped.as_reference() {
            self.decrease_reference_count(reference, 1)?;
        }
        Ok((name, popped))
    }

    /// rebinds the innermost `name` and returns the previous value.
    pub fn replace_stack_data(&mut self, name: &str, value: Primitive) -> Result<Primitive, LexemErr> {
        let old = self.get_from_stack(name)?;
        self.replace_primitives(None, Some(value))?;
        self.last_mut().stack_mut().replace(name, value)?;
        self.replace_primitives(Some(old), None)?;
        Ok(old)
    }

    pub fn open_stack_level(&mut self) {
        self.last_mut().stack_mut().open_level();
    }

    /// drops the innermost level with all of its bindings.
    pub fn close_stack_level(&mut self) -> Result<(), LexemErr> {
        if self.stack_level_count() == 0 {
            return Err(LexemErr::invalid_value("there is no stack level to close"));
        }
        let level = self
            .last_mut()
            .stack_mut()
            .close_level()
            .ok_or_else(|| LexemErr::invalid_value("there is no stack level to close"))?;
        for (_, primitive) in level.iter() {
            if let Some(reference) = primitive.as_reference() {
                self.decrease_reference_count(reference, 1)?;
            }
        }
        Ok(())
    }

    pub fn stack_level_count(&self) -> usize {
        self.last().stack().level_count()
    }
}

// diagnostics
impl Memory {
    /// checks the chain links of every snapshot and the heap and stack of the current one.
    pub fn check_invariants(&self) -> Result<(), LexemErr> {
        let mut visited = 0;
        let mut cursor = Some(self.last_node);
        let mut expected_next = None;
        while let Some(id) = cursor {
            let node = self.nodes.get(&id).ok_or_else(|| {
                LexemErr::restore_target_not_in_chain(format!("{id} is linked but was destroyed"))
            })?;
            if node.next() != expected_next {
                return Err(LexemErr::invalid_value(format!(
                    "{id} links forward to {:?}, expected {:?}",
                    node.next(),
                    expected_next
                )));
            }
            visited += 1;
            expected_next = Some(id);
            cursor = node.previous();
        }
        if visited != self.nodes.len() {
            return Err(LexemErr::invalid_value(format!(
                "{} snapshots are alive but only {visited} are chained",
                self.nodes.len()
            )));
        }

        let last = self.last();
        for cell in last.cells() {
            if cell.position() >= last.next_free_cell() {
                return Err(LexemErr::heap_out_of_range(format!(
                    "&{} lives beyond the heap of {}",
                    cell.position(),
                    last.id()
                )));
            }
        }
        for primitive in last.stack().primitives() {
            if let Some(reference) = primitive.as_reference() {
                last.cell(reference.position())?;
            }
        }
        Ok(())
    }
}

impl Display for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let last = self.last();
        writeln!(
            f,
            "snapshot {} (chain of {}, {} live cells, next free &{})",
            last.id(),
            self.chain_len(),
            last.live_cell_count(),
            last.next_free_cell()
        )?;
        writeln!(f, "stack:")?;
        for (depth, level) in last.stack().levels().iter().enumerate() {
            write!(f, "  level {depth}:")?;
            for (name, primitive) in level.iter() {
                write!(f, " {name} = {primitive}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "heap:")?;
        let mut cells: Vec<_> = last.cells().collect();
        cells.sort_by_key(|c| c.position());
        for cell in cells {
            writeln!(
                f,
                "  &{} [refs {}, {}] {}",
                cell.position(),
                cell.reference_count(),
                cell.owner(),
                cell.value()
            )?;
        }
        Ok(())
    }
}
