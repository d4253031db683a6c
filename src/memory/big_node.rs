use crate::errors::err::LexemErr;
use crate::memory::cell::HeapCell;
use crate::memory::stack::Stack;
use crate::values::{HeapValue, Reference};
use fxhash::FxHashMap;
use log::trace;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigNodeId(u64);

impl BigNodeId {
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl Debug for BigNodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Display for BigNodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type HeapTable = FxHashMap<usize, Arc<HeapCell>>;

/// one snapshot of the whole mutable state.
///
/// a fresh snapshot shares its stack and heap table with its predecessor. the first write to
/// either clones that collection once; the first write to a single cell additionally shifts that
/// cell (and its value) into this snapshot. cells nobody writes to are never copied.
pub struct BigNode {
    id: BigNodeId,
    previous: Option<BigNodeId>,
    next: Option<BigNodeId>,

    stack: Arc<Stack>,
    is_stack_cloned: bool,
    heap: Arc<HeapTable>,
    is_heap_cloned: bool,

    /// positions are handed out monotonically and never recycled.
    next_free_cell: usize,
    /// set by a full garbage collection, cleared by any write.
    is_cleaned: bool,
}

impl BigNode {
    pub fn root(id: BigNodeId) -> Self {
        Self {
            id,
            previous: None,
            next: None,
            stack: Arc::new(Stack::new()),
            is_stack_cloned: true,
            heap: Arc::new(HeapTable::default()),
            is_heap_cloned: true,
            next_free_cell: 0,
            is_cleaned: true,
        }
    }

    /// a new snapshot chained after `previous`, sharing all of its state.
    pub fn after(previous: &BigNode, id: BigNodeId) -> Self {
        Self {
            id,
            previous: Some(previous.id),
            next: None,
            stack: Arc::clone(&previous.stack),
            is_stack_cloned: false,
            heap: Arc::clone(&previous.heap),
            is_heap_cloned: false,
            next_free_cell: previous.next_free_cell,
            is_cleaned: previous.is_cleaned,
        }
    }

    pub fn id(&self) -> BigNodeId {
        self.id
    }

    pub fn previous(&self) -> Option<BigNodeId> {
        self.previous
    }

    pub fn next(&self) -> Option<BigNodeId> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<BigNodeId>) {
        self.next = next;
    }

    pub fn is_root(&self) -> bool {
        self.previous.is_none()
    }

    pub fn is_stack_cloned(&self) -> bool {
        self.is_stack_cloned
    }

    pub fn is_heap_cloned(&self) -> bool {
        self.is_heap_cloned
    }

    pub fn next_free_cell(&self) -> usize {
        self.next_free_cell
    }

    pub fn is_cleaned(&self) -> bool {
        self.is_cleaned
    }

    pub(crate) fn mark_cleaned(&mut self) {
        self.is_cleaned = true;
    }
}

// stack
impl BigNode {
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        if !self.is_stack_cloned {
            trace!("{}: cloning {} stack levels", self.id, self.stack.level_count());
            self.is_stack_cloned = true;
        }
        self.is_cleaned = false;
        Arc::make_mut(&mut self.stack)
    }
}

// heap
impl BigNode {
    fn heap_table_mut(&mut self) -> &mut HeapTable {
        if !self.is_heap_cloned {
            trace!("{}: cloning heap table of {} cells", self.id, self.heap.len());
            self.is_heap_cloned = true;
        }
        self.is_cleaned = false;
        Arc::make_mut(&mut self.heap)
    }

    /// live cells of this snapshot, in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = &HeapCell> + '_ {
        self.heap.values().map(|c| c.as_ref())
    }

    pub fn live_cell_count(&self) -> usize {
        self.heap.len()
    }

    pub fn has_cell(&self, position: usize) -> bool {
        self.heap.contains_key(&position)
    }

    fn check_position(&self, position: usize) -> Result<(), LexemErr> {
        if position >= self.next_free_cell {
            return Err(LexemErr::heap_out_of_range(format!(
                "&{position} is beyond the heap of {} ({} cells)",
                self.id, self.next_free_cell
            )));
        }
        if !self.heap.contains_key(&position) {
            return Err(LexemErr::freed_memory_access(format!(
                "&{position} was freed in {}",
                self.id
            )));
        }
        Ok(())
    }

    pub fn cell(&self, position: usize) -> Result<&HeapCell, LexemErr> {
        self.check_position(position)?;
        Ok(self.heap[&position].as_ref())
    }

    /// the cell at `position`, shifted into this snapshot first if an older one owns it.
    pub fn cell_mut(&mut self, position: usize) -> Result<&mut HeapCell, LexemErr> {
        self.check_position(position)?;
        let id = self.id;
        let cell = self
            .heap_table_mut()
            .get_mut(&position)
            .ok_or_else(|| LexemErr::freed_memory_access(format!("&{position} was freed in {id}")))?;
        if cell.owner() != id {
            trace!("{id}: shifting &{position} from {}", cell.owner());
            *cell = Arc::new(cell.shift(id));
        }
        Ok(Arc::make_mut(cell))
    }

    pub fn alloc(&mut self, value: HeapValue) -> Result<Reference, LexemErr> {
        if value.owner() != self.id {
            return Err(LexemErr::cross_snapshot_allocation(format!(
                "value built against {} cannot be allocated in {}",
                value.owner(),
                self.id
            )));
        }
        Ok(self.insert_cell(value, 0))
    }

    pub(crate) fn insert_cell(&mut self, value: HeapValue, reference_count: usize) -> Reference {
        let position = self.next_free_cell;
        let mut cell = HeapCell::new(position, value);
        cell.increase_reference_count(reference_count);
        self.heap_table_mut().insert(position, Arc::new(cell));
        self.next_free_cell += 1;
        Reference::new(position)
    }

    /// drops the cell from this snapshot's table and hands it back so that its value can release
    /// what it owns. older snapshots keep their own copy.
    pub fn free(&mut self, position: usize) -> Result<Arc<HeapCell>, LexemErr> {
        self.check_position(position)?;
        trace!("{}: freeing &{position}", self.id);
        let id = self.id;
        self.heap_table_mut()
            .remove(&position)
            .ok_or_else(|| LexemErr::freed_memory_access(format!("&{position} was freed in {id}")))
    }
}
