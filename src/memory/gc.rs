use crate::errors::err::LexemErr;
use crate::intervals::IntervalSet;
use crate::memory::{Memory, HIDDEN_CONTEXT, STD_LIB_CONTEXT};
use crate::values::Reference;
use bitvec::vec::BitVec;
use log::debug;

/// worklist of a spatial collection.
///
/// every position of the heap starts as dead. pushing a dead position moves it to the
/// to-process set; positions that already left the dead set are ignored, so each cell is
/// expanded at most once no matter how many references point at it.
#[derive(Debug)]
pub struct GarbageCollectorFifo {
    dead: IntervalSet,
    to_process: IntervalSet,
}

impl GarbageCollectorFifo {
    pub fn new(heap_size: usize) -> Self {
        Self {
            dead: IntervalSet::up_to(heap_size),
            to_process: IntervalSet::new(),
        }
    }

    pub fn push(&mut self, reference: Reference) {
        if self.dead.remove(reference.position()) {
            self.to_process.insert(reference.position());
        }
    }

    pub fn pop(&mut self) -> Option<Reference> {
        self.to_process.pop_first().map(Reference::new)
    }

    pub fn dead(&self) -> &IntervalSet {
        &self.dead
    }

    pub fn into_dead(self) -> IntervalSet {
        debug_assert!(self.to_process.is_empty());
        self.dead
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub marked: usize,
    pub freed: usize,
    /// the snapshot was already clean, nothing was traversed.
    pub skipped: bool,
}

impl Memory {
    /// mark and sweep over the current snapshot.
    ///
    /// roots are the two context cells and every primitive on the stack. cells that are not
    /// reached are freed; references they hold on surviving cells are released first. older
    /// snapshots are left untouched. the pass borrows the memory exclusively, so no rollback can
    /// destroy the snapshot while it runs.
    pub fn spatial_garbage_collect(&mut self, force: bool) -> Result<GcReport, LexemErr> {
        let node_id = self.last_node_id();
        if self.last().is_cleaned() && !force {
            debug!("gc: {node_id} is clean, skipping");
            return Ok(GcReport { skipped: true, ..Default::default() });
        }

        let heap_size = self.last().next_free_cell();
        let mut fifo = GarbageCollectorFifo::new(heap_size);
        let mut marks: BitVec = BitVec::repeat(false, heap_size);

        fifo.push(STD_LIB_CONTEXT);
        fifo.push(HIDDEN_CONTEXT);
        for primitive in self.last().stack().primitives() {
            if let Some(reference) = primitive.as_reference() {
                fifo.push(reference);
            }
        }

        while let Some(reference) = fifo.pop() {
            let position = reference.position();
            if marks[position] {
                continue;
            }
            marks.set(position, true);
            self.last().cell(position)?.value().spatial_garbage_collect(&mut fifo);
        }

        let dead: Vec<usize> = fifo
            .into_dead()
            .iter()
            .filter(|&p| self.last().has_cell(p))
            .collect();

        let mut released = Vec::new();
        for &position in &dead {
            for reference in self.last().cell(position)?.value().references() {
                if marks.get(reference.position()).is_some_and(|m| *m) {
                    released.push(reference);
                }
            }
        }
        for reference in released {
            self.decrease_reference_count(reference, 1)?;
        }

        let node = self.last_mut();
        for &position in &dead {
            node.free(position)?;
        }
        node.mark_cleaned();
        self.allocations_since_gc = 0;

        let report = GcReport {
            marked: marks.count_ones(),
            freed: dead.len(),
            ..Default::default()
        };
        debug!("gc: {node_id} marked {} cells, freed {}", report.marked, report.freed);
        Ok(report)
    }

    /// collects once the configured amount of allocations happened since the last collection.
    pub fn collect_if_needed(&mut self) -> Result<Option<GcReport>, LexemErr> {
        let threshold = self.config().gc_threshold;
        if threshold == 0 || self.allocations_since_gc < threshold {
            return Ok(None);
        }
        self.spatial_garbage_collect(false).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::err::ErrorKind;
    use crate::memory::MemoryConfig;
    use crate::values::{HeapValue, Primitive};

    fn memory() -> Memory {
        Memory::new(MemoryConfig::default())
    }

    fn string(memory: &mut Memory, s: &str) -> Reference {
        let value = HeapValue::string(memory, s);
        memory.add(value).unwrap()
    }

    #[test]
    fn fifo_expands_each_position_once() {
        let mut fifo = GarbageCollectorFifo::new(6);
        fifo.push(Reference::new(4));
        fifo.push(Reference::new(1));
        fifo.push(Reference::new(4));
        fifo.push(Reference::new(9));
        assert_eq!(fifo.pop(), Some(Reference::new(1)));
        fifo.push(Reference::new(1));
        assert_eq!(fifo.pop(), Some(Reference::new(4)));
        assert_eq!(fifo.pop(), None);
        assert_eq!(fifo.into_dead().iter().collect::<Vec<_>>(), vec![0, 2, 3, 5]);
    }

    #[test]
    fn unreachable_cells_are_freed() {
        let mut memory = memory();
        let kept = string(&mut memory, "kept");
        memory.push_stack("kept", Primitive::Reference(kept)).unwrap();
        let lost = string(&mut memory, "lost");

        let report = memory.spatial_garbage_collect(false).unwrap();
        assert_eq!(report.freed, 1);
        assert_eq!(report.marked, 3);
        assert_eq!(memory.get(lost).unwrap_err().kind(), ErrorKind::FreedMemoryAccess);
        assert_eq!(memory.get(kept).unwrap().to_string(), "\"kept\"");
        assert_eq!(memory.reference_count(kept).unwrap(), 1);
    }

    #[test]
    fn nested_values_survive_through_their_parents() {
        let mut memory = memory();
        let inner = string(&mut memory, "inner");
        let list = HeapValue::list(&memory, vec![Primitive::Reference(inner), Primitive::Int(1)]);
        let list = memory.add(list).unwrap();
        memory.push_stack("l", Primitive::Reference(list)).unwrap();

        let report = memory.spatial_garbage_collect(false).unwrap();
        assert_eq!(report.freed, 0);
        assert_eq!(memory.get(inner).unwrap().to_string(), "\"inner\"");
        assert_eq!(memory.reference_count(inner).unwrap(), 1);
    }

    #[test]
    fn unreachable_cycles_are_collected() {
        let mut memory = memory();
        let a = HeapValue::list(&memory, vec![]);
        let a = memory.add(a).unwrap();
        let b = HeapValue::list(&memory, vec![Primitive::Reference(a)]);
        let b = memory.add(b).unwrap();
        memory.push_list_item(a, Primitive::Reference(b)).unwrap();
        memory.push_stack("a", Primitive::Reference(a)).unwrap();
        memory.remove_from_stack("a").unwrap();
        // the cycle keeps both counts above zero
        assert_eq!(memory.reference_count(a).unwrap(), 1);
        assert_eq!(memory.reference_count(b).unwrap(), 1);

        let report = memory.spatial_garbage_collect(false).unwrap();
        assert_eq!(report.freed, 2);
        assert!(memory.is_freed(a));
        assert!(memory.is_freed(b));
    }

    #[test]
    fn dead_referrers_release_their_survivors() {
        let mut memory = memory();
        let shared = string(&mut memory, "shared");
        memory.push_stack("s", Primitive::Reference(shared)).unwrap();
        let holder = HeapValue::list(&memory, vec![Primitive::Reference(shared)]);
        memory.add(holder).unwrap();
        assert_eq!(memory.reference_count(shared).unwrap(), 2);

        let report = memory.spatial_garbage_collect(false).unwrap();
        assert_eq!(report.freed, 1);
        assert_eq!(memory.reference_count(shared).unwrap(), 1);
    }

    #[test]
    fn contexts_are_roots() {
        let mut memory = memory();
        let global = string(&mut memory, "global");
        memory.set_object_field(STD_LIB_CONTEXT, "g", Primitive::Reference(global)).unwrap();
        let hidden = string(&mut memory, "hidden");
        memory.set_object_field(HIDDEN_CONTEXT, "h", Primitive::Reference(hidden)).unwrap();

        let report = memory.spatial_garbage_collect(false).unwrap();
        assert_eq!(report.freed, 0);
        assert!(!memory.is_freed(global));
        assert!(!memory.is_freed(hidden));
    }

    #[test]
    fn clean_snapshots_are_skipped_unless_forced() {
        let mut memory = memory();
        string(&mut memory, "garbage");
        assert_eq!(memory.spatial_garbage_collect(false).unwrap().freed, 1);
        assert!(memory.spatial_garbage_collect(false).unwrap().skipped);

        memory.freeze_copy();
        assert!(memory.spatial_garbage_collect(false).unwrap().skipped);
        let forced = memory.spatial_garbage_collect(true).unwrap();
        assert!(!forced.skipped);
        assert_eq!(forced.freed, 0);
    }

    #[test]
    fn collection_leaves_history_alone() {
        let mut memory = memory();
        let lost = string(&mut memory, "lost");
        let frozen = memory.freeze_copy();
        assert_eq!(memory.spatial_garbage_collect(true).unwrap().freed, 1);
        assert!(memory.is_freed(lost));

        memory.restore_copy(frozen).unwrap();
        assert_eq!(memory.get(lost).unwrap().to_string(), "\"lost\"");
    }

    #[test]
    fn threshold_triggers_collection() {
        let mut memory = Memory::new(MemoryConfig { gc_threshold: 2 });
        string(&mut memory, "a");
        assert_eq!(memory.collect_if_needed().unwrap(), None);
        string(&mut memory, "b");
        let report = memory.collect_if_needed().unwrap().unwrap();
        assert_eq!(report.freed, 2);
        assert_eq!(memory.collect_if_needed().unwrap(), None);
    }

    #[test]
    fn report_of_a_full_pass() {
        let mut memory = memory();
        let kept = string(&mut memory, "kept");
        memory.push_stack("kept", Primitive::Reference(kept)).unwrap();
        string(&mut memory, "lost");
        assert_eq!(
            memory.spatial_garbage_collect(false).unwrap(),
            GcReport { marked: 3, freed: 1, skipped: false }
        );
        assert_eq!(
            memory.spatial_garbage_collect(false).unwrap(),
            GcReport { marked: 0, freed: 0, skipped: true }
        );
    }
}
