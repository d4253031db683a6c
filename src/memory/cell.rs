use crate::errors::err::LexemErr;
use crate::memory::big_node::BigNodeId;
use crate::values::HeapValue;

/// one reference counted heap slot.
///
/// a cell belongs to the snapshot that created or last shifted it. a snapshot never writes to a
/// cell it doesn't own: it shifts a copy into its own table first.
#[derive(Debug, Clone)]
pub struct HeapCell {
    position: usize,
    owner: BigNodeId,
    reference_count: usize,
    value: HeapValue,
}

impl HeapCell {
    pub fn new(position: usize, value: HeapValue) -> Self {
        Self {
            position,
            owner: value.owner(),
            reference_count: 0,
            value,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn owner(&self) -> BigNodeId {
        self.owner
    }

    pub fn reference_count(&self) -> usize {
        self.reference_count
    }

    pub fn value(&self) -> &HeapValue {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut HeapValue {
        &mut self.value
    }

    pub fn replace_value(&mut self, value: HeapValue) -> HeapValue {
        std::mem::replace(&mut self.value, value)
    }

    pub fn shift(&self, owner: BigNodeId) -> Self {
        Self {
            position: self.position,
            owner,
            reference_count: self.reference_count,
            value: self.value.shift(owner),
        }
    }

    pub fn increase_reference_count(&mut self, count: usize) {
        self.reference_count += count;
    }

    /// returns whether the count reached zero, at which point the cell must be freed.
    pub fn decrease_reference_count(&mut self, count: usize) -> Result<bool, LexemErr> {
        self.reference_count = self.reference_count.checked_sub(count).ok_or_else(|| {
            LexemErr::reference_count_underflow(format!(
                "cell &{} has {} references, cannot release {count}",
                self.position, self.reference_count
            ))
        })?;
        Ok(self.reference_count == 0)
    }
}
