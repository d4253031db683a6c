use crate::errors::err::LexemErr;
use crate::memory::big_node::BigNodeId;
use crate::memory::gc::GarbageCollectorFifo;
use crate::memory::Memory;
use crate::values::{Primitive, Reference};
use fxhash::FxHashMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum ValueData {
    Str(String),
    List(Vec<Primitive>),
    Object(FxHashMap<String, Primitive>),
}

/// a value that lives in a heap cell.
///
/// every heap value remembers the snapshot it was built against. allocating it into any other
/// snapshot is refused, and shifting a cell into a newer snapshot restamps the copy.
#[derive(Debug, Clone, PartialEq)]
pub struct HeapValue {
    owner: BigNodeId,
    data: ValueData,
}

// constructors
impl HeapValue {
    pub fn new(memory: &Memory, data: ValueData) -> Self {
        Self::owned_by(memory.last_node_id(), data)
    }

    pub fn owned_by(owner: BigNodeId, data: ValueData) -> Self {
        Self { owner, data }
    }

    pub fn string(memory: &Memory, value: &str) -> Self {
        Self::new(memory, ValueData::Str(value.to_string()))
    }

    pub fn list(memory: &Memory, items: Vec<Primitive>) -> Self {
        Self::new(memory, ValueData::List(items))
    }

    pub fn object(memory: &Memory, fields: FxHashMap<String, Primitive>) -> Self {
        Self::new(memory, ValueData::Object(fields))
    }
}

// accessors
impl HeapValue {
    pub fn owner(&self) -> BigNodeId {
        self.owner
    }

    pub fn data(&self) -> &ValueData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ValueData {
        &mut self.data
    }

    fn primitives(&self) -> Box<dyn Iterator<Item = &Primitive> + '_> {
        match &self.data {
            ValueData::Str(_) => Box::new(std::iter::empty()),
            ValueData::List(items) => Box::new(items.iter()),
            ValueData::Object(fields) => Box::new(fields.values()),
        }
    }

    /// every reference this value owns, once per occurrence.
    pub fn references(&self) -> impl Iterator<Item = Reference> + '_ {
        self.primitives().filter_map(Primitive::as_reference)
    }
}

// memory hooks
impl HeapValue {
    /// copy of this value for a newer snapshot. the copy shares no storage with the original.
    pub fn shift(&self, owner: BigNodeId) -> Self {
        Self {
            owner,
            data: self.data.clone(),
        }
    }

    pub fn spatial_garbage_collect(&self, fifo: &mut GarbageCollectorFifo) {
        for reference in self.references() {
            fifo.push(reference);
        }
    }

    /// releases the references this value owns. called once, when its cell is freed.
    pub fn memory_dealloc(&self, memory: &mut Memory) -> Result<(), LexemErr> {
        memory.release(self.references().collect())
    }
}

impl Display for HeapValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            ValueData::Str(s) => write!(f, "{s:?}"),
            ValueData::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            ValueData::Object(fields) => {
                let mut keys: Vec<&String> = fields.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {}", fields[key])?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64) -> BigNodeId {
        BigNodeId::from_raw(id)
    }

    #[test]
    fn references_cover_lists_and_objects() {
        let list = HeapValue::owned_by(node(1), ValueData::List(vec![
            Primitive::Int(1),
            Primitive::Reference(Reference::new(4)),
            Primitive::Reference(Reference::new(4)),
        ]));
        assert_eq!(list.references().collect::<Vec<_>>(), vec![Reference::new(4), Reference::new(4)]);

        let mut fields = FxHashMap::default();
        fields.insert("a".to_string(), Primitive::Reference(Reference::new(9)));
        fields.insert("b".to_string(), Primitive::Nil);
        let object = HeapValue::owned_by(node(1), ValueData::Object(fields));
        assert_eq!(object.references().collect::<Vec<_>>(), vec![Reference::new(9)]);

        let string = HeapValue::owned_by(node(1), ValueData::Str("abc".to_string()));
        assert_eq!(string.references().count(), 0);
    }

    #[test]
    fn shift_restamps_and_copies() {
        let original = HeapValue::owned_by(node(1), ValueData::List(vec![Primitive::Int(1)]));
        let mut shifted = original.shift(node(2));
        assert_eq!(shifted.owner(), node(2));
        if let ValueData::List(items) = shifted.data_mut() {
            items.push(Primitive::Int(2));
        }
        assert_eq!(original.data(), &ValueData::List(vec![Primitive::Int(1)]));
    }

    #[test]
    fn gc_hook_queues_owned_references() {
        let list = HeapValue::owned_by(node(1), ValueData::List(vec![
            Primitive::Reference(Reference::new(2)),
            Primitive::Reference(Reference::new(0)),
        ]));
        let mut fifo = GarbageCollectorFifo::new(4);
        list.spatial_garbage_collect(&mut fifo);
        assert_eq!(fifo.pop(), Some(Reference::new(0)));
        assert_eq!(fifo.pop(), Some(Reference::new(2)));
        assert_eq!(fifo.pop(), None);
    }

    #[test]
    fn display() {
        let mut fields = FxHashMap::default();
        fields.insert("b".to_string(), Primitive::Int(2));
        fields.insert("a".to_string(), Primitive::Reference(Reference::new(3)));
        let object = HeapValue::owned_by(node(1), ValueData::Object(fields));
        assert_eq!(object.to_string(), "{a: &3, b: 2}");
        let list = HeapValue::owned_by(node(1), ValueData::List(vec![Primitive::Bool(true), Primitive::Nil]));
        assert_eq!(list.to_string(), "[true, nil]");
    }
}
