pub mod heap;

pub use heap::{HeapValue, ValueData};

use std::fmt::{Debug, Display, Formatter};

/// handle to a heap cell of the current snapshot.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reference(usize);

impl Reference {
    pub const fn new(position: usize) -> Self {
        Self(position)
    }

    pub fn position(self) -> usize {
        self.0
    }
}

impl Debug for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "&{}", self.0)
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "&{}", self.0)
    }
}

/// values stored by the stack and inside heap values. everything but `Reference` is embedded
/// and carries no ownership.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Primitive {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Reference(Reference),
}

impl Primitive {
    pub fn as_reference(&self) -> Option<Reference> {
        match self {
            Primitive::Reference(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Primitive::Reference(_))
    }
}

impl From<Reference> for Primitive {
    fn from(value: Reference) -> Self {
        Primitive::Reference(value)
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Primitive::Nil => write!(f, "nil"),
            Primitive::Bool(b) => write!(f, "{b}"),
            Primitive::Int(i) => write!(f, "{i}"),
            Primitive::Float(x) => write!(f, "{x:?}"),
            Primitive::Char(c) => write!(f, "'{c}'"),
            Primitive::Reference(r) => write!(f, "{r}"),
        }
    }
}

/// the result of evaluating a compiled node: either already a primitive, or a heap value that
/// still has to be boxed into the current snapshot.
#[derive(Debug, Clone)]
pub enum LexemValue {
    Primitive(Primitive),
    Heap(HeapValue),
}

impl From<Primitive> for LexemValue {
    fn from(value: Primitive) -> Self {
        LexemValue::Primitive(value)
    }
}

impl From<HeapValue> for LexemValue {
    fn from(value: HeapValue) -> Self {
        LexemValue::Heap(value)
    }
}
