use crate::errors::err::LexemErr;
use crate::memory::Memory;
use crate::values::{LexemValue, Primitive, Reference, ValueData};

impl Memory {
    /// boxes heap values into the current snapshot. the new cell starts unreferenced, whoever
    /// stores the returned primitive counts it.
    pub fn value_to_primitive(&mut self, value: LexemValue) -> Result<Primitive, LexemErr> {
        match value {
            LexemValue::Primitive(p) => Ok(p),
            LexemValue::Heap(v) => self.add(v).map(Primitive::Reference),
        }
    }

    /// accounts for a slot going from `old` to `new`. the new value is counted before the old one
    /// is released, so a cell referenced by both never drops to zero in between. slots inside heap
    /// values count the new value first and release the old one only after the write, since the
    /// old value may be the last thing keeping the container alive.
    pub fn replace_primitives(&mut self, old: Option<Primitive>, new: Option<Primitive>) -> Result<(), LexemErr> {
        if let Some(reference) = new.as_ref().and_then(Primitive::as_reference) {
            self.increase_reference_count(reference, 1)?;
        }
        if let Some(reference) = old.as_ref().and_then(Primitive::as_reference) {
            self.decrease_reference_count(reference, 1)?;
        }
        Ok(())
    }

    pub fn set_list_item(&mut self, list: Reference, index: usize, value: Primitive) -> Result<(), LexemErr> {
        let old = match self.get(list)?.data() {
            ValueData::List(items) => items.get(index).copied().ok_or_else(|| {
                LexemErr::invalid_value(format!("index {index} is out of bounds for {list} of {}", items.len()))
            })?,
            _ => return Err(LexemErr::invalid_value(format!("{list} is not a list"))),
        };
        self.replace_primitives(None, Some(value))?;
        if let ValueData::List(items) = self.get_mut(list)?.data_mut() {
            items[index] = value;
        }
        self.replace_primitives(Some(old), None)
    }

    pub fn push_list_item(&mut self, list: Reference, value: Primitive) -> Result<(), LexemErr> {
        if !matches!(self.get(list)?.data(), ValueData::List(_)) {
            return Err(LexemErr::invalid_value(format!("{list} is not a list")));
        }
        self.replace_primitives(None, Some(value))?;
        if let ValueData::List(items) = self.get_mut(list)?.data_mut() {
            items.push(value);
        }
        Ok(())
    }

    pub fn set_object_field(&mut self, object: Reference, key: &str, value: Primitive) -> Result<(), LexemErr> {
        let old = match self.get(object)?.data() {
            ValueData::Object(fields) => fields.get(key).copied(),
            _ => return Err(LexemErr::invalid_value(format!("{object} is not an object"))),
        };
        self.replace_primitives(None, Some(value))?;
        if let ValueData::Object(fields) = self.get_mut(object)?.data_mut() {
            fields.insert(key.to_string(), value);
        }
        self.replace_primitives(old, None)
    }
}
