use crate::errors::err::LexemErr;
use crate::values::Primitive;

/// one scope of named bindings, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackLevel {
    slots: Vec<(String, Primitive)>,
}

impl StackLevel {
    fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|(n, _)| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Primitive> {
        self.index_of(name).map(|i| self.slots[i].1)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Primitive)> + '_ {
        self.slots.iter().map(|(n, p)| (n.as_str(), *p))
    }

    fn insert(&mut self, name: String, value: Primitive) {
        debug_assert!(!self.contains(&name));
        self.slots.push((name, value));
    }

    fn remove(&mut self, name: &str) -> Option<Primitive> {
        self.index_of(name).map(|i| self.slots.remove(i).1)
    }

    fn pop(&mut self) -> Option<(String, Primitive)> {
        self.slots.pop()
    }

    fn replace(&mut self, name: &str, value: Primitive) -> Option<Primitive> {
        self.index_of(name)
            .map(|i| std::mem::replace(&mut self.slots[i].1, value))
    }
}

/// local variables of a snapshot.
///
/// redeclaring a name that the innermost level already holds opens a new level instead of
/// overwriting, so the outer binding comes back once the inner one is removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    levels: Vec<StackLevel>,
}

fn not_found(name: &str) -> LexemErr {
    LexemErr::stack_name_not_found(format!("'{name}' is not declared in any stack level"))
}

impl Stack {
    pub fn new() -> Self {
        Self { levels: Vec::new() }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[StackLevel] {
        &self.levels
    }

    /// every primitive of every level, outermost first.
    pub fn primitives(&self) -> impl Iterator<Item = Primitive> + '_ {
        self.levels.iter().flat_map(|l| l.slots.iter().map(|(_, p)| *p))
    }

    /// returns true when a new level had to be opened for this binding.
    pub fn push(&mut self, name: &str, value: Primitive) -> bool {
        if let Some(last) = self.levels.last_mut().filter(|l| !l.contains(name)) {
            last.insert(name.to_string(), value);
            return false;
        }
        let mut level = StackLevel::default();
        level.insert(name.to_string(), value);
        self.levels.push(level);
        true
    }

    pub fn open_level(&mut self) {
        self.levels.push(StackLevel::default());
    }

    pub fn close_level(&mut self) -> Option<StackLevel> {
        self.levels.pop()
    }

    pub fn get(&self, name: &str) -> Result<Primitive, LexemErr> {
        self.levels
            .iter()
            .rev()
            .find_map(|l| l.get(name))
            .ok_or_else(|| not_found(name))
    }

    pub fn remove(&mut self, name: &str) -> Result<Primitive, LexemErr> {
        let removed = self.levels
            .iter_mut()
            .rev()
            .find_map(|l| l.remove(name))
            .ok_or_else(|| not_found(name))?;
        while self.levels.last().is_some_and(StackLevel::is_empty) {
            self.levels.pop();
        }
        Ok(removed)
    }

    /// removes the most recent binding of the innermost non-empty level.
    pub fn pop(&mut self) -> Option<(String, Primitive)> {
        let popped = self.levels.iter_mut().rev().find_map(StackLevel::pop);
        while self.levels.last().is_some_and(StackLevel::is_empty) {
            self.levels.pop();
        }
        popped
    }

    /// rewrites the innermost binding of `name` and returns the previous value.
    /// reference counts are the caller's business.
    pub fn replace(&mut self, name: &str, value: Primitive) -> Result<Primitive, LexemErr> {
        self.levels
            .iter_mut()
            .rev()
            .find_map(|l| l.replace(name, value))
            .ok_or_else(|| not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::err::ErrorKind;

    #[test]
    fn redeclaration_shadows_by_level() {
        let mut stack = Stack::new();
        assert!(stack.push("x", Primitive::Int(1)));
        assert!(!stack.push("y", Primitive::Int(2)));
        assert_eq!(stack.level_count(), 1);

        assert!(stack.push("x", Primitive::Int(3)));
        assert_eq!(stack.level_count(), 2);
        assert_eq!(stack.get("x").unwrap(), Primitive::Int(3));
        assert_eq!(stack.get("y").unwrap(), Primitive::Int(2));

        assert_eq!(stack.remove("x").unwrap(), Primitive::Int(3));
        assert_eq!(stack.level_count(), 1);
        assert_eq!(stack.get("x").unwrap(), Primitive::Int(1));
    }

    #[test]
    fn missing_names_are_reported() {
        let mut stack = Stack::new();
        stack.push("x", Primitive::Nil);
        for err in [
            stack.get("z").unwrap_err(),
            stack.remove("z").unwrap_err(),
            stack.replace("z", Primitive::Nil).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::StackNameNotFound);
        }
        stack.remove("x").unwrap();
        assert_eq!(stack.remove("x").unwrap_err().kind(), ErrorKind::StackNameNotFound);
    }

    #[test]
    fn removal_pops_every_trailing_empty_level() {
        let mut stack = Stack::new();
        stack.push("a", Primitive::Int(1));
        stack.open_level();
        stack.open_level();
        stack.push("b", Primitive::Int(2));
        assert_eq!(stack.level_count(), 3);
        stack.remove("b").unwrap();
        assert_eq!(stack.level_count(), 1);
    }

    #[test]
    fn inner_level_survives_until_emptied() {
        let mut stack = Stack::new();
        stack.push("a", Primitive::Int(1));
        stack.push("a", Primitive::Int(2));
        stack.push("b", Primitive::Int(3));
        assert_eq!(stack.level_count(), 2);
        stack.remove("b").unwrap();
        stack.remove("a").unwrap();
        assert_eq!(stack.level_count(), 1);
        assert_eq!(stack.get("a").unwrap(), Primitive::Int(1));
    }

    #[test]
    fn replace_rewrites_the_innermost_binding() {
        let mut stack = Stack::new();
        stack.push("x", Primitive::Int(1));
        stack.push("x", Primitive::Int(2));
        assert_eq!(stack.replace("x", Primitive::Int(5)).unwrap(), Primitive::Int(2));
        assert_eq!(stack.get("x").unwrap(), Primitive::Int(5));
        stack.remove("x").unwrap();
        assert_eq!(stack.get("x").unwrap(), Primitive::Int(1));
    }

    #[test]
    fn primitives_walk_all_levels() {
        let mut stack = Stack::new();
        stack.push("x", Primitive::Int(1));
        stack.push("x", Primitive::Int(2));
        stack.push("y", Primitive::Bool(false));
        let all: Vec<Primitive> = stack.primitives().collect();
        assert_eq!(all, vec![Primitive::Int(1), Primitive::Int(2), Primitive::Bool(false)]);
    }

    #[test]
    fn pop_takes_the_latest_binding() {
        let mut stack = Stack::new();
        stack.push("a", Primitive::Int(1));
        stack.push("b", Primitive::Int(2));
        stack.push("b", Primitive::Int(3));
        assert_eq!(stack.pop(), Some(("b".to_string(), Primitive::Int(3))));
        assert_eq!(stack.level_count(), 1);
        assert_eq!(stack.pop(), Some(("b".to_string(), Primitive::Int(2))));
        assert_eq!(stack.pop(), Some(("a".to_string(), Primitive::Int(1))));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.level_count(), 0);
    }
}
