/// knobs of the memory engine, filled from the command line by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// allocations between two automatic collections. zero disables them.
    pub gc_threshold: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { gc_threshold: 0 }
    }
}
