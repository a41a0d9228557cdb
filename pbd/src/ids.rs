use serde::{Deserialize, Serialize};

/// Lightweight handle identifying a body registered with a solver.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelId(usize);

impl ModelId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<ModelId> for usize {
    fn from(id: ModelId) -> usize {
        id.0
    }
}

/// Hands out sequential model ids starting at zero.
///
/// Each solver session owns its own allocator so ids are unique within a session and
/// independent between sessions.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next: usize,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator::default()
    }

    pub fn allocate(&mut self) -> ModelId {
        let id = ModelId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn count(&self) -> usize {
        self.next
    }

    /// Check that the given id was produced by this allocator.
    pub fn contains(&self, id: ModelId) -> bool {
        id.0 < self.next
    }
}
