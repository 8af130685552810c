/// Byte offsets of the frames discovered so far in one open file.
///
/// Offsets are strictly increasing and are never removed or rewritten: the
/// index only grows, either by a forward scan or as a side effect of
/// sequential reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameIndex {
    offsets: Vec<u64>,
    complete: bool,
}

/// An offset that would break the ordering of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonMonotonicOffset {
    pub offset: u64,
    pub previous: u64,
}

impl FrameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Whether a scan reached the end of the file.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn get(&self, step: usize) -> Option<u64> {
        self.offsets.get(step).copied()
    }

    pub fn last(&self) -> Option<u64> {
        self.offsets.last().copied()
    }

    /// The step starting at `offset`, if it was already discovered.
    pub fn step_at(&self, offset: u64) -> Option<usize> {
        self.offsets.binary_search(&offset).ok()
    }

    /// Records the start of a frame.
    ///
    /// Offsets already present are accepted as they are. A new offset must be
    /// past every recorded one, and can not be added once the index is
    /// complete.
    pub fn record(&mut self, offset: u64) -> Result<usize, NonMonotonicOffset> {
        if let Some(step) = self.step_at(offset) {
            return Ok(step);
        }
        match self.last() {
            Some(previous) if offset < previous || self.complete => Err(NonMonotonicOffset { offset, previous }),
            _ => {
                self.offsets.push(offset);
                Ok(self.offsets.len() - 1)
            }
        }
    }

    pub fn mark_complete(&mut self) {
        self.complete = true;
    }
}
