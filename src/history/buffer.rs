use crate::models::FeatureRow;

/// Fixed-capacity circular store of feature rows.
///
/// Maintains the most recent `capacity` bars. Once full, each insert
/// overwrites the oldest row unconditionally; there is no dynamic growth
/// and insertion is O(1). Rows are addressed by their offset from the
/// newest insert; all index arithmetic goes through one accessor so the
/// labeler and classifier cannot disagree about wrapping.
#[derive(Debug, Clone)]
pub struct FeatureHistoryBuffer {
    rows: Vec<FeatureRow>,
    head: usize,
    count: usize,
    capacity: usize,
}

impl FeatureHistoryBuffer {
    /// Create a buffer holding at most `capacity` rows.
    ///
    /// # Panics
    /// Panics if `capacity` is zero; configuration coerces it to >= 1
    /// before the buffer is ever constructed.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be at least 1");
        Self {
            rows: Vec::with_capacity(capacity),
            // First insert advances head to slot 0
            head: capacity - 1,
            count: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append a row, overwriting the oldest one once the buffer is full.
    pub fn insert(&mut self, row: FeatureRow) {
        self.head = (self.head + 1) % self.capacity;
        if self.count < self.capacity {
            debug_assert_eq!(self.head, self.rows.len());
            self.rows.push(row);
            self.count += 1;
        } else {
            self.rows[self.head] = row;
        }
    }

    /// Physical slot for a logical offset from the newest row.
    fn slot(&self, offset_from_newest: usize) -> usize {
        (self.head + self.capacity - offset_from_newest) % self.capacity
    }

    /// Row at `offset_from_newest` (0 = newest). None when the offset
    /// reaches past the rows actually held.
    pub fn at(&self, offset_from_newest: usize) -> Option<&FeatureRow> {
        if offset_from_newest >= self.count {
            return None;
        }
        Some(&self.rows[self.slot(offset_from_newest)])
    }

    /// Mutable counterpart of [`at`](Self::at); used by the labeler.
    pub fn at_mut(&mut self, offset_from_newest: usize) -> Option<&mut FeatureRow> {
        if offset_from_newest >= self.count {
            return None;
        }
        let slot = self.slot(offset_from_newest);
        Some(&mut self.rows[slot])
    }

    /// Iterate rows oldest-first.
    ///
    /// This is the order classifier candidates are collected in, which
    /// makes the stable-sort tie-break deterministic.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &FeatureRow> {
        (0..self.count).rev().filter_map(move |offset| self.at(offset))
    }
}
