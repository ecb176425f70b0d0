use std::collections::HashSet;

/// Ids already accepted during one harvest. Lives only as long as the harvest.
#[derive(Debug, Default)]
pub struct DedupStore {
    seen: HashSet<String>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn add(&mut self, id: &str) {
        self.seen.insert(id.to_string());
    }

    /// Test-and-set: returns true if `id` was not seen before and is now recorded
    pub fn insert_if_new(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.add(id);
        true
    }
}
