/// Removes duplicate ids while keeping first-seen order.
pub fn dedupe_ids(ids: &[i64]) -> Vec<i64> {
    let mut unique: Vec<i64> = Vec::with_capacity(ids.len());
    for &id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

/// Set difference between a thread's current membership and a desired
/// recipient list.
///
/// Rows in `kept` are left untouched by the sync so their per-member read
/// state survives a recipient-list edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDiff {
    pub to_add: Vec<i64>,
    pub to_remove: Vec<i64>,
    pub kept: Vec<i64>,
}

impl MembershipDiff {
    /// Computes the diff; `desired` is deduplicated first.
    pub fn compute(current: &[i64], desired: &[i64]) -> Self {
        let desired = dedupe_ids(desired);
        let to_add = desired
            .iter()
            .copied()
            .filter(|id| !current.contains(id))
            .collect();
        let to_remove = current
            .iter()
            .copied()
            .filter(|id| !desired.contains(id))
            .collect();
        let kept = current
            .iter()
            .copied()
            .filter(|id| desired.contains(id))
            .collect();
        Self {
            to_add,
            to_remove,
            kept,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}
