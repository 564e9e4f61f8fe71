//! Process-wide hot-number registry

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use services_common::constants::HOT_NUMBER_MAX;
use std::sync::Arc;
use tracing::info;

/// Set of numbers (00-99) flagged "hot".
///
/// Membership is global; the ceilings triggered by membership are per-draw
/// via `HotNumberLimit`. The set is stored as an immutable `Arc` swapped
/// wholesale on `replace`, so readers never observe a partially-replaced
/// set and concurrent replaces serialize last-committed-wins.
pub struct HotNumberRegistry {
    selected: RwLock<Arc<FxHashSet<u8>>>,
}

impl HotNumberRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            selected: RwLock::new(Arc::new(FxHashSet::default())),
        }
    }

    /// Whether the given bet number is currently hot. Only one- and
    /// two-digit numbers can be hot; anything else is never a member.
    #[must_use]
    pub fn is_hot(&self, bet_number: &str) -> bool {
        let number = bet_number.trim();
        if number.is_empty() || number.len() > 2 || !number.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        let Ok(value) = number.parse::<u8>() else {
            return false;
        };
        self.selected.read().contains(&value)
    }

    /// Atomic full replacement of the selection. Values outside 00-99 are
    /// dropped; duplicates collapse. Never a partial merge.
    pub fn replace(&self, numbers: &[u8]) {
        let next: FxHashSet<u8> = numbers
            .iter()
            .copied()
            .filter(|&n| n <= HOT_NUMBER_MAX)
            .collect();
        let count = next.len();
        *self.selected.write() = Arc::new(next);
        info!("Replaced hot numbers, {count} selected");
    }

    /// Current selection, as an immutable snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<FxHashSet<u8>> {
        Arc::clone(&self.selected.read())
    }
}

impl Default for HotNumberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_parsing() {
        let registry = HotNumberRegistry::new();
        registry.replace(&[23, 5]);

        assert!(registry.is_hot("23"));
        assert!(registry.is_hot("5"));
        assert!(registry.is_hot("05"));
        assert!(!registry.is_hot("24"));
        assert!(!registry.is_hot("123"));
        assert!(!registry.is_hot("2x"));
        assert!(!registry.is_hot(""));
    }

    #[test]
    fn test_replace_is_wholesale() {
        let registry = HotNumberRegistry::new();
        registry.replace(&[1, 2, 3]);
        let before = registry.snapshot();
        registry.replace(&[7]);

        assert!(!registry.is_hot("1"));
        assert!(registry.is_hot("7"));
        // old snapshots stay intact for readers holding them
        assert!(before.contains(&1));
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[test]
    fn test_out_of_range_dropped() {
        let registry = HotNumberRegistry::new();
        registry.replace(&[99, 100, 200]);
        assert!(registry.is_hot("99"));
        assert_eq!(registry.snapshot().len(), 1);
    }
}
