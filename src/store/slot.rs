//! Slot structure for stored values

/// A value as held in the map, tagged with the write that produced it
#[derive(Debug, Clone)]
pub(crate) struct Slot<V> {
    /// The value
    pub value: V,

    /// Sequence number of the insert that wrote this slot
    pub stamp: u64,
}

impl<V> Slot<V> {
    /// Create a new slot for a given write
    pub fn new(value: V, stamp: u64) -> Self {
        Slot { value, stamp }
    }

    /// Check whether this slot was produced by the given write
    pub fn written_by(&self, stamp: u64) -> bool {
        self.stamp == stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_by() {
        let slot = Slot::new("value1", 7);

        assert!(slot.written_by(7));
        assert!(!slot.written_by(8));
        assert_eq!(slot.value, "value1");
    }
}
