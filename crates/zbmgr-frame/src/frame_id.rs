//! Correlation IDs for outgoing command frames.

/// Frame ID meaning "no correlation": the device sends no response status.
pub const NO_CORRELATION: u8 = 0;

/// Produces frame IDs in the cycle 1, 2, …, 255, 1, 2, … and never 0.
#[derive(Debug, Default, Clone)]
pub struct FrameIdGenerator {
    last: u8,
}

impl FrameIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next frame ID in the cycle.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u8 {
        self.last = match self.last.wrapping_add(1) {
            NO_CORRELATION => 1,
            id => id,
        };
        self.last
    }

    /// The most recently issued ID, or 0 if none has been issued since reset.
    pub fn last(&self) -> u8 {
        self.last
    }

    /// Restart the cycle so the next ID is 1.
    pub fn reset(&mut self) {
        self.last = NO_CORRELATION;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_one() {
        let mut ids = FrameIdGenerator::new();
        assert_eq!(ids.last(), 0);
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
    }

    #[test]
    fn wraps_past_255_skipping_zero() {
        let mut ids = FrameIdGenerator::new();
        let issued: Vec<u8> = (0..600).map(|_| ids.next()).collect();

        assert!(!issued.contains(&0));
        assert_eq!(issued[254], 255);
        assert_eq!(issued[255], 1);
        assert_eq!(issued[509], 255);
        assert_eq!(issued[510], 1);
    }

    #[test]
    fn reset_restarts_cycle() {
        let mut ids = FrameIdGenerator::new();
        ids.next();
        ids.next();
        ids.reset();
        assert_eq!(ids.next(), 1);
    }
}
