/// Coalesces bursts of values so at most one is applied per rendering tick.
///
/// Offering a value while one is already pending replaces it; the consumer drains with
/// [`FrameCoalescer::take`] once per tick.
#[derive(Debug)]
pub struct FrameCoalescer<T> {
    pending: Option<T>,
}

impl<T> Default for FrameCoalescer<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> FrameCoalescer<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Stage `value` for the next tick. Returns `true` if a tick must be scheduled, i.e.
    /// nothing was pending before.
    pub fn offer(&mut self, value: T) -> bool {
        self.pending.replace(value).is_none()
    }

    /// Hand out the staged value, if any, clearing the pending flag.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_collapses_to_latest() {
        let mut frames = FrameCoalescer::new();
        assert!(frames.offer(1));
        assert!(!frames.offer(2));
        assert!(!frames.offer(3));

        assert_eq!(frames.take(), Some(3));
        assert_eq!(frames.take(), None);
        assert!(!frames.is_pending());

        // Next burst schedules a new tick
        assert!(frames.offer(4));
    }
}
