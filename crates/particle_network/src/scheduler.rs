//! Scheduling frames: "run this once before the next repaint", and cancelling that request.
//!
//! The host drives time. Once per display refresh it asks the scheduler for a due frame and, if
//! there is one, hands it back to the animation. Nothing is ever called recursively, so stopping
//! an animation is just a matter of cancelling its outstanding request.

/// A handle to a single requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

/// Something that can queue up, cancel and release frames.
pub trait FrameScheduler {
    /// Ask for a frame at the next refresh.
    fn request_frame(&mut self) -> FrameRequest;

    /// Withdraw a previously requested frame. Cancelling a request that already ran or was already
    /// cancelled does nothing.
    fn cancel_frame(&mut self, request: FrameRequest);

    /// Called by the host on every refresh. Returns the pending request, if any, removing it from
    /// the queue.
    fn take_due(&mut self) -> Option<FrameRequest>;
}

/// The standard scheduler: a single slot that holds at most one pending frame.
#[derive(Debug, Default)]
pub struct FrameQueue {
    /// Source of unique request IDs
    next_id: u64,
    /// The currently outstanding request
    pending: Option<FrameRequest>,
}

impl FrameQueue {
    /// Instantiate
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            pending: None,
        }
    }

    /// Is there a frame waiting to be run?
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameRequest {
        self.next_id = self.next_id.wrapping_add(1);
        let request = FrameRequest(self.next_id);
        self.pending = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }

    fn take_due(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn a_frame_is_only_released_once() {
        let mut queue = FrameQueue::new();
        assert_eq!(queue.take_due(), None);

        let request = queue.request_frame();
        assert!(queue.is_pending());
        assert_eq!(queue.take_due(), Some(request));
        assert_eq!(queue.take_due(), None);
    }

    #[test]
    fn cancelling_removes_the_pending_frame() {
        let mut queue = FrameQueue::new();
        let request = queue.request_frame();
        queue.cancel_frame(request);
        queue.cancel_frame(request);
        assert_eq!(queue.take_due(), None);
    }

    #[test]
    fn stale_cancellations_leave_newer_requests_alone() {
        let mut queue = FrameQueue::new();
        let old = queue.request_frame();
        let new = queue.request_frame();
        assert_ne!(old, new);

        queue.cancel_frame(old);
        assert_eq!(queue.take_due(), Some(new));
    }
}
