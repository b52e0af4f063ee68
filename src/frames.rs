//! Animation frames - a cooperative per-frame callback queue.
//!
//! The host drives frames by calling [`run_animation_frame`] with the
//! current time. Callbacks requested while a frame is running wait for the
//! next frame.

use std::cell::RefCell;
use std::collections::HashSet;

/// Handle for cancelling a requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

type FrameCallback = Box<dyn FnOnce(f64)>;

struct FrameQueue {
    pending: Vec<(FrameHandle, FrameCallback)>,
    /// Handles of the running batch that have not run yet.
    running: HashSet<FrameHandle>,
    next_id: u64,
}

thread_local! {
    static FRAMES: RefCell<FrameQueue> = RefCell::new(FrameQueue {
        pending: Vec::new(),
        running: HashSet::new(),
        next_id: 0,
    });
}

/// Run `callback` on the next frame with the frame time in milliseconds.
pub fn request_animation_frame(callback: impl FnOnce(f64) + 'static) -> FrameHandle {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        let handle = FrameHandle(frames.next_id);
        frames.next_id += 1;
        frames.pending.push((handle, Box::new(callback)));
        handle
    })
}

/// Cancel a requested callback. Returns whether it had not run yet.
pub fn cancel_animation_frame(handle: FrameHandle) -> bool {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        let before = frames.pending.len();
        frames.pending.retain(|(h, _)| *h != handle);
        if frames.pending.len() != before {
            return true;
        }
        frames.running.remove(&handle)
    })
}

/// Run every callback requested before this call. Returns how many ran.
pub fn run_animation_frame(now_ms: f64) -> usize {
    let batch = FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        let batch = std::mem::take(&mut frames.pending);
        frames.running = batch.iter().map(|(h, _)| *h).collect();
        batch
    });
    let mut ran = 0;
    for (handle, callback) in batch {
        let live = FRAMES.with(|frames| frames.borrow_mut().running.remove(&handle));
        if !live {
            continue;
        }
        callback(now_ms);
        ran += 1;
    }
    tracing::trace!(ran, now_ms, "animation frame");
    ran
}

/// Number of callbacks waiting for the next frame.
pub fn pending_frames() -> usize {
    FRAMES.with(|frames| frames.borrow().pending.len())
}

/// Drop every pending callback (for testing).
pub fn reset_frames() {
    let dropped = FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        frames.running.clear();
        std::mem::take(&mut frames.pending)
    });
    drop(dropped);
}
