//! Frame dispatch: one channel per frame ID.
//!
//! A handler is whatever holds the receiving end of a channel. It can be
//! drained by the caller between reactor turns, or run on its own thread
//! with [`HandlerTable::spawn`].

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};
use zbmgr_frame::{Frame, NO_CORRELATION};

/// Consumes dispatched frames.
pub trait FrameHandler: Send + 'static {
    fn handle(&mut self, frame: Frame);
}

impl<F> FrameHandler for F
where
    F: FnMut(Frame) + Send + 'static,
{
    fn handle(&mut self, frame: Frame) {
        self(frame)
    }
}

/// Where a frame ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Delivered to the handler registered for this frame ID.
    Handler(u8),
    /// Delivered to the default handler.
    Default,
    /// No live handler; the frame was dropped.
    Dropped,
}

/// Routes frames to handler channels keyed by frame ID.
///
/// Frame ID 0 ([`NO_CORRELATION`]) is the default route. A frame whose type
/// carries a non-zero frame ID goes to the handler registered for that ID if
/// there is one; everything else goes to the default route. Routes whose
/// receiver has been dropped are removed on the next delivery attempt.
#[derive(Debug, Default)]
pub struct HandlerTable {
    routes: HashMap<u8, Sender<Frame>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `frame_id`, replacing any previous one.
    pub fn register(&mut self, frame_id: u8) -> Receiver<Frame> {
        let (tx, rx) = mpsc::channel();
        if self.routes.insert(frame_id, tx).is_some() {
            debug!(frame_id, "replacing handler");
        }
        rx
    }

    /// Register the default handler.
    pub fn register_default(&mut self) -> Receiver<Frame> {
        self.register(NO_CORRELATION)
    }

    /// Run `handler` on its own thread, fed from a fresh route for
    /// `frame_id`. The thread exits once the route is dropped (with the
    /// table or the reactor) and returns how many frames it handled.
    pub fn spawn<H: FrameHandler>(
        &mut self,
        frame_id: u8,
        mut handler: H,
    ) -> std::io::Result<JoinHandle<u64>> {
        let rx = self.register(frame_id);
        thread::Builder::new()
            .name(format!("zbmgr-handler-{frame_id}"))
            .spawn(move || {
                let mut handled = 0u64;
                for frame in rx {
                    handler.handle(frame);
                    handled += 1;
                }
                handled
            })
    }

    /// Remove the route for `frame_id`. Returns true if one existed.
    pub fn unregister(&mut self, frame_id: u8) -> bool {
        self.routes.remove(&frame_id).is_some()
    }

    pub fn is_registered(&self, frame_id: u8) -> bool {
        self.routes.contains_key(&frame_id)
    }

    pub fn has_default(&self) -> bool {
        self.is_registered(NO_CORRELATION)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Deliver `frame` to its route.
    pub fn route(&mut self, frame: Frame) -> Dispatch {
        let frame = match frame.frame_id() {
            Some(id) if id != NO_CORRELATION && self.routes.contains_key(&id) => {
                match self.deliver(id, frame) {
                    Ok(()) => return Dispatch::Handler(id),
                    Err(frame) => frame,
                }
            }
            _ => frame,
        };

        if !self.has_default() {
            warn!(
                frame_type = ?frame.frame_type(),
                frame_id = ?frame.frame_id(),
                "no handler for frame, dropping"
            );
            return Dispatch::Dropped;
        }
        match self.deliver(NO_CORRELATION, frame) {
            Ok(()) => Dispatch::Default,
            Err(frame) => {
                warn!(
                    frame_type = ?frame.frame_type(),
                    frame_id = ?frame.frame_id(),
                    "default handler gone, dropping frame"
                );
                Dispatch::Dropped
            }
        }
    }

    /// Send on the route for `frame_id`; hands the frame back if the
    /// receiver is gone, after removing the dead route.
    fn deliver(&mut self, frame_id: u8, frame: Frame) -> Result<(), Frame> {
        let Some(tx) = self.routes.get(&frame_id) else {
            return Err(frame);
        };
        match tx.send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::SendError(frame)) => {
                debug!(frame_id, "handler receiver dropped, removing route");
                self.routes.remove(&frame_id);
                Err(frame)
            }
        }
    }
}
