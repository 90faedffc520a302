use std::cell::RefCell;
use std::rc::Rc;

use super::{ImageLoader, LoadCompletion, LoadError, LoadId, LoadRequest, Pixels};

#[derive(Debug, Default)]
struct ManualState {
    pending: Vec<LoadRequest>,
    ready: Vec<LoadCompletion>,
    cancelled: Vec<LoadId>,
}

/// Caller-driven loader: requests wait until [`resolve`](Self::resolve) or
/// [`fail`](Self::fail) is called on any clone of the loader.
///
/// Useful for embedders that fetch image bytes themselves, and for tests that
/// need to control exactly when a load completes.
#[derive(Debug, Clone, Default)]
pub struct ManualLoader {
    state: Rc<RefCell<ManualState>>,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that have been started and not yet resolved or cancelled.
    pub fn pending(&self) -> Vec<LoadRequest> {
        self.state.borrow().pending.clone()
    }

    /// Ids cancelled so far, in cancellation order.
    pub fn cancelled(&self) -> Vec<LoadId> {
        self.state.borrow().cancelled.clone()
    }

    /// Completes the oldest pending request for `uri`. Returns `false` if none is pending.
    pub fn resolve(&self, uri: &str, pixels: Pixels) -> bool {
        self.complete(uri, Ok(pixels))
    }

    /// Fails the oldest pending request for `uri`.
    pub fn fail(&self, uri: &str, message: &str) -> bool {
        self.complete(uri, Err(LoadError::Io(message.to_string())))
    }

    fn complete(&self, uri: &str, result: Result<Pixels, LoadError>) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(pos) = state.pending.iter().position(|r| r.uri == uri) else {
            return false;
        };
        let request = state.pending.remove(pos);
        state.ready.push(LoadCompletion { id: request.id, result });
        true
    }
}

impl ImageLoader for ManualLoader {
    fn start(&mut self, request: LoadRequest) {
        self.state.borrow_mut().pending.push(request);
    }

    fn cancel(&mut self, id: LoadId) {
        let mut state = self.state.borrow_mut();
        state.pending.retain(|r| r.id != id);
        state.ready.retain(|c| c.id != id);
        state.cancelled.push(id);
    }

    fn poll(&mut self) -> Vec<LoadCompletion> {
        std::mem::take(&mut self.state.borrow_mut().ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: u64, uri: &str) -> LoadRequest {
        LoadRequest { id: LoadId(id), uri: uri.to_string() }
    }

    #[test]
    fn completes_only_when_resolved() {
        let handle = ManualLoader::new();
        let mut loader = handle.clone();

        loader.start(request(1, "a.png"));
        assert!(loader.poll().is_empty());

        assert!(handle.resolve("a.png", Pixels::transparent_placeholder()));
        let done = loader.poll();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, LoadId(1));
        assert!(handle.pending().is_empty());
        assert!(loader.poll().is_empty());
    }

    #[test]
    fn cancel_drops_pending_and_ready() {
        let handle = ManualLoader::new();
        let mut loader = handle.clone();

        loader.start(request(1, "a.png"));
        loader.start(request(2, "b.png"));
        handle.fail("b.png", "offline");

        loader.cancel(LoadId(1));
        loader.cancel(LoadId(2));

        assert!(loader.poll().is_empty());
        assert!(!handle.resolve("a.png", Pixels::transparent_placeholder()));
        assert_eq!(handle.cancelled(), vec![LoadId(1), LoadId(2)]);
    }
}
