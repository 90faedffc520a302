//! Image sources for textured fills.
//!
//! Loads are asynchronous: a loader is handed a [`LoadRequest`], and the
//! renderer polls it once per frame for completions. Loads can be cancelled;
//! a cancelled load never produces a completion.

mod loader;
mod manual;
mod pixels;
mod threaded;

pub use loader::{ImageLoader, LoadCompletion, LoadError, LoadId, LoadRequest};
pub use manual::ManualLoader;
pub use pixels::Pixels;
pub use threaded::ThreadedLoader;
