use std::collections::HashSet;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use super::{ImageLoader, LoadCompletion, LoadError, LoadId, LoadRequest, Pixels};

/// Reads and decodes images on short-lived worker threads.
///
/// Accepts plain file paths and `file://` URIs. A worker cannot be
/// interrupted once started; cancelling only discards its result.
#[derive(Debug)]
pub struct ThreadedLoader {
    tx: Sender<LoadCompletion>,
    rx: Receiver<LoadCompletion>,
    in_flight: HashSet<LoadId>,
    cancelled: HashSet<LoadId>,
}

impl ThreadedLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            in_flight: HashSet::new(),
            cancelled: HashSet::new(),
        }
    }

    /// Number of loads started and not yet polled or cancelled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len() - self.cancelled.len()
    }
}

impl Default for ThreadedLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader for ThreadedLoader {
    fn start(&mut self, request: LoadRequest) {
        let LoadRequest { id, uri } = request;
        self.in_flight.insert(id);

        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("easel-image".to_string())
            .spawn(move || {
                let result = read_uri(&uri).and_then(|bytes| Pixels::decode(&bytes));
                // Receiver gone means the renderer was dropped; nothing to report to.
                let _ = tx.send(LoadCompletion { id, result });
            });

        if let Err(e) = spawned {
            log::warn!("image worker spawn failed: {e}");
            let _ = self.tx.send(LoadCompletion {
                id,
                result: Err(LoadError::Io(e.to_string())),
            });
        }
    }

    fn cancel(&mut self, id: LoadId) {
        if self.in_flight.contains(&id) {
            self.cancelled.insert(id);
        }
    }

    fn poll(&mut self) -> Vec<LoadCompletion> {
        let mut done = Vec::new();
        for completion in self.rx.try_iter() {
            self.in_flight.remove(&completion.id);
            if self.cancelled.remove(&completion.id) {
                log::debug!("dropping result of cancelled load {:?}", completion.id);
                continue;
            }
            done.push(completion);
        }
        done
    }
}

fn read_uri(uri: &str) -> Result<Vec<u8>, LoadError> {
    let path = match uri.strip_prefix("file://") {
        Some(path) => path,
        None if uri.contains("://") || uri.starts_with("data:") => {
            return Err(LoadError::UnsupportedUri(uri.to_string()));
        }
        None => uri,
    };
    std::fs::read(Path::new(path)).map_err(|e| LoadError::Io(format!("{path}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for(loader: &mut ThreadedLoader) -> Vec<LoadCompletion> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let done = loader.poll();
            if !done.is_empty() || Instant::now() > deadline {
                return done;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn remote_uris_are_rejected() {
        assert!(matches!(
            read_uri("https://example.com/a.png"),
            Err(LoadError::UnsupportedUri(_))
        ));
        assert!(matches!(read_uri("data:image/png;base64,AAAA"), Err(LoadError::UnsupportedUri(_))));
    }

    #[test]
    fn missing_file_completes_with_io_error() {
        let mut loader = ThreadedLoader::new();
        loader.start(LoadRequest { id: LoadId(1), uri: "file:///definitely/not/here.png".into() });

        let done = wait_for(&mut loader);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, LoadId(1));
        assert!(matches!(done[0].result, Err(LoadError::Io(_))));
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn decodes_file_from_disk() {
        let path = std::env::temp_dir().join(format!("easel-loader-{}.png", std::process::id()));
        image::RgbaImage::from_pixel(3, 1, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let mut loader = ThreadedLoader::new();
        loader.start(LoadRequest { id: LoadId(9), uri: path.display().to_string() });
        let done = wait_for(&mut loader);
        let _ = std::fs::remove_file(&path);

        let pixels = done[0].result.as_ref().unwrap();
        assert_eq!((pixels.width(), pixels.height()), (3, 1));
        assert_eq!(&pixels.rgba()[..4], &[1, 2, 3, 255]);
    }

    #[test]
    fn cancelled_load_is_never_reported() {
        let mut loader = ThreadedLoader::new();
        loader.start(LoadRequest { id: LoadId(2), uri: "/no/such/file.png".into() });
        loader.cancel(LoadId(2));

        let deadline = Instant::now() + Duration::from_millis(500);
        while Instant::now() < deadline {
            assert!(loader.poll().is_empty());
            thread::sleep(Duration::from_millis(10));
        }
    }
}
