use tokio::sync::watch;

/// Visibility threshold and root margin for the sentinel observer,
/// mirroring the host platform's intersection options.
#[derive(Debug, Clone, Copy)]
pub struct ObserverOptions {
    /// Fraction of the sentinel that must be visible to fire.
    pub threshold: f64,
    /// Margin added around the viewport before the threshold applies.
    pub root_margin_px: i32,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            root_margin_px: 0,
        }
    }
}

/// Drives pagination from sentinel visibility.
///
/// The host UI reports intersection ratios for the attached sentinel; the
/// trigger exposes a deduplicated "should load more" signal that flips when
/// the ratio crosses the threshold. At most one sentinel is observed at a
/// time: attaching a new one disconnects the previous binding first, and
/// reports for a stale sentinel are ignored. Dropping the trigger
/// disconnects unconditionally. The caller owns actual pagination and
/// suppressing the signal during an in-flight load.
pub struct ScrollTrigger {
    options: ObserverOptions,
    sentinel: Option<String>,
    tx: watch::Sender<bool>,
}

impl ScrollTrigger {
    pub fn new(options: ObserverOptions) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            options,
            sentinel: None,
            tx,
        }
    }

    pub fn options(&self) -> ObserverOptions {
        self.options
    }

    /// Observe a sentinel element, disconnecting any previous one.
    pub fn attach(&mut self, sentinel: impl Into<String>) {
        let sentinel = sentinel.into();
        if let Some(previous) = self.sentinel.take() {
            tracing::debug!(previous = %previous, next = %sentinel, "reattaching scroll observer");
            self.reset_signal();
        }
        self.sentinel = Some(sentinel);
    }

    /// Stop observing. The signal drops back to false.
    pub fn detach(&mut self) {
        if self.sentinel.take().is_some() {
            self.reset_signal();
        }
    }

    pub fn observed_sentinel(&self) -> Option<&str> {
        self.sentinel.as_deref()
    }

    /// Intersection report from the host UI. Reports for anything other
    /// than the currently attached sentinel are stale and ignored.
    pub fn record_intersection(&self, sentinel: &str, ratio: f64) {
        if self.sentinel.as_deref() != Some(sentinel) {
            tracing::debug!(sentinel = %sentinel, "ignoring intersection for detached sentinel");
            return;
        }
        let visible = ratio >= self.options.threshold;
        self.tx.send_if_modified(|current| {
            if *current != visible {
                *current = visible;
                true
            } else {
                false
            }
        });
    }

    pub fn should_load_more(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that wakes on each flip of the signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    fn reset_signal(&self) {
        self.tx.send_if_modified(|current| {
            if *current {
                *current = false;
                true
            } else {
                false
            }
        });
    }
}
