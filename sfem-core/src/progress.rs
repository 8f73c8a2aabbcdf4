//! Stage progress reporting through the `log` facade.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Monotonic progress counter for one assembly stage.
///
/// Logs the stage start at `info`, every tenth of the work at `debug`, and
/// the elapsed time when finished.
#[derive(Debug)]
pub struct Progress {
    name: String,
    total: usize,
    step: usize,
    done: AtomicUsize,
    start: Instant,
}

impl Progress {
    pub fn new(name: &str, total: usize) -> Self {
        log::info!("{} ({} items)", name, total);
        Self {
            name: name.to_string(),
            total,
            step: (total / 10).max(1),
            done: AtomicUsize::new(0),
            start: Instant::now(),
        }
    }

    /// Count one finished item.
    pub fn inc(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.step == 0 && done < self.total {
            log::debug!("{}: {}%", self.name, done * 100 / self.total);
        }
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        log::info!(
            "{}: done in {:.3} sec",
            self.name,
            self.start.elapsed().as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_from_many_threads() {
        let progress = Progress::new("counting", 400);
        crossbeam::scope(|s| {
            for _ in 0..4 {
                s.spawn(|_| (0..100).for_each(|_| progress.inc()));
            }
        })
        .unwrap();
        assert_eq!(progress.done(), 400);
        progress.finish();
    }
}
