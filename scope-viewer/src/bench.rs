use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Named wall-clock timers around the expensive viewer operations.
#[derive(Debug, Default)]
pub struct Benchmarks {
    running: HashMap<String, Instant>,
    last: HashMap<String, Duration>,
}

impl Benchmarks {
    pub fn start(&mut self, name: impl Into<String>) {
        self.running.insert(name.into(), Instant::now());
    }

    pub fn end(&mut self, name: &str) -> Option<Duration> {
        let elapsed = self.running.remove(name)?.elapsed();
        log::debug!(
            "Benchmark - {name}: took {:.3} milliseconds.",
            elapsed.as_secs_f64() * 1000.0
        );
        self.last.insert(name.to_string(), elapsed);
        Some(elapsed)
    }

    /// Runs `f` between `start` and `end`.
    pub fn time<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        self.start(name);
        let out = f();
        self.end(name);
        out
    }

    pub fn last(&self, name: &str) -> Option<Duration> {
        self.last.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.last.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_without_start_is_none() {
        let mut b = Benchmarks::default();
        assert!(b.end("recolor").is_none());
        assert!(b.last("recolor").is_none());
    }

    #[test]
    fn records_last_timing() {
        let mut b = Benchmarks::default();
        let v = b.time("initialize", || 41 + 1);
        assert_eq!(v, 42);
        assert!(b.last("initialize").is_some());
        assert_eq!(b.iter().count(), 1);
    }
}
