use log::info;

// Reports one pipeline invocation as a named event stream: a start event
// carrying the expected total, then an increment per completed batch
pub trait Progress: Send {
    fn start(&mut self, total: u64, progress_id: i64, label: &str);
    fn step(&mut self, n: u64);
}

// Log-backed progress reporter, keyed by operation name and unit label
pub struct LogProgress {
    event: &'static str,
    unit: &'static str,
    done: u64,
    total: u64,
}

impl LogProgress {
    pub fn new(event: &'static str, unit: &'static str) -> Self {
        LogProgress {
            event,
            unit,
            done: 0,
            total: 0,
        }
    }
}

impl Progress for LogProgress {
    fn start(&mut self, total: u64, progress_id: i64, label: &str) {
        self.total = total;
        self.done = 0;
        info!("{} [{}]: {} ({} {})", self.event, progress_id, label, total, self.unit);
    }

    fn step(&mut self, n: u64) {
        self.done += n;
        info!("{}: {}/{} {}", self.event, self.done, self.total, self.unit);
    }
}

// Human-readable label for a block range operation
pub fn make_label(action: &str, blocks: (i64, i64)) -> String {
    format!("{} {:>9}-{:>9}", action, blocks.0, blocks.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_pads_block_heights() {
        assert_eq!(
            make_label("add supports at", (100, 200)),
            "add supports at       100-      200"
        );
    }
}
