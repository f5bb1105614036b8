//! Optional instruction-history ring for `SHOW HISTORY`.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstHistory {
    pub pc: u16,
    pub ir: u16,
    pub lac: u16,
    pub mq: u16,
    /// Effective address and operand, populated only for memory-reference
    /// instructions.
    pub ea: Option<u32>,
    pub operand: Option<u16>,
}

#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<InstHistory>,
    capacity: usize,
    cursor: usize,
    filled: bool,
}

impl History {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Enable with a length in `[64, 65536]`, or `0` to disable.
    pub fn set_length(&mut self, len: usize) -> Result<(), String> {
        if len != 0 && !(64..=65_536).contains(&len) {
            return Err(format!(
                "history length must be 0 or in [64, 65536], got {len}"
            ));
        }
        self.capacity = len;
        self.entries = vec![InstHistory::default(); len];
        self.cursor = 0;
        self.filled = false;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity != 0
    }

    pub fn push(&mut self, entry: InstHistory) {
        if self.capacity == 0 {
            return;
        }
        self.entries[self.cursor] = entry;
        self.cursor = (self.cursor + 1) % self.capacity;
        if self.cursor == 0 {
            self.filled = true;
        }
    }

    /// The last `n` entries, oldest first.
    pub fn last(&self, n: usize) -> Vec<InstHistory> {
        if self.capacity == 0 {
            return Vec::new();
        }
        let available = if self.filled { self.capacity } else { self.cursor };
        let take = n.min(available);
        let start = (self.cursor + self.capacity - take) % self.capacity;
        (0..take).map(|i| self.entries[(start + i) % self.capacity]).collect()
    }
}
