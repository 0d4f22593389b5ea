//! Session history abstraction.
//!
//! [`HistoryBackend`] is the single router abstraction the interceptor
//! drives: the host maps it onto `window.history` / `window.location` (or a
//! framework router), and the interceptor is the only caller of its
//! mutating methods. Nothing global is patched.
//!
//! [`MemoryHistory`] is an in-process implementation with a browser-like
//! stack (push truncates forward entries, back/forward move the cursor). It
//! records every operation so callers can assert exactly what happened.

use crate::matching::resolve_path_and_query;
use parking_lot::Mutex;

/// Location source and history mutation primitives.
pub trait HistoryBackend: Send + Sync + 'static {
    /// Current location (path with query, or an absolute URL).
    fn location(&self) -> String;

    /// Add a history entry and move to it.
    fn push_state(&self, url: &str);

    /// Overwrite the current history entry.
    fn replace_state(&self, url: &str);
}

/// A primitive operation applied to a [`MemoryHistory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOp {
    Push(String),
    Replace(String),
    Back,
    Forward,
}

#[derive(Debug)]
struct Stack {
    entries: Vec<String>,
    current: usize,
    ops: Vec<HistoryOp>,
}

/// In-memory browser-style history.
#[derive(Debug)]
pub struct MemoryHistory {
    stack: Mutex<Stack>,
}

impl MemoryHistory {
    /// History with a single entry at `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            stack: Mutex::new(Stack {
                entries: vec![initial.into()],
                current: 0,
                ops: Vec::new(),
            }),
        }
    }

    /// Move back one entry, as the browser does before firing `popstate`.
    ///
    /// Returns the new location, or `None` at the start of history.
    pub fn go_back(&self) -> Option<String> {
        let mut stack = self.stack.lock();
        if stack.current == 0 {
            return None;
        }
        stack.current -= 1;
        stack.ops.push(HistoryOp::Back);
        stack.entries.get(stack.current).cloned()
    }

    /// Move forward one entry. Returns the new location, or `None` at the end.
    pub fn go_forward(&self) -> Option<String> {
        let mut stack = self.stack.lock();
        if stack.current + 1 >= stack.entries.len() {
            return None;
        }
        stack.current += 1;
        stack.ops.push(HistoryOp::Forward);
        stack.entries.get(stack.current).cloned()
    }

    pub fn can_go_back(&self) -> bool {
        self.stack.lock().current > 0
    }

    pub fn can_go_forward(&self) -> bool {
        let stack = self.stack.lock();
        stack.current + 1 < stack.entries.len()
    }

    /// Number of entries in the stack.
    pub fn len(&self) -> usize {
        self.stack.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.lock().entries.is_empty()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.stack.lock().entries.clone()
    }

    /// Every operation applied so far, in order.
    pub fn operations(&self) -> Vec<HistoryOp> {
        self.stack.lock().ops.clone()
    }

    /// Number of `replace_state` calls so far.
    pub fn replace_count(&self) -> usize {
        self.stack
            .lock()
            .ops
            .iter()
            .filter(|op| matches!(op, HistoryOp::Replace(_)))
            .count()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl HistoryBackend for MemoryHistory {
    fn location(&self) -> String {
        let stack = self.stack.lock();
        stack.entries.get(stack.current).cloned().unwrap_or_default()
    }

    fn push_state(&self, url: &str) {
        let mut stack = self.stack.lock();
        let current = stack.entries.get(stack.current).cloned().unwrap_or_default();
        let next = resolve_path_and_query(&current, url);
        let keep = stack.current + 1;
        stack.entries.truncate(keep);
        stack.entries.push(next);
        stack.current = keep;
        stack.ops.push(HistoryOp::Push(url.to_string()));
    }

    fn replace_state(&self, url: &str) {
        let mut stack = self.stack.lock();
        let index = stack.current;
        let current = stack.entries.get(index).cloned().unwrap_or_default();
        let next = resolve_path_and_query(&current, url);
        if let Some(entry) = stack.entries.get_mut(index) {
            *entry = next;
        }
        stack.ops.push(HistoryOp::Replace(url.to_string()));
    }
}
