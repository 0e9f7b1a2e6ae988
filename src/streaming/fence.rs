//! Code-fence repair
//!
//! Backends chunk generated text without regard for markdown structure, so a
//! triple-backtick marker routinely arrives glued to surrounding text with
//! its newlines missing. This pass re-inserts the newlines that make the
//! fence render, working per fragment: a marker and its language tag are
//! assumed to arrive in the same fragment (verified against the inference
//! service's chunking; re-check before trusting it for a new backend).
//!
//! The repair only ever adds whitespace around markers. It never reorders or
//! rewrites text, and re-applying it to repaired output changes nothing.

/// Fence marker
const FENCE: &str = "```";

/// Which side of a fence the stream is currently on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceState {
    OutsideFence,
    InsideFence,
}

/// Per-stream fence repair state machine
#[derive(Debug)]
pub struct FenceRepair {
    state: FenceState,
}

impl FenceRepair {
    pub fn new() -> Self {
        Self {
            state: FenceState::OutsideFence,
        }
    }

    /// Whether the stream is currently inside a fenced block
    pub fn in_fence(&self) -> bool {
        self.state == FenceState::InsideFence
    }

    /// Repair one fragment, updating fence state
    ///
    /// A fragment whose trimmed form starts with the marker but does not end
    /// with it opens a fence: it gets a trailing newline so the language-tag
    /// line is terminated. A fragment that is the bare marker or ends with
    /// it closes a fence: it gets a leading and a trailing newline. Anything
    /// else passes through untouched.
    pub fn apply(&mut self, fragment: &str) -> String {
        if !fragment.contains(FENCE) {
            return fragment.to_string();
        }

        let trimmed = fragment.trim();
        if trimmed.starts_with(FENCE) && !trimmed.ends_with(FENCE) {
            self.state = FenceState::InsideFence;
            let mut repaired = fragment.to_string();
            if !repaired.ends_with('\n') {
                repaired.push('\n');
            }
            repaired
        } else if trimmed == FENCE || trimmed.ends_with(FENCE) {
            self.state = FenceState::OutsideFence;
            let mut repaired = fragment.to_string();
            if !repaired.starts_with('\n') {
                repaired.insert(0, '\n');
            }
            if !repaired.ends_with('\n') {
                repaired.push('\n');
            }
            repaired
        } else {
            fragment.to_string()
        }
    }
}

impl Default for FenceRepair {
    fn default() -> Self {
        Self::new()
    }
}
