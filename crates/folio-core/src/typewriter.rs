#![forbid(unsafe_code)]

//! Typewriter text effect.
//!
//! Cycles forever through a fixed list of strings: types one grapheme at a
//! time, holds the full string, deletes one grapheme at a time, then moves to
//! the next string.
//!
//! ```text
//!   ┌──────── Typing ─────────┐ full  ┌── PausedAtFull ──┐
//!   │ +1 grapheme every 100ms ├──────►│  hold 2000ms     │
//!   └─────────▲───────────────┘       └────────┬─────────┘
//!             │ next string                    │ -1 grapheme
//!   ┌─────────┴──────────┐  empty   ┌──────────▼────────┐
//!   │   PausedAtEmpty    │◄─────────┤     Deleting      │
//!   │   wait 50ms        │          │ -1 every 50ms     │
//!   └────────────────────┘          └───────────────────┘
//! ```
//!
//! The loop is a [`ScheduledTask`]: each step schedules the next one. The
//! host polls [`Typewriter::next_deadline`] to arm its timer and calls
//! [`Typewriter::tick_at`] when it fires. [`Typewriter::stop`] or dropping
//! the controller cancels the loop.

use core::time::Duration;

use unicode_segmentation::UnicodeSegmentation;

use crate::timer::ScheduledTask;

/// Upper bound on steps replayed by one late host callback. Beyond it the
/// schedule restarts from `now` instead of replaying every missed step.
const MAX_CATCH_UP_STEPS: usize = 64;

/// Typing and deletion timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypewriterConfig {
    pub type_interval: Duration,
    pub delete_interval: Duration,
    pub pause_at_full: Duration,
}

impl Default for TypewriterConfig {
    fn default() -> Self {
        Self {
            type_interval: Duration::from_millis(100),
            delete_interval: Duration::from_millis(50),
            pause_at_full: Duration::from_millis(2000),
        }
    }
}

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingPhase {
    Typing,
    PausedAtFull,
    Deleting,
    PausedAtEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypewriterError {
    /// The text list has no entries.
    EmptyTextList,
}

impl core::fmt::Display for TypewriterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyTextList => write!(f, "typewriter needs at least one text"),
        }
    }
}

impl std::error::Error for TypewriterError {}

/// Texts plus the cursor into them.
///
/// `offset` counts grapheme clusters and always lies in
/// `[0, graphemes(current_text)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingState {
    texts: Vec<String>,
    index: usize,
    offset: usize,
    phase: TypingPhase,
}

impl TypingState {
    fn new(texts: Vec<String>) -> Result<Self, TypewriterError> {
        if texts.is_empty() {
            return Err(TypewriterError::EmptyTextList);
        }
        Ok(Self {
            texts,
            index: 0,
            offset: 0,
            phase: TypingPhase::Typing,
        })
    }

    #[must_use]
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn phase(&self) -> TypingPhase {
        self.phase
    }

    #[must_use]
    pub fn current_text(&self) -> &str {
        &self.texts[self.index]
    }

    /// Grapheme count of the current text.
    #[must_use]
    pub fn current_len(&self) -> usize {
        self.current_text().graphemes(true).count()
    }

    /// The visible prefix.
    #[must_use]
    pub fn display(&self) -> &str {
        let text = self.current_text();
        let end = text
            .grapheme_indices(true)
            .nth(self.offset)
            .map_or(text.len(), |(byte, _)| byte);
        &text[..end]
    }

    /// Advance one step; returns the delay until the next one.
    fn step(&mut self, config: &TypewriterConfig) -> Duration {
        match self.phase {
            TypingPhase::Typing => {
                let len = self.current_len();
                self.offset = (self.offset + 1).min(len);
                if self.offset >= len {
                    self.phase = TypingPhase::PausedAtFull;
                    config.pause_at_full
                } else {
                    config.type_interval
                }
            }
            TypingPhase::PausedAtFull | TypingPhase::Deleting => {
                self.offset = self.offset.saturating_sub(1);
                self.phase = if self.offset == 0 {
                    TypingPhase::PausedAtEmpty
                } else {
                    TypingPhase::Deleting
                };
                config.delete_interval
            }
            TypingPhase::PausedAtEmpty => {
                self.index = (self.index + 1) % self.texts.len();
                self.offset = 0;
                self.phase = TypingPhase::Typing;
                self.step(config)
            }
        }
    }
}

/// The typewriter controller.
#[derive(Debug, Clone)]
pub struct Typewriter {
    state: TypingState,
    config: TypewriterConfig,
    task: ScheduledTask,
}

impl Typewriter {
    /// Create a stopped typewriter over `texts`.
    pub fn new<I, S>(texts: I, config: TypewriterConfig) -> Result<Self, TypewriterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let texts = texts.into_iter().map(Into::into).collect();
        Ok(Self {
            state: TypingState::new(texts)?,
            config,
            task: ScheduledTask::new(),
        })
    }

    #[must_use]
    pub const fn state(&self) -> &TypingState {
        &self.state
    }

    #[must_use]
    pub fn display(&self) -> &str {
        self.state.display()
    }

    #[must_use]
    pub const fn phase(&self) -> TypingPhase {
        self.state.phase
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.task.is_scheduled()
    }

    /// When the next step is due.
    #[must_use]
    pub const fn next_deadline(&self) -> Option<Duration> {
        self.task.deadline()
    }

    /// Start from the beginning of the first text; the first grapheme
    /// appears on the tick at `now`.
    pub fn start_at(&mut self, now: Duration) {
        self.state.index = 0;
        self.state.offset = 0;
        self.state.phase = TypingPhase::Typing;
        self.task.schedule_at(now);
        crate::debug!(texts = self.state.texts.len(), "typewriter started");
    }

    /// Cancel the loop. The current text stays as displayed.
    pub fn stop(&mut self) {
        if self.task.cancel() {
            crate::debug!(runs = self.task.runs(), "typewriter stopped");
        }
    }

    /// Run every step due at `now`.
    ///
    /// Returns the new display text if anything changed.
    pub fn tick_at(&mut self, now: Duration) -> Option<&str> {
        let mut steps = 0usize;
        while let Some(due) = self.task.take_due(now) {
            let delay = self.state.step(&self.config);
            steps += 1;
            let next = if steps >= MAX_CATCH_UP_STEPS {
                now.saturating_add(delay)
            } else {
                due.saturating_add(delay)
            };
            self.task.schedule_at(next);
            if steps >= MAX_CATCH_UP_STEPS {
                crate::warn!(steps, "typewriter fell behind, resynchronising");
                break;
            }
        }
        (steps > 0).then(|| self.state.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn writer(texts: &[&str]) -> Typewriter {
        let mut t = Typewriter::new(texts.iter().copied(), TypewriterConfig::default()).unwrap();
        t.start_at(ms(0));
        t
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = Typewriter::new(Vec::<String>::new(), TypewriterConfig::default()).unwrap_err();
        assert_eq!(err, TypewriterError::EmptyTextList);
    }

    #[test]
    fn types_one_grapheme_per_tick() {
        let mut t = writer(&["abc"]);
        assert_eq!(t.tick_at(ms(0)), Some("a"));
        assert_eq!(t.tick_at(ms(50)), None);
        assert_eq!(t.tick_at(ms(100)), Some("ab"));
        assert_eq!(t.tick_at(ms(200)), Some("abc"));
        assert_eq!(t.phase(), TypingPhase::PausedAtFull);
        assert_eq!(t.next_deadline(), Some(ms(2200)));
    }

    #[test]
    fn wraps_to_next_text_after_deleting() {
        let mut t = writer(&["ab", "x"]);
        t.tick_at(ms(100)); // "ab" at 100, pause until 2100
        assert_eq!(t.tick_at(ms(2100)), Some("a"));
        assert_eq!(t.tick_at(ms(2150)), Some(""));
        assert_eq!(t.phase(), TypingPhase::PausedAtEmpty);
        assert_eq!(t.tick_at(ms(2200)), Some("x"));
        assert_eq!(t.state().index(), 1);
        assert_eq!(t.phase(), TypingPhase::PausedAtFull);
    }

    #[test]
    fn index_wraps_modulo_list_length() {
        let mut t = writer(&["a", "b"]);
        // a: typed at 0, pause to 2000, deleted at 2000, next text at 2050.
        t.tick_at(ms(2050));
        assert_eq!(t.display(), "b");
        // b: full at 2050, deleted at 4050, next text at 4100.
        t.tick_at(ms(4100));
        assert_eq!(t.state().index(), 0);
        assert_eq!(t.display(), "a");
    }

    #[test]
    fn graphemes_are_not_split() {
        let mut t = writer(&["e\u{301}x"]);
        assert_eq!(t.tick_at(ms(0)), Some("e\u{301}"));
    }

    #[test]
    fn empty_text_does_not_stall() {
        let mut t = writer(&["", "z"]);
        t.tick_at(ms(0));
        assert_eq!(t.phase(), TypingPhase::PausedAtFull);
        t.tick_at(ms(2000));
        assert_eq!(t.phase(), TypingPhase::PausedAtEmpty);
        assert_eq!(t.tick_at(ms(2050)), Some("z"));
    }

    #[test]
    fn stop_cancels_loop() {
        let mut t = writer(&["abc"]);
        t.tick_at(ms(0));
        t.stop();
        assert!(!t.is_running());
        assert_eq!(t.next_deadline(), None);
        assert_eq!(t.tick_at(ms(10_000)), None);
        assert_eq!(t.display(), "a");
    }

    #[test]
    fn long_gap_is_bounded() {
        let mut t = writer(&["abcdef"]);
        t.tick_at(ms(3_600_000));
        assert!(t.next_deadline().unwrap() > ms(3_600_000));
    }
}
