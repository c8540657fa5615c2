//! Digit buffer for fixed-length numeric codes.
//!
//! [`CodeEntryState`] is a small pure reducer over key, paste and focus
//! events. It performs no I/O; the flow reducer reads the signal it returns
//! and decides whether to submit.
//!
//! Rules:
//!
//! - Typing a digit overwrites the slot and advances focus; anything else is ignored.
//! - Backspace on a filled slot clears it in place. On an empty slot it steps
//!   back one slot and clears that slot too.
//! - Paste keeps only digits, truncates to the code length, fills from slot 0
//!   and clears the remaining slots. Partial pastes are accepted.
//! - [`EntrySignal::Completed`] fires once per transition from incomplete to complete.
//! - A disabled buffer ignores every event.

use serde::{Deserialize, Serialize};

/// Input events from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryEvent {
    /// A character typed into `slot`.
    Type {
        /// Target slot
        slot: usize,
        /// Typed character
        ch: char,
    },
    /// Backspace pressed while `slot` has focus.
    Backspace {
        /// Focused slot
        slot: usize,
    },
    /// Left arrow pressed while `slot` has focus.
    ArrowLeft {
        /// Focused slot
        slot: usize,
    },
    /// Right arrow pressed while `slot` has focus.
    ArrowRight {
        /// Focused slot
        slot: usize,
    },
    /// `slot` received focus.
    Focus {
        /// Focused slot
        slot: usize,
    },
    /// The widget lost focus.
    Blur,
    /// Clipboard text pasted into the widget.
    Paste {
        /// Raw clipboard text
        text: String,
    },
    /// Enter pressed.
    Enter,
    /// Empty the buffer.
    Clear,
}

/// What an event asks of the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySignal {
    /// Nothing to do.
    None,
    /// The buffer just became complete.
    Completed(String),
    /// Enter pressed on a complete buffer.
    SubmitRequested(String),
}

/// In-progress digit buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntryState {
    digits: Vec<Option<char>>,
    active_slot: Option<usize>,
    disabled: bool,
    fired: bool,
}

impl CodeEntryState {
    /// Empty buffer of `length` slots, focused on slot 0.
    ///
    /// A zero length is treated as one slot.
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self {
            digits: vec![None; length.max(1)],
            active_slot: Some(0),
            disabled: false,
            fired: false,
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// `true` when no slot holds a digit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digits.iter().all(Option::is_none)
    }

    /// Slot contents.
    #[must_use]
    pub fn digits(&self) -> &[Option<char>] {
        &self.digits
    }

    /// Focused slot, or `None` when unfocused.
    #[must_use]
    pub const fn active_slot(&self) -> Option<usize> {
        self.active_slot
    }

    /// Whether input is currently rejected.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Every slot holds a digit.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    /// The entered code, if complete.
    #[must_use]
    pub fn code(&self) -> Option<String> {
        self.digits.iter().copied().collect()
    }

    /// Filled digits with gaps skipped, for display.
    #[must_use]
    pub fn partial(&self) -> String {
        self.digits.iter().flatten().collect()
    }

    /// Enable or disable input.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Empty every slot and focus slot 0.
    pub fn clear(&mut self) {
        self.digits.iter_mut().for_each(|slot| *slot = None);
        self.active_slot = Some(0);
        self.fired = false;
    }

    /// Fill from an out-of-band source (OS autofill, link parameter).
    ///
    /// Only an exact-length, all-digit code is accepted.
    pub fn fill_exact(&mut self, code: &str) -> EntrySignal {
        if self.disabled
            || code.chars().count() != self.len()
            || !code.chars().all(|c| c.is_ascii_digit())
        {
            return EntrySignal::None;
        }

        for (slot, ch) in self.digits.iter_mut().zip(code.chars()) {
            *slot = Some(ch);
        }
        self.active_slot = Some(self.last_slot());
        self.completion()
    }

    /// Apply one input event.
    pub fn apply(&mut self, event: EntryEvent) -> EntrySignal {
        if self.disabled {
            return EntrySignal::None;
        }

        let last = self.last_slot();
        match event {
            EntryEvent::Type { slot, ch } => {
                if slot > last || !ch.is_ascii_digit() {
                    return EntrySignal::None;
                }
                self.digits[slot] = Some(ch);
                self.active_slot = Some((slot + 1).min(last));
                self.completion()
            },
            EntryEvent::Backspace { slot } => {
                if slot > last {
                    return EntrySignal::None;
                }
                if self.digits[slot].is_some() {
                    self.digits[slot] = None;
                    self.active_slot = Some(slot);
                } else if slot > 0 {
                    self.digits[slot - 1] = None;
                    self.active_slot = Some(slot - 1);
                }
                self.completion()
            },
            EntryEvent::ArrowLeft { slot } => {
                self.active_slot = Some(slot.min(last).saturating_sub(1));
                EntrySignal::None
            },
            EntryEvent::ArrowRight { slot } => {
                self.active_slot = Some((slot.saturating_add(1)).min(last));
                EntrySignal::None
            },
            EntryEvent::Focus { slot } => {
                self.active_slot = Some(slot.min(last));
                EntrySignal::None
            },
            EntryEvent::Blur => {
                self.active_slot = None;
                EntrySignal::None
            },
            EntryEvent::Paste { text } => {
                let pasted: Vec<char> = text
                    .chars()
                    .filter(char::is_ascii_digit)
                    .take(self.len())
                    .collect();
                if pasted.is_empty() {
                    return EntrySignal::None;
                }

                let filled = pasted.len();
                for (index, slot) in self.digits.iter_mut().enumerate() {
                    *slot = pasted.get(index).copied();
                }
                self.active_slot = Some(filled.min(last));
                self.completion()
            },
            EntryEvent::Enter => self
                .code()
                .map_or(EntrySignal::None, EntrySignal::SubmitRequested),
            EntryEvent::Clear => {
                self.clear();
                EntrySignal::None
            },
        }
    }

    fn last_slot(&self) -> usize {
        self.digits.len() - 1
    }

    /// Fire on the incomplete → complete edge only.
    fn completion(&mut self) -> EntrySignal {
        match self.code() {
            Some(code) if !self.fired => {
                self.fired = true;
                EntrySignal::Completed(code)
            },
            Some(_) => EntrySignal::None,
            None => {
                self.fired = false;
                EntrySignal::None
            },
        }
    }
}
