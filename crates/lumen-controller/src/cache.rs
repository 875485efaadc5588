//! Last-known device state with per-value change notifications.
//!
//! Each cached value is an independent `tokio::sync::watch` channel so
//! an external signal bridge can subscribe to exactly the values it
//! wires up, without the controller knowing anything about signal
//! numbering. Writes go through `send_if_modified`, so a poll that
//! reports an unchanged value wakes nobody downstream.
//!
//! Volume is cached on the external 0-65535 scale; the interpreter
//! converts from the native range before writing.

use tokio::sync::watch;

/// Current input index; 0 means unknown (reset on disconnect).
pub const INPUT_UNKNOWN: u8 = 0;

/// Observable last-known device state.
#[derive(Debug)]
pub struct FeedbackCache {
    online: watch::Sender<bool>,
    power: watch::Sender<bool>,
    warming: watch::Sender<bool>,
    cooling: watch::Sender<bool>,
    input: watch::Sender<u8>,
    mute: watch::Sender<bool>,
    volume: watch::Sender<u16>,
    lamp_hours: watch::Sender<u32>,
    error_text: watch::Sender<String>,
}

impl FeedbackCache {
    pub fn new() -> Self {
        Self {
            online: watch::Sender::new(false),
            power: watch::Sender::new(false),
            warming: watch::Sender::new(false),
            cooling: watch::Sender::new(false),
            input: watch::Sender::new(INPUT_UNKNOWN),
            mute: watch::Sender::new(false),
            volume: watch::Sender::new(0),
            lamp_hours: watch::Sender::new(0),
            error_text: watch::Sender::new(String::new()),
        }
    }

    // ------------------------------------------------------------------
    // Writers (interpreter side)
    // ------------------------------------------------------------------

    pub fn set_online(&self, online: bool) {
        Self::store(&self.online, online);
    }

    pub fn set_power(&self, on: bool) {
        Self::store(&self.power, on);
    }

    /// Publish the transitioning flags as a pair; at most one may be
    /// true at a time.
    pub fn set_transitioning(&self, warming: bool, cooling: bool) {
        debug_assert!(!(warming && cooling));
        Self::store(&self.warming, warming);
        Self::store(&self.cooling, cooling);
    }

    pub fn set_input(&self, input: u8) {
        Self::store(&self.input, input);
    }

    pub fn set_mute(&self, mute: bool) {
        Self::store(&self.mute, mute);
    }

    pub fn set_volume(&self, external: u16) {
        Self::store(&self.volume, external);
    }

    pub fn set_lamp_hours(&self, hours: u32) {
        Self::store(&self.lamp_hours, hours);
    }

    pub fn set_error_text(&self, text: String) {
        self.error_text.send_if_modified(|current| {
            if *current == text {
                false
            } else {
                *current = text;
                true
            }
        });
    }

    fn store<T: Copy + PartialEq>(sender: &watch::Sender<T>, value: T) {
        sender.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    // ------------------------------------------------------------------
    // Subscriptions (bridge side)
    // ------------------------------------------------------------------

    pub fn subscribe_online(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    pub fn subscribe_power(&self) -> watch::Receiver<bool> {
        self.power.subscribe()
    }

    pub fn subscribe_warming(&self) -> watch::Receiver<bool> {
        self.warming.subscribe()
    }

    pub fn subscribe_cooling(&self) -> watch::Receiver<bool> {
        self.cooling.subscribe()
    }

    pub fn subscribe_input(&self) -> watch::Receiver<u8> {
        self.input.subscribe()
    }

    pub fn subscribe_mute(&self) -> watch::Receiver<bool> {
        self.mute.subscribe()
    }

    pub fn subscribe_volume(&self) -> watch::Receiver<u16> {
        self.volume.subscribe()
    }

    pub fn subscribe_lamp_hours(&self) -> watch::Receiver<u32> {
        self.lamp_hours.subscribe()
    }

    pub fn subscribe_error_text(&self) -> watch::Receiver<String> {
        self.error_text.subscribe()
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn power(&self) -> bool {
        *self.power.borrow()
    }

    pub fn input(&self) -> u8 {
        *self.input.borrow()
    }

    pub fn mute(&self) -> bool {
        *self.mute.borrow()
    }

    pub fn volume(&self) -> u16 {
        *self.volume.borrow()
    }

    pub fn lamp_hours(&self) -> u32 {
        *self.lamp_hours.borrow()
    }
}

impl Default for FeedbackCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_value_does_not_notify() {
        let cache = FeedbackCache::new();
        let mut rx = cache.subscribe_volume();
        rx.mark_unchanged();

        cache.set_volume(0); // same as initial
        assert!(!rx.has_changed().unwrap());

        cache.set_volume(100);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 100);

        cache.set_volume(100); // repeat
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_transitioning_flags_are_exclusive() {
        let cache = FeedbackCache::new();

        cache.set_transitioning(true, false);
        assert!(*cache.subscribe_warming().borrow());
        assert!(!*cache.subscribe_cooling().borrow());

        cache.set_transitioning(false, true);
        assert!(!*cache.subscribe_warming().borrow());
        assert!(*cache.subscribe_cooling().borrow());
    }

    #[test]
    fn test_error_text_dedup() {
        let cache = FeedbackCache::new();
        let mut rx = cache.subscribe_error_text();
        rx.mark_unchanged();

        cache.set_error_text("lamp failure".into());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "lamp failure");

        cache.set_error_text("lamp failure".into());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_input_unknown_reset() {
        let cache = FeedbackCache::new();
        cache.set_input(3);
        assert_eq!(cache.input(), 3);

        cache.set_input(INPUT_UNKNOWN);
        assert_eq!(cache.input(), INPUT_UNKNOWN);
    }
}
