pub mod http;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::input::KeyEvent;

type Waker = Arc<dyn Fn() + Send + Sync>;

/// Cloneable handle that feeds key codes to the event loop.
#[derive(Clone)]
pub struct RemoteControl {
    tx: Sender<KeyEvent>,
    waker: Option<Waker>,
}

impl std::fmt::Debug for RemoteControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteControl")
            .field("waker", &self.waker.is_some())
            .finish()
    }
}

impl RemoteControl {
    pub fn channel() -> (Self, Receiver<KeyEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx, waker: None }, rx)
    }

    /// Called after every injected key, e.g. to request a repaint.
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    /// Press and release `keyflag`. Zero is ignored.
    pub fn control_key(&self, keyflag: u32) {
        if keyflag == 0 {
            return;
        }
        tracing::debug!(keyflag, "remote key");
        let sent = self.tx.send(KeyEvent::Press(keyflag)).is_ok()
            && self.tx.send(KeyEvent::Release(keyflag)).is_ok();
        if !sent {
            tracing::debug!("event loop gone, dropping remote key");
            return;
        }
        if let Some(wake) = &self.waker {
            wake();
        }
    }
}

/// Parse a key code the way C's `strtol(s, NULL, 0)` would: optional sign,
/// `0x` hex, leading-zero octal or decimal, stopping at the first invalid
/// digit. Anything unparsable is 0.
pub fn parse_keyflag(text: &str) -> u32 {
    let text = text.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (16, hex)
    } else if text.len() > 1 && text.starts_with('0') {
        (8, &text[1..])
    } else {
        (10, text)
    };

    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_digit(radix))
        .map_or(digits.len(), |(i, _)| i);
    let value = u64::from_str_radix(&digits[..end], radix).unwrap_or(0);
    if negative {
        0
    } else {
        u32::try_from(value).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::input::keysym;

    #[test]
    fn test_control_key_sends_press_and_release() {
        let (remote, rx) = RemoteControl::channel();
        remote.control_key(keysym::RIGHT);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![KeyEvent::Press(keysym::RIGHT), KeyEvent::Release(keysym::RIGHT)]
        );
    }

    #[test]
    fn test_zero_key_is_ignored() {
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        let (remote, rx) = RemoteControl::channel();
        let remote = remote.with_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        remote.control_key(0);
        assert!(rx.try_recv().is_err());
        assert_eq!(wakes.load(Ordering::SeqCst), 0);

        remote.control_key(keysym::LEFT);
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_keyflag_parsing() {
        assert_eq!(parse_keyflag("65363"), 0xff53);
        assert_eq!(parse_keyflag("0xff51"), 0xff51);
        assert_eq!(parse_keyflag("0177523"), 0xff53);
        assert_eq!(parse_keyflag("65293&junk"), 0xff0d);
        assert_eq!(parse_keyflag("next"), 0);
        assert_eq!(parse_keyflag(""), 0);
        assert_eq!(parse_keyflag("-5"), 0);
        assert_eq!(parse_keyflag("0"), 0);
    }
}
