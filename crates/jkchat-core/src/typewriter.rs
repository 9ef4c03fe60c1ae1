//! Character-by-character reveal of a reply.

use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

pub const DEFAULT_TYPING_SPEED: Duration = Duration::from_millis(12);

/// Every prefix of a text, shortest first, split on `char` boundaries.
/// Starts with the empty prefix and ends with the full text.
#[derive(Debug, Clone)]
pub struct Typewriter<'a> {
    text: &'a str,
    pos: Option<usize>,
}

impl<'a> Typewriter<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: Some(0) }
    }
}

impl<'a> Iterator for Typewriter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.pos?;
        self.pos = self.text[pos..]
            .chars()
            .next()
            .map(|c| pos + c.len_utf8());
        Some(&self.text[..pos])
    }
}

/// Reveal `text` one character per tick, handing each prefix to `on_frame`.
pub async fn play<F>(text: &str, speed: Duration, mut on_frame: F)
where
    F: FnMut(&str),
{
    let mut ticker = interval(speed);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    for prefix in Typewriter::new(text) {
        ticker.tick().await;
        on_frame(prefix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        let prefixes: Vec<&str> = Typewriter::new("abc").collect();
        assert_eq!(prefixes, vec!["", "a", "ab", "abc"]);
    }

    #[test]
    fn test_empty_text_has_one_frame() {
        let prefixes: Vec<&str> = Typewriter::new("").collect();
        assert_eq!(prefixes, vec![""]);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let prefixes: Vec<&str> = Typewriter::new("→é").collect();
        assert_eq!(prefixes, vec!["", "→", "→é"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_emits_every_prefix() {
        let mut seen = Vec::new();
        play("hey", Duration::from_millis(12), |prefix| {
            seen.push(prefix.to_string())
        })
        .await;
        assert_eq!(seen, vec!["", "h", "he", "hey"]);
    }
}
