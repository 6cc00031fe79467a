//! Wake-word gate for transcribed utterances.
//!
//! An utterance counts only when it starts with one of the configured wake
//! tokens.  The token must be a whole word: `"zena"` matches `"Zena, hi"`
//! but not `"Zenaida called"`.  Longer tokens are tried first, so
//! `"hey zenia"` wins over a bare `"hey"` should both be configured.
//!
//! | Utterance                  | Outcome                         |
//! |----------------------------|---------------------------------|
//! | `"Zenia, tell me a joke."` | `Command("tell me a joke.")`    |
//! | `"zenia"` / `"zenia ok"`   | `WakeOnly`                      |
//! | `"hello there"`            | `NoMatch`                       |

use std::fmt;

use crate::config::WakeConfig;

// ---------------------------------------------------------------------------
// Command / GateOutcome
// ---------------------------------------------------------------------------

/// The wake-token-stripped remainder of an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(String);

impl Command {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of running an utterance through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Wake token followed by a usable command.
    Command(Command),
    /// Wake token with nothing (or too little) after it.
    WakeOnly,
    /// No wake token.
    NoMatch,
}

// ---------------------------------------------------------------------------
// WakeGate
// ---------------------------------------------------------------------------

/// Case-insensitive wake-token prefix matcher.
///
/// ```
/// use handsfree_voice::wake::{GateOutcome, WakeGate};
///
/// let gate = WakeGate::new(["zenia", "xenia"], 2);
/// assert_eq!(gate.command("Xenia open the report").unwrap().as_str(), "open the report");
/// assert_eq!(gate.evaluate("zenia"), GateOutcome::WakeOnly);
/// assert_eq!(gate.evaluate("hello there"), GateOutcome::NoMatch);
/// ```
#[derive(Debug, Clone)]
pub struct WakeGate {
    /// Lowercased tokens, longest first.
    tokens: Vec<String>,
    min_command_chars: usize,
}

impl WakeGate {
    /// Build a gate from wake `tokens`.  A command must be longer than
    /// `min_command_chars` characters, not counting trailing punctuation.
    pub fn new<I, S>(tokens: I, min_command_chars: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tokens.sort_unstable();
        tokens.dedup();
        tokens.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));

        Self {
            tokens,
            min_command_chars,
        }
    }

    pub fn from_config(config: &WakeConfig) -> Self {
        Self::new(&config.wake_words, config.min_command_chars)
    }

    /// Classify `utterance`.
    pub fn evaluate(&self, utterance: &str) -> GateOutcome {
        let text = utterance.trim_start_matches(|c: char| !c.is_alphanumeric());

        let Some(rest) = self
            .tokens
            .iter()
            .find_map(|token| strip_word_prefix(text, token))
        else {
            return GateOutcome::NoMatch;
        };

        let command = rest
            .trim_start_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .trim_end();

        // Transcribers end sentences with punctuation; "ok." is as short as "ok".
        let significant = command.trim_end_matches(|c: char| c.is_ascii_punctuation());
        if significant.trim_end().chars().count() > self.min_command_chars {
            GateOutcome::Command(Command(command.to_string()))
        } else {
            GateOutcome::WakeOnly
        }
    }

    /// The command in `utterance`, if any.
    pub fn command(&self, utterance: &str) -> Option<Command> {
        match self.evaluate(utterance) {
            GateOutcome::Command(command) => Some(command),
            GateOutcome::WakeOnly | GateOutcome::NoMatch => None,
        }
    }
}

/// Strip lowercase `token` from the front of `text`, ignoring case, when
/// the token ends on a word boundary.
fn strip_word_prefix<'a>(text: &'a str, token: &str) -> Option<&'a str> {
    let mut expected = token.chars();
    let mut end = None;

    for (i, c) in text.char_indices() {
        if expected.as_str().is_empty() {
            end = Some(i);
            break;
        }
        for lower in c.to_lowercase() {
            if expected.next() != Some(lower) {
                return None;
            }
        }
    }

    let rest = match end {
        Some(i) => &text[i..],
        None if expected.as_str().is_empty() => "",
        None => return None,
    };

    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() => None,
        _ => Some(rest),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> WakeGate {
        WakeGate::from_config(&WakeConfig::default())
    }

    fn command(text: &str) -> GateOutcome {
        GateOutcome::Command(Command(text.into()))
    }

    #[test]
    fn wake_word_with_command() {
        assert_eq!(gate().evaluate("zenia tell me a joke"), command("tell me a joke"));
    }

    #[test]
    fn wake_word_alone_is_acknowledged() {
        assert_eq!(gate().evaluate("zenia"), GateOutcome::WakeOnly);
        assert!(gate().command("zenia").is_none());
    }

    #[test]
    fn no_wake_word_is_no_match() {
        assert_eq!(gate().evaluate("hello there"), GateOutcome::NoMatch);
        assert!(gate().command("hello there").is_none());
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        assert_eq!(
            gate().evaluate("Hey Zenia, what's on my calendar?"),
            command("what's on my calendar?")
        );
        assert_eq!(gate().evaluate("ZENITH. Open the report"), command("Open the report"));
        assert_eq!(gate().evaluate("  \"Zenia\" summarize this"), command("summarize this"));
    }

    #[test]
    fn misrecognitions_are_accepted() {
        for name in ["xenia", "zena", "zenya", "zenith"] {
            let utterance = format!("{name} read the summary");
            assert_eq!(gate().evaluate(&utterance), command("read the summary"), "{name}");
        }
    }

    #[test]
    fn short_remainder_is_wake_only() {
        assert_eq!(gate().evaluate("zenia ok"), GateOutcome::WakeOnly);
        assert_eq!(gate().evaluate("Zenia, ok."), GateOutcome::WakeOnly);
        assert_eq!(gate().evaluate("zenia abc"), command("abc"));
    }

    #[test]
    fn token_must_be_a_whole_word() {
        assert_eq!(gate().evaluate("zenaida called"), GateOutcome::NoMatch);
        assert_eq!(gate().evaluate("zeniath"), GateOutcome::NoMatch);
    }

    #[test]
    fn token_in_the_middle_does_not_count() {
        assert_eq!(gate().evaluate("ask zenia about it"), GateOutcome::NoMatch);
    }

    #[test]
    fn empty_utterance_is_no_match() {
        assert_eq!(gate().evaluate(""), GateOutcome::NoMatch);
        assert_eq!(gate().evaluate("   "), GateOutcome::NoMatch);
    }

    #[test]
    fn custom_tokens_replace_defaults() {
        let gate = WakeGate::new(["Computer"], 2);
        assert_eq!(gate.evaluate("computer lights on"), command("lights on"));
        assert_eq!(gate.evaluate("zenia lights on"), GateOutcome::NoMatch);
    }

    #[test]
    fn longest_token_wins() {
        let gate = WakeGate::new(["hey", "hey zenia"], 2);
        assert_eq!(gate.evaluate("hey zenia play music"), command("play music"));
        assert_eq!(gate.evaluate("hey play music"), command("play music"));
    }

    #[test]
    fn duplicate_tokens_are_collapsed() {
        let gate = WakeGate::new(["zena", "xena", "Zena ", "hey zena"], 2);
        assert_eq!(gate.tokens, vec!["hey zena", "xena", "zena"]);
        assert_eq!(gate.evaluate("zena play music"), command("play music"));
    }

    #[test]
    fn non_ascii_text_is_handled() {
        let gate = WakeGate::new(["zénia"], 2);
        assert_eq!(gate.evaluate("Zénia ouvre le rapport"), command("ouvre le rapport"));
    }

    #[test]
    fn command_display_and_accessors() {
        let cmd = gate().command("zenia open settings").unwrap();
        assert_eq!(cmd.to_string(), "open settings");
        assert_eq!(cmd.clone().into_string(), "open settings");
    }
}
