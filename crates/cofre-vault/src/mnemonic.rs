// SPDX-FileCopyrightText: 2026 Cofre Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recovery-phrase generation from the fixed English wordlist.
//!
//! Words are drawn independently and uniformly with the OS CSPRNG. The
//! result uses the standard 2048-word English list but is not a checksummed
//! BIP-39 encoding; every word is free.
//!
//! A phrase exists only to be shown to the user once and then fed to the
//! key derivation service. The core never persists it.

use std::collections::HashSet;
use std::sync::OnceLock;

use bip39::Language;
use rand::Rng;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Number of words in the fixed recovery wordlist.
pub const WORDLIST_LEN: usize = 2048;

/// Supported recovery-phrase lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseLength {
    /// 12 words (132 bits of sampled entropy).
    Words12,
    /// 24 words (264 bits of sampled entropy).
    Words24,
}

impl PhraseLength {
    /// Number of words generated for this phrase length.
    #[must_use]
    pub const fn word_count(self) -> usize {
        match self {
            Self::Words12 => 12,
            Self::Words24 => 24,
        }
    }
}

static WORDLIST: OnceLock<Vec<&'static str>> = OnceLock::new();
static WORDSET: OnceLock<HashSet<&'static str>> = OnceLock::new();

/// The fixed 2048-entry English wordlist, loaded and validated once.
///
/// A wordlist that does not contain exactly 2048 entries is a fatal startup
/// condition, not a recoverable error: uniform sampling and cross-device
/// phrase compatibility both depend on the exact list.
fn wordlist() -> &'static [&'static str] {
    WORDLIST.get_or_init(|| {
        let words: Vec<&'static str> = Language::English
            .wordlist()
            .get_words_by_prefix("")
            .to_vec();
        assert_eq!(
            words.len(),
            WORDLIST_LEN,
            "recovery wordlist must contain exactly {WORDLIST_LEN} words"
        );
        words
    })
}

fn wordset() -> &'static HashSet<&'static str> {
    WORDSET.get_or_init(|| wordlist().iter().copied().collect())
}

/// Generate a recovery phrase, space-separated.
///
/// Each word is drawn independently and uniformly at random from the fixed
/// wordlist. The returned buffer zeroes itself on drop.
#[must_use]
pub fn generate(length: PhraseLength) -> Zeroizing<String> {
    let words = wordlist();
    let mut rng = OsRng;

    let mut phrase = String::with_capacity(length.word_count() * 9);
    for i in 0..length.word_count() {
        if i > 0 {
            phrase.push(' ');
        }
        phrase.push_str(words[rng.gen_range(0..words.len())]);
    }
    Zeroizing::new(phrase)
}

/// Check that a phrase is non-empty and every word is a wordlist member.
#[must_use]
pub fn validate(phrase: &str) -> bool {
    let mut words = phrase.split_whitespace().peekable();
    if words.peek().is_none() {
        return false;
    }
    words.all(|word| wordset().contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wordlist_has_exactly_2048_entries() {
        assert_eq!(wordlist().len(), WORDLIST_LEN);
    }

    #[test]
    fn generate_12_returns_12_member_words() {
        let phrase = generate(PhraseLength::Words12);
        let words: Vec<&str> = phrase.split(' ').collect();
        assert_eq!(words.len(), 12);
        for word in words {
            assert!(wordset().contains(word), "{word} is not in the wordlist");
        }
    }

    #[test]
    fn generate_24_returns_24_member_words() {
        let phrase = generate(PhraseLength::Words24);
        assert_eq!(phrase.split(' ').count(), 24);
        assert!(validate(&phrase));
    }

    #[test]
    fn consecutive_phrases_differ() {
        // 2048^12 possibilities; a collision here means the RNG is broken.
        let a = generate(PhraseLength::Words12);
        let b = generate(PhraseLength::Words12);
        assert_ne!(*a, *b);
    }

    #[test]
    fn phrases_are_lowercase_ascii() {
        let phrase = generate(PhraseLength::Words12);
        assert!(
            phrase
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == ' ')
        );
    }

    #[test]
    fn validate_accepts_generated_phrases() {
        assert!(validate(&generate(PhraseLength::Words12)));
        assert!(validate(&generate(PhraseLength::Words24)));
    }

    #[test]
    fn validate_rejects_unknown_words() {
        assert!(!validate("abandon abandon xyzzy"));
    }

    #[test]
    fn validate_rejects_empty_input() {
        assert!(!validate(""));
        assert!(!validate("   "));
    }
}
