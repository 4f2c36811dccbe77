use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::ops::Index;

use crate::geometry::Overlap;
use crate::{WordId, MAX_SLOT_LENGTH};

/// A struct representing a word that can be chosen for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub string: String,
    pub chars: SmallVec<[char; MAX_SLOT_LENGTH]>,
}

impl Word {
    fn new(string: &str) -> Word {
        Word { string: string.to_string(), chars: string.chars().collect() }
    }

    /// Length in chars, which is what gets compared against slot lengths.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Do this word and `other` put the same letter in the crossing cell? A word too short to
    /// reach the crossing never agrees.
    pub fn agrees_with(&self, other: &Word, overlap: Overlap) -> bool {
        match (self.chars.get(overlap.cell), other.chars.get(overlap.other_cell)) {
            (Some(letter), Some(other_letter)) => letter == other_letter,
            _ => false,
        }
    }
}

/// The set of distinct candidate words for a puzzle. Ids are assigned in order of first
/// appearance, so iterating by id reproduces the caller's order.
#[derive(Clone, Default)]
pub struct WordPool {
    words: Vec<Word>,
    word_id_by_string: HashMap<String, WordId>,
}

impl Debug for WordPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordPool")
            .field("words", &format!("({} entries)", self.words.len()))
            .finish()
    }
}

impl WordPool {
    /// Build a pool from a list of words, dropping repeats.
    pub fn new<I, S>(words: I) -> WordPool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pool = WordPool::default();
        for word in words {
            pool.insert(word.as_ref());
        }
        pool
    }

    /// Add a word if it isn't already present, returning its id either way.
    pub fn insert(&mut self, string: &str) -> WordId {
        if let Some(&word_id) = self.word_id_by_string.get(string) {
            return word_id;
        }

        let word_id = self.words.len();
        self.words.push(Word::new(string));
        self.word_id_by_string.insert(string.to_string(), word_id);
        word_id
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    pub fn id_of(&self, string: &str) -> Option<WordId> {
        self.word_id_by_string.get(string).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WordId, &Word)> {
        self.words.iter().enumerate()
    }
}

impl Index<WordId> for WordPool {
    type Output = Word;

    fn index(&self, word_id: WordId) -> &Self::Output {
        &self.words[word_id]
    }
}
