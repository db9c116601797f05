use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::defs::TriggerId;
use crate::trigger::keys::TriggerSumKey;

/// Level-1 trigger output: trigger words keyed like sums, plus the
/// per-sample decision bits.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct LL1Out {
    pub trigger: TriggerId,
    words: BTreeMap<TriggerSumKey, Vec<u32>>,
    bits: Option<Vec<u32>>,
}

impl LL1Out {
    pub fn new(trigger: TriggerId) -> Self {
        LL1Out { trigger, words: BTreeMap::new(), bits: None }
    }

    pub fn add_word(&mut self, key: TriggerSumKey, word: Vec<u32>) {
        self.words.insert(key, word);
    }

    pub fn get_word(&self, key: TriggerSumKey) -> Option<&[u32]> {
        self.words.get(&key).map(|w| w.as_slice())
    }

    /// Trigger words in key order.
    pub fn words(&self) -> impl Iterator<Item = (TriggerSumKey, &[u32])> {
        self.words.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn n_words(&self) -> usize {
        self.words.len()
    }

    pub fn set_bit_pattern(&mut self, bits: Vec<u32>) {
        self.bits = Some(bits);
    }

    pub fn bit_pattern(&self) -> Option<&[u32]> {
        self.bits.as_deref()
    }

    /// True if any sample of the bit pattern fired.
    pub fn is_triggered(&self) -> bool {
        self.bits.as_ref().map_or(false, |b| b.iter().any(|&x| x != 0))
    }

    /// Sample indices whose decision bit is set.
    pub fn triggered_samples(&self) -> Vec<usize> {
        match &self.bits {
            Some(bits) => bits.iter().enumerate().filter(|&(_, &b)| b != 0).map(|(i, _)| i).collect(),
            None => Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.bits = None;
    }
}

impl Display for LL1Out {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "LL1Out(trigger: {}, words: {}, triggered: {})", self.trigger, self.words.len(), self.is_triggered())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::DetectorId;

    #[test]
    fn test_bit_pattern_accessors() {
        let mut ll1 = LL1Out::new(TriggerId::Jet);
        assert!(!ll1.is_triggered());
        assert!(ll1.bit_pattern().is_none());

        ll1.set_bit_pattern(vec![0, 0, 1, 0, 1]);
        assert!(ll1.is_triggered());
        assert_eq!(ll1.triggered_samples(), vec![2, 4]);
    }

    #[test]
    fn test_words_and_clear() {
        let mut ll1 = LL1Out::new(TriggerId::Jet);
        let key = TriggerSumKey::compose(TriggerId::Jet, DetectorId::HCalCombined, 0, 1, 1, 0);
        ll1.add_word(key, vec![3, 4]);
        assert_eq!(ll1.n_words(), 1);
        assert_eq!(ll1.get_word(key), Some(&[3u32, 4][..]));
        ll1.set_bit_pattern(vec![1]);
        ll1.clear();
        assert_eq!(ll1.n_words(), 0);
        assert!(!ll1.is_triggered());
    }
}
