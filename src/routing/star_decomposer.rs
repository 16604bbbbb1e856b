//! Star Decomposer
//!
//! Splits a BGP into maximal groups of patterns sharing the same subject term.

use crate::core::Bgp;
use std::collections::HashMap;

/// A star: the positions of all patterns of a BGP sharing one subject.
///
/// Positions index into the decomposed BGP and keep the BGP's pattern order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Star {
    /// Canonical string form of the shared subject
    pub subject_key: String,
    pub positions: Vec<usize>,
}

impl Star {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The star's patterns as a BGP of their own.
    pub fn to_bgp(&self, bgp: &Bgp) -> Bgp {
        bgp.select(&self.positions)
    }
}

/// Groups the patterns of `bgp` by subject.
///
/// Stars come out in the order their subject is first seen. Every position of
/// `bgp` ends up in exactly one star.
pub fn decompose(bgp: &Bgp) -> Vec<Star> {
    let mut stars: Vec<Star> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (position, pattern) in bgp.patterns().iter().enumerate() {
        let key = pattern.subject_key();
        match index.get(&key) {
            Some(&i) => stars[i].positions.push(position),
            None => {
                index.insert(key.clone(), stars.len());
                stars.push(Star { subject_key: key, positions: vec![position] });
            }
        }
    }

    stars
}
