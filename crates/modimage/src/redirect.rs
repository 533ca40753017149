//! Perfect-hash redirect table.
//!
//! The table maps a location name to a slot in `[0, len)` with at most two hash
//! evaluations. Names are first hashed with [`DEFAULT_SEED`] into a bucket; the
//! bucket value then either names the slot directly (negative values) or gives
//! the seed of a second hash that spreads the bucket's names over free slots.

use itertools::Itertools;

use crate::{ImageError, Result};

/// Seed of the first-level hash.
pub const DEFAULT_SEED: i32 = 0x0100_0193;

const HASH_MULTIPLIER: u32 = 0x0100_0193;

/// Seeds tried for one multi-entry bucket before the table is grown.
const MAX_SEED_ATTEMPTS: i32 = 1 << 16;

/// Number of times the table is grown before giving up.
const MAX_GROWTH_ROUNDS: usize = 16;

/// The jimage string hash, always non-negative.
pub fn hash_code(name: &str, seed: i32) -> i32 {
    let hash = name.bytes().fold(seed as u32, |hash, byte| {
        hash.wrapping_mul(HASH_MULTIPLIER) ^ byte as u32
    });
    (hash & 0x7FFF_FFFF) as i32
}

/// A built redirect table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RedirectTable {
    redirect: Vec<i32>,
}

/// Result of [`RedirectTable::build`]: the table plus the slot assigned to every
/// input name, in input order.
#[derive(Debug, Clone)]
pub struct RedirectLayout {
    pub table: RedirectTable,
    pub slots: Vec<usize>,
}

impl RedirectTable {
    /// Wrap a table read from an image.
    pub fn from_raw(redirect: Vec<i32>) -> Self {
        Self { redirect }
    }

    /// Build a table for `names`, which must be unique.
    ///
    /// The table starts with one slot per name and grows until every bucket can
    /// be placed, failing with [`ImageError::TableOverflow`] when it cannot.
    pub fn build(names: &[&str]) -> Result<RedirectLayout> {
        if names.len() > i32::MAX as usize {
            return Err(ImageError::TableOverflow(format!(
                "{} locations exceed the redirect table capacity",
                names.len()
            )));
        }
        if names.is_empty() {
            return Ok(RedirectLayout {
                table: RedirectTable::default(),
                slots: Vec::new(),
            });
        }

        let mut len = names.len();
        for round in 0..MAX_GROWTH_ROUNDS {
            if let Some(layout) = Self::try_build(names, len) {
                if round > 0 {
                    tracing::debug!(
                        "redirect table for {} names grown to {len} slots",
                        names.len()
                    );
                }
                return Ok(layout);
            }

            len = len + len / 8 + 1;
            if len > i32::MAX as usize {
                break;
            }
        }

        Err(ImageError::TableOverflow(format!(
            "no perfect hash found for {} locations",
            names.len()
        )))
    }

    fn try_build(names: &[&str], len: usize) -> Option<RedirectLayout> {
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); len];
        for (index, name) in names.iter().enumerate() {
            buckets[hash_code(name, DEFAULT_SEED) as usize % len].push(index);
        }

        let order = (0..len)
            .filter(|&bucket| !buckets[bucket].is_empty())
            .sorted_by_key(|&bucket| std::cmp::Reverse(buckets[bucket].len()))
            .collect_vec();

        let mut redirect = vec![0i32; len];
        let mut used = vec![false; len];
        let mut slots = vec![0usize; names.len()];
        let mut next_free = 0;

        for bucket in order {
            let members = &buckets[bucket];
            if let [single] = members.as_slice() {
                while used[next_free] {
                    next_free += 1;
                }
                used[next_free] = true;
                slots[*single] = next_free;
                redirect[bucket] = -1 - next_free as i32;
                continue;
            }

            let mut candidate = Vec::with_capacity(members.len());
            let seed = (1..=MAX_SEED_ATTEMPTS).find(|&seed| {
                candidate.clear();
                for &member in members {
                    let slot = hash_code(names[member], seed) as usize % len;
                    if used[slot] || candidate.contains(&slot) {
                        return false;
                    }
                    candidate.push(slot);
                }
                true
            })?;

            for (&member, &slot) in members.iter().zip(&candidate) {
                used[slot] = true;
                slots[member] = slot;
            }
            redirect[bucket] = seed;
        }

        Some(RedirectLayout {
            table: RedirectTable { redirect },
            slots,
        })
    }

    /// Candidate slot for `name`. The caller must confirm the slot holds `name`.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        if self.redirect.is_empty() {
            return None;
        }

        let len = self.redirect.len();
        let value = self.redirect[hash_code(name, DEFAULT_SEED) as usize % len];
        match value {
            0 => None,
            value if value < 0 => Some((-1 - value) as usize).filter(|&slot| slot < len),
            seed => Some(hash_code(name, seed) as usize % len),
        }
    }

    pub fn len(&self) -> usize {
        self.redirect.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redirect.is_empty()
    }

    pub fn values(&self) -> &[i32] {
        &self.redirect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{collection::hash_set, prelude::*};
    use std::collections::HashSet;

    #[test]
    fn test_hash_code_known_values() {
        assert_eq!(hash_code("", DEFAULT_SEED), DEFAULT_SEED);
        assert_eq!(
            hash_code("a", DEFAULT_SEED),
            ((0x0100_0193u32.wrapping_mul(0x0100_0193) ^ b'a' as u32) & 0x7FFF_FFFF) as i32
        );
        assert!(hash_code("/java.base/java/lang/Object.class", 7) >= 0);
    }

    #[test]
    fn test_empty() {
        let layout = RedirectTable::build(&[]).unwrap();
        assert!(layout.table.is_empty());
        assert_eq!(layout.table.lookup("/mod/X.class"), None);
    }

    #[test]
    fn test_single_name() {
        let layout = RedirectTable::build(&["/mod/a/X.class"]).unwrap();
        assert_eq!(layout.table.values(), &[-1]);
        assert_eq!(layout.slots, vec![0]);
        assert_eq!(layout.table.lookup("/mod/a/X.class"), Some(0));
    }

    #[test]
    fn test_many_names() {
        let names = (0..2000)
            .map(|i| format!("/mod/p{}/C{i}.class", i % 17))
            .collect_vec();
        let refs = names.iter().map(String::as_str).collect_vec();
        let layout = RedirectTable::build(&refs).unwrap();

        assert!(layout.table.len() >= names.len());
        for (name, &slot) in refs.iter().zip(&layout.slots) {
            assert_eq!(layout.table.lookup(name), Some(slot));
        }
        assert_eq!(layout.slots.iter().collect::<HashSet<_>>().len(), names.len());
    }

    proptest! {
        #[test]
        fn test_every_name_gets_unique_slot(names in hash_set("/[a-z]{1,6}/[a-z/]{0,8}[A-Za-z]{1,8}\\.class", 0..200)) {
            let refs = names.iter().map(String::as_str).collect_vec();
            let layout = RedirectTable::build(&refs).unwrap();

            prop_assert!(layout.table.len() >= refs.len());
            let mut seen = HashSet::new();
            for (name, &slot) in refs.iter().zip(&layout.slots) {
                prop_assert!(slot < layout.table.len());
                prop_assert!(seen.insert(slot));
                prop_assert_eq!(layout.table.lookup(name), Some(slot));
            }
        }
    }
}
