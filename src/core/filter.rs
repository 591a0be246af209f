//! Per-tag level filter
//!
//! Rules are `(tag, max level)` pairs kept in append order. Each rule lives in
//! one block of the filter's [`BlockPool`], encoded as
//! `[level u8][tag len u8][tag bytes]`, so configuring filters never touches
//! the heap after the pool is reserved.

use crate::error::{QlogError, Result};
use crate::level::Level;
use crate::pool::{BlockHandle, BlockPool};

/// Maximum tag length in bytes
pub const TAG_CAPACITY: usize = 15;

/// Bytes needed to encode one rule
pub const RULE_BLOCK_SIZE: usize = 2 + TAG_CAPACITY;

/// Borrowed view of a rule stored in a pool block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRule<'a> {
    tag: &'a str,
    level: Level,
}

impl<'a> TagRule<'a> {
    pub fn tag(&self) -> &'a str {
        self.tag
    }

    pub fn level(&self) -> Level {
        self.level
    }

    fn encode(tag: &str, level: Level, block: &mut [u8]) {
        block[0] = level as u8;
        block[1] = tag.len() as u8;
        block[2..2 + tag.len()].copy_from_slice(tag.as_bytes());
    }

    fn decode(block: &'a [u8]) -> Result<Self> {
        let level = Level::from_index(block[0])?;
        let len = block[1] as usize;
        if len > TAG_CAPACITY {
            return Err(QlogError::TagTooLong {
                tag: String::from_utf8_lossy(&block[2..]).into_owned(),
                capacity: TAG_CAPACITY,
            });
        }
        let tag = std::str::from_utf8(&block[2..2 + len])
            .map_err(|_| QlogError::InvalidConfig("corrupt tag rule".to_string()))?;
        Ok(TagRule { tag, level })
    }
}

/// Ordered set of tag rules plus the global level
#[derive(Debug)]
pub struct TagFilter {
    pool: BlockPool,
    /// Rule blocks in append order
    rules: Vec<BlockHandle>,
    global_level: Level,
}

impl TagFilter {
    /// Create a filter whose rules are allocated from `pool`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the pool's blocks cannot hold a rule.
    pub fn new(pool: BlockPool, global_level: Level) -> Result<Self> {
        if pool.block_size() < RULE_BLOCK_SIZE {
            return Err(QlogError::InvalidConfig(format!(
                "tag pool block size {} is smaller than a rule ({} bytes)",
                pool.block_size(),
                RULE_BLOCK_SIZE
            )));
        }
        Ok(TagFilter {
            pool,
            rules: Vec::new(),
            global_level,
        })
    }

    /// Create a filter with its own pool of `tag_capacity` rule blocks
    pub fn with_capacity(tag_capacity: usize, global_level: Level) -> Result<Self> {
        let pool = BlockPool::new("tag_pool", tag_capacity, RULE_BLOCK_SIZE)?;
        Self::new(pool, global_level)
    }

    /// Append a rule
    ///
    /// Configuration-time only. Rules are never removed individually.
    ///
    /// # Errors
    ///
    /// Returns `EmptyTag`/`TagTooLong` for bad tags and `PoolExhausted` once
    /// the tag capacity is used up.
    pub fn append(&mut self, tag: &str, level: Level) -> Result<()> {
        if tag.is_empty() {
            return Err(QlogError::EmptyTag);
        }
        if tag.len() > TAG_CAPACITY {
            return Err(QlogError::TagTooLong {
                tag: tag.to_string(),
                capacity: TAG_CAPACITY,
            });
        }

        let handle = self.pool.alloc()?;
        TagRule::encode(tag, level, self.pool.block_mut(handle)?);
        self.rules.push(handle);
        Ok(())
    }

    /// Decide whether a record should be suppressed
    ///
    /// Returns `true` to suppress. The first rule whose tag matches decides:
    /// records noisier than the rule's level are dropped. Tags without a rule
    /// always pass; the global level is enforced by the caller before this
    /// runs.
    pub fn invoke(&self, tag: Option<&str>, level: Level) -> bool {
        if tag.is_none() && level.passes(self.global_level) {
            return false;
        }
        if self.rules.is_empty() && level.passes(self.global_level) {
            return false;
        }
        let Some(tag) = tag else {
            return false;
        };

        match self.rules().find(|rule| rule.tag() == tag) {
            Some(rule) => !level.passes(rule.level()),
            None => false,
        }
    }

    /// Iterate over rules in append order
    pub fn rules(&self) -> impl Iterator<Item = TagRule<'_>> + '_ {
        self.rules.iter().filter_map(move |&handle| {
            self.pool
                .block(handle)
                .and_then(TagRule::decode)
                .map_err(|e| tracing::error!("unreadable tag rule: {}", e))
                .ok()
        })
    }

    /// Drop every rule and reclaim the pool
    pub fn clear(&mut self) {
        self.rules.clear();
        self.pool.reset();
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Remaining rule slots
    pub fn remaining(&self) -> usize {
        self.pool.block_free()
    }

    pub fn global_level(&self) -> Level {
        self.global_level
    }

    pub fn set_global_level(&mut self, level: Level) {
        self.global_level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> TagFilter {
        TagFilter::with_capacity(4, Level::Debug).unwrap()
    }

    #[test]
    fn test_empty_filter_passes() {
        let f = filter();
        for level in Level::ALL {
            assert!(!f.invoke(Some("net"), level));
            assert!(!f.invoke(None, level));
        }
    }

    #[test]
    fn test_rule_is_a_ceiling() {
        let mut f = filter();
        f.append("net", Level::Warning).unwrap();

        assert!(!f.invoke(Some("net"), Level::Fatal));
        assert!(!f.invoke(Some("net"), Level::Error));
        // Ties pass
        assert!(!f.invoke(Some("net"), Level::Warning));
        assert!(f.invoke(Some("net"), Level::Info));
        assert!(f.invoke(Some("net"), Level::Debug));
    }

    #[test]
    fn test_unmatched_tag_passes() {
        let mut f = TagFilter::with_capacity(4, Level::Warning).unwrap();
        f.append("net", Level::Error).unwrap();

        // Not checked against the global level here
        assert!(!f.invoke(Some("disk"), Level::Debug));
        assert!(!f.invoke(None, Level::Warning));
    }

    #[test]
    fn test_first_match_wins() {
        let mut f = filter();
        f.append("net", Level::Error).unwrap();
        f.append("net", Level::Debug).unwrap();

        assert!(f.invoke(Some("net"), Level::Info));
    }

    #[test]
    fn test_exact_match_only() {
        let mut f = filter();
        f.append("net", Level::Fatal).unwrap();

        assert!(!f.invoke(Some("network"), Level::Debug));
        assert!(!f.invoke(Some("ne"), Level::Debug));
        assert!(f.invoke(Some("net"), Level::Error));
    }

    #[test]
    fn test_rules_kept_in_order() {
        let mut f = filter();
        f.append("a", Level::Error).unwrap();
        f.append("bb", Level::Info).unwrap();
        f.append("ccc", Level::Debug).unwrap();

        let rules: Vec<_> = f.rules().map(|r| (r.tag(), r.level())).collect();
        assert_eq!(
            rules,
            vec![("a", Level::Error), ("bb", Level::Info), ("ccc", Level::Debug)]
        );
    }

    #[test]
    fn test_tag_capacity() {
        let mut f = filter();
        assert!(f.append(&"x".repeat(TAG_CAPACITY), Level::Info).is_ok());
        assert!(matches!(
            f.append(&"x".repeat(TAG_CAPACITY + 1), Level::Info),
            Err(QlogError::TagTooLong { .. })
        ));
        assert!(matches!(f.append("", Level::Info), Err(QlogError::EmptyTag)));
    }

    #[test]
    fn test_pool_exhaustion_surfaces() {
        let mut f = TagFilter::with_capacity(2, Level::Debug).unwrap();
        f.append("a", Level::Info).unwrap();
        f.append("b", Level::Info).unwrap();

        assert!(matches!(
            f.append("c", Level::Info),
            Err(QlogError::PoolExhausted(_))
        ));
        assert_eq!(f.len(), 2);
        assert_eq!(f.remaining(), 0);
    }

    #[test]
    fn test_clear_reclaims_pool() {
        let mut f = TagFilter::with_capacity(1, Level::Debug).unwrap();
        f.append("a", Level::Info).unwrap();
        f.clear();

        assert!(f.is_empty());
        assert!(f.append("b", Level::Info).is_ok());
    }

    #[test]
    fn test_pool_too_small_for_rules() {
        let pool = BlockPool::new("tiny", 4, 8).unwrap();
        assert!(matches!(
            TagFilter::new(pool, Level::Info),
            Err(QlogError::InvalidConfig(_))
        ));
    }
}
