//! Fixed-size block pool
//!
//! Partitions an arena into `block_total` uniform blocks threaded onto a
//! singly linked free-list. Allocation pops the list head, freeing pushes the
//! block back. Both are O(1); there is no coalescing and no growth.
//!
//! Each slot carries a header stamped with the owning pool's id when the block
//! is handed out, so a handle minted by one pool can never be returned to
//! another.

use crate::error::{QlogError, Result};
use std::sync::atomic::{AtomicU32, Ordering};

/// Alignment applied to every block
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Round `value` up to a multiple of `align` (power of two)
#[inline]
pub fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Identity of a pool, stamped into the header of each block it hands out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolId(u32);

/// Handle to an allocated block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    pool: PoolId,
    index: usize,
}

impl BlockHandle {
    /// Slot index inside the owning pool
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }
}

/// Per-slot header
#[derive(Debug, Clone, Copy, Default)]
struct SlotHeader {
    /// Set while the block is allocated
    owner: Option<PoolId>,
    /// Next free slot while the block is on the free-list
    next_free: Option<usize>,
}

/// Fixed-size block allocator over a pre-reserved arena
#[derive(Debug)]
pub struct BlockPool {
    id: PoolId,
    name: String,
    /// Block storage, `block_total * block_size` bytes in use
    arena: Vec<u8>,
    headers: Vec<SlotHeader>,
    /// Aligned block size
    block_size: usize,
    block_total: usize,
    block_free: usize,
    /// Head of the free-list
    free_head: Option<usize>,
}

impl BlockPool {
    /// Create a pool that reserves its own arena
    ///
    /// # Errors
    ///
    /// Returns `InvalidPoolGeometry` if `block_total` or `block_size` is zero.
    pub fn new(name: impl Into<String>, block_total: usize, block_size: usize) -> Result<Self> {
        let (stride, required) = Self::geometry(block_total, block_size)?;
        Ok(Self::build(name.into(), vec![0u8; required], block_total, stride))
    }

    /// Create a pool over a caller-supplied arena
    ///
    /// Only the first `block_total * align_up(block_size, WORD_SIZE)` bytes of
    /// the arena are used.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPoolGeometry` for a zero geometry and `ArenaTooSmall` if
    /// the arena cannot hold every block.
    pub fn with_arena(
        name: impl Into<String>,
        arena: Vec<u8>,
        block_total: usize,
        block_size: usize,
    ) -> Result<Self> {
        let (stride, required) = Self::geometry(block_total, block_size)?;
        if arena.len() < required {
            return Err(QlogError::ArenaTooSmall {
                required,
                actual: arena.len(),
            });
        }
        Ok(Self::build(name.into(), arena, block_total, stride))
    }

    fn geometry(block_total: usize, block_size: usize) -> Result<(usize, usize)> {
        let invalid = || QlogError::InvalidPoolGeometry {
            block_total,
            block_size,
        };
        if block_total == 0 || block_size == 0 {
            return Err(invalid());
        }
        let stride = align_up(block_size, WORD_SIZE);
        let required = stride.checked_mul(block_total).ok_or_else(invalid)?;
        Ok((stride, required))
    }

    fn build(name: String, arena: Vec<u8>, block_total: usize, block_size: usize) -> Self {
        // Thread every slot onto the free-list in arena order
        let headers = (0..block_total)
            .map(|index| SlotHeader {
                owner: None,
                next_free: (index + 1 < block_total).then_some(index + 1),
            })
            .collect();

        BlockPool {
            id: PoolId(NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed)),
            name,
            arena,
            headers,
            block_size,
            block_total,
            block_free: block_total,
            free_head: Some(0),
        }
    }

    /// Pop a block off the free-list
    ///
    /// The returned block is zeroed.
    ///
    /// # Errors
    ///
    /// Returns `PoolExhausted` when every block is in use.
    pub fn alloc(&mut self) -> Result<BlockHandle> {
        let index = self
            .free_head
            .ok_or_else(|| QlogError::PoolExhausted(self.name.clone()))?;

        let header = &mut self.headers[index];
        debug_assert!(header.owner.is_none());
        self.free_head = header.next_free.take();
        header.owner = Some(self.id);
        self.block_free -= 1;
        debug_assert!(self.block_free <= self.block_total);

        let range = self.range(index);
        self.arena[range].fill(0);

        Ok(BlockHandle {
            pool: self.id,
            index,
        })
    }

    /// Push a block back onto the free-list
    ///
    /// # Errors
    ///
    /// Rejects handles minted by another pool (`ForeignBlock`), out-of-range
    /// handles (`InvalidBlock`) and blocks that are already free
    /// (`BlockNotAllocated`).
    pub fn free(&mut self, handle: BlockHandle) -> Result<()> {
        let index = self.validate(handle)?;

        let header = &mut self.headers[index];
        header.owner = None;
        header.next_free = self.free_head;
        self.free_head = Some(index);
        self.block_free += 1;
        debug_assert!(self.block_free <= self.block_total);

        Ok(())
    }

    fn validate(&self, handle: BlockHandle) -> Result<usize> {
        if handle.pool != self.id {
            return Err(QlogError::ForeignBlock {
                index: handle.index,
            });
        }
        let header = self
            .headers
            .get(handle.index)
            .ok_or(QlogError::InvalidBlock(handle.index))?;
        if header.owner != Some(self.id) {
            tracing::warn!(pool = %self.name, block = handle.index, "double free rejected");
            return Err(QlogError::BlockNotAllocated(handle.index));
        }
        Ok(handle.index)
    }

    fn range(&self, index: usize) -> std::ops::Range<usize> {
        let start = index * self.block_size;
        start..start + self.block_size
    }

    /// Read access to an allocated block
    pub fn block(&self, handle: BlockHandle) -> Result<&[u8]> {
        let index = self.validate(handle)?;
        Ok(&self.arena[self.range(index)])
    }

    /// Write access to an allocated block
    pub fn block_mut(&mut self, handle: BlockHandle) -> Result<&mut [u8]> {
        let index = self.validate(handle)?;
        let range = self.range(index);
        Ok(&mut self.arena[range])
    }

    /// Check if a handle refers to a live allocation of this pool
    pub fn is_allocated(&self, handle: BlockHandle) -> bool {
        handle.pool == self.id
            && self
                .headers
                .get(handle.index)
                .is_some_and(|h| h.owner == Some(self.id))
    }

    /// Return every block to the free-list
    ///
    /// Outstanding handles become invalid.
    pub fn reset(&mut self) {
        let total = self.block_total;
        for (index, header) in self.headers.iter_mut().enumerate() {
            header.owner = None;
            header.next_free = (index + 1 < total).then_some(index + 1);
        }
        self.free_head = Some(0);
        self.block_free = total;
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Aligned size of a single block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_total(&self) -> usize {
        self.block_total
    }

    pub fn block_free(&self) -> usize {
        self.block_free
    }
}
