//! Block allocator for many small fixed-size items.
//!
//! Items live in blocks of `items_per_block` slots. Freed slots are threaded
//! onto a free list and reused before a new block is allocated; blocks are
//! only released all at once, by [`SlabPool::destroy`] or on drop.

use std::fmt;
use std::mem;

use crate::budget::{AllocBudget, BudgetVec};
use crate::error::{Error, Result};

/// Handle to an item of a [`SlabPool`].
///
/// Handles carry the pool generation they were issued in; after
/// [`SlabPool::destroy`] they no longer resolve.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    block: u32,
    index: u32,
    generation: u32,
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({}:{}@{})", self.block, self.index, self.generation)
    }
}

#[derive(Debug)]
enum Slot<T> {
    Occupied(T),
    Vacant(Option<SlotId>),
}

pub struct SlabPool<T> {
    blocks: Vec<BudgetVec<Slot<T>>>,
    free: Option<SlotId>,
    items_per_block: usize,
    live: usize,
    capacity: usize,
    generation: u32,
    budget: AllocBudget,
}

impl<T> SlabPool<T> {
    /// Pool growing by `items_per_block` items at a time.
    pub fn new(items_per_block: usize) -> Result<Self> {
        Self::with_budget(items_per_block, &AllocBudget::unlimited())
    }

    /// Same as [`SlabPool::new`] with block memory charged to `budget`.
    pub fn with_budget(items_per_block: usize, budget: &AllocBudget) -> Result<Self> {
        if items_per_block == 0 {
            return Err(Error::invalid("slab pool needs at least one item per block"));
        }
        Ok(Self {
            blocks: Vec::new(),
            free: None,
            items_per_block,
            live: 0,
            capacity: 0,
            generation: 0,
            budget: budget.clone(),
        })
    }

    /// Store `value` and return its handle.
    pub fn new_item(&mut self, value: T) -> Result<SlotId> {
        if self.free.is_none() {
            self.grow()?;
        }
        let id = self.free.ok_or(Error::OutOfMemory {
            requested: mem::size_of::<Slot<T>>(),
        })?;
        let slot = &mut self.blocks[id.block as usize][id.index as usize];
        let next = match slot {
            Slot::Vacant(next) => *next,
            Slot::Occupied(_) => {
                return Err(Error::invalid("slab pool free list is corrupted"));
            }
        };
        *slot = Slot::Occupied(value);
        self.free = next;
        self.live += 1;
        Ok(id)
    }

    fn grow(&mut self) -> Result<()> {
        let n = self.items_per_block;
        let block_index = u32::try_from(self.blocks.len())
            .map_err(|_| Error::invalid("too many slab pool blocks"))?;
        let count = u32::try_from(n).map_err(|_| Error::invalid("slab pool block too large"))?;
        self.blocks
            .try_reserve(1)
            .map_err(|_| Error::OutOfMemory {
                requested: mem::size_of::<BudgetVec<Slot<T>>>(),
            })?;

        let mut block = BudgetVec::with_capacity(&self.budget, n)?;
        for index in 0..count {
            let next = if index + 1 < count {
                Some(SlotId {
                    block: block_index,
                    index: index + 1,
                    generation: self.generation,
                })
            } else {
                self.free
            };
            block.push(Slot::Vacant(next))?;
        }
        self.blocks.push(block);
        self.free = Some(SlotId {
            block: block_index,
            index: 0,
            generation: self.generation,
        });
        self.capacity += n;
        log::trace!(
            "slab pool grew to {} blocks ({} items)",
            self.blocks.len(),
            self.capacity
        );
        Ok(())
    }

    /// Return the item to the free list and hand back its value.
    pub fn free_item(&mut self, id: SlotId) -> Result<T> {
        if id.generation != self.generation {
            return Err(Error::invalid(format!("stale slab slot {id:?}")));
        }
        let slot = self
            .blocks
            .get_mut(id.block as usize)
            .and_then(|b| b.get_mut(id.index as usize))
            .ok_or_else(|| Error::invalid(format!("unknown slab slot {id:?}")))?;
        if matches!(slot, Slot::Vacant(_)) {
            return Err(Error::invalid(format!("slab slot {id:?} is already free")));
        }
        match mem::replace(slot, Slot::Vacant(self.free)) {
            Slot::Occupied(value) => {
                self.free = Some(id);
                self.live -= 1;
                Ok(value)
            }
            Slot::Vacant(_) => Err(Error::invalid(format!("slab slot {id:?} is already free"))),
        }
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        if id.generation != self.generation {
            return None;
        }
        match self.blocks.get(id.block as usize)?.get(id.index as usize)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant(_) => None,
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if id.generation != self.generation {
            return None;
        }
        match self
            .blocks
            .get_mut(id.block as usize)?
            .get_mut(id.index as usize)?
        {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant(_) => None,
        }
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots over all blocks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn items_per_block(&self) -> usize {
        self.items_per_block
    }

    /// Change the size of the blocks allocated from now on. Zero is ignored.
    pub fn set_items_per_block(&mut self, n: usize) {
        if n > 0 {
            self.items_per_block = n;
        }
    }

    pub fn item_size(&self) -> usize {
        mem::size_of::<T>()
    }

    /// Release every block at once. Outstanding handles stop resolving.
    pub fn destroy(&mut self) {
        self.blocks.clear();
        self.generation = self.generation.wrapping_add(1);
        self.free = None;
        self.live = 0;
        self.capacity = 0;
    }
}

impl<T> fmt::Debug for SlabPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlabPool")
            .field("live", &self.live)
            .field("capacity", &self.capacity)
            .field("blocks", &self.blocks.len())
            .field("items_per_block", &self.items_per_block)
            .finish()
    }
}
