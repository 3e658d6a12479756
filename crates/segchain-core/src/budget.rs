//! Byte accounting for the scratch buffers of a construction call.
//!
//! Every buffer allocated while building a segmentation or a chain pool is
//! charged against an [`AllocBudget`]. An unlimited budget only records usage;
//! a limited one turns an over-budget request into `OutOfMemory`, which makes
//! allocation failures reproducible in tests.

use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct BudgetState {
    limit: Option<usize>,
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

/// Shared allocation budget. Clones refer to the same counters.
#[derive(Clone, Debug, Default)]
pub struct AllocBudget {
    state: Arc<BudgetState>,
}

impl AllocBudget {
    /// Budget that never refuses a request.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Budget refusing any request that would push usage above `bytes`.
    pub fn with_limit(bytes: usize) -> Self {
        Self {
            state: Arc::new(BudgetState {
                limit: Some(bytes),
                ..BudgetState::default()
            }),
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.state.limit
    }

    /// Bytes currently charged and not yet released.
    pub fn in_use(&self) -> usize {
        self.state.in_use.load(Ordering::Acquire)
    }

    /// High-water mark of [`AllocBudget::in_use`].
    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::Acquire)
    }

    /// Reserve `bytes`; the returned guard gives them back on drop.
    pub fn charge(&self, bytes: usize) -> Result<Charge> {
        self.reserve(bytes)?;
        Ok(Charge {
            budget: self.clone(),
            bytes,
        })
    }

    fn reserve(&self, bytes: usize) -> Result<()> {
        let state = &self.state;
        let mut current = state.in_use.load(Ordering::Acquire);
        loop {
            let next = current
                .checked_add(bytes)
                .ok_or(Error::OutOfMemory { requested: bytes })?;
            if state.limit.is_some_and(|limit| next > limit) {
                log::debug!(
                    "allocation budget exhausted: {} + {} > {:?}",
                    current,
                    bytes,
                    state.limit
                );
                return Err(Error::OutOfMemory { requested: bytes });
            }
            match state.in_use.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    state.peak.fetch_max(next, Ordering::AcqRel);
                    return Ok(());
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.state.in_use.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Bytes held against a budget until dropped.
#[derive(Debug)]
pub struct Charge {
    budget: AllocBudget,
    bytes: usize,
}

impl Charge {
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Extend the charge by `extra` bytes.
    pub fn grow(&mut self, extra: usize) -> Result<()> {
        self.budget.reserve(extra)?;
        self.bytes += extra;
        Ok(())
    }
}

impl Drop for Charge {
    fn drop(&mut self) {
        self.budget.release(self.bytes);
    }
}

fn bytes_for<T>(count: usize) -> Result<usize> {
    count
        .checked_mul(mem::size_of::<T>())
        .ok_or(Error::OutOfMemory {
            requested: usize::MAX,
        })
}

/// Growable buffer whose capacity is charged to an [`AllocBudget`].
///
/// Dereferences to a slice; all growth goes through `try_reserve_exact`, so both budget exhaustion and
/// a real allocator failure surface as `OutOfMemory`.
#[derive(Debug)]
pub struct BudgetVec<T> {
    data: Vec<T>,
    charge: Charge,
}

impl<T> BudgetVec<T> {
    /// Empty buffer with room for `capacity` items.
    pub fn with_capacity(budget: &AllocBudget, capacity: usize) -> Result<Self> {
        let bytes = bytes_for::<T>(capacity)?;
        let charge = budget.charge(bytes)?;
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory { requested: bytes })?;
        Ok(Self { data, charge })
    }

    /// Buffer of `len` copies of `value`.
    pub fn filled(budget: &AllocBudget, len: usize, value: T) -> Result<Self>
    where
        T: Clone,
    {
        let mut buf = Self::with_capacity(budget, len)?;
        buf.data.resize(len, value);
        Ok(buf)
    }

    /// Make room for at least `additional` more items.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let free = self.data.capacity() - self.data.len();
        if free >= additional {
            return Ok(());
        }
        let extra = additional - free;
        let bytes = bytes_for::<T>(extra)?;
        self.charge.grow(bytes)?;
        self.data
            .try_reserve_exact(additional)
            .map_err(|_| Error::OutOfMemory { requested: bytes })
    }

    /// Append `value`, doubling the capacity when full.
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.data.len() == self.data.capacity() {
            self.reserve(self.data.len().max(4))?;
        }
        self.data.push(value);
        Ok(())
    }

    /// Append every item of `iter`, growing through [`BudgetVec::push`].
    pub fn try_extend<I: IntoIterator<Item = T>>(&mut self, iter: I) -> Result<()> {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0)?;
        for value in iter {
            self.push(value)?;
        }
        Ok(())
    }

    /// Append a copy of `values`.
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<()>
    where
        T: Clone,
    {
        self.reserve(values.len())?;
        self.data.extend_from_slice(values);
        Ok(())
    }

    /// Remove every item; the capacity stays charged.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn charged_bytes(&self) -> usize {
        self.charge.bytes()
    }

    /// Release the charge and hand the storage over to the caller.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T> Deref for BudgetVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for BudgetVec<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}
