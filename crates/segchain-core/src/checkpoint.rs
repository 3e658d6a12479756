//! LIFO registry of cleanup obligations for multi-resource construction.
//!
//! A construction routine registers every intermediate resource on a
//! [`CheckpointStack`]. If any step fails, returning early drops the stack,
//! which releases the resources in strict reverse registration order. On
//! success the routine calls [`CheckpointStack::commit`] to take the final
//! result out and release everything else.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;

use crate::budget::{AllocBudget, BudgetVec};
use crate::error::{Error, Result};

type Destructor = Box<dyn FnOnce(Box<dyn Any>)>;

struct Entry {
    id: u64,
    type_name: &'static str,
    resource: Box<dyn Any>,
    destructor: Option<Destructor>,
}

impl Entry {
    fn release(self) {
        log::trace!("checkpoint: releasing {}", self.type_name);
        if let Some(destructor) = self.destructor {
            destructor(self.resource);
        }
    }
}

/// Typed handle to a resource registered on a [`CheckpointStack`].
pub struct Checkpoint<T> {
    id: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Checkpoint<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Checkpoint<T> {}

impl<T> fmt::Debug for Checkpoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checkpoint<{}>({})", type_name::<T>(), self.id)
    }
}

/// Summary of a stack entry returned by [`CheckpointStack::peek`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryInfo {
    pub type_name: &'static str,
    pub has_destructor: bool,
}

#[derive(Default)]
pub struct CheckpointStack {
    entries: Vec<Entry>,
    next_id: u64,
}

impl CheckpointStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `resource`, to be released by `destructor` when it is dropped
    /// from the stack.
    ///
    /// If the stack itself cannot grow, `destructor` runs immediately and
    /// `OutOfMemory` is returned.
    pub fn push<T, F>(&mut self, resource: T, destructor: F) -> Result<Checkpoint<T>>
    where
        T: Any,
        F: FnOnce(T) + 'static,
    {
        let destructor: Destructor = Box::new(move |any: Box<dyn Any>| {
            if let Ok(resource) = any.downcast::<T>() {
                destructor(*resource);
            }
        });
        self.insert(Box::new(resource), Some(destructor), type_name::<T>())
    }

    /// Register `resource` with plain `Drop` as its destructor.
    pub fn push_owned<T: Any>(&mut self, resource: T) -> Result<Checkpoint<T>> {
        self.insert(Box::new(resource), None, type_name::<T>())
    }

    /// Allocate `len` default-initialized items charged to `budget` and
    /// register the buffer.
    pub fn push_buffer<T>(
        &mut self,
        budget: &AllocBudget,
        len: usize,
    ) -> Result<Checkpoint<BudgetVec<T>>>
    where
        T: Any + Clone + Default,
    {
        let buffer = BudgetVec::filled(budget, len, T::default())?;
        self.push_owned(buffer)
    }

    fn insert<T: Any>(
        &mut self,
        resource: Box<dyn Any>,
        destructor: Option<Destructor>,
        type_name: &'static str,
    ) -> Result<Checkpoint<T>> {
        let entry = Entry {
            id: self.next_id,
            type_name,
            resource,
            destructor,
        };
        if self.entries.try_reserve(1).is_err() {
            entry.release();
            return Err(Error::OutOfMemory {
                requested: std::mem::size_of::<Entry>(),
            });
        }
        self.entries.push(entry);
        self.next_id += 1;
        Ok(Checkpoint {
            id: self.next_id - 1,
            _marker: PhantomData,
        })
    }

    /// Release the top `n` entries (all of them if `n >= len`).
    pub fn drop_top(&mut self, n: usize) {
        let keep = self.entries.len().saturating_sub(n);
        while self.entries.len() > keep {
            if let Some(entry) = self.entries.pop() {
                entry.release();
            }
        }
    }

    /// Release every entry, topmost first.
    pub fn drop_all(&mut self) {
        self.drop_top(self.entries.len());
    }

    /// Take the topmost resource out of the stack without releasing it.
    ///
    /// Fails with `InvalidArgument` if the stack is empty or if the top entry
    /// does not hold a `T`; the stack is left untouched in that case.
    pub fn pop<T: Any>(&mut self) -> Result<T> {
        let top = self
            .entries
            .last()
            .ok_or_else(|| Error::invalid("pop from an empty checkpoint stack"))?;
        if !top.resource.is::<T>() {
            return Err(Error::invalid(format!(
                "top of checkpoint stack is {}, not {}",
                top.type_name,
                type_name::<T>()
            )));
        }
        let entry = self
            .entries
            .pop()
            .ok_or_else(|| Error::invalid("pop from an empty checkpoint stack"))?;
        entry
            .resource
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| Error::invalid("checkpoint entry changed type"))
    }

    /// Describe entry `j`, counted from the top (0 is the topmost).
    pub fn peek(&self, j: usize) -> Option<EntryInfo> {
        let index = self.position_from_top(j)?;
        let entry = &self.entries[index];
        Some(EntryInfo {
            type_name: entry.type_name,
            has_destructor: entry.destructor.is_some(),
        })
    }

    /// Exchange entries `j1` and `j2`, both counted from the top.
    pub fn swap(&mut self, j1: usize, j2: usize) -> Result<()> {
        let len = self.entries.len();
        let a = self
            .position_from_top(j1)
            .ok_or(Error::OutOfRange { index: j1, len })?;
        let b = self
            .position_from_top(j2)
            .ok_or(Error::OutOfRange { index: j2, len })?;
        self.entries.swap(a, b);
        Ok(())
    }

    /// Take the topmost resource out as the result of the construction and
    /// release every scratch resource below it, topmost first.
    pub fn commit<T: Any>(&mut self) -> Result<T> {
        let result = self.pop::<T>()?;
        self.drop_all();
        Ok(result)
    }

    pub fn get<T: Any>(&self, checkpoint: &Checkpoint<T>) -> Result<&T> {
        let index = self.index_of(checkpoint.id)?;
        self.entries[index]
            .resource
            .downcast_ref::<T>()
            .ok_or_else(|| Error::invalid("checkpoint type mismatch"))
    }

    pub fn get_mut<T: Any>(&mut self, checkpoint: &Checkpoint<T>) -> Result<&mut T> {
        let index = self.index_of(checkpoint.id)?;
        self.entries[index]
            .resource
            .downcast_mut::<T>()
            .ok_or_else(|| Error::invalid("checkpoint type mismatch"))
    }

    /// Borrow two distinct resources mutably at the same time.
    pub fn get_pair_mut<A: Any, B: Any>(
        &mut self,
        a: &Checkpoint<A>,
        b: &Checkpoint<B>,
    ) -> Result<(&mut A, &mut B)> {
        let ia = self.index_of(a.id)?;
        let ib = self.index_of(b.id)?;
        if ia == ib {
            return Err(Error::invalid("the same checkpoint was requested twice"));
        }
        let (first, second) = if ia < ib {
            let (lo, hi) = self.entries.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.entries.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        };
        let ra = first
            .resource
            .downcast_mut::<A>()
            .ok_or_else(|| Error::invalid("checkpoint type mismatch"))?;
        let rb = second
            .resource
            .downcast_mut::<B>()
            .ok_or_else(|| Error::invalid("checkpoint type mismatch"))?;
        Ok((ra, rb))
    }

    fn position_from_top(&self, j: usize) -> Option<usize> {
        let len = self.entries.len();
        (j < len).then(|| len - 1 - j)
    }

    fn index_of(&self, id: u64) -> Result<usize> {
        self.entries
            .iter()
            .rposition(|e| e.id == id)
            .ok_or_else(|| Error::invalid(format!("checkpoint {id} is no longer on the stack")))
    }
}

impl Drop for CheckpointStack {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("unwinding {} checkpoint(s)", self.entries.len());
        }
        self.drop_all();
    }
}

impl fmt::Debug for CheckpointStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().rev().map(|e| e.type_name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce(u32)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let handle = log.clone();
        let make = move |name: &'static str| {
            let log = handle.clone();
            Box::new(move |_: u32| log.borrow_mut().push(name)) as Box<dyn FnOnce(u32)>
        };
        (log, make)
    }

    #[test]
    fn drop_runs_destructors_in_reverse_order() {
        let (log, make) = recorder();
        {
            let mut stack = CheckpointStack::new();
            stack.push(1u32, make("first")).expect("push");
            stack.push(2u32, make("second")).expect("push");
            stack.push(3u32, make("third")).expect("push");
            assert_eq!(stack.len(), 3);
        }
        assert_eq!(*log.borrow(), vec!["third", "second", "first"]);
    }

    #[test]
    fn drop_top_is_bounded_by_len() {
        let (log, make) = recorder();
        let mut stack = CheckpointStack::new();
        stack.push(1u32, make("a")).expect("push");
        stack.push(2u32, make("b")).expect("push");
        stack.drop_top(1);
        assert_eq!(*log.borrow(), vec!["b"]);
        stack.drop_top(10);
        assert!(stack.is_empty());
        assert_eq!(*log.borrow(), vec!["b", "a"]);
    }

    #[test]
    fn pop_transfers_ownership_without_destructor() {
        let (log, make) = recorder();
        let mut stack = CheckpointStack::new();
        stack.push(7u32, make("seven")).expect("push");
        assert!(stack.pop::<String>().is_err());
        assert_eq!(stack.pop::<u32>().expect("pop"), 7);
        assert!(log.borrow().is_empty());
        assert!(matches!(stack.pop::<u32>(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn swap_peek_and_dump() {
        let mut stack = CheckpointStack::new();
        stack.push_owned(1u8).expect("push");
        stack.push_owned(String::from("s")).expect("push");
        stack.push_owned(3.0f64).expect("push");
        assert_eq!(stack.peek(0).map(|e| e.type_name), Some("f64"));
        stack.swap(0, 2).expect("swap");
        assert_eq!(stack.peek(0).map(|e| e.type_name), Some("u8"));
        assert_eq!(stack.peek(2).map(|e| e.type_name), Some("f64"));
        assert!(stack.peek(3).is_none());
        assert!(matches!(stack.swap(0, 3), Err(Error::OutOfRange { .. })));
        let dump = format!("{stack:?}");
        assert!(dump.starts_with("[\"u8\""), "dump={dump}");
    }

    #[test]
    fn commit_keeps_top_and_releases_the_rest() {
        let (log, make) = recorder();
        let mut stack = CheckpointStack::new();
        stack.push(10u32, make("scratch-1")).expect("push");
        stack.push(20u32, make("scratch-2")).expect("push");
        stack.push(30u32, make("result")).expect("push");
        assert!(stack.commit::<String>().is_err());
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.commit::<u32>().expect("commit"), 30);
        assert!(stack.is_empty());
        assert_eq!(*log.borrow(), vec!["scratch-2", "scratch-1"]);
    }

    #[test]
    fn handles_resolve_after_swaps() {
        let mut stack = CheckpointStack::new();
        let a = stack.push_owned(vec![1u32, 2]).expect("push");
        let b = stack.push_owned(String::from("x")).expect("push");
        stack.swap(0, 1).expect("swap");
        {
            let (va, sb) = stack.get_pair_mut(&a, &b).expect("pair");
            va.push(3);
            sb.push('y');
        }
        assert_eq!(stack.get(&a).expect("a"), &vec![1, 2, 3]);
        assert_eq!(stack.get(&b).expect("b"), "xy");
        assert!(stack.get_pair_mut(&a, &a).is_err());
        stack.drop_top(1);
        assert!(stack.get(&a).is_err());
    }

    #[test]
    fn push_buffer_charges_the_budget_until_released() {
        let budget = AllocBudget::unlimited();
        let mut stack = CheckpointStack::new();
        let buf = stack.push_buffer::<u16>(&budget, 8).expect("buffer");
        assert_eq!(stack.get(&buf).expect("buf").len(), 8);
        assert_eq!(budget.in_use(), 16);
        drop(stack);
        assert_eq!(budget.in_use(), 0);
    }
}
