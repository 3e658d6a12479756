//! Chain graph: links between a partial chain and its one-step extension.
//!
//! A chain of `n + 1` segments is represented by a link of level `n` whose
//! left child is the chain without its last segment and whose right child is
//! the chain without its first segment. Level-1 links join two segments.

use segchain_core::{AllocBudget, BudgetVec, Error, Result, SlabPool, SlotId};

/// Items per slab pool block.
const LINKS_PER_BLOCK: usize = 20;

/// Child of a chain link: a bare segment or a shorter chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Node {
    Segment(usize),
    Link(SlotId),
}

#[derive(Debug)]
pub(crate) struct ChainLink {
    /// Chain length minus one.
    pub level: usize,
    /// Number of links having this one as a child.
    pub parents: usize,
    /// Most recent link having this one as left child.
    pub first_link: Option<SlotId>,
    /// Next link in the global list (non-increasing levels).
    pub next: Option<SlotId>,
    /// Next link sharing the same left child.
    pub next_sibling: Option<SlotId>,
    pub left: Node,
    pub right: Node,
    /// First segment of the chain.
    pub first: usize,
    /// Last segment of the chain.
    pub last: usize,
    /// Reported as a chain by the selection pass.
    pub selected: bool,
}

/// Graph bookkeeping of a bare segment.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SegmentNode {
    pub parents: usize,
    pub first_link: Option<SlotId>,
}

/// Slab of chain links plus the head of the global link list.
#[derive(Debug)]
pub(crate) struct LinkArena {
    pub pool: SlabPool<ChainLink>,
    pub head: Option<SlotId>,
}

impl LinkArena {
    pub fn new(budget: &AllocBudget) -> Result<Self> {
        Ok(Self {
            pool: SlabPool::with_budget(LINKS_PER_BLOCK, budget)?,
            head: None,
        })
    }

    pub fn link(&self, id: SlotId) -> Result<&ChainLink> {
        self.pool
            .get(id)
            .ok_or_else(|| Error::invalid(format!("dangling chain link {id:?}")))
    }

    pub fn link_mut(&mut self, id: SlotId) -> Result<&mut ChainLink> {
        self.pool
            .get_mut(id)
            .ok_or_else(|| Error::invalid(format!("dangling chain link {id:?}")))
    }

    /// Segments of the chain topped by `node`, from left to right.
    pub fn collect_chain(&self, node: Node, out: &mut BudgetVec<usize>) -> Result<()> {
        let mut node = node;
        while let Node::Link(id) = node {
            let link = self.link(id)?;
            out.push(link.first)?;
            node = link.right;
        }
        if let Node::Segment(j) = node {
            out.push(j)?;
        }
        Ok(())
    }

    /// Iterate the global list from `start`, following `next`.
    pub fn iter_from(&self, start: Option<SlotId>) -> impl Iterator<Item = (SlotId, &ChainLink)> {
        let mut cursor = start;
        std::iter::from_fn(move || {
            let id = cursor?;
            let link = self.pool.get(id)?;
            cursor = link.next;
            Some((id, link))
        })
    }

    /// Iterate the links whose left child is the node owning `first_link`.
    pub fn siblings(
        &self,
        first_link: Option<SlotId>,
    ) -> impl Iterator<Item = (SlotId, &ChainLink)> {
        let mut cursor = first_link;
        std::iter::from_fn(move || {
            let id = cursor?;
            let link = self.pool.get(id)?;
            cursor = link.next_sibling;
            Some((id, link))
        })
    }
}

/// Per-segment bookkeeping, abscissa order, a scratch member list and the
/// segments already claimed by a selected chain.
#[derive(Debug)]
pub(crate) struct SegmentIndex {
    pub nodes: BudgetVec<SegmentNode>,
    pub order: BudgetVec<usize>,
    pub scratch: BudgetVec<usize>,
    pub claimed: BudgetVec<bool>,
}

impl SegmentIndex {
    pub fn new(budget: &AllocBudget, nsegments: usize) -> Result<Self> {
        let nodes = BudgetVec::filled(budget, nsegments, SegmentNode::default())?;
        let mut order = BudgetVec::with_capacity(budget, nsegments)?;
        order.try_extend(0..nsegments)?;
        let scratch = BudgetVec::with_capacity(budget, nsegments)?;
        let claimed = BudgetVec::filled(budget, nsegments, false)?;
        Ok(Self {
            nodes,
            order,
            scratch,
            claimed,
        })
    }
}

/// Mutable view on the whole graph while links are being created.
pub(crate) struct Graph<'w> {
    pub arena: &'w mut LinkArena,
    pub index: &'w mut SegmentIndex,
}

impl Graph<'_> {
    pub fn level(&self, node: Node) -> Result<usize> {
        match node {
            Node::Segment(_) => Ok(0),
            Node::Link(id) => Ok(self.arena.link(id)?.level),
        }
    }

    pub fn first_link(&self, node: Node) -> Result<Option<SlotId>> {
        match node {
            Node::Segment(j) => Ok(self.index.nodes[j].first_link),
            Node::Link(id) => Ok(self.arena.link(id)?.first_link),
        }
    }

    fn endpoints(&self, node: Node) -> Result<(usize, usize)> {
        match node {
            Node::Segment(j) => Ok((j, j)),
            Node::Link(id) => {
                let link = self.arena.link(id)?;
                Ok((link.first, link.last))
            }
        }
    }

    fn bump_parents(&mut self, node: Node) -> Result<()> {
        match node {
            Node::Segment(j) => self.index.nodes[j].parents += 1,
            Node::Link(id) => self.arena.link_mut(id)?.parents += 1,
        }
        Ok(())
    }

    /// Record that `right` extends `left` by one segment.
    ///
    /// The new link is prepended to the global list, so the list stays
    /// sorted by non-increasing level, and becomes the head of the sibling
    /// list of `left`.
    pub fn insert(&mut self, left: Node, right: Node) -> Result<SlotId> {
        let level = self.level(left)? + 1;
        debug_assert_eq!(self.level(right)?, level - 1);
        let (first, _) = self.endpoints(left)?;
        let (_, last) = self.endpoints(right)?;
        let next_sibling = self.first_link(left)?;
        let id = self.arena.pool.new_item(ChainLink {
            level,
            parents: 0,
            first_link: None,
            next: self.arena.head,
            next_sibling,
            left,
            right,
            first,
            last,
            selected: false,
        })?;
        self.arena.head = Some(id);
        match left {
            Node::Segment(j) => self.index.nodes[j].first_link = Some(id),
            Node::Link(lid) => self.arena.link_mut(lid)?.first_link = Some(id),
        }
        self.bump_parents(left)?;
        self.bump_parents(right)?;
        Ok(id)
    }
}
