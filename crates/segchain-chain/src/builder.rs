//! Chain search over a segmentation.
//!
//! Segments are paired in abscissa order, pairs are extended one segment at
//! a time while the members stay on a line, and the chains that are not part
//! of a longer one are fitted and kept.

use std::sync::Arc;

use segchain_core::{
    heap_sort_by_key, AllocBudget, BudgetVec, CheckpointStack, Error, Result, SlotId,
};
use segchain_segment::{Segment, Segmentation};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::graph::{ChainLink, Graph, LinkArena, Node, SegmentIndex};
use crate::line::ShortLine;
use crate::params::{ChainParams, PairBounds};
use crate::pool::{Chain, ChainPool};
use crate::shear::fit_shears;

/// Chains under construction; becomes the [`ChainPool`] on success.
struct StagedChains {
    segmentation: Arc<Segmentation>,
    members: BudgetVec<usize>,
    chains: BudgetVec<Chain>,
}

impl StagedChains {
    fn new(
        budget: &AllocBudget,
        segmentation: Arc<Segmentation>,
        nchains: usize,
        nmembers: usize,
    ) -> Result<Self> {
        Ok(Self {
            segmentation,
            members: BudgetVec::with_capacity(budget, nmembers)?,
            chains: BudgetVec::with_capacity(budget, nchains)?,
        })
    }

    fn into_pool(self) -> ChainPool {
        ChainPool {
            segmentation: self.segmentation,
            members: self.members.into_vec(),
            chains: self.chains.into_vec(),
        }
    }
}

/// Finds chains of aligned segments.
///
/// All intermediate storage is charged to the builder's [`AllocBudget`] and
/// released before [`ChainBuilder::build`] returns, whatever the outcome.
#[derive(Clone, Debug, Default)]
pub struct ChainBuilder {
    params: ChainParams,
    budget: AllocBudget,
}

impl ChainBuilder {
    pub fn new(params: ChainParams) -> Self {
        Self {
            params,
            budget: AllocBudget::unlimited(),
        }
    }

    /// Charge the search to `budget`.
    pub fn with_budget(mut self, budget: &AllocBudget) -> Self {
        self.budget = budget.clone();
        self
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Search `segmentation` for chains.
    ///
    /// Finding no chain is not an error. A chain whose shear fit degenerates
    /// is dropped.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, segmentation),
            fields(segments = segmentation.len())
        )
    )]
    pub fn build(&self, segmentation: &Arc<Segmentation>) -> Result<ChainPool> {
        let params = self.params.clamped();
        let segments = segmentation.segments();

        let mut stack = CheckpointStack::new();
        let arena = stack.push(LinkArena::new(&self.budget)?, |mut arena: LinkArena| {
            arena.pool.destroy()
        })?;
        let index = stack.push_owned(SegmentIndex::new(&self.budget, segments.len())?)?;

        let (pairs, depth) = {
            let (arena, index) = stack.get_pair_mut(&arena, &index)?;
            heap_sort_by_key(&mut index.order[..], |&j| segments[j].xcen());
            let mut graph = Graph { arena, index };
            let pairs = link_pairs(&mut graph, segments, &params)?;
            let depth = extend_links(&mut graph, segments, &params, pairs)?;
            (pairs, depth)
        };

        let (nchains, nmembers) = {
            let (arena, index) = stack.get_pair_mut(&arena, &index)?;
            select_chains(arena, index, &params)?
        };

        let staged = stack.push_owned(StagedChains::new(
            &self.budget,
            Arc::clone(segmentation),
            nchains,
            nmembers,
        )?)?;
        {
            let (arena, staged) = stack.get_pair_mut(&arena, &staged)?;
            collect_chains(arena, staged, &params)?;
        }
        let staged = stack.commit::<StagedChains>()?;

        log::debug!(
            "{} segments: {} pairs, longest chain {}, {}/{} chains kept",
            segments.len(),
            pairs,
            depth + 1,
            staged.chains.len(),
            nchains
        );
        Ok(staged.into_pool())
    }
}

impl ChainPool {
    /// Search `segmentation` with `params` and no allocation limit.
    pub fn new(segmentation: &Arc<Segmentation>, params: &ChainParams) -> Result<Self> {
        ChainBuilder::new(params.clone()).build(segmentation)
    }
}

/// Mark the chains to report: maximal chains whose length is within
/// `[lmin, lmax]`, taken longest first, skipping any chain that shares a
/// segment with one already taken.
///
/// Returns the number of selected chains and their total member count.
fn select_chains(
    arena: &mut LinkArena,
    index: &mut SegmentIndex,
    params: &ChainParams,
) -> Result<(usize, usize)> {
    let (mut nchains, mut nmembers) = (0, 0);
    let mut cursor = arena.head;
    while let Some(id) = cursor {
        let link = arena.link(id)?;
        if link.level + 1 < params.lmin {
            break;
        }
        cursor = link.next;
        if link.parents != 0 || link.level >= params.lmax {
            continue;
        }

        index.scratch.clear();
        arena.collect_chain(Node::Link(id), &mut index.scratch)?;
        if index.scratch.iter().any(|&j| index.claimed[j]) {
            log::trace!("chain {:?} overlaps a longer one", &index.scratch[..]);
            continue;
        }
        for &j in index.scratch.iter() {
            index.claimed[j] = true;
        }
        arena.link_mut(id)?.selected = true;
        nchains += 1;
        nmembers += index.scratch.len();
    }
    Ok((nchains, nmembers))
}

/// Chains marked by [`select_chains`], longest first.
fn selected<'a>(
    arena: &'a LinkArena,
    params: &'a ChainParams,
) -> impl Iterator<Item = (SlotId, &'a ChainLink)> + 'a {
    arena
        .iter_from(arena.head)
        .take_while(|(_, link)| link.level + 1 >= params.lmin)
        .filter(|(_, link)| link.selected)
}

/// Create a level-1 link for every admissible pair of segments.
///
/// `graph.index.order` must hold the segments sorted by center abscissa.
fn link_pairs(graph: &mut Graph<'_>, segments: &[Segment], params: &ChainParams) -> Result<usize> {
    let bounds = PairBounds::new(params);
    let n = graph.index.order.len();
    let mut count = 0;
    for i0 in 0..n {
        let left = graph.index.order[i0];
        let s0 = &segments[left];
        let (x0, y0) = (s0.xcen(), s0.ycen());
        let (w0, h0) = (s0.width() as f64, s0.height() as f64);
        let (hmin, hmax) = bounds.height_range(h0);
        let reach = x0 + bounds.rmax * (h0 + hmax);

        for i1 in i0 + 1..n {
            let right = graph.index.order[i1];
            let s1 = &segments[right];
            let x1 = s1.xcen();
            if x1 >= reach {
                break;
            }
            let h1 = s1.height() as f64;
            if h1 <= hmin || h1 >= hmax {
                continue;
            }
            let dx = x1 - x0;
            if (s1.ycen() - y0).abs() > params.slope * dx.abs() {
                continue;
            }
            let w1 = s1.width() as f64;
            if dx < 1.0 + bounds.rmin * (w0 + w1) || dx > bounds.rmax * (h0 + h1) {
                continue;
            }
            // Skip `right` if it sits between `left` and an already linked
            // segment on the same line.
            let pair = [left, right];
            let line = ShortLine::new(segments, &pair);
            let skipped = graph
                .arena
                .siblings(graph.index.nodes[left].first_link)
                .any(|(_, link)| line.accepts(&pair, link.last, params));
            if skipped {
                continue;
            }
            graph.insert(Node::Segment(left), Node::Segment(right))?;
            count += 1;
        }
    }
    Ok(count)
}

/// Grow chains one segment at a time until no chain can be extended.
///
/// Returns the highest link level reached.
fn extend_links(
    graph: &mut Graph<'_>,
    segments: &[Segment],
    params: &ChainParams,
    mut count: usize,
) -> Result<usize> {
    let mut level = 0;
    while count > 0 {
        let head = graph.arena.head;
        level = match head {
            Some(id) => graph.arena.link(id)?.level,
            None => break,
        };
        count = 0;

        let mut cursor = head;
        while let Some(top) = cursor {
            let link = graph.arena.link(top)?;
            if link.level != level {
                break;
            }
            cursor = link.next;
            let mut candidate = graph.first_link(link.right)?;
            if candidate.is_none() {
                continue;
            }

            graph.index.scratch.clear();
            graph
                .arena
                .collect_chain(Node::Link(top), &mut graph.index.scratch)?;
            let line = ShortLine::new(segments, &graph.index.scratch);
            while let Some(id) = candidate {
                let next = graph.arena.link(id)?;
                let (last, next_sibling) = (next.last, next.next_sibling);
                if line.accepts(&graph.index.scratch, last, params) {
                    graph.insert(Node::Link(top), Node::Link(id))?;
                    count += 1;
                }
                candidate = next_sibling;
            }
        }
        if count > 0 {
            log::trace!("{count} chains of length {}", level + 2);
        }
    }
    Ok(level)
}

/// Materialize the selected chains and fit their shears.
fn collect_chains(
    arena: &LinkArena,
    staged: &mut StagedChains,
    params: &ChainParams,
) -> Result<()> {
    for (id, link) in selected(arena, params) {
        let start = staged.members.len();
        arena.collect_chain(Node::Link(id), &mut staged.members)?;
        let members = &staged.members[start..];
        match fit_shears(&staged.segmentation, members, params.prec) {
            Ok(fit) => staged.chains.push(Chain {
                start,
                length: link.level + 1,
                fit,
            })?,
            Err(Error::Singular) => {
                log::debug!("dropping chain {members:?}: shear fit is singular");
                staged.members.truncate(start);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
