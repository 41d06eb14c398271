//! Depth-first and breadth-first walks over a DAG.
//!
//! A [`Traversal`] is a step machine. Each call to [`Traversal::step`] either
//! yields the next node, asks the caller to fetch a node it has no copy of,
//! or reports that the walk is over. The caller chooses how to fetch: drive
//! the walk through a [`Resolver`] with [`Traversal::next_with`], seed it
//! from a fully resolved graph and use it as an [`Iterator`], or answer
//! [`Step::NeedsFetch`] by hand with [`Traversal::supply`].
//!
//! # Invariants
//!
//! - Each node identity (its digest) is visited at most once, so cycles and
//!   shared substructure terminate.
//! - When a node is visited through several links, the first queued
//!   occurrence wins.
//! - In post-order a node's visitor runs after every child it actually
//!   visited; children skipped as duplicates count as done.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use mdag_types::Multihash;
use tracing::debug;

use crate::error::{DagError, DagResult};
use crate::node::Node;
use crate::resolved::ResolvedDag;

/// Fetches nodes that a traversal has no local copy of.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Fetch the node stored under `digest`.
    async fn resolve(&self, digest: &Multihash) -> DagResult<Node>;
}

/// Visiting order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    /// Children are visited before later siblings of their parent.
    #[default]
    DepthFirst,
    /// Nodes are visited level by level.
    BreadthFirst,
}

/// When the visitor runs relative to a node's children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Action {
    /// As soon as the node is reached.
    #[default]
    Pre,
    /// Once the node and all of its visited children are done.
    Post,
}

/// Where the visitor is in the walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitContext {
    /// Identity of the node being visited.
    pub digest: Multihash,
    /// Distance from the root; the root is at depth 0.
    pub depth: usize,
}

/// An operation applied to nodes during a traversal.
pub trait Visitor {
    fn visit(&mut self, node: &Node, ctx: &VisitContext);
}

impl<F> Visitor for F
where
    F: FnMut(&Node, &VisitContext),
{
    fn visit(&mut self, node: &Node, ctx: &VisitContext) {
        self(node, ctx)
    }
}

/// Visitor that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoVisitor;

impl Visitor for NoVisitor {
    fn visit(&mut self, _node: &Node, _ctx: &VisitContext) {}
}

/// A node reached by the traversal.
#[derive(Clone, Debug)]
pub struct Visit {
    pub node: Arc<Node>,
    pub digest: Multihash,
    pub depth: usize,
}

/// Outcome of one [`Traversal::step`].
#[derive(Clone, Debug)]
pub enum Step {
    /// The next node in order.
    Ready(Visit),
    /// The walk needs the node stored under this digest. Hand it over with
    /// [`Traversal::supply`] and step again.
    NeedsFetch(Multihash),
    /// Every reachable node has been visited.
    Done,
}

/// One queued or visited occurrence of a node.
#[derive(Debug)]
struct Slot {
    /// Index into the arena.
    node: usize,
    identity: Multihash,
    depth: usize,
    parent: Option<usize>,
    /// Children not yet completed (post-order bookkeeping).
    remaining: usize,
    expanded: bool,
}

/// Child gathering for the current node, resumable across fetches.
#[derive(Debug)]
struct Expansion {
    slot: usize,
    next_link: usize,
    children: Vec<usize>,
}

/// A walk over the DAG below a root node.
pub struct Traversal<V = NoVisitor> {
    arena: ResolvedDag,
    slots: Vec<Slot>,
    pending: VecDeque<usize>,
    seen: HashSet<Multihash>,
    current: Option<usize>,
    expansion: Option<Expansion>,
    order: Order,
    action: Action,
    visitor: Option<V>,
    failed: bool,
}

impl Traversal<NoVisitor> {
    /// Walk from `root`. Children are fetched on demand.
    pub fn new(root: Node, order: Order) -> Self {
        let mut arena = ResolvedDag::new();
        arena.insert_node(root);
        Self::over(arena, order)
    }

    /// Walk a resolved graph from its root. No fetches are needed for
    /// nodes already in `dag`.
    pub fn from_resolved(dag: ResolvedDag, order: Order) -> DagResult<Self> {
        if dag.is_empty() {
            return Err(DagError::EmptyGraph);
        }
        Ok(Self::over(dag, order))
    }

    fn over(arena: ResolvedDag, order: Order) -> Self {
        let key_algorithm = arena.digest_at(0).algorithm();
        let root = Slot {
            node: 0,
            identity: arena.shared(0).digest_with(key_algorithm),
            depth: 0,
            parent: None,
            remaining: 0,
            expanded: false,
        };
        Self {
            arena,
            slots: vec![root],
            pending: VecDeque::from([0]),
            seen: HashSet::new(),
            current: None,
            expansion: None,
            order,
            action: Action::Pre,
            visitor: None,
            failed: false,
        }
    }
}

impl<V: Visitor> Traversal<V> {
    /// Run `visitor` on every visited node, before or after its children.
    ///
    /// Must be called before the first step.
    pub fn with_visitor<W: Visitor>(self, action: Action, visitor: W) -> Traversal<W> {
        Traversal {
            arena: self.arena,
            slots: self.slots,
            pending: self.pending,
            seen: self.seen,
            current: self.current,
            expansion: self.expansion,
            order: self.order,
            action,
            visitor: Some(visitor),
            failed: self.failed,
        }
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// Depth of the node most recently reached, or 0 before the first step.
    pub fn current_depth(&self) -> usize {
        self.current.map_or(0, |slot| self.slots[slot].depth)
    }

    /// Number of distinct nodes reached so far.
    pub fn visited_count(&self) -> usize {
        self.seen.len()
    }

    pub fn visitor(&self) -> Option<&V> {
        self.visitor.as_ref()
    }

    pub fn into_visitor(self) -> Option<V> {
        self.visitor
    }

    /// The nodes known to the traversal, including every fetched one.
    pub fn into_resolved(self) -> ResolvedDag {
        self.arena
    }

    /// Provide the node stored under `digest`.
    pub fn supply(&mut self, digest: Multihash, node: Node) {
        self.arena.insert(digest, node);
    }

    /// Advance the walk by one node.
    pub fn step(&mut self) -> Step {
        loop {
            if let Some(mut expansion) = self.expansion.take() {
                if let Some(digest) = self.expand(&mut expansion) {
                    self.expansion = Some(expansion);
                    debug!(digest = %digest.short_hex(), depth = self.current_depth() + 1, "traversal needs fetch");
                    return Step::NeedsFetch(digest);
                }
                return Step::Ready(self.finish(expansion));
            }
            let Some(slot) = self.pending.pop_front() else {
                return Step::Done;
            };
            self.begin(slot);
        }
    }

    /// Advance the walk, fetching unresolved nodes through `resolver`.
    ///
    /// Without a resolver, reaching an unresolved link fails with
    /// [`DagError::MissingResolver`].
    pub async fn next_with(&mut self, resolver: Option<&dyn Resolver>) -> DagResult<Option<Visit>> {
        loop {
            match self.step() {
                Step::Ready(visit) => return Ok(Some(visit)),
                Step::Done => return Ok(None),
                Step::NeedsFetch(digest) => {
                    let resolver = resolver.ok_or_else(|| DagError::MissingResolver(digest.clone()))?;
                    let node = resolver.resolve(&digest).await?;
                    self.supply(digest, node);
                }
            }
        }
    }

    /// Walk to the end, returning every visit in order.
    pub async fn run(&mut self, resolver: Option<&dyn Resolver>) -> DagResult<Vec<Visit>> {
        let mut visits = Vec::new();
        while let Some(visit) = self.next_with(resolver).await? {
            visits.push(visit);
        }
        Ok(visits)
    }

    fn begin(&mut self, slot: usize) {
        self.current = Some(slot);
        self.seen.insert(self.slots[slot].identity.clone());
        self.slots[slot].remaining = self.arena.shared(self.slots[slot].node).links().len();
        if self.action == Action::Pre {
            self.apply(slot);
        }
        self.expansion = Some(Expansion {
            slot,
            next_link: 0,
            children: Vec::new(),
        });
    }

    /// Queue a slot for every link of the expanding node. Returns the digest
    /// of the first link target missing from the arena.
    fn expand(&mut self, expansion: &mut Expansion) -> Option<Multihash> {
        let node = Arc::clone(self.arena.shared(self.slots[expansion.slot].node));
        let depth = self.slots[expansion.slot].depth + 1;
        while let Some(link) = node.links().get(expansion.next_link) {
            let target = match self.arena.slot_of(link.digest()) {
                Some(target) => target,
                None => return Some(link.digest().clone()),
            };
            let identity = self.arena.shared(target).digest_with(link.digest().algorithm());
            expansion.children.push(self.slots.len());
            self.slots.push(Slot {
                node: target,
                identity,
                depth,
                parent: Some(expansion.slot),
                remaining: 0,
                expanded: false,
            });
            expansion.next_link += 1;
        }
        None
    }

    fn finish(&mut self, expansion: Expansion) -> Visit {
        let slot = expansion.slot;
        match self.order {
            Order::DepthFirst => {
                for &child in expansion.children.iter().rev() {
                    self.pending.push_front(child);
                }
            }
            Order::BreadthFirst => {
                self.pending.extend(expansion.children);
                let slots = &self.slots;
                self.pending.make_contiguous().sort_by_key(|&s| slots[s].depth);
            }
        }
        self.drop_duplicates();

        self.slots[slot].expanded = true;
        if self.action == Action::Post && self.slots[slot].remaining == 0 {
            self.complete(slot);
        }

        let entry = &self.slots[slot];
        Visit {
            node: Arc::clone(self.arena.shared(entry.node)),
            digest: entry.identity.clone(),
            depth: entry.depth,
        }
    }

    /// Keep only the first pending occurrence of each identity, and nothing
    /// already visited.
    fn drop_duplicates(&mut self) {
        let slots = &self.slots;
        let seen = &self.seen;
        let mut queued = HashSet::new();
        let mut dropped = Vec::new();
        self.pending.retain(|&s| {
            let identity = &slots[s].identity;
            let keep = !seen.contains(identity) && queued.insert(identity.clone());
            if !keep {
                dropped.push(s);
            }
            keep
        });
        for slot in dropped {
            if let Some(parent) = self.slots[slot].parent {
                self.release(parent);
            }
        }
    }

    /// Count one child of `slot` as done without visiting it.
    fn release(&mut self, slot: usize) {
        let entry = &mut self.slots[slot];
        entry.remaining = entry.remaining.saturating_sub(1);
        if self.action == Action::Post && entry.remaining == 0 && entry.expanded {
            self.complete(slot);
        }
    }

    /// Run the post-order visitor on `slot`, then on each ancestor whose
    /// children are now all done.
    fn complete(&mut self, slot: usize) {
        let mut next = Some(slot);
        while let Some(slot) = next.take() {
            self.apply(slot);
            if let Some(parent) = self.slots[slot].parent {
                let entry = &mut self.slots[parent];
                entry.remaining = entry.remaining.saturating_sub(1);
                if entry.remaining == 0 && entry.expanded {
                    next = Some(parent);
                }
            }
        }
    }

    fn apply(&mut self, slot: usize) {
        if let Some(visitor) = self.visitor.as_mut() {
            let entry = &self.slots[slot];
            let ctx = VisitContext {
                digest: entry.identity.clone(),
                depth: entry.depth,
            };
            visitor.visit(self.arena.shared(entry.node), &ctx);
        }
    }
}

impl<V: Visitor> Iterator for Traversal<V> {
    type Item = DagResult<Visit>;

    /// Steps without a resolver: an unresolved link yields
    /// [`DagError::MissingResolver`] and ends the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.step() {
            Step::Ready(visit) => Some(Ok(visit)),
            Step::Done => None,
            Step::NeedsFetch(digest) => {
                self.failed = true;
                Some(Err(DagError::MissingResolver(digest)))
            }
        }
    }
}

impl<V> std::fmt::Debug for Traversal<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Traversal")
            .field("order", &self.order)
            .field("action", &self.action)
            .field("visited", &self.seen.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
