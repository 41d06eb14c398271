use std::collections::HashMap;
use std::sync::Arc;

use mdag_types::Multihash;

use crate::link::Link;
use crate::node::Node;

/// An arena of resolved nodes keyed by digest.
///
/// Produced by [`DagService::get_recursive`](crate::DagService::get_recursive)
/// and used as the lookup table of a [`Traversal`](crate::Traversal). Each
/// digest is stored once, in discovery order; the first entry is the root.
/// Shared substructure is represented by several links resolving to the same
/// entry.
#[derive(Clone, Debug, Default)]
pub struct ResolvedDag {
    digests: Vec<Multihash>,
    nodes: Vec<Arc<Node>>,
    index: HashMap<Multihash, usize>,
}

impl ResolvedDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an arena from nodes keyed by their own digests. The first node
    /// becomes the root.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut dag = Self::new();
        for node in nodes {
            dag.insert_node(node);
        }
        dag
    }

    /// Number of distinct nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, digest: &Multihash) -> bool {
        self.index.contains_key(digest)
    }

    /// Store `node` under `digest`. An existing entry for the digest wins.
    pub fn insert(&mut self, digest: Multihash, node: Node) -> usize {
        self.insert_shared(digest, Arc::new(node))
    }

    /// Store `node` under its own digest.
    pub fn insert_node(&mut self, node: Node) -> Multihash {
        let digest = node.digest();
        self.insert(digest.clone(), node);
        digest
    }

    pub(crate) fn insert_shared(&mut self, digest: Multihash, node: Arc<Node>) -> usize {
        if let Some(&slot) = self.index.get(&digest) {
            return slot;
        }
        let slot = self.nodes.len();
        self.index.insert(digest.clone(), slot);
        self.digests.push(digest);
        self.nodes.push(node);
        slot
    }

    /// The root node, if any.
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first().map(Arc::as_ref)
    }

    /// The digest the root was fetched under.
    pub fn root_digest(&self) -> Option<&Multihash> {
        self.digests.first()
    }

    pub fn get(&self, digest: &Multihash) -> Option<&Node> {
        self.index.get(digest).map(|&slot| self.nodes[slot].as_ref())
    }

    /// The node `link` points at, if it has been resolved.
    pub fn resolve(&self, link: &Link) -> Option<&Node> {
        self.get(link.digest())
    }

    /// Entries in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&Multihash, &Node)> {
        self.digests.iter().zip(self.nodes.iter().map(Arc::as_ref))
    }

    /// Consume into nodes in discovery order.
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes.into_iter().map(Arc::unwrap_or_clone).collect()
    }

    pub(crate) fn slot_of(&self, digest: &Multihash) -> Option<usize> {
        self.index.get(digest).copied()
    }

    pub(crate) fn shared(&self, slot: usize) -> &Arc<Node> {
        &self.nodes[slot]
    }

    pub(crate) fn digest_at(&self, slot: usize) -> &Multihash {
        &self.digests[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let a = Node::new(b"a".to_vec());
        let b = Node::new(b"b".to_vec());
        let mut dag = ResolvedDag::new();
        let digest = a.digest();
        assert_eq!(dag.insert(digest.clone(), a.clone()), 0);
        assert_eq!(dag.insert(digest.clone(), b), 0);
        assert_eq!(dag.len(), 1);
        assert_eq!(dag.get(&digest), Some(&a));
    }

    #[test]
    fn resolve_links_and_root() {
        let child = Node::new(b"child".to_vec());
        let mut root = Node::new(b"root".to_vec());
        root.add_link_to_node("c", &child);

        let dag = ResolvedDag::from_nodes([root.clone(), child.clone()]);
        assert_eq!(dag.root(), Some(&root));
        assert_eq!(dag.root_digest(), Some(&root.digest()));
        assert_eq!(dag.resolve(&root.links()[0]), Some(&child));

        let order: Vec<_> = dag.iter().map(|(d, _)| d.clone()).collect();
        assert_eq!(order, vec![root.digest(), child.digest()]);
        assert_eq!(dag.into_nodes(), vec![root, child]);
    }

    #[test]
    fn unresolved_link() {
        let dag = ResolvedDag::new();
        let link = Link::from_node(&Node::new(b"x".to_vec()));
        assert!(dag.resolve(&link).is_none());
        assert!(dag.root().is_none());
    }
}
