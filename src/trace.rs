//! Walking the graph behind a stream.
//!
//! Nodes report what they reference through a [`Visitor`]: a trigger reports
//! its input and, until it fires, its closure; an add reports both summands.
//! Memory managers for closure payloads use this to keep them alive.
//! [`Topology`] is a visitor that records the graph for inspection.

use hashbrown::HashMap;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::closure::Closure;
use crate::stream::SoundStream;

/// Receives every stream and closure a node references.
pub trait Visitor {
    fn visit_stream(&mut self, stream: &SoundStream);

    fn visit_closure(&mut self, _closure: &Closure) {}
}

/// A snapshot of the node graph reachable from a stream.
///
/// Nodes are keyed by identity, so a node shared by several streams shows up
/// once.
pub struct Topology {
    graph: DiGraph<&'static str, ()>,
    root: NodeIndex,
    closures: usize,
}

impl Topology {
    pub fn capture(stream: &SoundStream) -> Self {
        let mut builder = Builder {
            graph: DiGraph::new(),
            index: HashMap::new(),
            parent: None,
            closures: 0,
        };
        let root = builder.enter(stream);
        Topology {
            graph: builder.graph,
            root,
            closures: builder.closures,
        }
    }

    pub fn graph(&self) -> &DiGraph<&'static str, ()> {
        &self.graph
    }

    /// Name of the node the snapshot was taken from.
    pub fn root_name(&self) -> &'static str {
        self.graph[self.root]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Names of the nodes `root` reads from directly.
    pub fn inputs_of_root(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .graph
            .neighbors(self.root)
            .map(|idx| self.graph[idx])
            .collect();
        names.sort_unstable();
        names
    }

    /// Closures still held by triggers that have not fired.
    pub fn pending_closures(&self) -> usize {
        self.closures
    }
}

struct Builder {
    graph: DiGraph<&'static str, ()>,
    index: HashMap<usize, NodeIndex>,
    parent: Option<NodeIndex>,
    closures: usize,
}

impl Builder {
    fn enter(&mut self, stream: &SoundStream) -> NodeIndex {
        let id = stream.node_id();
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(stream.name());
        self.index.insert(id, idx);

        let outer = self.parent.replace(idx);
        stream.trace(self);
        self.parent = outer;
        idx
    }
}

impl Visitor for Builder {
    fn visit_stream(&mut self, stream: &SoundStream) {
        let child = self.enter(stream);
        if let Some(parent) = self.parent {
            self.graph.update_edge(parent, child, ());
        }
    }

    fn visit_closure(&mut self, _closure: &Closure) {
        self.closures += 1;
    }
}
