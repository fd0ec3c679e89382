//! An undirected adjacency-map graph, keyed by vertex *value* rather than
//! object identity (spec.md §9: "model it as an adjacency map keyed by
//! vertex identity (locations compare by value), not by object pointer").
//! Used for the interference graph over [`super::x86::Location`]s.

use crate::common::{Map, Set};

#[derive(Debug, Clone, Default)]
pub struct UndirectedAdjList<T: Ord + Clone> {
    adj: Map<T, Set<T>>,
}

impl<T: Ord + Clone> UndirectedAdjList<T> {
    pub fn new() -> Self {
        UndirectedAdjList { adj: Map::new() }
    }

    pub fn add_vertex(&mut self, v: T) {
        self.adj.entry(v).or_default();
    }

    pub fn add_edge(&mut self, u: T, v: T) {
        if u == v {
            return;
        }
        self.adj.entry(u.clone()).or_default().insert(v.clone());
        self.adj.entry(v).or_default().insert(u);
    }

    pub fn neighbors(&self, v: &T) -> Set<T> {
        self.adj.get(v).cloned().unwrap_or_default()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &T> {
        self.adj.keys()
    }

    pub fn contains(&self, v: &T) -> bool {
        self.adj.contains_key(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_undirected_and_deduplicated() {
        let mut g: UndirectedAdjList<i32> = UndirectedAdjList::new();
        g.add_edge(1, 2);
        g.add_edge(2, 1);
        assert_eq!(g.neighbors(&1).len(), 1);
        assert_eq!(g.neighbors(&2).len(), 1);
    }

    #[test]
    fn self_edges_are_ignored() {
        let mut g: UndirectedAdjList<i32> = UndirectedAdjList::new();
        g.add_edge(1, 1);
        assert!(g.neighbors(&1).is_empty());
    }
}
