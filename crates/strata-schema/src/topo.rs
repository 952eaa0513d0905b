use crate::name::Name;
use crate::{Error, Result};
use indexmap::{IndexMap, IndexSet};

/// A dependency graph over named items with a deterministic topological
/// sort: among ready nodes, insertion order wins.
///
/// Dependencies naming nodes outside the graph are ignored; only edges
/// between registered nodes constrain the order.
pub struct DepGraph<T> {
    nodes: IndexMap<Name, Node<T>>,
}

struct Node<T> {
    item: T,
    deps: IndexSet<Name>,
}

impl<T> DepGraph<T> {
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn add(&mut self, name: Name, item: T, deps: impl IntoIterator<Item = Name>) {
        self.nodes.insert(
            name,
            Node {
                item,
                deps: deps.into_iter().collect(),
            },
        );
    }

    /// Sorts dependencies-first. Fails if the graph has a cycle, naming
    /// one of its members.
    pub fn sort(mut self) -> Result<Vec<T>> {
        let mut done: IndexSet<Name> = IndexSet::new();
        let mut result = Vec::with_capacity(self.nodes.len());

        while !self.nodes.is_empty() {
            let ready = self.nodes.iter().position(|(_, node)| {
                node.deps
                    .iter()
                    .all(|dep| done.contains(dep) || !self.nodes.contains_key(dep))
            });

            match ready {
                Some(pos) => {
                    let (name, node) = self.nodes.shift_remove_index(pos).unwrap();
                    done.insert(name);
                    result.push(node.item);
                }
                None => {
                    let (name, _) = self.nodes.first().unwrap();
                    return Err(Error::internal(format!(
                        "dependency cycle detected involving '{name}'"
                    )));
                }
            }
        }

        Ok(result)
    }
}

impl<T> Default for DepGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> Name {
        Name::new("m", s)
    }

    #[test]
    fn sorts_dependencies_first() {
        let mut g = DepGraph::new();
        g.add(n("c"), "c", [n("b")]);
        g.add(n("b"), "b", [n("a")]);
        g.add(n("a"), "a", []);
        assert_eq!(g.sort().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn stable_for_independent_nodes() {
        let mut g = DepGraph::new();
        g.add(n("z"), "z", []);
        g.add(n("a"), "a", []);
        assert_eq!(g.sort().unwrap(), vec!["z", "a"]);
    }

    #[test]
    fn ignores_external_deps() {
        let mut g = DepGraph::new();
        g.add(n("a"), "a", [n("outside")]);
        assert_eq!(g.sort().unwrap(), vec!["a"]);
    }

    #[test]
    fn detects_cycles() {
        let mut g = DepGraph::new();
        g.add(n("a"), "a", [n("b")]);
        g.add(n("b"), "b", [n("a")]);
        assert!(g.sort().is_err());
    }
}
