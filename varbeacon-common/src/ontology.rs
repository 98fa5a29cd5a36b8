//! OBO-backed phenotype ontology
//!
//! Reads the `[Term]` stanzas of an OBO file (e.g. `hp.obo`) into an `is_a`
//! graph with one edge from each term to each of its parents. A term's depth
//! is its shortest distance to a root, a term without parents. Obsolete terms
//! are skipped and `alt_id`s resolve to their primary term.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;
use tracing::{info, warn};

use crate::engine::ports::{OntologyError, OntologyLookup};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct TermStanza {
    id: Option<String>,
    parents: Vec<String>,
    alt_ids: Vec<String>,
    obsolete: bool,
}

/// `is_a` graph; edges point from child to parent
pub type TermGraph = DiGraph<String, ()>;

#[derive(Debug, Clone, Default)]
pub struct OboOntology {
    graph: TermGraph,
    node_index: HashMap<String, NodeIndex>,
    alt_ids: HashMap<String, String>,
    depths: HashMap<NodeIndex, usize>,
    /// Terms on an `is_a` cycle
    cyclic: HashSet<NodeIndex>,
}

/// Value of an OBO tag line, without trailing `! comment` or `{modifiers}`
fn tag_value(value: &str) -> &str {
    value
        .split(['!', '{'])
        .next()
        .unwrap_or_default()
        .trim()
}

fn parse_stanzas(text: &str) -> Result<Vec<TermStanza>> {
    let mut stanzas = Vec::new();
    let mut current: Option<TermStanza> = None;

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') {
            continue;
        }
        if line.starts_with('[') {
            stanzas.extend(current.take());
            if line == "[Term]" {
                current = Some(TermStanza::default());
            }
            continue;
        }
        // Header tags and non-term stanzas
        let Some(stanza) = current.as_mut() else {
            continue;
        };
        let Some((tag, value)) = line.split_once(':') else {
            return Err(Error::Ontology(format!(
                "line {}: expected 'tag: value', found '{}'",
                number + 1,
                line
            )));
        };
        let value = tag_value(value);
        match tag.trim() {
            "id" => stanza.id = Some(value.to_string()),
            "is_a" => stanza.parents.push(value.to_string()),
            "alt_id" => stanza.alt_ids.push(value.to_string()),
            "is_obsolete" => stanza.obsolete = value == "true",
            _ => {}
        }
    }
    stanzas.extend(current.take());
    Ok(stanzas)
}

impl OboOntology {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ontology = Self::parse(&text)?;
        info!(
            path = %path.display(),
            terms = ontology.len(),
            relations = ontology.graph.edge_count(),
            "Loaded phenotype ontology"
        );
        Ok(ontology)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut ontology = OboOntology::default();
        let mut parents = Vec::new();

        for stanza in parse_stanzas(text)? {
            let Some(id) = stanza.id else {
                return Err(Error::Ontology("term stanza without id".to_string()));
            };
            if stanza.obsolete {
                continue;
            }
            for alt_id in stanza.alt_ids {
                ontology.alt_ids.insert(alt_id, id.clone());
            }
            let node = ontology.ensure_node(&id);
            parents.push((node, stanza.parents));
        }
        if ontology.graph.node_count() == 0 {
            return Err(Error::Ontology("no terms found".to_string()));
        }

        // Parents outside the file (or obsolete) are dropped
        for (child, ids) in parents {
            for parent in ids.iter().filter_map(|id| ontology.node_index.get(id).copied()) {
                ontology.graph.update_edge(child, parent, ());
            }
        }

        ontology.find_cycles();
        ontology.compute_depths();
        Ok(ontology)
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.node_index.insert(id.to_string(), idx);
        idx
    }

    fn find_cycles(&mut self) {
        for component in tarjan_scc(&self.graph) {
            let self_loop = component.len() == 1
                && self.graph.find_edge(component[0], component[0]).is_some();
            if component.len() > 1 || self_loop {
                self.cyclic.extend(component);
            }
        }
        if !self.cyclic.is_empty() {
            warn!(terms = self.cyclic.len(), "Ontology contains is_a cycles");
        }
    }

    /// Shortest distance from any root, breadth-first from the roots down to children
    fn compute_depths(&mut self) {
        let mut queue: VecDeque<(NodeIndex, usize)> = self
            .graph
            .node_indices()
            .filter(|&node| {
                self.graph
                    .neighbors_directed(node, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|root| (root, 0))
            .collect();

        while let Some((node, depth)) = queue.pop_front() {
            if self.depths.contains_key(&node) {
                continue;
            }
            self.depths.insert(node, depth);
            for child in self.graph.neighbors_directed(node, Direction::Incoming) {
                if !self.depths.contains_key(&child) {
                    queue.push_back((child, depth + 1));
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn index(&self, term: &str) -> Option<NodeIndex> {
        self.node_index
            .get(term)
            .or_else(|| self.alt_ids.get(term).and_then(|id| self.node_index.get(id)))
            .copied()
    }

    /// Primary id of a term or of one of its alternative ids
    pub fn resolve(&self, term: &str) -> Option<&str> {
        self.index(term).map(|node| self.graph[node].as_str())
    }

    pub fn depth(&self, term: &str) -> Option<usize> {
        self.index(term).and_then(|node| self.depths.get(&node).copied())
    }
}

impl OntologyLookup for OboOntology {
    fn ancestors_at_depth(
        &self,
        term: &str,
        depth: usize,
    ) -> std::result::Result<BTreeSet<String>, OntologyError> {
        let node = self
            .index(term)
            .ok_or_else(|| OntologyError::UnknownTerm(term.to_string()))?;
        let malformed = |reason: &str| OntologyError::Malformed {
            term: self.graph[node].clone(),
            reason: reason.to_string(),
        };
        if self.cyclic.contains(&node) {
            return Err(malformed("part of an is_a cycle"));
        }
        let term_depth = self
            .depths
            .get(&node)
            .ok_or_else(|| malformed("not reachable from a root"))?;
        if *term_depth <= depth {
            return Ok(BTreeSet::new());
        }

        // Every ancestor, not only those on shortest paths
        let mut found = BTreeSet::new();
        let mut dfs = Dfs::new(&self.graph, node);
        while let Some(ancestor) = dfs.next(&self.graph) {
            if ancestor != node && self.depths.get(&ancestor) == Some(&depth) {
                found.insert(self.graph[ancestor].clone());
            }
        }
        Ok(found)
    }
}

/// Stand-in used when no ontology file is configured; every lookup degrades
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableOntology;

impl OntologyLookup for UnavailableOntology {
    fn ancestors_at_depth(
        &self,
        _term: &str,
        _depth: usize,
    ) -> std::result::Result<BTreeSet<String>, OntologyError> {
        Err(OntologyError::Unavailable)
    }
}
