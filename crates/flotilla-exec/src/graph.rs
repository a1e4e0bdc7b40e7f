//! Release dependency graph
//!
//! Built once per plan from the resolved release set. Construction fails on
//! duplicate identities, on dependency references that name no release in the
//! plan, and on cycles. A successfully built graph is read-only and safe to
//! share across concurrent release tasks.

use std::collections::{HashMap, HashSet};

use flotilla_core::{Release, UniqName};

use crate::error::{ExecError, Result};
use crate::waves::{Wave, WavePlan};

/// Directed dependency graph over release identities.
///
/// Edges point from a release to the releases it depends on.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// All nodes in plan declaration order
    nodes: Vec<UniqName>,
    /// release -> its dependencies, in declaration order
    edges: HashMap<UniqName, Vec<UniqName>>,
    /// dependency -> the releases depending on it
    dependents: HashMap<UniqName, Vec<UniqName>>,
}

impl DependencyGraph {
    /// Build and validate the graph for a release set.
    pub fn build(releases: &[Release]) -> Result<Self> {
        let mut nodes = Vec::with_capacity(releases.len());
        let mut known = HashSet::with_capacity(releases.len());
        for release in releases {
            if !known.insert(release.uniq.clone()) {
                return Err(ExecError::DuplicateRelease {
                    uniq: release.uniq.clone(),
                });
            }
            nodes.push(release.uniq.clone());
        }

        let mut edges: HashMap<UniqName, Vec<UniqName>> = HashMap::new();
        let mut dependents: HashMap<UniqName, Vec<UniqName>> = HashMap::new();
        for release in releases {
            for dep in &release.depends_on {
                // An edge that targets nothing cannot be scheduled. Unlike a
                // malformed reference string (dropped at resolve time), this
                // is fatal.
                if !known.contains(dep) {
                    return Err(ExecError::UnresolvedDependency {
                        release: release.uniq.clone(),
                        dependency: dep.clone(),
                    });
                }
                edges
                    .entry(release.uniq.clone())
                    .or_default()
                    .push(dep.clone());
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(release.uniq.clone());
            }
        }

        let graph = Self {
            nodes,
            edges,
            dependents,
        };
        graph.check_acyclic()?;

        Ok(graph)
    }

    /// Dependencies of a release, in declaration order.
    pub fn dependencies(&self, uniq: &UniqName) -> &[UniqName] {
        self.edges.get(uniq).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Releases that depend on the given release.
    pub fn dependents(&self, uniq: &UniqName) -> &[UniqName] {
        self.dependents.get(uniq).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Group the graph into execution waves.
    ///
    /// Each wave contains every release whose dependencies all lie in prior
    /// waves. Members are sorted by canonical identity so runs over the same
    /// plan are reproducible.
    pub fn waves(&self) -> WavePlan {
        let mut emitted: HashSet<UniqName> = HashSet::with_capacity(self.nodes.len());
        let mut waves = Vec::new();

        while emitted.len() < self.nodes.len() {
            let mut ready: Vec<UniqName> = self
                .nodes
                .iter()
                .filter(|n| !emitted.contains(*n))
                .filter(|n| self.dependencies(n).iter().all(|d| emitted.contains(d)))
                .cloned()
                .collect();

            // An acyclic graph always makes progress.
            if ready.is_empty() {
                break;
            }

            ready.sort();
            emitted.extend(ready.iter().cloned());
            waves.push(Wave::new(ready));
        }

        WavePlan::new(waves)
    }

    // Three-color depth-first traversal; a back-edge to an in-progress node
    // is a cycle, reported with the ordered members.
    fn check_acyclic(&self) -> Result<()> {
        let mut colors: HashMap<&UniqName, Color> = HashMap::with_capacity(self.nodes.len());
        let mut path: Vec<UniqName> = Vec::new();

        for node in &self.nodes {
            if colors.get(node).copied().unwrap_or(Color::White) == Color::White {
                self.visit(node, &mut colors, &mut path)?;
            }
        }

        Ok(())
    }

    fn visit<'a>(
        &'a self,
        node: &'a UniqName,
        colors: &mut HashMap<&'a UniqName, Color>,
        path: &mut Vec<UniqName>,
    ) -> Result<()> {
        colors.insert(node, Color::Gray);
        path.push(node.clone());

        for dep in self.dependencies(node) {
            match colors.get(dep).copied().unwrap_or(Color::White) {
                Color::White => self.visit(dep, colors, path)?,
                Color::Gray => {
                    let start = path.iter().position(|u| u == dep).unwrap_or(0);
                    return Err(ExecError::DependencyCycle {
                        members: path[start..].to_vec(),
                    });
                }
                Color::Black => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}
