//! Formula dependency graph.
//!
//! Edges run from a formula cell to the formula cells it reads. Recompute
//! schedules by the graph's strongly connected components: every component
//! is evaluated after the components it reads, so an acyclic chain never
//! nests evaluation, however long it is.

use std::collections::{BTreeMap, BTreeSet};

use super::arith::reference_tokens;
use super::cell::{CellValue, Grid};
use super::cell_ref::CellRef;
use super::functions::match_call;
use super::range::{Resolved, resolve_token};

/// Extract the cell references of a formula body (no leading `=`).
///
/// Function-call formulas contribute single references plus the cells of
/// each range argument that exist in `grid`; arithmetic formulas contribute
/// each reference token. Malformed tokens contribute nothing. Duplicates are
/// kept.
pub fn extract_dependencies(formula: &str, grid: &Grid) -> Vec<CellRef> {
    if let Some((_, args)) = match_call(formula) {
        let mut deps = Vec::new();
        for arg in args {
            match resolve_token(arg) {
                Ok(Resolved::Cell(cell)) => deps.push(cell),
                Ok(Resolved::Range(range)) => deps.extend(range.cells_within(grid)),
                Ok(Resolved::Literal(_)) | Err(_) => {}
            }
        }
        return deps;
    }

    reference_tokens(formula).filter_map(CellRef::decode).collect()
}

/// Strongly connected components of a [`DependencyGraph`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Condensation {
    /// Components in evaluation order: each one comes after every component
    /// it reads. Members are row-major.
    pub components: Vec<Vec<CellRef>>,
    component_of: BTreeMap<CellRef, usize>,
    reads: Vec<BTreeSet<usize>>,
    cyclic: Vec<bool>,
}

impl Condensation {
    pub fn component_of(&self, cell: CellRef) -> Option<usize> {
        self.component_of.get(&cell).copied()
    }

    /// Other components that `component` reads.
    pub fn dependencies(&self, component: usize) -> impl Iterator<Item = usize> + '_ {
        self.reads.get(component).into_iter().flatten().copied()
    }

    /// Whether the component contains a reference cycle (several members,
    /// or one member that reads itself).
    pub fn is_cyclic(&self, component: usize) -> bool {
        self.cyclic.get(component).copied().unwrap_or(false)
    }
}

/// Formula dependency graph for one grid snapshot.
///
/// Nodes are formula cells. Edges point from a formula cell to the formula
/// cells it references; references to literals and empty cells carry no
/// ordering constraint and are left out.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    depends_on: BTreeMap<CellRef, BTreeSet<CellRef>>,
    dependents: BTreeMap<CellRef, BTreeSet<CellRef>>,
}

impl DependencyGraph {
    pub fn build(grid: &Grid) -> DependencyGraph {
        let mut graph = DependencyGraph::default();
        let formulas: BTreeMap<CellRef, &str> = grid
            .iter()
            .filter_map(|(cell, value)| match value {
                CellValue::Formula(f) => Some((cell, f.as_str())),
                _ => None,
            })
            .collect();

        for (&cell, formula) in &formulas {
            let deps: BTreeSet<CellRef> = extract_dependencies(formula, grid)
                .into_iter()
                .filter(|dep| formulas.contains_key(dep))
                .collect();
            for &dep in &deps {
                graph.dependents.entry(dep).or_default().insert(cell);
            }
            graph.depends_on.insert(cell, deps);
        }
        graph
    }

    /// Number of formula cells.
    pub fn len(&self) -> usize {
        self.depends_on.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depends_on.is_empty()
    }

    /// Formula cells referenced by `cell`.
    pub fn dependencies(&self, cell: CellRef) -> impl Iterator<Item = CellRef> + '_ {
        self.depends_on.get(&cell).into_iter().flatten().copied()
    }

    /// Formula cells that reference `cell`.
    pub fn dependents(&self, cell: CellRef) -> impl Iterator<Item = CellRef> + '_ {
        self.dependents.get(&cell).into_iter().flatten().copied()
    }

    /// Tarjan's algorithm with an explicit work stack. Deterministic: nodes
    /// and edges are visited in row-major order.
    pub fn condense(&self) -> Condensation {
        const UNVISITED: usize = usize::MAX;

        let nodes: Vec<CellRef> = self.depends_on.keys().copied().collect();
        let position: BTreeMap<CellRef, usize> =
            nodes.iter().enumerate().map(|(i, &cell)| (cell, i)).collect();
        let edges: Vec<Vec<usize>> = nodes
            .iter()
            .map(|&cell| {
                self.dependencies(cell)
                    .filter_map(|dep| position.get(&dep).copied())
                    .collect()
            })
            .collect();

        let n = nodes.len();
        let mut index = vec![UNVISITED; n];
        let mut low = vec![0; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut next_index = 0;
        let mut members: Vec<Vec<usize>> = Vec::new();

        for root in 0..n {
            if index[root] != UNVISITED {
                continue;
            }
            index[root] = next_index;
            low[root] = next_index;
            next_index += 1;
            stack.push(root);
            on_stack[root] = true;
            let mut work = vec![(root, 0usize)];

            while let Some(&(v, edge)) = work.last() {
                if let Some(&w) = edges[v].get(edge) {
                    if let Some(frame) = work.last_mut() {
                        frame.1 += 1;
                    }
                    if index[w] == UNVISITED {
                        index[w] = next_index;
                        low[w] = next_index;
                        next_index += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        work.push((w, 0));
                    } else if on_stack[w] {
                        low[v] = low[v].min(index[w]);
                    }
                    continue;
                }

                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    low[parent] = low[parent].min(low[v]);
                }
                if low[v] == index[v] {
                    let mut component = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    component.sort_unstable();
                    members.push(component);
                }
            }
        }

        let mut component_by_node = vec![0; n];
        for (c, component) in members.iter().enumerate() {
            for &v in component {
                component_by_node[v] = c;
            }
        }

        let mut reads = vec![BTreeSet::new(); members.len()];
        let mut cyclic = vec![false; members.len()];
        for (v, targets) in edges.iter().enumerate() {
            let c = component_by_node[v];
            for &w in targets {
                if component_by_node[w] == c {
                    cyclic[c] = true;
                } else {
                    reads[c].insert(component_by_node[w]);
                }
            }
        }

        Condensation {
            component_of: nodes
                .iter()
                .enumerate()
                .map(|(v, &cell)| (cell, component_by_node[v]))
                .collect(),
            components: members
                .into_iter()
                .map(|component| component.into_iter().map(|v| nodes[v]).collect())
                .collect(),
            reads,
            cyclic,
        }
    }

    /// Find a cycle through `start`. Returns the path `start -> ... -> start`.
    pub fn find_cycle(&self, start: CellRef) -> Option<Vec<CellRef>> {
        let mut visited = BTreeSet::from([start]);
        let mut stack = vec![(start, self.dependencies(start))];

        loop {
            let next = match stack.last_mut() {
                Some((_, deps)) => deps.next(),
                None => return None,
            };
            match next {
                Some(dep) if dep == start => {
                    let mut path: Vec<CellRef> = stack.iter().map(|(cell, _)| *cell).collect();
                    path.push(start);
                    return Some(path);
                }
                Some(dep) => {
                    if visited.insert(dep) {
                        stack.push((dep, self.dependencies(dep)));
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
    }
}
