//! Graph analysis over the algorithm registry.
//!
//! Works on plain adjacency data (`Vec<Vec<usize>>` indexed by algorithm
//! slot) so it can be tested without building algorithms.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Forward adjacency (`from -> [to]`) over `n` slots.
pub fn build_adjacency(n: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Vec<Vec<usize>> {
    let mut adj = vec![Vec::new(); n];
    for (from, to) in edges {
        if from < n && to < n {
            adj[from].push(to);
        }
    }
    adj
}

/// Topological order of the `live` slots using Kahn's algorithm.
///
/// Among slots that are ready at the same time, the lowest index
/// (registration order) goes first, which makes the order deterministic.
/// Returns `None` if the graph has a cycle.
pub fn topological_order(adj: &[Vec<usize>], live: &[bool]) -> Option<Vec<usize>> {
    let n = adj.len();
    let mut in_degree = vec![0u32; n];
    for (from, targets) in adj.iter().enumerate() {
        if !live[from] {
            continue;
        }
        for &to in targets {
            if live[to] {
                in_degree[to] += 1;
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&i| live[i] && in_degree[i] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(n);

    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &next in &adj[node] {
            if !live[next] {
                continue;
            }
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    let live_count = live.iter().filter(|&&l| l).count();
    if order.len() == live_count {
        Some(order)
    } else {
        None
    }
}

/// Whether `to` can reach `from`, i.e. whether adding `from -> to` closes a cycle.
pub fn would_create_cycle(adj: &[Vec<usize>], from: usize, to: usize) -> bool {
    if from == to {
        return true;
    }
    let mut visited = vec![false; adj.len()];
    let mut stack = vec![to];

    while let Some(current) = stack.pop() {
        if current == from {
            return true;
        }
        if current >= adj.len() || visited[current] {
            continue;
        }
        visited[current] = true;
        stack.extend(adj[current].iter().copied());
    }
    false
}

/// For every slot, whether any strict ancestor is in `marked`.
///
/// `order` must be a topological order of the graph.
pub fn has_marked_ancestor(adj: &[Vec<usize>], order: &[usize], marked: &[bool]) -> Vec<bool> {
    let mut tainted = vec![false; adj.len()];
    for &node in order {
        let carries = marked[node] || tainted[node];
        if carries {
            for &next in &adj[node] {
                tainted[next] = true;
            }
        }
    }
    tainted
}
