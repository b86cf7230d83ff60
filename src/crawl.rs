//! Network Crawl
//!
//! Breadth-first worklist traversal of the simulated network through the
//! runtime's adjacency query. An explicit queue avoids the recursion-depth
//! concerns of the naive recursive crawl; every reachable host is visited
//! exactly once, in discovery order.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::runtime::GameRuntime;

/// Every host reachable from `root`, including `root`, in BFS order
pub fn crawl(runtime: &dyn GameRuntime, root: &str) -> Vec<String> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut order: Vec<String> = Vec::new();
    let mut worklist: VecDeque<String> = VecDeque::new();

    visited.insert(root.to_string());
    worklist.push_back(root.to_string());

    while let Some(host) = worklist.pop_front() {
        for neighbor in runtime.scan(&host) {
            if visited.insert(neighbor.clone()) {
                worklist.push_back(neighbor);
            }
        }
        order.push(host);
    }

    debug!(root = %root, reachable = order.len(), "Network crawl complete");
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sim_network, SimRuntime};

    #[test]
    fn test_crawl_visits_every_host_once() {
        let runtime = SimRuntime::new(sim_network());
        let hosts = crawl(&runtime, "home");

        let unique: std::collections::HashSet<&String> = hosts.iter().collect();
        assert_eq!(unique.len(), hosts.len());
        assert!(hosts.contains(&"home".to_string()));
        assert!(hosts.contains(&"n00dles".to_string()));
        assert!(hosts.contains(&"phantasy".to_string()));
    }

    #[test]
    fn test_crawl_is_breadth_first_from_root() {
        let runtime = SimRuntime::new(sim_network());
        let hosts = crawl(&runtime, "home");
        assert_eq!(hosts[0], "home");

        // Direct neighbors of home come before anything two hops out.
        let direct: Vec<String> = runtime.scan("home");
        for neighbor in &direct {
            let neighbor_pos = hosts.iter().position(|h| h == neighbor).unwrap();
            let phantasy_pos = hosts.iter().position(|h| h == "phantasy").unwrap();
            assert!(neighbor_pos < phantasy_pos);
        }
    }

    #[test]
    fn test_crawl_isolated_root() {
        let runtime = SimRuntime::new(vec![("lonely".to_string(), vec![])]);
        assert_eq!(crawl(&runtime, "lonely"), vec!["lonely".to_string()]);
    }

    #[test]
    fn test_crawl_handles_cycles() {
        let runtime = SimRuntime::new(vec![
            ("a".to_string(), vec!["b".to_string()]),
            ("b".to_string(), vec!["a".to_string(), "c".to_string()]),
            ("c".to_string(), vec!["b".to_string()]),
        ]);
        let hosts = crawl(&runtime, "a");
        assert_eq!(hosts, vec!["a", "b", "c"]);
    }
}
