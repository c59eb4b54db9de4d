use std::collections::{BTreeMap, BTreeSet};

use crate::config::DumpConfig;
use crate::error::{Error, Result};

/// Order configured tables so every table follows its dependencies.
///
/// Ties are broken by table name, so the order is stable across runs.
pub fn dependency_order(config: &DumpConfig) -> Result<Vec<String>> {
    toposort(&config.dependents()).map_err(|cycle| {
        Error::Configuration(format!(
            "table dependencies contain a cycle: {}",
            cycle.join(", ")
        ))
    })
}

fn toposort(
    graph: &BTreeMap<String, BTreeSet<String>>,
) -> std::result::Result<Vec<String>, Vec<String>> {
    let mut indegree: BTreeMap<&str, usize> = graph.keys().map(|node| (node.as_str(), 0)).collect();
    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.as_str()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();

    let mut order = Vec::with_capacity(indegree.len());
    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());

        if let Some(targets) = graph.get(node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target.as_str()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.as_str());
                    }
                }
            }
        }
    }

    if order.len() == indegree.len() {
        Ok(order)
    } else {
        Err(indegree
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(node, _)| node.to_string())
            .collect())
    }
}
