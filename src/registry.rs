//! Subscription registry — a trie keyed by path component
//!
//! Established subscribers live in a tree of nodes, one level per name
//! component, with the empty-string key reserved for wildcards. Terminal
//! callback lists sit at the node a pattern ends on; a pattern shorter
//! than a published name matches because terminals fire at every depth
//! the event's path reaches, not only the final one.

use std::collections::HashMap;

use crate::types::{same_subscriber, SubscriberFn};

#[derive(Default)]
struct Node {
    children: HashMap<String, Node>,
    terminals: Vec<SubscriberFn>,
}

impl Node {
    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.terminals.is_empty()
    }
}

/// Trie of established subscribers
///
/// Invariant: no node is left without both children and terminals —
/// removal prunes empty nodes so the tree never leaks.
#[derive(Default)]
pub(crate) struct SubscriptionTree {
    root: Node,
}

impl SubscriptionTree {
    /// Register `callback` at the terminal node for `path`, creating
    /// nodes along the way
    pub(crate) fn insert(&mut self, path: &[String], callback: SubscriberFn) {
        let mut node = &mut self.root;
        for component in path {
            node = node.children.entry(component.clone()).or_default();
        }
        node.terminals.push(callback);
    }

    /// Whether `callback` is registered exactly at `path`
    ///
    /// Walks without creating nodes, so a miss leaves no residue.
    pub(crate) fn contains(&self, path: &[String], callback: &SubscriberFn) -> bool {
        let mut node = &self.root;
        for component in path {
            match node.children.get(component) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.terminals.iter().any(|t| same_subscriber(t, callback))
    }

    /// Remove `callback` from every terminal list it appears in,
    /// pruning nodes that become empty; returns how many registrations
    /// were removed
    pub(crate) fn remove(&mut self, callback: &SubscriberFn) -> usize {
        remove_from(&mut self.root, callback)
    }

    /// Total number of registered (pattern, callback) pairs
    pub(crate) fn count(&self) -> usize {
        count_in(&self.root)
    }

    /// All callbacks matching the published path, in trie-walk order
    ///
    /// Breadth-first over levels: the frontier starts at the root; at
    /// each component the current frontier's terminals are collected
    /// first (short patterns match deep names), then the frontier
    /// advances through the exact child and the wildcard child of every
    /// node. The final frontier's terminals are collected as well.
    /// Patterns longer than the event never match.
    pub(crate) fn matches(&self, path: &[String]) -> Vec<SubscriberFn> {
        let mut matched = Vec::new();
        let mut frontier: Vec<&Node> = vec![&self.root];

        for component in path {
            for node in &frontier {
                matched.extend(node.terminals.iter().cloned());
            }

            let mut next = Vec::new();
            for node in &frontier {
                if let Some(child) = node.children.get(component) {
                    next.push(child);
                }
                if let Some(wildcard) = node.children.get("") {
                    next.push(wildcard);
                }
            }
            frontier = next;

            if frontier.is_empty() {
                return matched;
            }
        }

        for node in &frontier {
            matched.extend(node.terminals.iter().cloned());
        }
        matched
    }
}

fn remove_from(node: &mut Node, callback: &SubscriberFn) -> usize {
    let mut removed = 0;
    node.children.retain(|_, child| {
        removed += remove_from(child, callback);
        !child.is_empty()
    });
    let before = node.terminals.len();
    node.terminals.retain(|t| !same_subscriber(t, callback));
    removed + before - node.terminals.len()
}

fn count_in(node: &Node) -> usize {
    node.terminals.len() + node.children.values().map(count_in).sum::<usize>()
}
