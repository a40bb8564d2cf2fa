//! Explicit game tree over the betting state machine.
//!
//! Nodes carry only what CFR traversal needs: the dense game-abstraction
//! id, the street and active seat (to look up card buckets) and the depth.
//! Fold-out terminals precompute their payouts since those are independent
//! of the cards; showdown payouts are resolved at traversal time through
//! the game abstraction.

use crate::abstraction::{ActionAbstraction, GameAbstraction};
use crate::game::{GameState, Street};

/// One tree node; children are owned exclusively by their parent.
#[derive(Debug)]
pub enum Node {
    Infoset {
        id: u32,
        street: Street,
        seat: usize,
        depth: u8,
        children: Vec<Node>,
    },
    Terminal {
        id: u32,
        street: Street,
        seat: usize,
        depth: u8,
        payouts: Vec<i32>,
        showdown: bool,
    },
}

impl Node {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Node::Terminal { .. })
    }

    pub fn id(&self) -> u32 {
        match self {
            Node::Infoset { id, .. } | Node::Terminal { id, .. } => *id,
        }
    }

    pub fn street(&self) -> Street {
        match self {
            Node::Infoset { street, .. } | Node::Terminal { street, .. } => *street,
        }
    }

    pub fn seat(&self) -> usize {
        match self {
            Node::Infoset { seat, .. } | Node::Terminal { seat, .. } => *seat,
        }
    }

    pub fn depth(&self) -> u8 {
        match self {
            Node::Infoset { depth, .. } | Node::Terminal { depth, .. } => *depth,
        }
    }

    /// Children in action order; empty for terminals.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Infoset { children, .. } => children,
            Node::Terminal { .. } => &[],
        }
    }
}

/// Recursively expand `state` under the given abstractions. Ids are handed
/// out by `games` in pre-order, so the n-th encoded state belongs to the
/// n-th created node.
pub fn build_tree(
    state: &GameState,
    games: &mut dyn GameAbstraction,
    actions: &dyn ActionAbstraction,
) -> Node {
    build_node(state, games, actions, 0)
}

fn build_node(
    state: &GameState,
    games: &mut dyn GameAbstraction,
    actions: &dyn ActionAbstraction,
    depth: u8,
) -> Node {
    let id = games.encode(state);
    if state.is_terminal() {
        let showdown = state.is_showdown();
        let payouts = if showdown {
            Vec::new()
        } else {
            state.payouts_no_showdown().expect("fold-out terminal")
        };
        Node::Terminal {
            id,
            street: state.street(),
            seat: state.active_seat(),
            depth,
            payouts,
            showdown,
        }
    } else {
        let filtered = actions.filter(state);
        let mut children = Vec::with_capacity(filtered.len());
        for action in &filtered {
            let mut next = state.clone();
            next.execute_action(action);
            children.push(build_node(&next, games, actions, depth + 1));
        }
        Node::Infoset {
            id,
            street: state.street(),
            seat: state.active_seat(),
            depth,
            children,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSize {
    pub infosets: usize,
    pub terminals: usize,
}

pub fn tree_size(root: &Node) -> TreeSize {
    let mut size = TreeSize::default();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_terminal() {
            size.terminals += 1;
        } else {
            size.infosets += 1;
        }
        stack.extend(node.children());
    }
    size
}
