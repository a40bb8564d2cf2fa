//! Counterfactual Regret Minimization over an abstracted game tree.
//!
//! Regret and strategy sums live in two flat arenas of `AtomicI32`,
//! addressed as `[game_id][card_bucket][action]` through per-node offsets.
//! A traversal with a fixed deal touches one bucket row per visited
//! infoset, contiguous across actions, which keeps the hot loop cache
//! friendly.
//!
//! Worker threads share the tables and update them with relaxed atomic
//! adds. There is no ordering between threads: lost or torn interleavings
//! only perturb sums that the iteration keeps re-estimating, so the
//! averaged strategy still converges. Single-worker runs are deterministic
//! for a fixed seed.

use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::abstraction::{
    ActionAbstraction, CardAbstraction, GameAbstraction, GameStateEnumerator,
};
use crate::error::{GtoError, GtoResult};
use crate::game::{GameCards, GameState, Street};
use crate::game_tree::{build_tree, tree_size, Node, TreeSize};
use crate::range::{Range, RANGE_SIZE};

/// Fixed-point factor for strategy-sum accumulation; keeps fractional
/// reach-weighted probabilities alive in the i32 tables.
const STRATEGY_SCALE: f32 = 100.0;

// ---------------------------------------------------------------------------
// Strategy math
// ---------------------------------------------------------------------------

/// Regret matching: play proportionally to positive regrets, uniformly
/// when no regret is positive. Always sums to 1 for non-empty input.
pub fn current_strategy(regrets: &[i32]) -> Vec<f32> {
    let positive_sum: i64 = regrets.iter().map(|&r| r.max(0) as i64).sum();
    if positive_sum > 0 {
        regrets
            .iter()
            .map(|&r| r.max(0) as f32 / positive_sum as f32)
            .collect()
    } else {
        vec![1.0 / regrets.len() as f32; regrets.len()]
    }
}

/// Normalized cumulative strategy; the averaged strategy converges to the
/// equilibrium one. Uniform fallback for untouched rows.
pub fn average_strategy(strategy_sum: &[i32]) -> Vec<f32> {
    let sum: i64 = strategy_sum.iter().map(|&v| v as i64).sum();
    if sum > 0 {
        strategy_sum
            .iter()
            .map(|&v| v as f32 / sum as f32)
            .collect()
    } else {
        vec![1.0 / strategy_sum.len() as f32; strategy_sum.len()]
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

struct CfrTables {
    offsets: Vec<usize>,
    num_actions: Vec<u32>,
    regret_sum: Vec<AtomicI32>,
    strategy_sum: Vec<AtomicI32>,
}

impl CfrTables {
    fn new(root: &Node, num_states: usize, cards: &dyn CardAbstraction) -> CfrTables {
        let mut num_actions = vec![0u32; num_states];
        let mut num_buckets = vec![0usize; num_states];

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if let Node::Infoset {
                id,
                street,
                children,
                ..
            } = node
            {
                num_actions[*id as usize] = children.len() as u32;
                num_buckets[*id as usize] = cards.size(*street);
                stack.extend(children.iter());
            }
        }

        let mut offsets = vec![0usize; num_states];
        let mut total = 0usize;
        for id in 0..num_states {
            offsets[id] = total;
            total += num_buckets[id] * num_actions[id] as usize;
        }

        let zeroed = |n: usize| -> Vec<AtomicI32> { (0..n).map(|_| AtomicI32::new(0)).collect() };
        CfrTables {
            offsets,
            num_actions,
            regret_sum: zeroed(total),
            strategy_sum: zeroed(total),
        }
    }

    /// Flat slot range of one `[game_id][bucket]` row.
    #[inline]
    fn row(&self, id: u32, bucket: usize) -> std::ops::Range<usize> {
        let actions = self.num_actions[id as usize] as usize;
        let base = self.offsets[id as usize] + bucket * actions;
        base..base + actions
    }

    fn load(slots: &[AtomicI32]) -> Vec<i32> {
        slots.iter().map(|s| s.load(Ordering::Relaxed)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RegretStats {
    pub sum: i64,
    pub min: i32,
    pub max: i32,
}

// ---------------------------------------------------------------------------
// CFR data
// ---------------------------------------------------------------------------

/// The tree, the enumerated game states behind it, the card abstraction
/// and both accumulation tables. Shared immutably between workers; all
/// mutation goes through the atomic slots.
pub struct CfrData {
    root: Node,
    games: GameStateEnumerator,
    cards: Box<dyn CardAbstraction>,
    tables: CfrTables,
}

impl CfrData {
    pub fn new(
        state: &GameState,
        actions: &dyn ActionAbstraction,
        cards: Box<dyn CardAbstraction>,
    ) -> GtoResult<CfrData> {
        if state.seats() != 2 {
            return Err(GtoError::UnsupportedSeatCount(state.seats()));
        }
        let mut games = GameStateEnumerator::new();
        let root = build_tree(state, &mut games, actions);
        let tables = CfrTables::new(&root, games.len(), cards.as_ref());
        Ok(CfrData {
            root,
            games,
            cards,
            tables,
        })
    }

    #[inline]
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn tree_size(&self) -> TreeSize {
        tree_size(&self.root)
    }

    pub fn num_states(&self) -> usize {
        self.games.len()
    }

    pub fn card_abstraction(&self) -> &dyn CardAbstraction {
        self.cards.as_ref()
    }

    /// The game state behind a node id; with an action abstraction this
    /// recovers the action list a node's children were built from.
    pub fn state(&self, id: u32) -> &GameState {
        self.games.decode(id)
    }

    /// One vanilla CFR traversal with a fixed deal, updating regret and
    /// strategy sums in place. Returns both seats' utilities in mBB.
    pub fn cfr(&self, deal: &GameCards, node: &Node, reach: [f32; 2]) -> [i32; 2] {
        match node {
            Node::Terminal {
                id,
                payouts,
                showdown,
                ..
            } => {
                if *showdown {
                    let p = self
                        .games
                        .decode(*id)
                        .payouts_showdown(deal)
                        .expect("terminal showdown state");
                    [p[0], p[1]]
                } else {
                    [payouts[0], payouts[1]]
                }
            }
            Node::Infoset {
                id,
                street,
                seat,
                children,
                ..
            } => {
                let ap = *seat;
                let bucket = self.cards.id(*street, ap, deal);
                let row = self.tables.row(*id, bucket);

                let regrets = CfrTables::load(&self.tables.regret_sum[row.clone()]);
                let strategy = current_strategy(&regrets);

                for (slot, &p) in self.tables.strategy_sum[row.clone()].iter().zip(&strategy) {
                    slot.fetch_add((reach[ap] * STRATEGY_SCALE * p) as i32, Ordering::Relaxed);
                }

                let mut node_utility = [0i32; 2];
                let mut child_utilities = Vec::with_capacity(children.len());
                for (child, &p) in children.iter().zip(&strategy) {
                    let mut next_reach = reach;
                    next_reach[ap] *= p;
                    let utility = self.cfr(deal, child, next_reach);
                    child_utilities.push(utility);
                    node_utility[0] += (utility[0] as f32 * p) as i32;
                    node_utility[1] += (utility[1] as f32 * p) as i32;
                }

                let opponent_reach = reach[1 - ap];
                for (slot, utility) in self.tables.regret_sum[row].iter().zip(&child_utilities) {
                    let regret = (utility[ap] - node_utility[ap]) as f32 * opponent_reach;
                    slot.fetch_add(regret as i32, Ordering::Relaxed);
                }
                node_utility
            }
        }
    }

    /// Expected utilities when both seats play their averaged strategies
    /// for this deal. Read-only; used to probe convergence.
    pub fn expected_utility(&self, deal: &GameCards, node: &Node) -> [f32; 2] {
        match node {
            Node::Terminal {
                id,
                payouts,
                showdown,
                ..
            } => {
                if *showdown {
                    let p = self
                        .games
                        .decode(*id)
                        .payouts_showdown(deal)
                        .expect("terminal showdown state");
                    [p[0] as f32, p[1] as f32]
                } else {
                    [payouts[0] as f32, payouts[1] as f32]
                }
            }
            Node::Infoset {
                id,
                street,
                seat,
                children,
                ..
            } => {
                let bucket = self.cards.id(*street, *seat, deal);
                let sums = CfrTables::load(&self.tables.strategy_sum[self.tables.row(*id, bucket)]);
                let strategy = average_strategy(&sums);
                let mut utility = [0f32; 2];
                for (child, &p) in children.iter().zip(&strategy) {
                    let child_utility = self.expected_utility(deal, child);
                    utility[0] += child_utility[0] * p;
                    utility[1] += child_utility[1] * p;
                }
                utility
            }
        }
    }

    /// Current (regret-matched) strategy of one infoset row.
    pub fn current_strategy_at(&self, node: &Node, bucket: usize) -> Vec<f32> {
        let regrets = CfrTables::load(&self.tables.regret_sum[self.tables.row(node.id(), bucket)]);
        current_strategy(&regrets)
    }

    /// Averaged output strategy of one infoset row.
    pub fn average_strategy_at(&self, node: &Node, bucket: usize) -> Vec<f32> {
        let sums = CfrTables::load(&self.tables.strategy_sum[self.tables.row(node.id(), bucket)]);
        average_strategy(&sums)
    }

    /// For a preflop infoset bucketed by the 169-hand grid: one `Range`
    /// per action holding the averaged frequency of that action.
    pub fn preflop_ranges(&self, node: &Node) -> Option<Vec<Range>> {
        match node {
            Node::Infoset {
                street: Street::Preflop,
                children,
                ..
            } if self.cards.size(Street::Preflop) == RANGE_SIZE => {
                let mut ranges = vec![Range::new(); children.len()];
                for bucket in 0..RANGE_SIZE {
                    let strategy = self.average_strategy_at(node, bucket);
                    for (range, &p) in ranges.iter_mut().zip(&strategy) {
                        range
                            .set_normalized(bucket, (p * 100.0) as u8)
                            .expect("probability within 0..=100");
                    }
                }
                Some(ranges)
            }
            _ => None,
        }
    }

    /// Sum / min / max over every regret slot; overflow canary for long
    /// runs.
    pub fn regret_stats(&self) -> RegretStats {
        let mut stats = RegretStats {
            sum: 0,
            min: i32::MAX,
            max: i32::MIN,
        };
        for slot in &self.tables.regret_sum {
            let v = slot.load(Ordering::Relaxed);
            stats.sum += v as i64;
            stats.min = stats.min.min(v);
            stats.max = stats.max.max(v);
        }
        if self.tables.regret_sum.is_empty() {
            stats.min = 0;
            stats.max = 0;
        }
        stats
    }
}

// ---------------------------------------------------------------------------
// Trainer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct TrainerConfig {
    /// Number of OS worker threads sharing the tables.
    pub workers: usize,
    /// Iterations (sampled deals) per worker.
    pub iterations: u64,
    /// Base RNG seed; worker `i` uses `seed + i`.
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> TrainerConfig {
        TrainerConfig {
            workers: 1,
            iterations: 10_000,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingStats {
    pub iterations: u64,
    /// Mean per-iteration utility per seat, in mBB.
    pub average_utility: [f64; 2],
}

/// Drives CFR iterations over a shared `CfrData`. Each worker owns a
/// private seeded RNG, samples a deal, and runs one traversal from the
/// root; workers exit when their iteration budget is spent.
pub struct Trainer {
    data: CfrData,
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(
        state: &GameState,
        actions: &dyn ActionAbstraction,
        cards: Box<dyn CardAbstraction>,
        config: TrainerConfig,
    ) -> GtoResult<Trainer> {
        let data = CfrData::new(state, actions, cards)?;
        let size = data.tree_size();
        info!(
            "cfr tree built: {} infosets, {} terminals, {} states",
            size.infosets,
            size.terminals,
            data.num_states()
        );
        Ok(Trainer { data, config })
    }

    pub fn data(&self) -> &CfrData {
        &self.data
    }

    pub fn into_data(self) -> CfrData {
        self.data
    }

    pub fn run(&self) -> TrainingStats {
        let config = self.config;
        let workers = config.workers.max(1);
        let data = &self.data;

        let worker_sums: Vec<[i64; 2]> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|tid| {
                    scope.spawn(move || {
                        let mut rng =
                            StdRng::seed_from_u64(config.seed.wrapping_add(tid as u64));
                        let mut utility_sum = [0i64; 2];
                        for i in 0..config.iterations {
                            let deal = GameCards::sample(&mut rng, 2);
                            let utility = data.cfr(&deal, data.root(), [1.0, 1.0]);
                            utility_sum[0] += utility[0] as i64;
                            utility_sum[1] += utility[1] as i64;
                            if (i + 1) % 100_000 == 0 {
                                debug!(
                                    "worker {}: {} iterations, running avg utility {:.1}/{:.1} mBB",
                                    tid,
                                    i + 1,
                                    utility_sum[0] as f64 / (i + 1) as f64,
                                    utility_sum[1] as f64 / (i + 1) as f64,
                                );
                            }
                        }
                        utility_sum
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("cfr worker panicked"))
                .collect()
        });

        let total_iterations = config.iterations * workers as u64;
        let mut total = [0i64; 2];
        for sums in &worker_sums {
            total[0] += sums[0];
            total[1] += sums[1];
        }
        TrainingStats {
            iterations: total_iterations,
            average_utility: [
                total[0] as f64 / total_iterations.max(1) as f64,
                total[1] as f64 / total_iterations.max(1) as f64,
            ],
        }
    }
}
