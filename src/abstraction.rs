//! Pluggable abstractions for tree building and CFR.
//!
//! Three seams, all object-safe: an action abstraction prunes the legal
//! action set, a card abstraction buckets deals into information-set rows,
//! and a game abstraction maps game states to dense ids and back.

use crate::cards::DECK_SIZE;
use crate::cardset::CardSet;
use crate::error::GtoResult;
use crate::game::{Action, ActionKind, GameCards, GameState, Street};
use crate::normalize::suit_normalization_permutation;
use crate::range::{Range, RANGE_SIZE};

// ---------------------------------------------------------------------------
// Action abstraction
// ---------------------------------------------------------------------------

pub trait ActionAbstraction: Send + Sync {
    /// Restrict the legal actions of `state`.
    fn filter(&self, state: &GameState) -> Vec<Action>;
}

/// Keeps every legal action.
#[derive(Debug, Default)]
pub struct NoopActionAbstraction;

impl ActionAbstraction for NoopActionAbstraction {
    fn filter(&self, state: &GameState) -> Vec<Action> {
        state.possible_actions()
    }
}

/// Preflop-only game: fold, check, call, all-in and the pot-sized raise
/// survive preflop; every later street is checked down.
///
/// The pot-raise filter accepts amounts within the half-open window
/// `(pot - 250, pot + 250]` mBB, so at most one 500-step size qualifies on
/// each side of the exact pot raise.
#[derive(Debug, Default)]
pub struct SimplePreflopActionAbstraction;

impl SimplePreflopActionAbstraction {
    pub const POT_RAISE_TOLERANCE: i32 = 250;
}

impl ActionAbstraction for SimplePreflopActionAbstraction {
    fn filter(&self, state: &GameState) -> Vec<Action> {
        if state.street() != Street::Preflop {
            return vec![Action::new(0, ActionKind::Check, state.active_seat())];
        }

        // pot-sized raise: call amount + (call amount + pot)
        let pot_raise = 2 * state.amount_to_call() + state.pot_size();
        state
            .possible_actions()
            .into_iter()
            .filter(|a| match a.kind {
                ActionKind::Fold | ActionKind::Check | ActionKind::Call | ActionKind::AllIn => {
                    true
                }
                ActionKind::Raise => {
                    (a.amount - pot_raise).abs() < Self::POT_RAISE_TOLERANCE
                        || a.amount - pot_raise == Self::POT_RAISE_TOLERANCE
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Card abstraction
// ---------------------------------------------------------------------------

pub trait CardAbstraction: Send + Sync {
    /// Number of buckets on the given street.
    fn size(&self, street: Street) -> usize;

    /// Bucket of `seat`'s view of the deal; always below `size(street)`.
    fn id(&self, street: Street, seat: usize, cards: &GameCards) -> usize;

    /// Human-readable bucket description for diagnostics.
    fn label(&self, street: Street, id: usize) -> String;
}

/// Buckets every street by the 169 strategically distinct starting hands
/// (pairs, suited and off-suit combos).
#[derive(Debug, Default)]
pub struct RangeCardAbstraction;

impl CardAbstraction for RangeCardAbstraction {
    fn size(&self, _street: Street) -> usize {
        RANGE_SIZE
    }

    fn id(&self, _street: Street, seat: usize, cards: &GameCards) -> usize {
        Range::index_of(cards.hand(seat))
    }

    fn label(&self, _street: Street, id: usize) -> String {
        format!("{} ({})", Range::hand_label(id), id)
    }
}

/// Buckets preflop hands by their canonical suit-isomorphic form (169
/// classes) and, when built `with_flops`, hand+flop configurations by
/// their joint canonical form. Later streets collapse into one bucket.
pub struct SuitNormalizedAbstraction {
    preflop: Vec<CardSet>,
    flops: Option<Vec<(CardSet, CardSet)>>,
}

impl SuitNormalizedAbstraction {
    pub fn new() -> SuitNormalizedAbstraction {
        let mut preflop = Vec::with_capacity(1326);
        for i in 0..DECK_SIZE as u64 {
            for j in (i + 1)..DECK_SIZE as u64 {
                let hand = CardSet::from_bits(1u64 << i | 1u64 << j).expect("deck bits");
                preflop.push(hand.rotate_suits(hand.normalization_vector()));
            }
        }
        preflop.sort_unstable();
        preflop.dedup();
        SuitNormalizedAbstraction {
            preflop,
            flops: None,
        }
    }

    /// Additionally enumerate every hand/flop configuration (~26 million
    /// before dedup). Expensive; only worth it for flop-aware training.
    pub fn with_flops() -> GtoResult<SuitNormalizedAbstraction> {
        let mut abstraction = SuitNormalizedAbstraction::new();
        let mut flops = Vec::new();
        for i in 0..DECK_SIZE {
            for j in (i + 1)..DECK_SIZE {
                let hand = crate::hand::Hand::new(
                    crate::cards::Card::from_index(i)?,
                    crate::cards::Card::from_index(j)?,
                )?;
                let hand_cs = hand.as_cardset();
                for k in 0..DECK_SIZE {
                    let c3 = crate::cards::Card::from_index(k)?;
                    if hand_cs.contains(c3) {
                        continue;
                    }
                    for l in (k + 1)..DECK_SIZE {
                        let c4 = crate::cards::Card::from_index(l)?;
                        if hand_cs.contains(c4) {
                            continue;
                        }
                        for m in (l + 1)..DECK_SIZE {
                            let c5 = crate::cards::Card::from_index(m)?;
                            if hand_cs.contains(c5) {
                                continue;
                            }
                            let flop = CardSet::new().with(c3).with(c4).with(c5);
                            let perm = suit_normalization_permutation(hand, flop)?;
                            flops.push((
                                hand_cs.rotate_suits(perm),
                                flop.rotate_suits(perm),
                            ));
                        }
                    }
                }
            }
        }
        flops.sort_unstable();
        flops.dedup();
        abstraction.flops = Some(flops);
        Ok(abstraction)
    }
}

impl Default for SuitNormalizedAbstraction {
    fn default() -> SuitNormalizedAbstraction {
        SuitNormalizedAbstraction::new()
    }
}

impl CardAbstraction for SuitNormalizedAbstraction {
    fn size(&self, street: Street) -> usize {
        match street {
            Street::Preflop => self.preflop.len(),
            Street::Flop => self.flops.as_ref().map_or(1, Vec::len),
            _ => 1,
        }
    }

    fn id(&self, street: Street, seat: usize, cards: &GameCards) -> usize {
        match street {
            Street::Preflop => {
                let cs = cards.hand(seat).as_cardset();
                let norm = cs.rotate_suits(cs.normalization_vector());
                self.preflop.binary_search(&norm).unwrap_or(0)
            }
            Street::Flop => match &self.flops {
                Some(flops) => {
                    let hand = cards.hand(seat);
                    let flop = cards.board_cardset(3).expect("flop prefix");
                    let perm = suit_normalization_permutation(hand, flop)
                        .expect("deal cards are distinct");
                    let key = (hand.as_cardset().rotate_suits(perm), flop.rotate_suits(perm));
                    flops.binary_search(&key).unwrap_or(0)
                }
                None => 0,
            },
            _ => 0,
        }
    }

    fn label(&self, street: Street, id: usize) -> String {
        match street {
            Street::Preflop => self
                .preflop
                .get(id)
                .map_or_else(String::new, CardSet::to_string),
            Street::Flop => match &self.flops {
                Some(flops) => flops
                    .get(id)
                    .map_or_else(String::new, |(h, f)| format!("{} | {}", h, f)),
                None => "single flop bucket".to_string(),
            },
            _ => "single bucket".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Game abstraction
// ---------------------------------------------------------------------------

pub trait GameAbstraction: Send + Sync {
    /// Assign `state` a dense id, stable for the lifetime of a run.
    fn encode(&mut self, state: &GameState) -> u32;

    /// Recover the state behind an id.
    fn decode(&self, id: u32) -> &GameState;
}

/// Stores every encountered state and hands out ids in encounter order
/// (for the tree builder: pre-order).
#[derive(Debug, Default)]
pub struct GameStateEnumerator {
    states: Vec<GameState>,
}

impl GameStateEnumerator {
    pub fn new() -> GameStateEnumerator {
        GameStateEnumerator { states: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl GameAbstraction for GameStateEnumerator {
    fn encode(&mut self, state: &GameState) -> u32 {
        self.states.push(state.clone());
        (self.states.len() - 1) as u32
    }

    fn decode(&self, id: u32) -> &GameState {
        &self.states[id as usize]
    }
}
