//! The betting-game state machine.
//!
//! A `GameState` tracks one hand of No-Limit Hold'em for 2 to 6 seats with
//! all chip amounts in milli big blinds (1000 = 1 BB). It enumerates legal
//! actions, advances streets, builds side pots and settles showdowns and
//! fold-outs, with an optional rake that only applies once a flop has been
//! dealt. Cards live in a separate immutable `GameCards` value; the state
//! machine itself never sees them until payout time.
//!
//! Seat order is SB, BB, UTG, MP, CO, BTN. Heads-up, seat 0 is both small
//! blind and button and acts first preflop.

use std::fmt;

use rand::Rng;

use crate::cards::{Card, DECK_SIZE};
use crate::cardset::CardSet;
use crate::error::{GtoError, GtoResult};
use crate::hand::Hand;
use crate::hand_evaluator::{evaluate_unsafe, HandResult};

pub const MAX_SEATS: usize = 6;
pub const NUM_BOARD_CARDS: usize = 5;

/// Starting minimum raise and big blind, in mBB.
pub const BIG_BLIND: i32 = 1000;
pub const SMALL_BLIND: i32 = 500;

/// Step between enumerated raise sizes, in mBB.
pub const RAISE_STEP: i32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Street {
    Preflop = 0,
    Flop = 1,
    Turn = 2,
    River = 3,
    Finished = 4,
}

impl Street {
    fn next(self) -> Street {
        match self {
            Street::Preflop => Street::Flop,
            Street::Flop => Street::Turn,
            Street::Turn => Street::River,
            Street::River | Street::Finished => Street::Finished,
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Street::Preflop => write!(f, "Preflop"),
            Street::Flop => write!(f, "Flop"),
            Street::Turn => write!(f, "Turn"),
            Street::River => write!(f, "River"),
            Street::Finished => write!(f, "Finished"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeatState {
    /// Has not acted in the current betting round.
    Init,
    /// Folded.
    Out,
    /// Acted and still in the hand.
    Alive,
    /// All chips committed.
    AllIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Raise,
    AllIn,
}

/// One seat action. `amount` is the number of chips moved in front of the
/// seat by this action (0 for fold and check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub amount: i32,
    pub kind: ActionKind,
    pub seat: usize,
}

impl Action {
    pub fn new(amount: i32, kind: ActionKind, seat: usize) -> Action {
        Action { amount, kind, seat }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ActionKind::Fold => write!(f, "FOLD"),
            ActionKind::Check => write!(f, "CHECK"),
            ActionKind::Call => write!(f, "CALL({})", self.amount),
            ActionKind::Raise => write!(f, "RAISE({})", self.amount),
            ActionKind::AllIn => write!(f, "ALLIN({})", self.amount),
        }
    }
}

/// Rake as the fraction numerator/denominator; a zero numerator disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rake {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rake {
    pub const NONE: Rake = Rake {
        numerator: 0,
        denominator: 1,
    };

    pub fn new(numerator: u32, denominator: u32) -> GtoResult<Rake> {
        if denominator == 0 || numerator >= denominator {
            return Err(GtoError::InvalidRake {
                numerator,
                denominator,
            });
        }
        Ok(Rake {
            numerator,
            denominator,
        })
    }
}

// ---------------------------------------------------------------------------
// Deal
// ---------------------------------------------------------------------------

/// A full deal: 5 board cards plus one hole-card pair per seat, all
/// distinct. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCards {
    board: [Card; NUM_BOARD_CARDS],
    hands: Vec<Hand>,
}

impl GameCards {
    pub fn new(board: [Card; NUM_BOARD_CARDS], hands: Vec<Hand>) -> GtoResult<GameCards> {
        if !(2..=MAX_SEATS).contains(&hands.len()) {
            return Err(GtoError::InvalidSeatCount(hands.len()));
        }
        let mut all = CardSet::from_cards(&board);
        for h in &hands {
            all.join(h.as_cardset());
        }
        let expected = NUM_BOARD_CARDS + 2 * hands.len();
        if all.size() != expected {
            return Err(GtoError::DuplicateCards(all.to_string()));
        }
        Ok(GameCards { board, hands })
    }

    /// Build from a flat card list: board first, then two cards per seat.
    pub fn from_cards(cards: &[Card]) -> GtoResult<GameCards> {
        let num_hands = cards.len().saturating_sub(NUM_BOARD_CARDS) / 2;
        if cards.len() != NUM_BOARD_CARDS + 2 * num_hands || !(2..=MAX_SEATS).contains(&num_hands)
        {
            return Err(GtoError::WrongCardCount {
                min: NUM_BOARD_CARDS + 4,
                max: NUM_BOARD_CARDS + 2 * MAX_SEATS,
                got: cards.len(),
            });
        }
        let board = [cards[0], cards[1], cards[2], cards[3], cards[4]];
        let hands = cards[NUM_BOARD_CARDS..]
            .chunks(2)
            .map(|pair| Hand::new(pair[0], pair[1]))
            .collect::<GtoResult<Vec<_>>>()?;
        GameCards::new(board, hands)
    }

    /// Parse board-then-hands notation, e.g. "2c3c4c5c7d AcAd KcKd".
    pub fn parse(notation: &str) -> GtoResult<GameCards> {
        GameCards::from_cards(&crate::cards::parse_cards(notation)?)
    }

    /// Deal a uniformly random board and `num_hands` hole-card pairs.
    pub fn sample<R: Rng>(rng: &mut R, num_hands: usize) -> GameCards {
        debug_assert!((2..=MAX_SEATS).contains(&num_hands));
        let needed = NUM_BOARD_CARDS + 2 * num_hands;
        let mut deck: [u8; DECK_SIZE as usize] = std::array::from_fn(|i| i as u8);
        // partial Fisher-Yates: only the first `needed` slots matter
        for k in 0..needed {
            let swap = rng.gen_range(k..deck.len());
            deck.swap(k, swap);
        }
        let cards: Vec<Card> = deck[..needed]
            .iter()
            .map(|&i| Card::from_index(i).expect("deck index"))
            .collect();
        GameCards::from_cards(&cards).expect("sampled cards are distinct")
    }

    #[inline]
    pub fn board(&self) -> &[Card; NUM_BOARD_CARDS] {
        &self.board
    }

    #[inline]
    pub fn hand(&self, seat: usize) -> Hand {
        self.hands[seat]
    }

    #[inline]
    pub fn num_hands(&self) -> usize {
        self.hands.len()
    }

    /// First `n` board cards (3 = flop, 4 = turn, 5 = river).
    pub fn board_prefix(&self, n: usize) -> GtoResult<&[Card]> {
        if n > NUM_BOARD_CARDS {
            return Err(GtoError::InvalidBoardSize(n));
        }
        Ok(&self.board[..n])
    }

    pub fn board_cardset(&self, n: usize) -> GtoResult<CardSet> {
        Ok(CardSet::from_cards(self.board_prefix(n)?))
    }

    /// Seven-card strength of one seat's holding on the full board.
    pub fn strength(&self, seat: usize) -> HandResult {
        let cs = CardSet::from_cards(&self.board).combine(self.hands[seat].as_cardset());
        evaluate_unsafe(cs)
    }
}

impl fmt::Display for GameCards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for c in &self.board {
            write!(f, "{}", c)?;
        }
        write!(f, ") [")?;
        for (i, h) in self.hands.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "({})", h)?;
        }
        write!(f, "]")
    }
}

// ---------------------------------------------------------------------------
// Pots
// ---------------------------------------------------------------------------

/// One (side) pot: seats eligible to win it, and the per-seat contribution
/// band `(lower, upper]` it collects from the committed chips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pot {
    pub eligible: Vec<usize>,
    pub upper: i32,
    pub lower: i32,
}

// ---------------------------------------------------------------------------
// Game state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    seats: usize,
    rake: Rake,
    chips_behind: [i32; MAX_SEATS],
    chips_front: [i32; MAX_SEATS],
    seat_state: [SeatState; MAX_SEATS],
    minraise: i32,
    current: usize,
    street: Street,
    /// Rake only applies once a flop has been dealt (or would be dealt for
    /// an all-in showdown).
    flop_dealt: bool,
}

impl GameState {
    /// New hand where every seat starts with the same `stack` (>= 1000 mBB).
    pub fn new(seats: usize, stack: i32, rake: Rake) -> GtoResult<GameState> {
        if !(2..=MAX_SEATS).contains(&seats) {
            return Err(GtoError::InvalidSeatCount(seats));
        }
        if stack < BIG_BLIND {
            return Err(GtoError::StackTooSmall(stack));
        }
        let stacks = [stack; MAX_SEATS];
        GameState::with_stacks(&stacks[..seats], rake)
    }

    /// New hand with per-seat starting stacks; the blind seats must cover
    /// their blinds.
    pub fn with_stacks(stacks: &[i32], rake: Rake) -> GtoResult<GameState> {
        let seats = stacks.len();
        if !(2..=MAX_SEATS).contains(&seats) {
            return Err(GtoError::InvalidSeatCount(seats));
        }
        if rake.denominator == 0 || rake.numerator >= rake.denominator {
            return Err(GtoError::InvalidRake {
                numerator: rake.numerator,
                denominator: rake.denominator,
            });
        }
        if stacks[0] < SMALL_BLIND {
            return Err(GtoError::StackTooSmall(stacks[0]));
        }
        if stacks[1] < BIG_BLIND {
            return Err(GtoError::StackTooSmall(stacks[1]));
        }

        let mut chips_front = [0i32; MAX_SEATS];
        let mut chips_behind = [0i32; MAX_SEATS];
        let mut seat_state = [SeatState::Out; MAX_SEATS];
        chips_front[0] = SMALL_BLIND;
        chips_front[1] = BIG_BLIND;
        for i in 0..seats {
            chips_behind[i] = stacks[i] - chips_front[i];
            seat_state[i] = SeatState::Init;
        }

        Ok(GameState {
            seats,
            rake,
            chips_behind,
            chips_front,
            seat_state,
            minraise: BIG_BLIND,
            // heads-up the small blind is the button and opens the betting
            current: if seats > 2 { 2 } else { 0 },
            street: Street::Preflop,
            flop_dealt: false,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[inline]
    pub fn seats(&self) -> usize {
        self.seats
    }

    #[inline]
    pub fn rake(&self) -> Rake {
        self.rake
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.street == Street::Finished
    }

    /// More than one seat still alive; at a terminal state this means the
    /// pot goes to a showdown.
    #[inline]
    pub fn is_showdown(&self) -> bool {
        self.num_alive() > 1
    }

    #[inline]
    pub fn street(&self) -> Street {
        self.street
    }

    #[inline]
    pub fn active_seat(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn active_seat_state(&self) -> SeatState {
        self.seat_state[self.current]
    }

    #[inline]
    pub fn seat_states(&self) -> &[SeatState] {
        &self.seat_state[..self.seats]
    }

    #[inline]
    pub fn chips_front(&self) -> &[i32] {
        &self.chips_front[..self.seats]
    }

    #[inline]
    pub fn chips_behind(&self) -> &[i32] {
        &self.chips_behind[..self.seats]
    }

    #[inline]
    pub fn minraise(&self) -> i32 {
        self.minraise
    }

    #[inline]
    pub fn flop_dealt(&self) -> bool {
        self.flop_dealt
    }

    pub fn current_highest_bet(&self) -> i32 {
        *self.chips_front().iter().max().expect("at least two seats")
    }

    /// Chips the active seat must add to match the highest bet.
    pub fn amount_to_call(&self) -> i32 {
        self.current_highest_bet() - self.chips_front[self.current]
    }

    /// Total committed chips, not adjusted for rake or returned chips.
    pub fn pot_size(&self) -> i32 {
        self.chips_front().iter().sum()
    }

    /// Pot after removing any unmatched bet and applying rake.
    pub fn pot_size_rake_adjusted(&self) -> i32 {
        self.apply_rake(self.pot_size() - self.chips_to_return().1)
    }

    /// Chips the house takes from the current pot.
    pub fn rake_size(&self) -> i32 {
        let pot = self.pot_size() - self.chips_to_return().1;
        pot - self.apply_rake(pot)
    }

    fn apply_rake(&self, amount: i32) -> i32 {
        if self.flop_dealt && self.rake.numerator > 0 {
            amount
                - (amount as i64 * self.rake.numerator as i64 / self.rake.denominator as i64)
                    as i32
        } else {
            amount
        }
    }

    /// If the last call or fold left exactly one seat with an unmatched
    /// bet, that excess is returned to it and is not part of any pot.
    /// Returns `(seat, amount)`; amount 0 when nothing is returned.
    pub fn chips_to_return(&self) -> (usize, i32) {
        let highest = self.current_highest_bet();
        let front = self.chips_front();
        if front.iter().filter(|&&c| c == highest).count() < 2 {
            let seat = front
                .iter()
                .position(|&c| c == highest)
                .expect("some seat holds the highest bet");
            let mut sorted: Vec<i32> = front.to_vec();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            (seat, highest - sorted[1])
        } else {
            (0, 0)
        }
    }

    /// Main pot and side pots with their eligible seats, only available at
    /// a terminal state. Folded seats are never eligible but their chips
    /// stay in the pots they contributed to.
    pub fn all_pots(&self) -> GtoResult<Vec<Pot>> {
        if !self.is_terminal() {
            return Err(GtoError::NotTerminal);
        }

        let mut front: Vec<i32> = self.chips_front().to_vec();
        let (return_seat, return_amount) = self.chips_to_return();
        front[return_seat] -= return_amount;

        let mut by_chips: Vec<(i32, usize)> =
            front.iter().copied().zip(0..self.seats).collect();
        by_chips.sort_by(|lhs, rhs| rhs.0.cmp(&lhs.0));

        let mut pots = Vec::new();
        let mut eligible: Vec<usize> = Vec::new();
        let mut upper = by_chips[0].0;
        for &(chips, seat) in &by_chips {
            if self.seat_state[seat] == SeatState::Out {
                // cannot win, chips stay in the pot
            } else if chips == upper {
                eligible.push(seat);
            } else if self.seat_state[seat] == SeatState::AllIn {
                // shorter all-in: close the current pot and open a side pot
                pots.push(Pot {
                    eligible: eligible.clone(),
                    upper,
                    lower: chips,
                });
                upper = chips;
                eligible.push(seat);
            }
        }
        pots.push(Pot {
            eligible,
            upper,
            lower: 0,
        });
        Ok(pots)
    }

    // -----------------------------------------------------------------------
    // Legal actions
    // -----------------------------------------------------------------------

    /// All legal actions for the active seat; empty iff the hand is over.
    pub fn possible_actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        let seat = self.current;

        if self.street == Street::Finished
            || self.seat_state[seat] == SeatState::Out
            || self.seat_state[seat] == SeatState::AllIn
        {
            return actions;
        }

        // folding is always allowed once the early exits are done
        actions.push(Action::new(0, ActionKind::Fold, seat));

        let highest = self.current_highest_bet();
        let committed = self.chips_front[seat];
        let remaining = self.chips_behind[seat];
        let total = committed + remaining;

        if committed == highest {
            actions.push(Action::new(0, ActionKind::Check, seat));
        }

        // calling needs chips left over; matching exactly is an all-in
        if committed < highest && total > highest {
            actions.push(Action::new(highest - committed, ActionKind::Call, seat));
        }

        // raising requires room above the minimum raise, and is closed to a
        // seat that already acted unless the last raise was a full one
        let min_raise_to = highest + self.minraise;
        if total > min_raise_to
            && (self.seat_state[seat] == SeatState::Init
                || (committed < highest && highest - committed >= self.minraise))
        {
            let mut amount = min_raise_to - committed;
            while amount < remaining {
                actions.push(Action::new(amount, ActionKind::Raise, seat));
                amount += RAISE_STEP;
            }
        }

        if remaining > 0 {
            actions.push(Action::new(remaining, ActionKind::AllIn, seat));
        }
        actions
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Apply an action for the active seat and advance the hand.
    ///
    /// The action must come from `possible_actions()`; this is checked in
    /// debug builds only, the release hot path trusts the caller.
    pub fn execute_action(&mut self, action: &Action) {
        debug_assert_eq!(
            action.seat, self.current,
            "action seat does not match the active seat"
        );
        debug_assert!(
            self.possible_actions().contains(action),
            "illegal action {} in {}",
            action,
            self
        );

        let seat = action.seat;
        match action.kind {
            ActionKind::Fold => self.seat_state[seat] = SeatState::Out,
            ActionKind::Check => self.seat_state[seat] = SeatState::Alive,
            ActionKind::Call | ActionKind::Raise | ActionKind::AllIn => {
                let raise_size =
                    action.amount + self.chips_front[seat] - self.current_highest_bet();
                if raise_size > self.minraise {
                    self.minraise = raise_size;
                }
                self.chips_behind[seat] -= action.amount;
                self.chips_front[seat] += action.amount;
                self.seat_state[seat] = if self.chips_behind[seat] == 0 {
                    SeatState::AllIn
                } else {
                    SeatState::Alive
                };
            }
        }
        self.advance();
    }

    fn advance(&mut self) {
        let num_act = self.num_actionable();

        // the entire hand ended: everyone folded, or nobody can act and at
        // most one seat could act on a later street
        if self.num_alive() < 2 || (num_act == 0 && self.num_future_actionable() < 2) {
            if !self.flop_dealt
                && self.seat_states().contains(&SeatState::AllIn)
            {
                // remaining streets run out for the all-in showdown
                self.flop_dealt = true;
            }
            self.street = Street::Finished;
            return;
        }

        // a lone seat left to act that already matches the highest bet:
        // showdown, the remaining streets are dealt
        if num_act == 1 && self.num_future_actionable() == 1 {
            let last = self
                .seat_states()
                .iter()
                .position(|&s| s != SeatState::Out && s != SeatState::AllIn)
                .expect("one future-actionable seat");
            if self.chips_front[last] == self.current_highest_bet() {
                self.flop_dealt = true;
                self.street = Street::Finished;
                return;
            }
        }

        if num_act == 0 {
            if self.street == Street::River {
                self.street = Street::Finished;
                return;
            }
            // betting round over: first to act is the lowest live seat
            self.current = self
                .seat_states()
                .iter()
                .position(|&s| s != SeatState::Out && s != SeatState::AllIn)
                .expect("a seat can act next street");
            self.minraise = BIG_BLIND;
            self.street = self.street.next();
            if self.street == Street::Flop {
                self.flop_dealt = true;
            }
            for st in self.seat_state[..self.seats].iter_mut() {
                if *st == SeatState::Alive {
                    *st = SeatState::Init;
                }
            }
            return;
        }

        // next seat's turn
        loop {
            self.current = (self.current + 1) % self.seats;
            let st = self.seat_state[self.current];
            if st != SeatState::Out && st != SeatState::AllIn {
                break;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Payouts
    // -----------------------------------------------------------------------

    /// Per-seat chip deltas when the hand ended in a showdown. The sum over
    /// all seats equals minus the rake (zero without a flop).
    pub fn payouts_showdown(&self, cards: &GameCards) -> GtoResult<Vec<i32>> {
        if !self.is_terminal() {
            return Err(GtoError::NotTerminal);
        }
        if !self.is_showdown() {
            return Err(GtoError::NoShowdown);
        }
        debug_assert_eq!(cards.num_hands(), self.seats);

        let mut payouts = vec![0i32; self.seats];
        for pot in self.all_pots()? {
            self.settle_pot(cards, &pot, &mut payouts);
        }
        Ok(payouts)
    }

    fn settle_pot(&self, cards: &GameCards, pot: &Pot, payouts: &mut [i32]) {
        let strengths: Vec<(HandResult, usize)> = pot
            .eligible
            .iter()
            .map(|&seat| (cards.strength(seat), seat))
            .collect();
        let best = strengths
            .iter()
            .map(|&(r, _)| r)
            .max()
            .expect("pot has an eligible seat");
        let winners: Vec<usize> = strengths
            .iter()
            .filter(|&&(r, _)| r == best)
            .map(|&(_, seat)| seat)
            .collect();

        let contribution = |seat: usize| -> i32 {
            let chips = self.chips_front[seat];
            if chips <= pot.lower {
                0
            } else {
                chips.min(pot.upper) - pot.lower
            }
        };

        let total: i32 = (0..self.seats).map(contribution).sum();
        let share = self.apply_rake(total) / winners.len() as i32;
        for seat in 0..self.seats {
            payouts[seat] -= contribution(seat);
            if winners.contains(&seat) {
                payouts[seat] += share;
            }
        }
    }

    /// Per-seat chip deltas when all but one seat folded. The survivor
    /// collects the whole pot, raked only if a flop was dealt.
    pub fn payouts_no_showdown(&self) -> GtoResult<Vec<i32>> {
        if !self.is_terminal() {
            return Err(GtoError::NotTerminal);
        }
        if self.is_showdown() {
            return Err(GtoError::ShowdownRequiresCards);
        }

        let pot = self.apply_rake(self.pot_size());
        let winner = self
            .seat_states()
            .iter()
            .position(|&s| s != SeatState::Out)
            .expect("one seat remains");
        Ok((0..self.seats)
            .map(|seat| {
                if seat == winner {
                    pot - self.chips_front[seat]
                } else {
                    -self.chips_front[seat]
                }
            })
            .collect())
    }

    // -----------------------------------------------------------------------
    // Seat counting helpers
    // -----------------------------------------------------------------------

    fn num_alive(&self) -> usize {
        self.seat_states()
            .iter()
            .filter(|&&s| s != SeatState::Out)
            .count()
    }

    /// Seats that can still act in this betting round.
    fn num_actionable(&self) -> usize {
        let highest = self.current_highest_bet();
        (0..self.seats)
            .filter(|&i| {
                self.seat_state[i] == SeatState::Init
                    || (self.seat_state[i] == SeatState::Alive && self.chips_front[i] < highest)
            })
            .count()
    }

    /// Seats that could act in a later betting round.
    fn num_future_actionable(&self) -> usize {
        self.seat_states()
            .iter()
            .filter(|&&s| s != SeatState::Out && s != SeatState::AllIn)
            .count()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pot {} minraise {} |",
            self.street,
            self.pot_size(),
            self.minraise
        )?;
        for i in 0..self.seats {
            write!(
                f,
                " P{}{}({:?},{}/{})",
                i,
                if i == self.current { "*" } else { "" },
                self.seat_state[i],
                self.chips_front[i],
                self.chips_behind[i],
            )?;
        }
        Ok(())
    }
}
