//! Exhaustive all-in equity for fixed hole cards.
//!
//! For 2 to 9 hands and up to 5 fixed board cards, every distinct board
//! completion is enumerated. A sole winner scores n points (n = number of
//! hands), tied winners score 1 point each, so relative equity is
//! score / total score. Completions fan out over rayon by the first drawn
//! card.

use std::fmt;

use itertools::Itertools;
use rayon::prelude::*;

use crate::cards::{Card, DECK_SIZE};
use crate::cardset::CardSet;
use crate::error::{GtoError, GtoResult};
use crate::hand::Hand;
use crate::hand_evaluator::evaluate_unsafe;

pub struct EquityResult {
    pub wins: Vec<u32>,
    pub ties: Vec<u32>,
    /// Equity share in percent, summing to ~100.
    pub equities: Vec<f32>,
}

impl fmt::Display for EquityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.equities.len() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(
                f,
                "hand {}: {:.1}% (w {}, t {})",
                i, self.equities[i], self.wins[i], self.ties[i]
            )?;
        }
        Ok(())
    }
}

#[derive(Clone)]
struct Tally {
    wins: Vec<u64>,
    ties: Vec<u64>,
    score: Vec<u64>,
}

impl Tally {
    fn new(n: usize) -> Tally {
        Tally {
            wins: vec![0; n],
            ties: vec![0; n],
            score: vec![0; n],
        }
    }

    fn merge(mut self, other: Tally) -> Tally {
        for i in 0..self.wins.len() {
            self.wins[i] += other.wins[i];
            self.ties[i] += other.ties[i];
            self.score[i] += other.score[i];
        }
        self
    }

    fn record(&mut self, hands: &[Hand], runout: CardSet) {
        let results: Vec<_> = hands
            .iter()
            .map(|h| evaluate_unsafe(runout.combine(h.as_cardset())))
            .collect();
        let best = *results.iter().max().expect("at least two hands");
        let winners = results.iter().filter(|&&r| r == best).count();
        if winners > 1 {
            for (i, &r) in results.iter().enumerate() {
                if r == best {
                    self.ties[i] += 1;
                    self.score[i] += 1;
                }
            }
        } else {
            let winner = results.iter().position(|&r| r == best).expect("winner");
            self.wins[winner] += 1;
            self.score[winner] += hands.len() as u64;
        }
    }
}

/// Enumerate all board completions and report per-hand wins, ties and
/// equity percentages.
pub fn calculate_equities(hands: &[Hand], board: &[Card]) -> GtoResult<EquityResult> {
    if !(2..=9).contains(&hands.len()) {
        return Err(GtoError::InvalidHandCount(hands.len()));
    }
    let mut hole_cards = CardSet::new();
    for h in hands {
        hole_cards.join(h.as_cardset());
    }
    if hole_cards.size() != 2 * hands.len() {
        return Err(GtoError::DuplicateCards(hole_cards.to_string()));
    }

    if board.len() > 5 {
        return Err(GtoError::InvalidBoardSize(board.len()));
    }
    let board_set = CardSet::from_cards(board);
    if board_set.size() != board.len() {
        return Err(GtoError::DuplicateCards(board_set.to_string()));
    }
    let fixed = board_set.combine(hole_cards);
    if fixed.size() != board.len() + 2 * hands.len() {
        return Err(GtoError::DuplicateCards(fixed.to_string()));
    }

    let need = 5 - board.len();
    let tally = if need == 0 {
        let mut t = Tally::new(hands.len());
        t.record(hands, board_set);
        t
    } else {
        let remaining: Vec<Card> = (0..DECK_SIZE)
            .map(|i| Card::from_index(i).expect("deck index"))
            .filter(|c| !fixed.contains(*c))
            .collect();

        (0..remaining.len())
            .into_par_iter()
            .map(|i| {
                let mut t = Tally::new(hands.len());
                let first = board_set.with(remaining[i]);
                for rest in remaining[i + 1..].iter().combinations(need - 1) {
                    let mut runout = first;
                    for &&c in &rest {
                        runout.insert(c);
                    }
                    t.record(hands, runout);
                }
                t
            })
            .reduce(|| Tally::new(hands.len()), Tally::merge)
    };

    let total_score: u64 = tally.score.iter().sum();
    Ok(EquityResult {
        wins: tally.wins.iter().map(|&w| w as u32).collect(),
        ties: tally.ties.iter().map(|&t| t as u32).collect(),
        equities: tally
            .score
            .iter()
            .map(|&s| s as f32 / total_score as f32 * 100.0)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_cards;

    fn hands(list: &[&str]) -> Vec<Hand> {
        list.iter().map(|s| Hand::parse(s).unwrap()).collect()
    }

    #[test]
    fn input_validation() {
        let two = hands(&["AcAd", "KcKd"]);
        assert!(calculate_equities(&two[..1], &[]).is_err());
        assert!(calculate_equities(&hands(&["AcAd", "AcKd"]), &[]).is_err());
        let board = parse_cards("2c2c3d").unwrap();
        assert!(calculate_equities(&two, &board).is_err());
        let overlap = parse_cards("Ac7h9s").unwrap();
        assert!(calculate_equities(&two, &overlap).is_err());
    }

    #[test]
    fn full_board_is_a_single_showdown() {
        let hs = hands(&["AcAd", "KcKd"]);
        let board = parse_cards("2h3h4h5s9d").unwrap();
        let result = calculate_equities(&hs, &board).unwrap();
        assert_eq!(result.wins[0], 1);
        assert_eq!(result.wins[1], 0);
        assert!((result.equities[0] - 100.0).abs() < 1e-3);
    }

    #[test]
    fn chopped_board_scores_ties() {
        // board plays for both
        let hs = hands(&["2c2d", "3c3d"]);
        let board = parse_cards("AhKhQhJsTs").unwrap();
        let result = calculate_equities(&hs, &board).unwrap();
        assert_eq!(result.ties, vec![1, 1]);
        assert!((result.equities[0] - 50.0).abs() < 1e-3);
    }

    #[test]
    fn dominated_hand_on_turn() {
        // one card to come: AK vs AQ on A-high turn, Q has 3 outs of 44
        let hs = hands(&["AcKc", "AdQd"]);
        let board = parse_cards("Ah7s2d9c").unwrap();
        let result = calculate_equities(&hs, &board).unwrap();
        let boards = result.wins[0] + result.wins[1] + result.ties[0];
        assert_eq!(boards, 44);
        assert_eq!(result.wins[1], 3);
    }
}
