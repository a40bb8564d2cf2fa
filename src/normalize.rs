//! Suit-isomorphism normalization for a hole-card pair plus board.
//!
//! Two configurations that differ only by a relabeling of suits are
//! strategically identical. `suit_normalization_permutation` picks the
//! permutation that maps a configuration onto the canonical representative
//! of its equivalence class; ranks are never touched.

use crate::cardset::CardSet;
use crate::error::{GtoError, GtoResult};
use crate::hand::Hand;

/// Fixed permutation-choice table indexed by the two hole-card suits.
/// The tie-breaking passes below depend on this exact seeding; do not
/// re-derive it at runtime.
const CHOOSE: [[[u8; 4]; 4]; 4] = [
    [[0, 1, 2, 3], [0, 1, 2, 3], [0, 2, 1, 3], [0, 3, 1, 2]],
    [[1, 0, 2, 3], [1, 0, 2, 3], [1, 2, 0, 3], [1, 3, 0, 2]],
    [[2, 0, 1, 3], [2, 1, 0, 3], [2, 0, 1, 3], [2, 3, 0, 1]],
    [[3, 0, 1, 2], [3, 1, 0, 2], [3, 2, 0, 1], [3, 0, 1, 2]],
];

/// Compute the suit permutation that maps `hand` + `board` (3..=5 cards)
/// into canonical form. Apply it with [`CardSet::rotate_suits`].
pub fn suit_normalization_permutation(hand: Hand, board: CardSet) -> GtoResult<[u8; 4]> {
    let board_size = board.size();
    if !(3..=5).contains(&board_size) {
        return Err(GtoError::InvalidBoardSize(board_size));
    }
    let all = board.combine(hand.as_cardset());
    if all.size() != board_size + 2 {
        return Err(GtoError::DuplicateCards(format!("{}/{}", hand, board)));
    }

    let masks = all.rank_masks();
    let mask_at = |suit: u8| masks[suit as usize];

    let s1 = hand.low().suit.index() as usize;
    let s2 = hand.high().suit.index() as usize;
    let mut temp = CHOOSE[s1][s2];

    if hand.is_suited() {
        // The hand suit stays in front; order the other three by card
        // count, then by the higher rank mask.
        let mut tail = [
            (temp[1], mask_at(temp[1])),
            (temp[2], mask_at(temp[2])),
            (temp[3], mask_at(temp[3])),
        ];
        tail.sort_by(|lhs, rhs| {
            rhs.1
                .count_ones()
                .cmp(&lhs.1.count_ones())
                .then(rhs.1.cmp(&lhs.1))
        });
        temp[1] = tail[0].0;
        temp[2] = tail[1].0;
        temp[3] = tail[2].0;
    } else {
        if hand.is_pair() && mask_at(temp[0]) < mask_at(temp[1]) {
            temp.swap(0, 1);
        }
        if mask_at(temp[2]) < mask_at(temp[3]) {
            temp.swap(2, 3);
        }
    }

    // invert: suit temp[u] moves to label u
    let mut perm = [0u8; 4];
    for (u, &t) in temp.iter().enumerate() {
        perm[t as usize] = u as u8;
    }
    Ok(perm)
}
