//! Weighted preflop ranges on the classic 13x13 grid.
//!
//! Index 0 is AA in the top-left corner; row and column walk down from ace
//! to deuce. The diagonal holds pocket pairs (6 combos each), the upper
//! triangle suited hands (4 combos), the lower triangle off-suit hands
//! (12 combos). Weights are stored pre-multiplied by the combo factor, so
//! one unit equals 1% of a single combo and a cell maxes out at 600, 400
//! or 1200 depending on its kind.

use std::fmt;

use crate::cards::{Rank, NUM_RANKS};
use crate::error::{GtoError, GtoResult};
use crate::hand::Hand;

/// Number of cells in the 13x13 grid.
pub const RANGE_SIZE: usize = (NUM_RANKS * NUM_RANKS) as usize;

/// Sum of all cell maxima: 13*600 + 78*400 + 78*1200.
pub const RANGE_TOTAL_WEIGHT: u32 = 13 * 600 + 78 * 400 + 78 * 1200;

const ACE: u8 = Rank::Ace as u8;

#[derive(Clone, PartialEq, Eq)]
pub struct Range {
    weights: [u16; RANGE_SIZE],
}

impl Default for Range {
    fn default() -> Range {
        Range::new()
    }
}

impl Range {
    /// Empty range.
    pub fn new() -> Range {
        Range {
            weights: [0; RANGE_SIZE],
        }
    }

    /// Range containing every hand at full weight.
    pub fn full() -> Range {
        let mut r = Range::new();
        r.fill();
        r
    }

    /// Parse a comma-separated range string such as "99+,A2s+,KQo+".
    /// A trailing comma is tolerated.
    pub fn parse(notation: &str) -> GtoResult<Range> {
        let mut range = Range::new();
        for token in notation.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            range.apply_token(token)?;
        }
        Ok(range)
    }

    fn apply_token(&mut self, token: &str) -> GtoResult<()> {
        let invalid = || GtoError::InvalidRangeToken(token.to_string());
        let chars: Vec<char> = token.chars().collect();

        let r1 = Rank::from_char(*chars.first().ok_or_else(invalid)?)?;
        let r2 = Rank::from_char(*chars.get(1).ok_or_else(invalid)?)?;

        match chars.len() {
            // "77" is a single pair
            2 => {
                if r1 != r2 {
                    return Err(invalid());
                }
                self.set_pair(r1);
                Ok(())
            }
            // "99+" walks pairs upward; "AKs"/"AKo" is a single combo class
            3 => match chars[2] {
                '+' => {
                    if r1 != r2 {
                        return Err(invalid());
                    }
                    for idx in r1.index()..=ACE {
                        self.set_pair(Rank::from_index(idx)?);
                    }
                    Ok(())
                }
                's' | 'o' => {
                    if r1 == r2 {
                        return Err(invalid());
                    }
                    self.set_unpaired(r1, r2, chars[2] == 's');
                    Ok(())
                }
                _ => Err(invalid()),
            },
            // "A2s+" walks the lower rank up to just below the higher one
            4 => {
                if chars[3] != '+' || (chars[2] != 's' && chars[2] != 'o') || r1 == r2 {
                    return Err(invalid());
                }
                let suited = chars[2] == 's';
                let (lo, hi) = if r1 < r2 { (r1, r2) } else { (r2, r1) };
                for idx in lo.index()..hi.index() {
                    self.set_unpaired(hi, Rank::from_index(idx)?, suited);
                }
                Ok(())
            }
            _ => Err(invalid()),
        }
    }

    fn set_pair(&mut self, r: Rank) {
        let idx = (ACE - r.index()) as usize * 13 + (ACE - r.index()) as usize;
        self.weights[idx] = 600;
    }

    fn set_unpaired(&mut self, a: Rank, b: Rank, suited: bool) {
        let (hi, lo) = if a > b { (a, b) } else { (b, a) };
        let idx = if suited {
            (ACE - hi.index()) as usize * 13 + (ACE - lo.index()) as usize
        } else {
            (ACE - lo.index()) as usize * 13 + (ACE - hi.index()) as usize
        };
        self.weights[idx] = if suited { 400 } else { 1200 };
    }

    // -----------------------------------------------------------------------
    // Static grid geometry
    // -----------------------------------------------------------------------

    /// Grid index for a concrete hole-card pair.
    pub fn index_of(hand: Hand) -> usize {
        let (lo, hi) = (hand.low().rank.index(), hand.high().rank.index());
        if lo == hi {
            (ACE - hi) as usize * 13 + (ACE - hi) as usize
        } else if hand.is_suited() {
            (ACE - hi) as usize * 13 + (ACE - lo) as usize
        } else {
            (ACE - lo) as usize * 13 + (ACE - hi) as usize
        }
    }

    /// Canonical notation for a grid index, e.g. "AA", "AKs", "T9o".
    pub fn hand_label(index: usize) -> String {
        let row = index / 13;
        let col = index % 13;
        let rank_row = Rank::from_index(ACE - row as u8).expect("row within grid");
        let rank_col = Rank::from_index(ACE - col as u8).expect("col within grid");
        if row == col {
            format!("{}{}", rank_row.to_char(), rank_col.to_char())
        } else if row < col {
            format!("{}{}s", rank_row.to_char(), rank_col.to_char())
        } else {
            format!("{}{}o", rank_col.to_char(), rank_row.to_char())
        }
    }

    /// Maximum weight of a cell: 600 for pairs, 400 suited, 1200 off-suit.
    pub fn max_weight(index: usize) -> u16 {
        let row = index / 13;
        let col = index % 13;
        if row == col {
            600
        } else if row < col {
            400
        } else {
            1200
        }
    }

    /// Number of concrete combos a cell stands for (6, 4 or 12).
    pub fn combos_at(index: usize) -> u16 {
        Range::max_weight(index) / 100
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn weight(&self, index: usize) -> u16 {
        self.weights[index]
    }

    pub fn weight_of(&self, hand: Hand) -> u16 {
        self.weights[Range::index_of(hand)]
    }

    /// Cell weight scaled to 0..=100.
    pub fn normalized(&self, index: usize) -> u16 {
        self.weights[index] * 100 / Range::max_weight(index)
    }

    /// Number of concrete combos covered (counting the 4/6/12 factors).
    pub fn hands(&self) -> u16 {
        (0..RANGE_SIZE)
            .filter(|&i| self.weights[i] > 0)
            .map(Range::combos_at)
            .sum()
    }

    /// Number of non-empty cells.
    pub fn size(&self) -> usize {
        self.weights.iter().filter(|&&w| w > 0).count()
    }

    /// Sum of all stored weights.
    pub fn total(&self) -> u32 {
        self.weights.iter().map(|&w| w as u32).sum()
    }

    /// Integer percentage of the full 1326-combo range.
    pub fn percent(&self) -> u16 {
        (self.total() * 100 / RANGE_TOTAL_WEIGHT) as u16
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    pub fn clear(&mut self) {
        self.weights = [0; RANGE_SIZE];
    }

    pub fn fill(&mut self) {
        for i in 0..RANGE_SIZE {
            self.weights[i] = Range::max_weight(i);
        }
    }

    pub fn set_weight(&mut self, index: usize, value: u16) -> GtoResult<()> {
        if index >= RANGE_SIZE {
            return Err(GtoError::RangeIndexOutOfBounds(index));
        }
        let max = Range::max_weight(index);
        if value > max {
            return Err(GtoError::RangeWeightTooLarge { value, max });
        }
        self.weights[index] = value;
        Ok(())
    }

    /// Set a cell from a 0..=100 percentage.
    pub fn set_normalized(&mut self, index: usize, value: u8) -> GtoResult<()> {
        if index >= RANGE_SIZE {
            return Err(GtoError::RangeIndexOutOfBounds(index));
        }
        if value > 100 {
            return Err(GtoError::RangeWeightTooLarge {
                value: value as u16,
                max: 100,
            });
        }
        self.weights[index] = value as u16 * Range::max_weight(index) / 100;
        Ok(())
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Range({} combos, {}%)", self.hands(), self.percent())
    }
}

/// 13x13 grid of normalized percentages, ace row first.
impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    A   K   Q   J   T   9   8   7   6   5   4   3   2")?;
        for row in 0..13 {
            let rank = Rank::from_index(ACE - row as u8).expect("row within grid");
            write!(f, "{} ", rank.to_char())?;
            for col in 0..13 {
                write!(f, "{:>3} ", self.normalized(row * 13 + col))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
