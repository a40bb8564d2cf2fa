//! Branch-light 7-card Hold'em evaluator.
//!
//! A holding is decomposed into four 13-bit rank masks, one per suit, and
//! the categories are checked from strongest to weakest with an early exit
//! at the first match. Straight detection and top-k kicker selection go
//! through three precomputed 2^13 lookup tables built on first use.
//!
//! The result is a packed 32-bit integer whose unsigned order is exactly
//! the poker hand order, so showdowns reduce to an integer compare.

use std::fmt;

use once_cell::sync::Lazy;

use crate::cards::{Rank, RANK_MASK};
use crate::cardset::CardSet;
use crate::error::{GtoError, GtoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
}

impl HandCategory {
    fn from_index(idx: u32) -> HandCategory {
        match idx {
            0 => HandCategory::HighCard,
            1 => HandCategory::OnePair,
            2 => HandCategory::TwoPair,
            3 => HandCategory::ThreeOfAKind,
            4 => HandCategory::Straight,
            5 => HandCategory::Flush,
            6 => HandCategory::FullHouse,
            7 => HandCategory::FourOfAKind,
            _ => HandCategory::StraightFlush,
        }
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandCategory::HighCard => write!(f, "High Card"),
            HandCategory::OnePair => write!(f, "One Pair"),
            HandCategory::TwoPair => write!(f, "Two Pair"),
            HandCategory::ThreeOfAKind => write!(f, "Three of a Kind"),
            HandCategory::Straight => write!(f, "Straight"),
            HandCategory::Flush => write!(f, "Flush"),
            HandCategory::FullHouse => write!(f, "Full House"),
            HandCategory::FourOfAKind => write!(f, "Four of a Kind"),
            HandCategory::StraightFlush => write!(f, "Straight Flush"),
        }
    }
}

// Packed layout, high to low:
//   bits 21..25  category
//   bits 17..21  major rank (pairs, trips, quads, straights, boat top)
//   bits 13..17  minor rank (two-pair low, boat bottom)
//   bits  0..13  kicker mask, one bit per rank
const OFFSET_MINOR: u32 = 13;
const OFFSET_MAJOR: u32 = 17;
const OFFSET_CATEGORY: u32 = 21;

/// Total hand strength as a packed 32-bit integer; `a > b` iff hand `a`
/// beats hand `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandResult(u32);

impl HandResult {
    fn pack(category: HandCategory, major: u8, minor: u8, kickers: u16) -> HandResult {
        HandResult(
            (category as u32) << OFFSET_CATEGORY
                | (major as u32) << OFFSET_MAJOR
                | (minor as u32) << OFFSET_MINOR
                | (kickers & RANK_MASK) as u32,
        )
    }

    /// Checked construction for hand-crafted results (mostly test support).
    pub fn new(
        category: HandCategory,
        major: u8,
        minor: u8,
        kickers: u16,
    ) -> GtoResult<HandResult> {
        use HandCategory::*;
        let fail = |what: &str| {
            Err(GtoError::InvalidHandResult(format!(
                "{} for {:?} (major {}, minor {}, kickers {:#015b})",
                what, category, major, minor, kickers
            )))
        };

        if major > Rank::Ace as u8 || minor > Rank::Ace as u8 {
            return fail("rank out of bounds");
        }
        match category {
            HighCard | Flush if major > 0 => return fail("unexpected major rank"),
            Straight | StraightFlush if major < Rank::Five as u8 => {
                return fail("straight below five-high")
            }
            _ => {}
        }
        match category {
            TwoPair if minor >= major => return fail("minor must be below major"),
            FullHouse if minor == major => return fail("minor must differ from major"),
            HighCard | OnePair | ThreeOfAKind | Straight | Flush | FourOfAKind
            | StraightFlush
                if minor > 0 =>
            {
                return fail("unexpected minor rank")
            }
            _ => {}
        }
        let kicker_count = (kickers & RANK_MASK).count_ones();
        let overlap = |rank: u8| kickers & (1u16 << rank) != 0;
        let kickers_ok = match category {
            HighCard | Flush => kicker_count <= 5,
            OnePair => kicker_count <= 3 && !overlap(major),
            TwoPair => kicker_count <= 1 && !overlap(major) && !overlap(minor),
            ThreeOfAKind => kicker_count <= 2 && !overlap(major),
            FourOfAKind => kicker_count <= 1,
            Straight | FullHouse | StraightFlush => kicker_count == 0,
        };
        if !kickers_ok {
            return fail("bad kickers");
        }
        Ok(HandResult::pack(category, major, minor, kickers))
    }

    #[inline]
    pub fn category(self) -> HandCategory {
        HandCategory::from_index(self.0 >> OFFSET_CATEGORY)
    }

    /// Major rank; meaningful for pairs, trips, quads, straights and the
    /// top of a full house.
    #[inline]
    pub fn major_rank(self) -> Rank {
        Rank::from_index(((self.0 >> OFFSET_MAJOR) & 0xF) as u8).expect("packed rank")
    }

    /// Minor rank; meaningful for two pair and the bottom of a full house.
    #[inline]
    pub fn minor_rank(self) -> Rank {
        Rank::from_index(((self.0 >> OFFSET_MINOR) & 0xF) as u8).expect("packed rank")
    }

    /// Kicker mask, one bit per rank, up to five bits set.
    #[inline]
    pub fn kickers(self) -> u16 {
        (self.0 & RANK_MASK as u32) as u16
    }

    #[inline]
    pub fn as_bits(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use HandCategory::*;
        let kicker_high = || {
            Rank::from_index(high_bit(self.kickers())).expect("kicker rank")
        };
        match self.category() {
            HighCard => write!(f, "high card, {}", kicker_high().name()),
            OnePair => write!(f, "a pair of {}", self.major_rank().name_plural()),
            TwoPair => write!(
                f,
                "two pairs, {} and {}",
                self.major_rank().name_plural(),
                self.minor_rank().name_plural()
            ),
            ThreeOfAKind => write!(f, "three of a kind, {}", self.major_rank().name_plural()),
            Straight => write!(f, "a straight, {} high", self.major_rank().name()),
            Flush => write!(f, "a flush, {} high", kicker_high().name()),
            FullHouse => write!(
                f,
                "a full house, {} full of {}",
                self.major_rank().name_plural(),
                self.minor_rank().name_plural()
            ),
            FourOfAKind => write!(f, "four of a kind, {}", self.major_rank().name_plural()),
            StraightFlush => write!(f, "a straight flush, {} high", self.major_rank().name()),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

const TABLE_SIZE: usize = 1 << 13;
const WHEEL: u16 = (1 << 12) | 0b1111; // A-2-3-4-5

/// Top rank of the best straight in a rank mask, 0 if none.
static STRAIGHT_HIGH: Lazy<Box<[u8]>> = Lazy::new(|| {
    let mut table = vec![0u8; TABLE_SIZE];
    for (mask, slot) in table.iter_mut().enumerate() {
        let mask = mask as u16;
        for high in (4..=12u8).rev() {
            let run = 0b11111u16 << (high - 4);
            if mask & run == run {
                *slot = high;
                break;
            }
        }
        if *slot == 0 && mask & WHEEL == WHEEL {
            *slot = Rank::Five as u8;
        }
    }
    table.into_boxed_slice()
});

/// Mask reduced to its five highest set bits.
static TOP5: Lazy<Box<[u16]>> = Lazy::new(|| build_top_table(5));

/// Mask reduced to its three highest set bits.
static TOP3: Lazy<Box<[u16]>> = Lazy::new(|| build_top_table(3));

fn build_top_table(keep: u32) -> Box<[u16]> {
    let mut table = vec![0u16; TABLE_SIZE];
    for (mask, slot) in table.iter_mut().enumerate() {
        let mut m = mask as u16;
        while m.count_ones() > keep {
            m &= m - 1;
        }
        *slot = m;
    }
    table.into_boxed_slice()
}

#[inline]
fn high_bit(mask: u16) -> u8 {
    if mask == 0 {
        0
    } else {
        15 - mask.leading_zeros() as u8
    }
}

#[inline]
fn low_bit(mask: u16) -> u8 {
    if mask == 0 {
        0
    } else {
        mask.trailing_zeros() as u8
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate a set of at most 7 cards. The caller must guarantee the size
/// bound; beyond 7 cards the result is meaningless (but never UB).
pub fn evaluate_unsafe(cs: CardSet) -> HandResult {
    use HandCategory::*;

    let [mc, md, mh, ms] = cs.rank_masks();

    // A flush rules out quads and full houses on 7 cards, so it is safe to
    // return immediately.
    let flush_or_straight_flush = |mask: u16| {
        let high = STRAIGHT_HIGH[mask as usize];
        if high > 0 {
            HandResult::pack(StraightFlush, high, 0, 0)
        } else {
            HandResult::pack(Flush, 0, 0, TOP5[mask as usize])
        }
    };
    if mc.count_ones() >= 5 {
        return flush_or_straight_flush(mc);
    }
    if md.count_ones() >= 5 {
        return flush_or_straight_flush(md);
    }
    if mh.count_ones() >= 5 {
        return flush_or_straight_flush(mh);
    }
    if ms.count_ones() >= 5 {
        return flush_or_straight_flush(ms);
    }

    let any = mc | md | mh | ms;

    let quads = mc & md & mh & ms;
    if quads != 0 {
        let q = high_bit(quads);
        let kicker = high_bit(any & !quads);
        return HandResult::pack(FourOfAKind, q, 0, 1 << kicker);
    }

    let trips = ((mc & md) | (mh & ms)) & ((mc & mh) | (md & ms));
    if trips != 0 {
        // Double trips: with 7 cards there is no room for a separate pair,
        // the lower trips provides the boat bottom.
        if trips.count_ones() > 1 {
            return HandResult::pack(FullHouse, high_bit(trips), low_bit(trips), 0);
        }
        // Ranks held exactly twice.
        let pairs = any ^ (mc ^ md ^ mh ^ ms);
        if pairs != 0 {
            return HandResult::pack(FullHouse, high_bit(trips), high_bit(pairs), 0);
        }
    }

    let straight = STRAIGHT_HIGH[any as usize];
    if straight > 0 {
        return HandResult::pack(Straight, straight, 0, 0);
    }

    if trips != 0 {
        let kickers = any & !trips;
        let hi = high_bit(kickers);
        let lo = high_bit(kickers & !(1u16 << hi));
        return HandResult::pack(ThreeOfAKind, high_bit(trips), 0, (1 << hi) | (1 << lo));
    }

    let pairs = any ^ (mc ^ md ^ mh ^ ms);
    match pairs.count_ones() {
        // Up to three pairs on 7 cards; the third falls into the kickers.
        n if n > 1 => {
            let hi = high_bit(pairs);
            let lo = high_bit(pairs & !(1u16 << hi));
            let kicker = high_bit(any & !((1u16 << hi) | (1u16 << lo)));
            HandResult::pack(TwoPair, hi, lo, 1 << kicker)
        }
        1 => HandResult::pack(OnePair, high_bit(pairs), 0, TOP3[(any & !pairs) as usize]),
        _ => HandResult::pack(HighCard, 0, 0, TOP5[any as usize]),
    }
}

/// Evaluate a set of 5 to 7 cards, validating the size.
pub fn evaluate(cs: CardSet) -> GtoResult<HandResult> {
    let size = cs.size();
    if !(5..=7).contains(&size) {
        return Err(GtoError::WrongCardCount {
            min: 5,
            max: 7,
            got: size,
        });
    }
    Ok(evaluate_unsafe(cs))
}
