use std::fmt;

use crate::error::{GtoError, GtoResult};

pub const RANKS_STR: &str = "23456789TJQKA";
pub const SUITS_STR: &str = "cdhs";

pub const NUM_RANKS: u8 = 13;
pub const NUM_SUITS: u8 = 4;
pub const DECK_SIZE: u8 = NUM_RANKS * NUM_SUITS;

/// All 13 rank bits set.
pub const RANK_MASK: u16 = 0b0001_1111_1111_1111;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Two = 0,
    Three = 1,
    Four = 2,
    Five = 3,
    Six = 4,
    Seven = 5,
    Eight = 6,
    Nine = 7,
    Ten = 8,
    Jack = 9,
    Queen = 10,
    King = 11,
    Ace = 12,
}

impl Rank {
    pub fn from_char(c: char) -> GtoResult<Rank> {
        match c.to_ascii_uppercase() {
            '2' => Ok(Rank::Two),
            '3' => Ok(Rank::Three),
            '4' => Ok(Rank::Four),
            '5' => Ok(Rank::Five),
            '6' => Ok(Rank::Six),
            '7' => Ok(Rank::Seven),
            '8' => Ok(Rank::Eight),
            '9' => Ok(Rank::Nine),
            'T' => Ok(Rank::Ten),
            'J' => Ok(Rank::Jack),
            'Q' => Ok(Rank::Queen),
            'K' => Ok(Rank::King),
            'A' => Ok(Rank::Ace),
            _ => Err(GtoError::InvalidRank(c)),
        }
    }

    pub fn from_index(idx: u8) -> GtoResult<Rank> {
        ALL_RANKS
            .get(idx as usize)
            .copied()
            .ok_or(GtoError::InvalidCardIndex(idx))
    }

    pub fn to_char(self) -> char {
        RANKS_STR.as_bytes()[self as usize] as char
    }

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// One-hot bit inside a 13-bit rank mask.
    #[inline]
    pub fn bit(self) -> u16 {
        1u16 << (self as u8)
    }

    /// Singular name, e.g. "Ace".
    pub fn name(self) -> &'static str {
        const NAMES: [&str; 13] = [
            "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Jack",
            "Queen", "King", "Ace",
        ];
        NAMES[self as usize]
    }

    /// Plural name, e.g. "Aces" ("Sixes" for the odd one out).
    pub fn name_plural(self) -> String {
        if self == Rank::Six {
            format!("{}es", self.name())
        } else {
            format!("{}s", self.name())
        }
    }
}

pub const ALL_RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

/// Suits in canonical (alphabetical) order: clubs, diamonds, hearts, spades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Clubs = 0,
    Diamonds = 1,
    Hearts = 2,
    Spades = 3,
}

impl Suit {
    pub fn from_char(c: char) -> GtoResult<Suit> {
        match c.to_ascii_lowercase() {
            'c' => Ok(Suit::Clubs),
            'd' => Ok(Suit::Diamonds),
            'h' => Ok(Suit::Hearts),
            's' => Ok(Suit::Spades),
            _ => Err(GtoError::InvalidSuit(c)),
        }
    }

    pub fn from_index(idx: u8) -> GtoResult<Suit> {
        ALL_SUITS
            .get(idx as usize)
            .copied()
            .ok_or(GtoError::InvalidCardIndex(idx))
    }

    pub fn to_char(self) -> char {
        SUITS_STR.as_bytes()[self as usize] as char
    }

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }
}

pub const ALL_SUITS: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

/// A playing card with the canonical deck index `rank + 13 * suit`,
/// i.e. 0 = 2c, 12 = Ac, 13 = 2d, ..., 51 = As.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    /// Create from the canonical deck index 0..52.
    pub fn from_index(idx: u8) -> GtoResult<Card> {
        if idx >= DECK_SIZE {
            return Err(GtoError::InvalidCardIndex(idx));
        }
        Ok(Card {
            rank: ALL_RANKS[(idx % NUM_RANKS) as usize],
            suit: ALL_SUITS[(idx / NUM_RANKS) as usize],
        })
    }

    #[inline]
    pub fn index(self) -> u8 {
        self.rank.index() + NUM_RANKS * self.suit.index()
    }

    /// One-hot representation inside a 64-bit card set.
    #[inline]
    pub fn bit(self) -> u64 {
        1u64 << self.index()
    }

    pub fn parse(notation: &str) -> GtoResult<Card> {
        let notation = notation.trim();
        let mut chars = notation.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(s), None) => Ok(Card::new(Rank::from_char(r)?, Suit::from_char(s)?)),
            _ => Err(GtoError::InvalidCardNotation(notation.to_string())),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.to_char(), self.suit.to_char())
    }
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Cards order by rank first, suit second.
impl Ord for Card {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank.cmp(&other.rank).then(self.suit.cmp(&other.suit))
    }
}

/// Parse a run of concatenated card tokens, e.g. "AsKdQh" or "As Kd Qh".
pub fn parse_cards(notation: &str) -> GtoResult<Vec<Card>> {
    let cleaned = notation.trim().replace([' ', ','], "");
    if cleaned.len() % 2 != 0 {
        return Err(GtoError::InvalidCardNotation(notation.to_string()));
    }
    let chars: Vec<char> = cleaned.chars().collect();
    let mut cards = Vec::with_capacity(chars.len() / 2);
    for pair in chars.chunks(2) {
        cards.push(Card::new(
            Rank::from_char(pair[0])?,
            Suit::from_char(pair[1])?,
        ));
    }
    Ok(cards)
}
