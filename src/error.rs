use thiserror::Error;

#[derive(Error, Debug)]
pub enum GtoError {
    #[error("Invalid rank: {0}")]
    InvalidRank(char),

    #[error("Invalid suit: {0}")]
    InvalidSuit(char),

    #[error("Invalid card index: {0}")]
    InvalidCardIndex(u8),

    #[error("Invalid card notation: {0}")]
    InvalidCardNotation(String),

    #[error("Invalid hand notation: {0}")]
    InvalidHandNotation(String),

    #[error("Invalid range token: {0}")]
    InvalidRangeToken(String),

    #[error("Duplicate cards: {0}")]
    DuplicateCards(String),

    #[error("Need between {min} and {max} cards, got {got}")]
    WrongCardCount { min: usize, max: usize, got: usize },

    #[error("Card set bits beyond the 52-card deck: {0:#x}")]
    InvalidCardBits(u64),

    #[error("Range index out of bounds: {0}")]
    RangeIndexOutOfBounds(usize),

    #[error("Range weight {value} exceeds the cell maximum {max}")]
    RangeWeightTooLarge { value: u16, max: u16 },

    #[error("Invalid hand result: {0}")]
    InvalidHandResult(String),

    #[error("Number of seats must be between 2 and 6, got {0}")]
    InvalidSeatCount(usize),

    #[error("Stack of {0} mBB cannot cover the blinds")]
    StackTooSmall(i32),

    #[error("Invalid rake fraction {numerator}/{denominator}")]
    InvalidRake { numerator: u32, denominator: u32 },

    #[error("Game is not in a terminal state")]
    NotTerminal,

    #[error("Terminal state ended with a fold, not a showdown")]
    NoShowdown,

    #[error("Terminal state is a showdown, cards are required")]
    ShowdownRequiresCards,

    #[error("Invalid board size: {0}")]
    InvalidBoardSize(usize),

    #[error("Number of hands must be between 2 and 9, got {0}")]
    InvalidHandCount(usize),

    #[error("CFR training requires a 2-seat game, got {0} seats")]
    UnsupportedSeatCount(usize),
}

pub type GtoResult<T> = Result<T, GtoError>;
