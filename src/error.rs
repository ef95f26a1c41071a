//! Error types shared by the rule compiler and the generation engines.

use thiserror::Error;

/// Errors reported while parsing a rule string.
///
/// Each variant corresponds to one parser diagnostic; the message is what a
/// host application shows to the user. On error the previous compiled rule
/// is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule name is too long")]
    TooLong,
    #[error("rule cannot be empty string")]
    Empty,
    #[error("only one B allowed")]
    MultipleBirth,
    #[error("only one S allowed")]
    MultipleSurvival,
    #[error("only one slash allowed")]
    MultipleSlash,
    #[error("only one underscore allowed")]
    MultipleUnderscore,
    #[error("only one neighborhood allowed")]
    MultipleNeighborhood,
    #[error("minus can only follow a digit")]
    BadMinus,
    #[error("bad character found")]
    BadCharacter,
    #[error("can't have slash and underscore")]
    SlashAndUnderscore,
    #[error("underscore not valid for totalistic rules, use slash")]
    UnderscoreTotalistic,
    #[error("wolfram rule must be an even number from 0 to 254")]
    WolframRange,
    #[error("bad character in Wolfram rule")]
    WolframCharacter,
    #[error("neighborhood must be at end of rule")]
    NeighborhoodPosition,
    #[error("rule must contain a slash or B or S")]
    MissingSeparator,
    #[error("digit greater than neighborhood allows")]
    DigitTooBig,
    #[error("B and S must be either side of slash")]
    BirthSurvivalOrder,
    #[error("non-totalistic birth must start with a digit")]
    BirthNeedsDigit,
    #[error("non-totalistic survival must start with a digit")]
    SurvivalNeedsDigit,
    #[error("non-totalistic only supported with Moore neighborhood")]
    NonTotalisticNeighborhood,
    #[error("letter not valid for birth neighbor count")]
    BadBirthLetter,
    #[error("letter not valid for survival neighbor count")]
    BadSurvivalLetter,
    #[error("MAP rule needs 6, 22 or 86 base64 characters")]
    MapLength,
    #[error("MAP contains illegal base64 character")]
    MapCharacter,

    // grid topology suffix
    #[error("unknown grid topology")]
    UnknownTopology,
    #[error("only specify a twist for a Klein bottle")]
    TwistWithoutKlein,
    #[error("plane can't have a shift")]
    PlaneShift,
    #[error("sphere can't have a shift")]
    SphereShift,
    #[error("cross-surface can't have a shift")]
    CrossSurfaceShift,
    #[error("shift must be on twisted edges")]
    ShiftOnUntwistedEdge,
    #[error("can't shift infinite width")]
    ShiftInfiniteWidth,
    #[error("can't shift infinite height")]
    ShiftInfiniteHeight,
    #[error("unexpected stuff after grid width")]
    TrailingAfterWidth,
    #[error("unexpected stuff after grid height")]
    TrailingAfterHeight,
    #[error("given topology can't have an infinite width")]
    InfiniteWidth,
    #[error("Klein bottle or cross-surface can't have an infinite height")]
    InfiniteHeight,
    #[error("Klein bottle can't have both horizontal and vertical twists")]
    DoubleTwist,
    #[error("can't have both horizontal and vertical shifts")]
    DoubleShift,
    #[error("shifting is not allowed if either grid dimension is unbounded")]
    ShiftUnbounded,

    // Larger than Life
    #[error("bad syntax in Larger than Life rule")]
    LtlSyntax,
    #[error("R value is too small")]
    RangeTooSmall,
    #[error("R value is too big")]
    RangeTooBig,
    #[error("C value must be from 0 to 255")]
    StatesRange,
    #[error("M value must be 0 or 1")]
    MiddleRange,
    #[error("S minimum must be <= S maximum")]
    SurvivalOrder,
    #[error("B minimum must be <= B maximum")]
    BirthOrder,
    #[error("N must be followed by M or N or C")]
    BadLtlNeighborhood,
    #[error("S value must be from 0 to max neighbors")]
    SurvivalTooBig,
    #[error("B value must be from 0 to max neighbors")]
    BirthTooBig,
    #[error("bad suffix")]
    BadSuffix,
    #[error("bad topology in suffix (must be torus or plane)")]
    BadLtlTopology,
    #[error("bad grid size")]
    BadGridSize,
    #[error("unexpected character in suffix")]
    TrailingSuffix,
    #[error("grid size is too big")]
    GridTooBig,
    #[error("B0 is not allowed if universe is unbounded")]
    B0Unbounded,
}

/// Runtime failures raised by the generation engines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The bump allocator exceeded the user-specified memory limit.
    #[error("exceeded user-specified memory limit")]
    MemoryLimit,
    /// An unbounded grid could not be resized.
    #[error("not enough memory to resize universe")]
    ResizeFailed,
    /// The universe can't be expanded past the total cell cap.
    #[error("the universe can't be expanded that far")]
    ExpansionLimit,
    /// The pattern reached the per-cell-coordinate editing limits.
    #[error("pattern exceeded editing limit")]
    EditingLimit,
    /// `set_cell` was given a coordinate outside a bounded grid.
    #[error("cell is outside the bounded grid")]
    OutsideGrid,
    /// `set_cell` was given a state the current rule does not allow.
    #[error("invalid cell state")]
    InvalidState,
    /// A `step` method was entered recursively from a poller callback.
    #[error("step entered while already calculating")]
    Recursed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_parser_diagnostics() {
        assert_eq!(RuleError::MultipleBirth.to_string(), "only one B allowed");
        assert_eq!(
            RuleError::WolframRange.to_string(),
            "wolfram rule must be an even number from 0 to 254"
        );
        assert_eq!(
            EngineError::MemoryLimit.to_string(),
            "exceeded user-specified memory limit"
        );
    }
}
