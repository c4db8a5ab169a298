use schema::Side;
use thiserror::Error;

/// Main error type for the Gauntlet battle engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleEngineError {
    /// Error related to content loading or lookup
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
    /// Error related to invalid battle state
    #[error("Battle state error: {0}")]
    BattleState(#[from] BattleStateError),
    /// Error related to an invalid player selection
    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

/// Errors related to content packs and configuration files
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// The content text could not be parsed
    #[error("Malformed content: {0}")]
    Malformed(String),
    /// A content file could not be read
    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },
    /// A postcard bundle could not be encoded or decoded
    #[error("Bundle error: {0}")]
    Bundle(String),
}

/// Errors related to battle setup and state validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleStateError {
    /// No usable combatant could be built for a side
    #[error("{0} side has no combatants")]
    EmptySide(Side),
    /// A unit id does not exist in this battle
    #[error("Unknown unit: {0}")]
    UnknownUnit(usize),
    /// The battle already reached a terminal state
    #[error("The battle is already over")]
    BattleOver,
}

/// Errors raised at the player selection boundary, before anything resolves
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The battle is not waiting for this kind of input
    #[error("Not awaiting {0}")]
    NotAwaiting(&'static str),
    /// The acting unit has no skill with this name
    #[error("Unknown skill: {0}")]
    UnknownSkill(String),
    /// The skill exists but cannot be used right now
    #[error("Skill unavailable: {0}")]
    SkillUnavailable(String),
    /// The chosen target is not valid for the pending skill
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
}

/// Convenience type alias for Results using BattleEngineError
pub type BattleResult<T> = Result<T, BattleEngineError>;

/// Convenience type alias for content loading results
pub type ContentResult<T> = Result<T, ContentError>;
