// In: src/lib.rs

//! Gauntlet Battle Engine
//!
//! A deterministic, turn-based combat engine for a hero roster against AI
//! opponents: status effects, per-class resources, a skill resolution
//! pipeline, leader skills, summons and finales, driven by a small state
//! machine that pauses only for player input.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod combatant;
pub mod config;
pub mod content;
pub mod demo;
pub mod errors;
pub mod mcp_interface;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
// Re-export the content contract so callers rarely need `schema` directly.
pub use schema::{
    BaseStats,
    ClassDefinition,
    ContentPack,
    EffectApplication,
    EffectKind,
    Encounter,
    FightEffect,
    HeroInstance,
    LeaderSkill,
    ResourceArchetype,
    Role,
    Side,
    SkillDescriptor,
    SkillTarget,
    StatType,
    UnitTemplate,
};

// --- From this crate's modules (`src/`) ---

// Battle driver and state.
pub use battle::roster::BattleSetup;
pub use battle::runner::{BattleInfo, BattleRunner};
pub use battle::state::{BattleEvent, BattleState, GameState, Outcome, TurnRng};

// Runtime and content types.
pub use combatant::{Combatant, UnitId};
pub use config::BattleConfig;
pub use content::ContentLibrary;

// Crate-specific error and result types.
pub use errors::{
    ActionError, BattleEngineError, BattleResult, BattleStateError, ContentError, ContentResult,
};
