//! Vitality error types

use thiserror::Error;

use crate::phase::Phase;

#[derive(Error, Debug)]
pub enum VitalityError {
    #[error("Storage error: {0}")]
    Storage(#[from] lastchance_storage::StorageError),

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("Sentence must end in '.', '!' or '?'")]
    IncompleteSentence,

    #[error("No writing session in progress")]
    NotWriting,

    #[error("Cooldown has not elapsed yet")]
    CooldownActive,
}
