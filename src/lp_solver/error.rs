//! Errors raised while assembling a model.
//!
//! These are construction-time failures: they indicate a bug in the code
//! generating the model and abort assembly before any solver is involved.
//! Outcomes reported by a solver (infeasible, unbounded, timed out) are not
//! errors, see [`SolveStatus`](super::SolveStatus).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Two variables, two constraints or two collections share a name.
    #[error("name '{0}' is already registered in this model")]
    DuplicateName(String),

    /// A collection's index domain lists the same key twice.
    #[error("key {key} appears twice in the index domain of collection '{collection}'")]
    DuplicateKey { collection: String, key: String },

    /// Lookup outside a collection's declared index domain.
    #[error("key {key} is outside the index domain of collection '{collection}'")]
    KeyNotFound { collection: String, key: String },

    /// The antecedent of an implication is not a 0/1 indicator.
    #[error("unsupported implication antecedent: {0}")]
    UnsupportedAntecedent(String),

    #[error("the model already has an objective")]
    MultipleObjectives,

    #[error("'{name}' has lower bound {lower} above its upper bound {upper}")]
    InvertedBounds { name: String, lower: f64, upper: f64 },

    /// No finite big-M can be derived for the consequent and none was configured.
    #[error("cannot linearise implication: variable '{0}' in the consequent is unbounded")]
    UnboundedConsequent(String),

    /// A variable handle that was not allocated by this model.
    #[error("variable #{0} does not belong to this model")]
    UnknownVariable(usize),
}
