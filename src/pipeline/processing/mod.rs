// Pipeline processing: normalization, unification, validation and rebasing

pub mod normalize;
pub mod quality_gate;
pub mod rebase;
pub mod unify;
