/// Evaluation backends.
pub mod backend;
/// Chess domain types.
pub mod chess;
/// The common evaluation scale.
pub mod eval;
/// Transport seams.
pub mod io;
/// The move resolution entry point.
pub mod resolver;
