//! Application services: the dispatch loop and the operator surface.

pub mod dispatcher;
pub mod operations;
