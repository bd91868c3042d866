// src/path_functions/mod.rs - Concrete path-cost strategies

pub mod edge_max;
pub mod max;
pub mod oriented_extern;
pub mod sum;

pub use edge_max::EdgeMaxPathFunction;
pub use max::MaxPathFunction;
pub use oriented_extern::OrientedExternPathFunction;
pub use sum::SumPathFunction;
