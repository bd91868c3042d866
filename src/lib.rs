// src/lib.rs - Library interface for the IFT engine

pub mod adjacency;
pub mod bucket_queue;
pub mod config;
pub mod errors;
pub mod ift;
pub mod image_io;
pub mod output;
pub mod path_function;
pub mod path_functions;
pub mod pipeline;
pub mod seeds;
pub mod segmentation;

// Re-export commonly used types and functions
pub use errors::{ErrorKind, IftError, Result};
pub use config::{Config, SegmentationMethod};
pub use pipeline::{process_directory, process_image};
pub use image_io::{InputImage, load_image, save_image};

// Engine
pub use adjacency::{Adjacency, CompleteAdjacency, GridAdjacency, GridShape, ListAdjacency, Neighbors};
pub use bucket_queue::{BucketQueue, BucketState, NIL};
pub use ift::{Ift, IftStats};
pub use path_function::{PathConfig, PathFunction, PathMaps, PathValue, RemoveMode, INFINITY};
pub use path_functions::{
    EdgeMaxPathFunction,
    MaxPathFunction,
    OrientedExternPathFunction,
    SumPathFunction,
};

// Segmentation operators
pub use seeds::{load_seeds, parse_seeds, Seed};
pub use segmentation::{
    edge_max_regions,
    live_wire,
    local_minima,
    oriented_watershed,
    trace_path,
    watershed,
    watershed_from_minima,
    Forest,
    LiveWire,
};
