pub mod paths;

pub use paths::{GuardPaths, PathUtils};
