pub mod model;
pub mod rewriter;
pub mod scheme;
pub mod synth;
