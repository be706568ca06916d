mod annotation;
mod buffer;
mod engine;
mod pipeline;
mod state;

#[cfg(test)]
mod engine_spec;

pub use annotation::{
    LineAnnotation, parse_preceding_line_number_annotation, parse_trailing_line_number_annotation,
    parse_trailing_line_number_annotation_within,
};
pub use engine::*;
pub use pipeline::*;
