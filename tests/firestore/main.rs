mod common;
mod model;
mod transaction;
mod write_pipeline;
