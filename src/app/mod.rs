pub mod intake;
pub mod pipelines;
