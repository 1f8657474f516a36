pub mod observation;
pub mod fitness;
pub mod lifecycle;
pub mod generation;
