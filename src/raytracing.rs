pub mod camera;
pub mod core;
pub mod input;
pub mod math;
pub mod parser;
pub mod renderer;
