pub mod particle;
pub mod system;
