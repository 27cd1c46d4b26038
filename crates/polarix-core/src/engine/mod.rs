pub mod config;
pub mod error;
pub mod evaluator;
pub mod exchange;
pub mod field;
pub mod forces;
pub mod observer;
pub mod ranking;
pub mod recip;
pub mod settings;
pub mod solver;
pub mod tensor;
