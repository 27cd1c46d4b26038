pub mod run;
pub mod settings;
