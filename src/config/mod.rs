pub mod prompt;
pub mod skip;
