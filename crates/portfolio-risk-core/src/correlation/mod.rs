pub mod history;
pub mod matrix;
pub mod pearson;
