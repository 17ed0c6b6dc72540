pub mod historical;
pub mod path_stress;
pub mod report;
pub mod scenarios;
pub mod sensitivity;
pub mod var;
