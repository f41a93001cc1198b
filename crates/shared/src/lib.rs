pub mod domain;
pub mod error;
pub mod pose;
pub mod protocol;
