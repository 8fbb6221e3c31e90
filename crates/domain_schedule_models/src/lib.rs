pub mod dto;

pub use dto::v1::*;
