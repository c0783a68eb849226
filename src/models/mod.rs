pub mod enums;
pub mod events;
pub mod normalized_item;
pub mod raw_item;
pub mod validation;

pub use enums::*;
pub use events::*;
pub use normalized_item::*;
pub use raw_item::*;
pub use validation::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid value for {field}: '{value}'")]
    InvalidEnum { field: String, value: String },
}
