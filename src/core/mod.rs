pub mod column;
pub mod models;
pub mod mutation;
pub mod operator;
pub mod types;
pub mod validation;

pub use column::{Column, ColumnCatalog};
pub use models::*;
pub use operator::Operator;
pub use types::*;
pub use validation::{Field, FieldErrors, ValidationError};
