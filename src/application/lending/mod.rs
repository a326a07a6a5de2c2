mod errors;
mod lending_service;

pub use errors::{LendingError, Result};
pub use lending_service::{
    DEFAULT_OPERATION_TIMEOUT, ServiceDependencies, borrow_item, list_loans, return_item,
};
