pub mod catalog;
pub mod loan_store;
pub mod member_directory;

pub use catalog::Catalog;
pub use loan_store::{LoanStore, LoanStoreError, LoanTransaction};
pub use member_directory::MemberDirectory;
