pub mod accounts;
pub mod fs_store;

pub use accounts::{AccountVerifier, Registration, RegistrationError};
pub use fs_store::FileBlobStore;
