//! Resolves OCR- and confirmation-supplied user references against the
//! local graph cache, falling back to an external identity directory
//! (the "Identity Resolver" component, spec §4.3).

pub mod directory;
pub mod error;
pub mod resolver;

pub use directory::{AzureDirectoryClient, DirectoryClient, InMemoryDirectoryClient};
pub use error::IdentityError;
pub use resolver::{IdentityResolver, NAME_SIMILARITY_THRESHOLD};
