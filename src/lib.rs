//! Unified smart wallet session.
//!
//! Presents one account-abstraction session over two credential backends: an
//! embedded key-custody signer and an externally connected wallet. See
//! [`orchestrator::WalletOrchestrator`] for the entry point.

pub mod account;
pub mod backend;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod resolver;
pub mod session;
pub mod signer;

pub use account::AccountClient;
pub use backend::{AuthBackend, AuthSurface, EmbeddedCredentialService, ExternalWalletConnector};
pub use config::WalletConfig;
pub use error::{ProvisioningError, WalletError};
pub use orchestrator::{Collaborators, Evaluation, SponsoredTransaction, WalletOrchestrator};
pub use session::{LoginMethod, SessionSnapshot, SetupState};
pub use signer::{LocalSigner, Signer, SignerHandle};
