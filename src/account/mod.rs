//! Smart account clients and provisioning.

pub mod client;
pub mod provisioner;
pub mod transport;

pub use client::{AccountClient, AccountKind, SmartWalletClient};
pub use provisioner::{
    ClientFactory, ClientParams, ProvisionedAccount, ProvisioningStrategy, RpcClientFactory,
    provision,
};
pub use transport::{Call, CallCapabilities, CallsStatus, RpcWalletTransport, WalletTransport};
