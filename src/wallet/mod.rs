//! Wallet access: addresses, the provider trait and wallet error codes.

mod address;
mod provider;

pub use address::{is_valid_address, parse_address, Address, ZERO_ADDRESS};
pub use provider::{
    ChainDescriptor, NativeCurrency, WalletError, WalletErrorCode, WalletProvider,
    UNRECOGNIZED_CHAIN_CODE, USER_REJECTED_CODE,
};
