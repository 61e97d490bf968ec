pub mod identity;
pub mod xrpc;

pub use identity::{normalize_actor_input, Identity, IdentityResolver};
pub use xrpc::XrpcClient;
