// ABOUTME: Command module aggregator for the rollout CLI.
// ABOUTME: Re-exports deploy, init, and outputs command handlers.

mod deploy;
mod init;
mod outputs;

pub use deploy::deploy;
pub use init::init;
pub use outputs::outputs;
