/*!
# Welcome to Sibyl

Sibyl is a request/response correlation protocol between on-chain clients and
off-chain oracles. A client packs its request parameters into a compact,
self-describing binary format, reserves a payment, and hands both to a token
transport for delivery to an oracle; the oracle answers later through a
callback that is only accepted when it carries the correlation identifier of
an outstanding request and arrives from the participant recorded for it.

Sibyl-Rust implements the client side of that protocol: the wire encoder, the
request builder, and the lifecycle manager that mints correlation identifiers
and guarantees exactly-once fulfillment and safe cancellation.

# Usage

See `src/bin/sibylcli.rs` for an end-to-end walkthrough against the mock
collaborators.

*/
pub mod bytebuffer;
pub mod cbor;
pub mod crypto;
pub mod interfaces;
pub mod manager;
pub mod request;
pub mod test_utilities;

use thiserror::Error;

/// Failures surfaced by the lifecycle transitions. Every operation is a
/// whole-call abort: when one of these comes back, the pending table and the
/// issuer counter are exactly as they were before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SibylError {
    /// payment and payload could not be delivered to the oracle
    #[error("unable to deliver payment and payload to the oracle")]
    TransportFailure,
    /// an externally-sourced id is already in the pending table
    #[error("request is already pending")]
    DuplicateRequest,
    /// fulfillment attempted by a participant other than the recorded oracle
    #[error("source must be the oracle of the request")]
    UnauthorizedFulfillment,
    /// the id was never issued here, or was already fulfilled or cancelled
    #[error("no pending request with this id")]
    UnknownRequest,
}

pub type Result<T> = std::result::Result<T, SibylError>;
