//! Collaborator contracts consumed by the protocol core. The core never
//! moves value or talks to an oracle directly; it drives these seams and
//! leaves delivery, receipt hooks and payment custody to the implementations
//! behind them.

use crate::crypto::{SibylHash, SibylPublicKey};
use crate::request::SibylSelector;

/// Moves `amount` of value to `destination` and triggers its receipt hook
/// with `payload` in the same atomic step. The hook re-derives the true
/// sender and amount from the transfer itself and substitutes them over the
/// payload's zeroed override slots, so a payload can never be spoofed
/// independently of the transfer that carries it.
pub trait TokenTransport {
    fn transfer_and_call(
        &mut self,
        destination: &SibylPublicKey,
        amount: u64,
        payload: Vec<u8>,
    ) -> crate::Result<()>;
}

/// The oracle-side surface of the protocol. `oracle_request` is normally
/// reached indirectly, through the token transport's receipt hook;
/// `cancel_oracle_request` is called directly when a client reclaims the
/// payment reserved for a pending request.
pub trait OracleRequestInterface {
    fn oracle_request(
        &mut self,
        sender: &SibylPublicKey,
        amount: u64,
        spec_id: &SibylHash,
        callback_target: &SibylPublicKey,
        callback_selector: &SibylSelector,
        nonce: u64,
        args_version: u64,
        data: &[u8],
    ) -> crate::Result<()>;

    /// Release the payment reserved for `correlation_id` back to its sender.
    /// `expiration` is whatever the caller recorded from the original request
    /// acknowledgment; the oracle, not this side, enforces it.
    fn cancel_oracle_request(
        &mut self,
        correlation_id: &SibylHash,
        payment: u64,
        callback_selector: &SibylSelector,
        expiration: u64,
    ) -> crate::Result<()>;
}

/// Resolves a human-readable name to a token or oracle address. Setup-time
/// only; never on the request/fulfill hot path.
pub trait NameResolution {
    fn resolve(&self, name: &str) -> Option<SibylPublicKey>;
}
