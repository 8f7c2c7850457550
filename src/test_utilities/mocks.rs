use crate::crypto::{SibylHash, SibylPublicKey};
use crate::interfaces::{NameResolution, OracleRequestInterface, TokenTransport};
use crate::request::{OracleRequestPayload, SibylSelector};
use crate::SibylError;
use std::collections::HashMap;
use std::convert::TryInto;

/// Generate a random 32-byte spec identifier
pub fn make_mock_spec_id() -> SibylHash {
    let data: Vec<u8> = (0..32).map(|_| rand::random::<u8>()).collect();
    data.try_into().unwrap()
}

/// A token transport that records every transfer it is asked to perform.
/// Flip `set_fail_transfers` to make delivery fail without touching state.
pub struct MockTokenTransport {
    transfers: Vec<(SibylPublicKey, u64, Vec<u8>)>,
    fail_transfers: bool,
}

impl MockTokenTransport {
    pub fn new() -> MockTokenTransport {
        MockTokenTransport {
            transfers: vec![],
            fail_transfers: false,
        }
    }

    pub fn set_fail_transfers(&mut self, fail_transfers: bool) {
        self.fail_transfers = fail_transfers;
    }

    pub fn get_transfers(&self) -> &Vec<(SibylPublicKey, u64, Vec<u8>)> {
        &self.transfers
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }
}

impl TokenTransport for MockTokenTransport {
    fn transfer_and_call(
        &mut self,
        destination: &SibylPublicKey,
        amount: u64,
        payload: Vec<u8>,
    ) -> crate::Result<()> {
        if self.fail_transfers {
            return Err(SibylError::TransportFailure);
        }
        self.transfers.push((*destination, amount, payload));
        Ok(())
    }
}

/// Plays the oracle side of the protocol. Its receipt hook decodes a
/// delivered payload and substitutes the zeroed override slots with the
/// sender and amount the transport vouches for, then records the request.
pub struct MockOracle {
    received_requests: Vec<OracleRequestPayload>,
    cancellations: Vec<(SibylHash, u64, SibylSelector, u64)>,
    fail_cancellations: bool,
}

impl MockOracle {
    pub fn new() -> MockOracle {
        MockOracle {
            received_requests: vec![],
            cancellations: vec![],
            fail_cancellations: false,
        }
    }

    pub fn set_fail_cancellations(&mut self, fail_cancellations: bool) {
        self.fail_cancellations = fail_cancellations;
    }

    pub fn get_received_requests(&self) -> &Vec<OracleRequestPayload> {
        &self.received_requests
    }

    pub fn get_cancellations(&self) -> &Vec<(SibylHash, u64, SibylSelector, u64)> {
        &self.cancellations
    }

    /// The receipt hook a real transport would invoke on delivery. `sender`
    /// and `amount` come from the transfer itself, never from the payload.
    pub fn receive_token_transfer(
        &mut self,
        sender: &SibylPublicKey,
        amount: u64,
        payload: &Vec<u8>,
    ) -> crate::Result<()> {
        let decoded = OracleRequestPayload::deserialize(payload);
        self.oracle_request(
            sender,
            amount,
            &decoded.spec_id,
            &decoded.callback_target,
            &decoded.callback_selector,
            decoded.nonce,
            decoded.args_version,
            &decoded.data,
        )
    }
}

impl OracleRequestInterface for MockOracle {
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
    ) -> crate::Result<()> {
        self.received_requests.push(OracleRequestPayload {
            sender: *sender,
            amount,
            spec_id: *spec_id,
            callback_target: *callback_target,
            callback_selector: *callback_selector,
            nonce,
            args_version,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn cancel_oracle_request(
        &mut self,
        correlation_id: &SibylHash,
        payment: u64,
        callback_selector: &SibylSelector,
        expiration: u64,
    ) -> crate::Result<()> {
        if self.fail_cancellations {
            return Err(SibylError::TransportFailure);
        }
        self.cancellations
            .push((*correlation_id, payment, *callback_selector, expiration));
        Ok(())
    }
}

/// Name resolution over a fixed table, registered at setup time.
pub struct MockNameResolution {
    addresses: HashMap<String, SibylPublicKey>,
}

impl MockNameResolution {
    pub fn new() -> MockNameResolution {
        MockNameResolution {
            addresses: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, publickey: SibylPublicKey) {
        self.addresses.insert(String::from(name), publickey);
    }
}

impl NameResolution for MockNameResolution {
    fn resolve(&self, name: &str) -> Option<SibylPublicKey> {
        self.addresses.get(name).copied()
    }
}
