use crate::crypto::{address_from_publickey, hash, SibylHash, SibylPublicKey};
use crate::interfaces::{OracleRequestInterface, TokenTransport};
use crate::request::{Request, SibylSelector};
use crate::SibylError;
use ahash::AHashMap;
use tokio::sync::broadcast;
use tracing::{info, warn};

///
/// The request lifecycle emits the following system-wide messages over the
/// main broadcast channel. Convention has the message begin with the class
/// that is broadcasting.
///
#[derive(Clone, Debug)]
pub enum SibylMessage {
    // broadcast when a request is dispatched to an oracle
    RequestManagerNewRequest {
        correlation_id: SibylHash,
        oracle: SibylPublicKey,
    },
    // broadcast when the recorded oracle fulfills a pending request
    RequestManagerFulfilledRequest {
        correlation_id: SibylHash,
    },
    // broadcast when a pending request is cancelled and its payment reclaimed
    RequestManagerCancelledRequest {
        correlation_id: SibylHash,
    },
}

/// The `RequestManager` owns the issuer's nonce counter and the table of
/// outstanding requests. A correlation id present in the table denotes an
/// unfulfilled, uncancelled request mapped to the one participant entitled
/// to answer it; absence means no such request. All mutation funnels through
/// the four transitions below, each of which either completes or leaves the
/// table and counter untouched.
pub struct RequestManager {
    publickey: SibylPublicKey,
    request_count: u64,
    pending_requests: AHashMap<SibylHash, SibylPublicKey>,
    broadcast_channel_sender: broadcast::Sender<SibylMessage>,
}

impl RequestManager {
    pub fn new(
        publickey: SibylPublicKey,
        broadcast_channel_sender: broadcast::Sender<SibylMessage>,
    ) -> Self {
        RequestManager {
            publickey,
            request_count: 1,
            pending_requests: AHashMap::new(),
            broadcast_channel_sender,
        }
    }

    /// Dispatch `request` to `oracle`, reserving `payment` for it. Assigns
    /// the nonce and correlation id, seals the parameter map, and hands the
    /// serialized payload to the transport; only when delivery succeeds is
    /// the pending entry recorded and the counter advanced. The request is
    /// consumed: it cannot be re-sent or mutated afterwards.
    pub fn send_request(
        &mut self,
        oracle: SibylPublicKey,
        mut request: Request,
        payment: u64,
        transport: &mut dyn TokenTransport,
    ) -> crate::Result<SibylHash> {
        let correlation_id = self.next_correlation_id();
        request.set_nonce(self.request_count);
        request.set_correlation_id(correlation_id);
        request.seal_params();

        let payload = request.serialize_payload();
        transport.transfer_and_call(&oracle, payment, payload)?;

        self.pending_requests.insert(correlation_id, oracle);
        self.request_count += 1;
        info!(
            "request {} dispatched to oracle {}",
            hex::encode(&correlation_id),
            address_from_publickey(&oracle)
        );
        self.broadcast_channel_sender
            .send(SibylMessage::RequestManagerNewRequest {
                correlation_id,
                oracle,
            })
            .ok();
        Ok(correlation_id)
    }

    /// Adopt a request minted on another contract so it can be fulfilled
    /// here. The counter is untouched; the id must not already be pending.
    pub fn register_external_request(
        &mut self,
        oracle: SibylPublicKey,
        correlation_id: SibylHash,
    ) -> crate::Result<()> {
        if self.pending_requests.contains_key(&correlation_id) {
            return Err(SibylError::DuplicateRequest);
        }
        self.pending_requests.insert(correlation_id, oracle);
        info!(
            "external request {} registered for oracle {}",
            hex::encode(&correlation_id),
            address_from_publickey(&oracle)
        );
        Ok(())
    }

    /// Precondition for fulfillment: the id is pending and `caller` is the
    /// recorded oracle. An id that was never issued, or already resolved,
    /// fails the same way an imposter does; the lookup simply misses.
    pub fn validate_fulfillment(
        &self,
        correlation_id: &SibylHash,
        caller: &SibylPublicKey,
    ) -> crate::Result<()> {
        match self.pending_requests.get(correlation_id) {
            Some(oracle) if oracle == caller => Ok(()),
            _ => Err(SibylError::UnauthorizedFulfillment),
        }
    }

    /// Record the fulfillment of a pending request by its oracle. On success
    /// the entry is gone, so a second attempt for the same id fails and the
    /// caller's own callback logic is free to run exactly once.
    pub fn fulfill_request(
        &mut self,
        correlation_id: SibylHash,
        caller: &SibylPublicKey,
    ) -> crate::Result<()> {
        if let Err(err) = self.validate_fulfillment(&correlation_id, caller) {
            warn!(
                "rejected fulfillment of {} from {}",
                hex::encode(&correlation_id),
                address_from_publickey(caller)
            );
            return Err(err);
        }
        self.pending_requests.remove(&correlation_id);
        info!("request {} fulfilled", hex::encode(&correlation_id));
        self.broadcast_channel_sender
            .send(SibylMessage::RequestManagerFulfilledRequest { correlation_id })
            .ok();
        Ok(())
    }

    /// Cancel a pending request and ask the oracle to release the reserved
    /// payment. The entry is removed up front; if the remote cancel fails it
    /// is restored, so the call aborts whole. Table membership is the only
    /// local gate; the oracle enforces who may actually reclaim the payment.
    pub fn cancel_request(
        &mut self,
        correlation_id: SibylHash,
        payment: u64,
        callback_selector: SibylSelector,
        expiration: u64,
        oracle_handle: &mut dyn OracleRequestInterface,
    ) -> crate::Result<()> {
        let oracle = self
            .pending_requests
            .remove(&correlation_id)
            .ok_or(SibylError::UnknownRequest)?;

        if let Err(err) = oracle_handle.cancel_oracle_request(
            &correlation_id,
            payment,
            &callback_selector,
            expiration,
        ) {
            // restore the entry: a failed cancel leaves the request pending
            self.pending_requests.insert(correlation_id, oracle);
            warn!(
                "remote cancel of {} failed, request stays pending",
                hex::encode(&correlation_id)
            );
            return Err(err);
        }

        info!("request {} cancelled", hex::encode(&correlation_id));
        self.broadcast_channel_sender
            .send(SibylMessage::RequestManagerCancelledRequest { correlation_id })
            .ok();
        Ok(())
    }

    pub fn is_pending(&self, correlation_id: &SibylHash) -> bool {
        self.pending_requests.contains_key(correlation_id)
    }

    pub fn get_request_count(&self) -> u64 {
        self.request_count
    }

    pub fn get_publickey(&self) -> &SibylPublicKey {
        &self.publickey
    }

    // ids are namespaced on the issuer identity; the strictly increasing
    // counter keeps them distinct within it
    fn next_correlation_id(&self) -> SibylHash {
        let mut vbytes: Vec<u8> = vec![];
        vbytes.extend(&self.publickey);
        vbytes.extend(&self.request_count.to_be_bytes());
        hash(&vbytes)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::crypto::generate_keys;
    use crate::test_utilities::mocks::{make_mock_spec_id, MockOracle, MockTokenTransport};

    fn make_manager() -> (
        RequestManager,
        broadcast::Receiver<SibylMessage>,
        SibylPublicKey,
    ) {
        let (broadcast_channel_sender, broadcast_channel_receiver) = broadcast::channel(32);
        let (publickey, _privatekey) = generate_keys();
        (
            RequestManager::new(publickey, broadcast_channel_sender),
            broadcast_channel_receiver,
            publickey,
        )
    }

    fn make_request() -> Request {
        let (callback_target, _privatekey) = generate_keys();
        let mut request = Request::new(make_mock_spec_id(), callback_target, [1, 2, 3, 4]);
        request.add("get", "https://example.com/report");
        request
    }

    #[test]
    fn send_request_test() {
        let (mut manager, mut receiver, publickey) = make_manager();
        let (oracle, _privatekey) = generate_keys();
        let mut transport = MockTokenTransport::new();

        assert_eq!(manager.get_request_count(), 1);
        let correlation_id = manager
            .send_request(oracle, make_request(), 100, &mut transport)
            .unwrap();

        assert!(manager.is_pending(&correlation_id));
        assert_eq!(manager.get_request_count(), 2);
        assert_eq!(transport.transfer_count(), 1);

        // the id is the digest of the issuer identity and the counter value
        let mut vbytes: Vec<u8> = vec![];
        vbytes.extend(&publickey);
        vbytes.extend(&1u64.to_be_bytes());
        assert_eq!(correlation_id, hash(&vbytes));

        let (destination, amount, payload) = transport.get_transfers()[0].clone();
        assert_eq!(destination, oracle);
        assert_eq!(amount, 100);
        assert_eq!(&payload[0..8], b"ORCLRQST");
        // the parameter map went out balanced
        assert_eq!(*payload.last().unwrap(), 0xFF);

        match receiver.try_recv().unwrap() {
            SibylMessage::RequestManagerNewRequest {
                correlation_id: id,
                oracle: recorded,
            } => {
                assert_eq!(id, correlation_id);
                assert_eq!(recorded, oracle);
            }
            message => panic!("unexpected message {:?}", message),
        }
    }

    #[test]
    fn back_to_back_requests_get_distinct_ids_test() {
        let (mut manager, _receiver, _publickey) = make_manager();
        let (oracle, _privatekey) = generate_keys();
        let mut transport = MockTokenTransport::new();

        let first = manager
            .send_request(oracle, make_request(), 100, &mut transport)
            .unwrap();
        let second = manager
            .send_request(oracle, make_request(), 100, &mut transport)
            .unwrap();

        assert_ne!(first, second);
        assert!(manager.is_pending(&first));
        assert!(manager.is_pending(&second));
        assert_eq!(manager.get_request_count(), 3);

        // the dispatched nonces differ even though every caller-set field matched
        let first_payload = &transport.get_transfers()[0].2;
        let second_payload = &transport.get_transfers()[1].2;
        assert_eq!(&first_payload[118..126], &1u64.to_be_bytes());
        assert_eq!(&second_payload[118..126], &2u64.to_be_bytes());
    }

    #[test]
    fn send_request_transport_failure_test() {
        let (mut manager, mut receiver, _publickey) = make_manager();
        let (oracle, _privatekey) = generate_keys();
        let mut transport = MockTokenTransport::new();
        transport.set_fail_transfers(true);

        let result = manager.send_request(oracle, make_request(), 100, &mut transport);
        assert_eq!(result, Err(SibylError::TransportFailure));
        assert_eq!(manager.get_request_count(), 1);
        assert_eq!(transport.transfer_count(), 0);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn fulfill_request_test() {
        let (mut manager, mut receiver, _publickey) = make_manager();
        let (oracle, _privatekey) = generate_keys();
        let mut transport = MockTokenTransport::new();

        let correlation_id = manager
            .send_request(oracle, make_request(), 100, &mut transport)
            .unwrap();
        let _ = receiver.try_recv();

        assert!(manager.validate_fulfillment(&correlation_id, &oracle).is_ok());
        manager.fulfill_request(correlation_id, &oracle).unwrap();
        assert!(!manager.is_pending(&correlation_id));

        // exactly once: the entry is gone, so a repeat cannot match
        assert_eq!(
            manager.fulfill_request(correlation_id, &oracle),
            Err(SibylError::UnauthorizedFulfillment)
        );

        match receiver.try_recv().unwrap() {
            SibylMessage::RequestManagerFulfilledRequest { correlation_id: id } => {
                assert_eq!(id, correlation_id)
            }
            message => panic!("unexpected message {:?}", message),
        }
    }

    #[test]
    fn fulfill_request_unauthorized_test() {
        let (mut manager, _receiver, _publickey) = make_manager();
        let (oracle, _privatekey) = generate_keys();
        let (imposter, _privatekey2) = generate_keys();
        let mut transport = MockTokenTransport::new();

        let correlation_id = manager
            .send_request(oracle, make_request(), 100, &mut transport)
            .unwrap();

        assert_eq!(
            manager.fulfill_request(correlation_id, &imposter),
            Err(SibylError::UnauthorizedFulfillment)
        );
        // the entry survives untouched for the real oracle
        assert!(manager.is_pending(&correlation_id));
        manager.fulfill_request(correlation_id, &oracle).unwrap();
    }

    #[test]
    fn fulfill_unknown_id_test() {
        let (mut manager, _receiver, _publickey) = make_manager();
        let (oracle, _privatekey) = generate_keys();
        assert_eq!(
            manager.fulfill_request([5; 32], &oracle),
            Err(SibylError::UnauthorizedFulfillment)
        );
    }

    #[test]
    fn cancel_request_test() {
        let (mut manager, mut receiver, _publickey) = make_manager();
        let (oracle, _privatekey) = generate_keys();
        let mut transport = MockTokenTransport::new();
        let mut oracle_handle = MockOracle::new();

        let correlation_id = manager
            .send_request(oracle, make_request(), 100, &mut transport)
            .unwrap();
        let _ = receiver.try_recv();

        manager
            .cancel_request(correlation_id, 100, [1, 2, 3, 4], 5000, &mut oracle_handle)
            .unwrap();
        assert!(!manager.is_pending(&correlation_id));
        assert_eq!(
            oracle_handle.get_cancellations(),
            &vec![(correlation_id, 100, [1, 2, 3, 4], 5000)]
        );

        // cancellation forecloses fulfillment for good
        assert_eq!(
            manager.fulfill_request(correlation_id, &oracle),
            Err(SibylError::UnauthorizedFulfillment)
        );

        match receiver.try_recv().unwrap() {
            SibylMessage::RequestManagerCancelledRequest { correlation_id: id } => {
                assert_eq!(id, correlation_id)
            }
            message => panic!("unexpected message {:?}", message),
        }
    }

    #[test]
    fn cancel_unknown_request_test() {
        let (mut manager, _receiver, _publickey) = make_manager();
        let mut oracle_handle = MockOracle::new();
        assert_eq!(
            manager.cancel_request([5; 32], 100, [1, 2, 3, 4], 5000, &mut oracle_handle),
            Err(SibylError::UnknownRequest)
        );
    }

    #[test]
    fn cancel_remote_failure_restores_entry_test() {
        let (mut manager, _receiver, _publickey) = make_manager();
        let (oracle, _privatekey) = generate_keys();
        let mut transport = MockTokenTransport::new();
        let mut oracle_handle = MockOracle::new();
        oracle_handle.set_fail_cancellations(true);

        let correlation_id = manager
            .send_request(oracle, make_request(), 100, &mut transport)
            .unwrap();

        let result =
            manager.cancel_request(correlation_id, 100, [1, 2, 3, 4], 5000, &mut oracle_handle);
        assert!(result.is_err());
        assert!(manager.is_pending(&correlation_id));
        // and the recorded oracle can still fulfill
        manager.fulfill_request(correlation_id, &oracle).unwrap();
    }

    #[test]
    fn register_external_request_test() {
        let (mut manager, _receiver, _publickey) = make_manager();
        let (oracle, _privatekey) = generate_keys();

        manager.register_external_request(oracle, [7; 32]).unwrap();
        assert!(manager.is_pending(&[7; 32]));
        // adoption never advances the issuer counter
        assert_eq!(manager.get_request_count(), 1);

        assert_eq!(
            manager.register_external_request(oracle, [7; 32]),
            Err(SibylError::DuplicateRequest)
        );

        manager.fulfill_request([7; 32], &oracle).unwrap();
        assert!(!manager.is_pending(&[7; 32]));
    }
}
