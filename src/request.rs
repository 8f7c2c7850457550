use crate::bytebuffer::ByteBuffer;
use crate::cbor;
use crate::crypto::{SibylHash, SibylPublicKey};
use std::convert::TryInto;

/// 4-byte identifier of the callback entry point on the requesting contract
pub type SibylSelector = [u8; 4];

/// version of the parameter encoding understood by oracle-side decoders
pub const ARGS_VERSION: u64 = 1;

/// 8-byte message name fronting every transport payload; receipt hooks
/// dispatch on it before decoding the tuple behind it
pub const REQUEST_MESSAGE_NAME: [u8; 8] = *b"ORCLRQST";

/// parameter buffers start at this capacity; typical requests fit unresized
pub const DEFAULT_BUFFER_SIZE: usize = 256;

// Fixed offsets of the payload fields behind the message name. Sender and
// amount are sent as zeroed override slots and substituted by the transport's
// own knowledge of the transfer, so they cannot be spoofed inside the payload.
const SENDER_OFFSET: usize = 8;
const AMOUNT_OFFSET: usize = 41;
const SPEC_ID_OFFSET: usize = 49;
const CALLBACK_TARGET_OFFSET: usize = 81;
const CALLBACK_SELECTOR_OFFSET: usize = 114;
const NONCE_OFFSET: usize = 118;
const ARGS_VERSION_OFFSET: usize = 126;
const PARAMS_OFFSET: usize = 134;

/// A single oracle request under construction. Created with the spec
/// identifier and callback coordinates fixed, then populated through the
/// typed `add` operations, which stream key/value pairs into the parameter
/// buffer in insertion order. The nonce and correlation id stay zero until
/// the lifecycle manager assigns them on the send path.
#[derive(Debug, PartialEq, Clone)]
pub struct Request {
    spec_id: SibylHash,
    callback_target: SibylPublicKey,
    callback_selector: SibylSelector,
    nonce: u64,
    correlation_id: SibylHash,
    param_buffer: ByteBuffer,
}

impl Request {
    /// Create a new `Request`. The parameter buffer is pre-sized and the
    /// indefinite-length parameter map is opened immediately; `seal_params`
    /// balances it before the request goes out.
    pub fn new(
        spec_id: SibylHash,
        callback_target: SibylPublicKey,
        callback_selector: SibylSelector,
    ) -> Request {
        let mut param_buffer = ByteBuffer::with_capacity(DEFAULT_BUFFER_SIZE);
        cbor::start_map(&mut param_buffer);
        Request {
            spec_id,
            callback_target,
            callback_selector,
            nonce: 0,
            correlation_id: [0; 32],
            param_buffer,
        }
    }

    /// Add a text parameter. Duplicate keys are legal; both pairs are
    /// transmitted and consumer-side policy decides between them.
    pub fn add(&mut self, key: &str, value: &str) {
        cbor::encode_string(&mut self.param_buffer, key);
        cbor::encode_string(&mut self.param_buffer, value);
    }

    pub fn add_bytes(&mut self, key: &str, value: &[u8]) {
        cbor::encode_string(&mut self.param_buffer, key);
        cbor::encode_bytes(&mut self.param_buffer, value);
    }

    pub fn add_int(&mut self, key: &str, value: i128) {
        cbor::encode_string(&mut self.param_buffer, key);
        cbor::encode_int(&mut self.param_buffer, value);
    }

    pub fn add_uint(&mut self, key: &str, value: u64) {
        cbor::encode_string(&mut self.param_buffer, key);
        cbor::encode_uint(&mut self.param_buffer, value);
    }

    /// Add a list of text values under one key as a nested indefinite-length
    /// array.
    pub fn add_string_array(&mut self, key: &str, values: &[String]) {
        cbor::encode_string(&mut self.param_buffer, key);
        cbor::start_array(&mut self.param_buffer);
        for value in values {
            cbor::encode_string(&mut self.param_buffer, value);
        }
        cbor::end_sequence(&mut self.param_buffer);
    }

    /// Close the parameter map. The manager calls this once on the send path;
    /// the wire format is balanced from here on.
    pub fn seal_params(&mut self) {
        cbor::end_sequence(&mut self.param_buffer);
    }

    pub fn get_spec_id(&self) -> &SibylHash {
        &self.spec_id
    }

    pub fn get_callback_target(&self) -> &SibylPublicKey {
        &self.callback_target
    }

    pub fn get_callback_selector(&self) -> &SibylSelector {
        &self.callback_selector
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_correlation_id(&self) -> &SibylHash {
        &self.correlation_id
    }

    pub fn get_param_buffer(&self) -> &ByteBuffer {
        &self.param_buffer
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    pub fn set_correlation_id(&mut self, correlation_id: SibylHash) {
        self.correlation_id = correlation_id;
    }

    /// Pack the request into the transport payload delivered alongside the
    /// payment: message name, zeroed sender/amount override slots, then the
    /// request tuple and the encoded parameters, all big-endian at fixed
    /// offsets.
    pub fn serialize_payload(&self) -> Vec<u8> {
        let mut vbytes: Vec<u8> = vec![];
        vbytes.extend(&REQUEST_MESSAGE_NAME);
        vbytes.extend(&[0u8; 33]);
        vbytes.extend(&0u64.to_be_bytes());
        vbytes.extend(&self.spec_id);
        vbytes.extend(&self.callback_target);
        vbytes.extend(&self.callback_selector);
        vbytes.extend(&self.nonce.to_be_bytes());
        vbytes.extend(&ARGS_VERSION.to_be_bytes());
        vbytes.extend(self.param_buffer.as_slice());
        vbytes
    }
}

/// A transport payload as decoded by the oracle-side receipt hook. `sender`
/// and `amount` hold the override slots until the hook substitutes the values
/// the transport itself vouches for.
#[derive(Debug, PartialEq, Clone)]
pub struct OracleRequestPayload {
    pub sender: SibylPublicKey,
    pub amount: u64,
    pub spec_id: SibylHash,
    pub callback_target: SibylPublicKey,
    pub callback_selector: SibylSelector,
    pub nonce: u64,
    pub args_version: u64,
    pub data: Vec<u8>,
}

impl OracleRequestPayload {
    pub fn deserialize(bytes: &Vec<u8>) -> OracleRequestPayload {
        assert_eq!(&bytes[0..SENDER_OFFSET], &REQUEST_MESSAGE_NAME);
        let sender: SibylPublicKey = bytes[SENDER_OFFSET..AMOUNT_OFFSET].try_into().unwrap();
        let amount = u64::from_be_bytes(bytes[AMOUNT_OFFSET..SPEC_ID_OFFSET].try_into().unwrap());
        let spec_id: SibylHash = bytes[SPEC_ID_OFFSET..CALLBACK_TARGET_OFFSET]
            .try_into()
            .unwrap();
        let callback_target: SibylPublicKey = bytes
            [CALLBACK_TARGET_OFFSET..CALLBACK_SELECTOR_OFFSET]
            .try_into()
            .unwrap();
        let callback_selector: SibylSelector = bytes[CALLBACK_SELECTOR_OFFSET..NONCE_OFFSET]
            .try_into()
            .unwrap();
        let nonce = u64::from_be_bytes(
            bytes[NONCE_OFFSET..ARGS_VERSION_OFFSET]
                .try_into()
                .unwrap(),
        );
        let args_version = u64::from_be_bytes(
            bytes[ARGS_VERSION_OFFSET..PARAMS_OFFSET]
                .try_into()
                .unwrap(),
        );
        let data = bytes[PARAMS_OFFSET..].to_vec();
        OracleRequestPayload {
            sender,
            amount,
            spec_id,
            callback_target,
            callback_selector,
            nonce,
            args_version,
            data,
        }
    }
}
