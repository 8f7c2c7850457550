use base58::ToBase58;
use secp256k1::SECP256K1;

/// 32-byte digest; correlation identifiers are values of this type
pub type SibylHash = [u8; 32];
/// compressed secp256k1 public key identifying a participant
pub type SibylPublicKey = [u8; 33];
pub type SibylPrivateKey = [u8; 32];

pub fn hash(data: &Vec<u8>) -> SibylHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Create and return a keypair with a randomly generated private key.
pub fn generate_keys() -> (SibylPublicKey, SibylPrivateKey) {
    let (secret_key, public_key) =
        SECP256K1.generate_keypair(&mut secp256k1::rand::thread_rng());
    let mut privatekey: SibylPrivateKey = [0; 32];
    privatekey.copy_from_slice(&secret_key[..]);
    (public_key.serialize(), privatekey)
}

/// Render a participant identifier in base58(i.e. address) format
pub fn address_from_publickey(publickey: &SibylPublicKey) -> String {
    publickey.to_base58()
}
