/*!
# Sibyl Command Line Interface

Walks one request through the whole lifecycle against the mock
collaborators: resolve the oracle by name, build and dispatch a request,
replay the recorded transfer into the oracle's receipt hook, then accept
the fulfillment.

## Example Usage

```bash
sibylcli --oracle=mock-oracle --payment=250
```
*/

use base58::ToBase58;
use clap::{App, Arg};
use sibyl_rust::crypto::generate_keys;
use sibyl_rust::interfaces::NameResolution;
use sibyl_rust::manager::{RequestManager, SibylMessage};
use sibyl_rust::request::Request;
use sibyl_rust::test_utilities::mocks::{
    make_mock_spec_id, MockNameResolution, MockOracle, MockTokenTransport,
};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

#[tokio::main]
pub async fn main() -> sibyl_rust::Result<()> {
    tracing_subscriber::fmt::init();

    let matches = App::new("Sibyl Runtime")
        .about("Dispatches a sample oracle request through the mock collaborators")
        .arg(
            Arg::with_name("oracle")
                .short("o")
                .long("oracle")
                .default_value("mock-oracle")
                .takes_value(true)
                .help("name of the oracle to resolve"),
        )
        .arg(
            Arg::with_name("payment")
                .short("p")
                .long("payment")
                .takes_value(true)
                .help("payment to reserve for the request"),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .help("config file name"),
        )
        .get_matches();

    let config_name = match matches.value_of("config") {
        Some(name) => name,
        None => "config",
    };
    let mut settings = config::Config::default();
    settings
        .merge(config::File::with_name(config_name).required(false))
        .unwrap();

    let payment: u64 = match matches.value_of("payment") {
        Some(amount) => amount.parse().unwrap(),
        None => settings.get::<u64>("request.payment").unwrap_or(100),
    };

    //
    // identities: one issuer, one oracle known to the resolver by name
    //
    let (issuer_publickey, _issuer_privatekey) = generate_keys();
    let (oracle_publickey, _oracle_privatekey) = generate_keys();

    let oracle_name = matches.value_of("oracle").unwrap();
    let mut resolver = MockNameResolution::new();
    resolver.register(oracle_name, oracle_publickey);
    let oracle_address = resolver.resolve(oracle_name).unwrap();

    //
    // lifecycle events arrive over the main broadcast channel
    //
    let (broadcast_channel_sender, mut broadcast_channel_receiver) = broadcast::channel(32);
    tokio::spawn(async move {
        while let Ok(message) = broadcast_channel_receiver.recv().await {
            match message {
                SibylMessage::RequestManagerNewRequest {
                    correlation_id,
                    oracle,
                } => {
                    info!(
                        "event: request {} -> oracle {}",
                        hex::encode(&correlation_id),
                        oracle.to_base58()
                    );
                }
                SibylMessage::RequestManagerFulfilledRequest { correlation_id } => {
                    info!("event: request {} fulfilled", hex::encode(&correlation_id));
                }
                SibylMessage::RequestManagerCancelledRequest { correlation_id } => {
                    info!("event: request {} cancelled", hex::encode(&correlation_id));
                }
            }
        }
    });

    let mut manager = RequestManager::new(issuer_publickey, broadcast_channel_sender);
    let mut transport = MockTokenTransport::new();
    let mut oracle = MockOracle::new();

    let mut request = Request::new(
        make_mock_spec_id(),
        issuer_publickey,
        [0x12, 0x34, 0x56, 0x78],
    );
    request.add("get", "https://example.com/price?pair=SBL-USD");
    request.add("path", "data.price");
    request.add_int("times", 1_000_000_000_000_000_000);

    let correlation_id = manager.send_request(oracle_address, request, payment, &mut transport)?;

    //
    // replay the recorded transfer into the oracle's receipt hook, which
    // substitutes the true sender and amount over the override slots
    //
    let (destination, amount, payload) = transport.get_transfers()[0].clone();
    info!(
        "transfer of {} delivered to {} with {} payload bytes",
        amount,
        destination.to_base58(),
        payload.len()
    );
    oracle.receive_token_transfer(&issuer_publickey, amount, &payload)?;

    manager.fulfill_request(correlation_id, &oracle_address)?;

    let summary = serde_json::json!({
        "correlation_id": hex::encode(&correlation_id),
        "oracle": oracle_address.to_base58(),
        "payment": amount,
        "payload_bytes": payload.len(),
        "requests_received_by_oracle": oracle.get_received_requests().len(),
        "still_pending": manager.is_pending(&correlation_id),
    });
    println!("{}", summary);

    // give the event listener a beat to drain before exit
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
