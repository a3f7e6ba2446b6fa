mod common;

use common::{addr, MockClient};
use ethers::abi::{encode, Token};
use ethers::types::U256;
use ethers::utils::id;
use tea_project::contracts::{read_decimals, read_symbol};

#[tokio::test]
async fn test_reads_token_metadata() {
    let client = MockClient::new();
    client.respond_to_call(id("symbol()"), encode(&[Token::String("TEA".to_string())]));
    client.respond_to_call(id("decimals()"), encode(&[Token::Uint(U256::from(6u64))]));

    let token = addr(0xcc);
    assert_eq!(read_symbol(&client, token).await.unwrap(), "TEA");
    assert_eq!(read_decimals(&client, token).await.unwrap(), 6);
}

#[tokio::test]
async fn test_failed_call_is_an_error() {
    let client = MockClient::new();
    assert!(read_symbol(&client, addr(0xcc)).await.is_err());
}
