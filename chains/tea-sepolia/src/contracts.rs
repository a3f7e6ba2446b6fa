use crate::client::ChainClient;
use anyhow::{Context, Result};
use ethers::abi::{AbiDecode, AbiEncode};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;

ethers::contract::abigen!(
    CustomToken,
    r#"[
        function transfer(address to, uint256 amount) returns (bool)
        function balanceOf(address owner) view returns (uint256)
        function decimals() view returns (uint8)
        function symbol() view returns (string)
        function sendNative(address recipient, uint256 amount)
    ]"#
);

pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
    TransferCall { to, amount }.encode().into()
}

pub fn send_native_calldata(recipient: Address, amount: U256) -> Bytes {
    SendNativeCall { recipient, amount }.encode().into()
}

fn read_call(token: Address, data: Vec<u8>) -> TypedTransaction {
    TransactionRequest::new().to(token).data(data).into()
}

pub async fn read_symbol<C: ChainClient + ?Sized>(client: &C, token: Address) -> Result<String> {
    let raw = client
        .call(read_call(token, SymbolCall.encode()))
        .await
        .context("symbol() call failed")?;
    let decoded = SymbolReturn::decode(raw.as_ref()).context("Malformed symbol() result")?;
    Ok(decoded.0)
}

pub async fn read_decimals<C: ChainClient + ?Sized>(client: &C, token: Address) -> Result<u8> {
    let raw = client
        .call(read_call(token, DecimalsCall.encode()))
        .await
        .context("decimals() call failed")?;
    let decoded = DecimalsReturn::decode(raw.as_ref()).context("Malformed decimals() result")?;
    Ok(decoded.0)
}
