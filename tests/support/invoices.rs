use anyhow::Result;
use bitcoin::hashes::{Hash as _, sha256};
use bitcoin::secp256k1::{Secp256k1, SecretKey};
use lightning_invoice::{Currency, InvoiceBuilder, PaymentSecret};

pub const PEER_PUBKEY: &str =
    "02eec7245d6b7d2ccb30380bfbe2a3648cd7a942653f5aa340edcea1f283686619";
pub const OTHER_PEER_PUBKEY: &str =
    "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

/// Signed regtest invoice with a fresh payment hash.
pub fn signed_invoice(amount_msat: u64, description: &str, key_byte: u8) -> Result<String> {
    let secp = Secp256k1::new();
    let key = SecretKey::from_slice(&[key_byte; 32])?;
    let preimage = uuid::Uuid::new_v4();

    let invoice = InvoiceBuilder::new(Currency::Regtest)
        .description(description.to_string())
        .payment_hash(sha256::Hash::hash(preimage.as_bytes()))
        .payment_secret(PaymentSecret([key_byte; 32]))
        .amount_milli_satoshis(amount_msat)
        .current_timestamp()
        .min_final_cltv_expiry_delta(144)
        .build_signed(|hash| secp.sign_ecdsa_recoverable(hash, &key))
        .map_err(|e| anyhow::anyhow!("sign invoice: {e:?}"))?;

    Ok(invoice.to_string())
}
