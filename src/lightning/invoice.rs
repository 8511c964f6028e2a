use anyhow::Result;
use bitcoin::hashes::Hash as _;
use lightning_invoice::{Bolt11Invoice, Bolt11InvoiceDescriptionRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr as _;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInvoice {
    pub payment_hash: String,
    pub payee_pubkey: String,
    /// Zero for invoices without an amount.
    pub amount_msat: u64,
    pub description: String,
    pub expiry_secs: u64,
}

pub fn decode_bolt11(invoice: &str) -> Result<DecodedInvoice> {
    let invoice = Bolt11Invoice::from_str(invoice.trim())
        .map_err(|e| anyhow::anyhow!("parse BOLT11 invoice: {e:?}"))?;

    let description = match invoice.description() {
        Bolt11InvoiceDescriptionRef::Direct(d) => d.to_string(),
        Bolt11InvoiceDescriptionRef::Hash(h) => hex::encode(h.0.to_byte_array()),
    };

    Ok(DecodedInvoice {
        payment_hash: hex::encode(invoice.payment_hash().to_byte_array()),
        payee_pubkey: invoice.get_payee_pub_key().to_string(),
        amount_msat: invoice.amount_milli_satoshis().unwrap_or(0),
        description,
        expiry_secs: invoice.expiry_time().as_secs(),
    })
}
