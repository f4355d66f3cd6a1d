//! Ledger transaction artifacts.
//!
//! A request names everything in ciphertext: source and destination account
//! points under the respective bank keys and the value under the sending
//! bank's key. The header the sender derives carries the value twice more —
//! fresh encryptions under its own key and the receiving bank's key — tied
//! together by three proofs:
//!
//! - a Maxwell range proof on the source-key value cipher,
//! - a same-key equality proof back to the request's value cipher,
//! - a cross-key equality proof between the two fresh ciphers.
//!
//! Request ids travel with the request and the timeout with the message
//! header; neither is enforced here.

use std::sync::Arc;

use solidus_primitives::codec::{self, Codec, Decoder, Encoder};
use solidus_primitives::error::CodecError;
use solidus_primitives::group::{Point, PointEncoding, Scalar};
use solidus_primitives::params::Params;
use solidus_primitives::{Cipher, Executor};
use solidus_proofs::{
    MaxwellRangeProof, PlaintextEqDisKeyProof, PlaintextEqProof, SchnorrSignature,
};
use solidus_pvorm::PvormUpdate;

use crate::error::BankError;

/// The canonical compressed payload bytes of any artifact, used wherever a
/// signature covers another message.
pub(crate) fn payload_bytes<T: Codec>(value: &T) -> Vec<u8> {
    let mut enc = Encoder::compressed();
    value.encode(&mut enc);
    enc.finish()
}

/// A customer's transfer order, signed with the account key. The account
/// identifier *is* the customer's public point, so only the sending bank —
/// which can decrypt `enc_source_account` — can check the signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub txn_id: u64,
    pub source_bank: Point,
    pub dest_bank: Point,
    /// Source account point under the source bank key.
    pub enc_source_account: Cipher,
    /// Destination account point under the destination bank key.
    pub enc_dest_account: Cipher,
    /// Transfer value under the source bank key.
    pub enc_value: Cipher,
    pub signature: SchnorrSignature,
}

impl TransactionRequest {
    /// Compose and sign a request on the customer's behalf.
    pub fn build(
        params: &Arc<Params>,
        txn_id: u64,
        source_bank: Point,
        dest_bank: Point,
        account_secret: &Scalar,
        dest_account: &Point,
        value: i64,
    ) -> Self {
        let account = solidus_primitives::group::G * *account_secret;
        let source_encryptor = solidus_primitives::Encryptor::for_key(params, source_bank);
        let dest_encryptor = solidus_primitives::Encryptor::for_key(params, dest_bank);
        let mut request = Self {
            txn_id,
            source_bank,
            dest_bank,
            enc_source_account: source_encryptor.encrypt_point(&account),
            enc_dest_account: dest_encryptor.encrypt_point(dest_account),
            enc_value: source_encryptor.encrypt_value(value),
            signature: SchnorrSignature {
                challenge: Scalar::ZERO,
                response: Scalar::ZERO,
            },
        };
        let signed = request.signed_bytes();
        request.signature = SchnorrSignature::sign(params, account_secret, &[&signed]);
        request
    }

    /// Everything the customer signs: all fields except the signature.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut enc = Encoder::compressed();
        enc.put_u64(self.txn_id);
        enc.put_point(&self.source_bank);
        enc.put_point(&self.dest_bank);
        enc.put_pair(&self.enc_source_account);
        enc.put_pair(&self.enc_dest_account);
        enc.put_pair(&self.enc_value);
        enc.finish()
    }

    pub fn verify_signature(&self, account: &Point) -> bool {
        self.signature.verify(account, &[&self.signed_bytes()])
    }
}

impl Codec for TransactionRequest {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u64(self.txn_id);
        enc.put_point(&self.source_bank);
        enc.put_point(&self.dest_bank);
        enc.put_pair(&self.enc_source_account);
        enc.put_pair(&self.enc_dest_account);
        enc.put_pair(&self.enc_value);
        self.signature.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            txn_id: dec.u64()?,
            source_bank: dec.point()?,
            dest_bank: dec.point()?,
            enc_source_account: dec.pair()?,
            enc_dest_account: dec.pair()?,
            enc_value: dec.pair()?,
            signature: SchnorrSignature::decode(dec)?,
        })
    }
}

/// The sender-published transfer header: the original request plus fresh
/// value ciphers under both bank keys and the three proofs binding them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionHeader {
    pub request: TransactionRequest,
    /// Fresh encryption of the value under the source bank key.
    pub enc_value_source: Cipher,
    /// Fresh encryption of the value under the destination bank key.
    pub enc_value_dest: Cipher,
    pub range_proof: MaxwellRangeProof,
    pub reencryption_proof: PlaintextEqProof,
    pub cross_key_proof: PlaintextEqDisKeyProof,
}

impl TransactionHeader {
    /// Check all three header proofs. Anyone can run this; no key material
    /// is involved.
    pub fn verify(&self, params: &Params, exec: &Executor) -> bool {
        if !self.range_proof.verify(
            &self.enc_value_source,
            &self.request.source_bank,
            params.max_balance_bits(),
            exec,
        ) {
            return false;
        }
        if !self.reencryption_proof.verify(
            &self.request.enc_value,
            &self.enc_value_source,
            &self.request.source_bank,
        ) {
            return false;
        }
        self.cross_key_proof.verify(
            &self.enc_value_source,
            &self.enc_value_dest,
            &self.request.source_bank,
            &self.request.dest_bank,
        )
    }

    pub fn serialize(&self, params: &Arc<Params>, encoding: PointEncoding) -> Vec<u8> {
        codec::write_message(params, self, encoding)
    }

    pub fn deserialize(params: &Arc<Params>, bytes: &[u8]) -> Result<Self, BankError> {
        Ok(codec::read_message(params, bytes)?)
    }
}

impl Codec for TransactionHeader {
    fn encode(&self, enc: &mut Encoder) {
        self.request.encode(enc);
        enc.put_pair(&self.enc_value_source);
        enc.put_pair(&self.enc_value_dest);
        self.range_proof.encode(enc);
        self.reencryption_proof.encode(enc);
        self.cross_key_proof.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            request: TransactionRequest::decode(dec)?,
            enc_value_source: dec.pair()?,
            enc_value_dest: dec.pair()?,
            range_proof: MaxwellRangeProof::decode(dec)?,
            reencryption_proof: PlaintextEqProof::decode(dec)?,
            cross_key_proof: PlaintextEqDisKeyProof::decode(dec)?,
        })
    }
}

/// The sending bank's half of a settled transfer: its PVORM decrement and a
/// signature over header‖update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderInfo {
    pub update: PvormUpdate,
    pub signature: SchnorrSignature,
}

/// The receiving bank's half: its PVORM increment, likewise signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiverInfo {
    pub update: PvormUpdate,
    pub signature: SchnorrSignature,
}

pub(crate) fn info_signature(
    params: &Params,
    secret: &Scalar,
    header: &TransactionHeader,
    update: &PvormUpdate,
) -> SchnorrSignature {
    SchnorrSignature::sign(
        params,
        secret,
        &[&payload_bytes(header), &payload_bytes(update)],
    )
}

pub(crate) fn info_signature_holds(
    signature: &SchnorrSignature,
    bank: &Point,
    header: &TransactionHeader,
    update: &PvormUpdate,
) -> bool {
    signature.verify(bank, &[&payload_bytes(header), &payload_bytes(update)])
}

impl SenderInfo {
    pub fn verify_signature(&self, header: &TransactionHeader) -> bool {
        info_signature_holds(
            &self.signature,
            &header.request.source_bank,
            header,
            &self.update,
        )
    }
}

impl ReceiverInfo {
    pub fn verify_signature(&self, header: &TransactionHeader) -> bool {
        info_signature_holds(
            &self.signature,
            &header.request.dest_bank,
            header,
            &self.update,
        )
    }
}

impl Codec for SenderInfo {
    fn encode(&self, enc: &mut Encoder) {
        self.update.encode(enc);
        self.signature.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            update: PvormUpdate::decode(dec)?,
            signature: SchnorrSignature::decode(dec)?,
        })
    }
}

impl Codec for ReceiverInfo {
    fn encode(&self, enc: &mut Encoder) {
        self.update.encode(enc);
        self.signature.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            update: PvormUpdate::decode(dec)?,
            signature: SchnorrSignature::decode(dec)?,
        })
    }
}

/// A fully settled transfer as it appears in the broadcast log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub header: TransactionHeader,
    pub sender: SenderInfo,
    pub receiver: ReceiverInfo,
}

impl Transaction {
    /// Observer-side check of the whole artifact: header proofs, both bank
    /// signatures, and both PVORM updates against the given shadows. On
    /// success both shadows hold a pending overlay ready to apply.
    pub fn verify(
        &self,
        params: &Params,
        sender_shadow: &mut crate::bank::RemoteBank,
        receiver_shadow: &mut crate::bank::RemoteBank,
        exec: &Executor,
    ) -> bool {
        if !self.header.verify(params, exec) {
            tracing::debug!("transaction rejected: header proofs");
            return false;
        }
        if !self.sender.verify_signature(&self.header)
            || !self.receiver.verify_signature(&self.header)
        {
            tracing::debug!("transaction rejected: bank signature");
            return false;
        }
        sender_shadow.verify_update(&self.sender.update, exec)
            && receiver_shadow.verify_update(&self.receiver.update, exec)
    }

    pub fn serialize(&self, params: &Arc<Params>, encoding: PointEncoding) -> Vec<u8> {
        codec::write_message(params, self, encoding)
    }

    pub fn deserialize(params: &Arc<Params>, bytes: &[u8]) -> Result<Self, BankError> {
        Ok(codec::read_message(params, bytes)?)
    }
}

impl Codec for Transaction {
    fn encode(&self, enc: &mut Encoder) {
        self.header.encode(enc);
        self.sender.encode(enc);
        self.receiver.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            header: TransactionHeader::decode(dec)?,
            sender: SenderInfo::decode(dec)?,
            receiver: ReceiverInfo::decode(dec)?,
        })
    }
}
