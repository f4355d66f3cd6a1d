//! Local banks and their remote shadows.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use solidus_primitives::codec;
use solidus_primitives::error::CodecError;
use solidus_primitives::group::{self, Point, PointEncoding, Scalar};
use solidus_primitives::params::Params;
use solidus_primitives::{Decryptor, Encryptor, Executor};
use solidus_proofs::{MaxwellRangeProof, PlaintextEqDisKeyProof, PlaintextEqProof};
use solidus_pvorm::{EncryptedPvorm, OwnedPvorm, OwnedPvormBuilder, PvormUpdate};

use crate::error::BankError;
use crate::txn::{
    info_signature, ReceiverInfo, SenderInfo, TransactionHeader, TransactionRequest,
};

/// Base64url (no padding) of the compressed public encryption key.
pub fn bank_id(public_key: &Point) -> String {
    URL_SAFE_NO_PAD.encode(group::compress(public_key))
}

pub struct LocalBankBuilder {
    params: Arc<Params>,
    secret: Scalar,
    pvorm: OwnedPvormBuilder,
}

impl LocalBankBuilder {
    pub fn new(
        params: &Arc<Params>,
        secret: Scalar,
        depth: u32,
        bucket_size: u8,
        stash_size: u8,
    ) -> Result<Self, BankError> {
        Ok(Self {
            params: Arc::clone(params),
            secret,
            pvorm: OwnedPvormBuilder::new(params, secret, depth, bucket_size, stash_size)?,
        })
    }

    /// Open a customer account; the account identifier is the customer's
    /// public point.
    pub fn insert(&mut self, account: Point, balance: i64) -> Result<(), BankError> {
        Ok(self.pvorm.insert(account, balance)?)
    }

    pub fn build(self) -> Result<LocalBank, BankError> {
        let pvorm = self.pvorm.build()?;
        let public_key = pvorm.public_key();
        Ok(LocalBank {
            encryptor: Encryptor::for_key(&self.params, public_key),
            decryptor: Decryptor::for_key(&self.params, self.secret),
            params: self.params,
            secret: self.secret,
            public_key,
            pvorm,
        })
    }
}

/// A bank's private side: the owned PVORM, its keypair, and the
/// sender/receiver halves of the transfer protocol.
pub struct LocalBank {
    params: Arc<Params>,
    secret: Scalar,
    public_key: Point,
    pvorm: OwnedPvorm,
    encryptor: Arc<Encryptor>,
    decryptor: Decryptor,
}

impl LocalBank {
    pub fn public_key(&self) -> Point {
        self.public_key
    }

    pub fn id(&self) -> String {
        bank_id(&self.public_key)
    }

    pub fn encrypted_snapshot(&self) -> EncryptedPvorm {
        self.pvorm.encrypted_snapshot()
    }

    pub fn decrypt_all(
        &self,
    ) -> Result<std::collections::BTreeMap<group::PointKey, i64>, BankError> {
        Ok(self.pvorm.decrypt_all()?)
    }

    /// Validate a customer request and derive the transfer header.
    ///
    /// Rejections (wrong bank, bad signature, unknown account, negative
    /// value, insufficient balance) leave all state untouched.
    pub fn generate_header(
        &self,
        request: &TransactionRequest,
        exec: &Executor,
    ) -> Result<TransactionHeader, BankError> {
        if request.source_bank != self.public_key {
            return Err(BankError::WrongBank);
        }
        let account = self.decryptor.decrypt_point(&request.enc_source_account);
        if !self.pvorm.contains(&account) {
            return Err(BankError::UnknownAccount);
        }
        if !request.verify_signature(&account) {
            return Err(BankError::BadSignature);
        }
        let value = self.decryptor.decrypt_balance(&request.enc_value)?;
        if value < 0 {
            return Err(BankError::NegativeTransfer);
        }
        let balance = self
            .pvorm
            .balance_of(&account)
            .ok_or(BankError::UnknownAccount)?;
        if balance < value {
            return Err(BankError::InsufficientBalance);
        }

        // Fresh value ciphers with known openings under both bank keys.
        let (enc_value_source, source_opening) = self.encryptor.encrypt_value_opening(value);
        let dest_encryptor = Encryptor::for_key(&self.params, request.dest_bank);
        let (enc_value_dest, dest_opening) = dest_encryptor.encrypt_value_opening(value);

        let range_proof = MaxwellRangeProof::build(
            &self.params,
            &self.encryptor,
            &self.secret,
            &enc_value_source,
            value,
            self.params.max_balance_bits(),
            exec,
        );
        let reencryption_proof = PlaintextEqProof::build(
            &self.params,
            &request.enc_value,
            &enc_value_source,
            &self.public_key,
            &self.secret,
        );
        let cross_key_proof = PlaintextEqDisKeyProof::build(
            &self.params,
            &enc_value_source,
            &enc_value_dest,
            &self.public_key,
            &request.dest_bank,
            &Scalar::from(value as u64),
            &source_opening,
            &dest_opening,
        );

        Ok(TransactionHeader {
            request: request.clone(),
            enc_value_source,
            enc_value_dest,
            range_proof,
            reencryption_proof,
            cross_key_proof,
        })
    }

    /// Decrement the source account and sign the resulting update.
    pub fn send_transaction(
        &mut self,
        header: &TransactionHeader,
        exec: &Executor,
    ) -> Result<SenderInfo, BankError> {
        if header.request.source_bank != self.public_key {
            return Err(BankError::WrongBank);
        }
        let account = self
            .decryptor
            .decrypt_point(&header.request.enc_source_account);
        let value = self.decryptor.decrypt_balance(&header.enc_value_source)?;
        if value < 0 {
            return Err(BankError::NegativeTransfer);
        }
        let balance = self
            .pvorm
            .balance_of(&account)
            .ok_or(BankError::UnknownAccount)?;
        if balance < value {
            return Err(BankError::InsufficientBalance);
        }

        let update = self.pvorm.update(
            &header.request.enc_source_account,
            &-header.enc_value_source,
            true,
            exec,
        )?;
        let signature = info_signature(&self.params, &self.secret, header, &update);
        Ok(SenderInfo { update, signature })
    }

    /// Verify the header, credit the destination account, and sign the
    /// resulting update.
    pub fn receive_transaction(
        &mut self,
        header: &TransactionHeader,
        exec: &Executor,
    ) -> Result<ReceiverInfo, BankError> {
        if header.request.dest_bank != self.public_key {
            return Err(BankError::WrongBank);
        }
        if !header.verify(&self.params, exec) {
            return Err(BankError::RejectedHeader);
        }
        let account = self
            .decryptor
            .decrypt_point(&header.request.enc_dest_account);
        let value = self.decryptor.decrypt_balance(&header.enc_value_dest)?;
        let balance = self
            .pvorm
            .balance_of(&account)
            .ok_or(BankError::UnknownAccount)?;
        if balance + value > self.params.max_balance() {
            return Err(BankError::BalanceOverflow);
        }

        let update = self.pvorm.update(
            &header.request.enc_dest_account,
            &header.enc_value_dest,
            true,
            exec,
        )?;
        let signature = info_signature(&self.params, &self.secret, header, &update);
        Ok(ReceiverInfo { update, signature })
    }
}

/// Another bank's published state: its key and a duplicate of its encrypted
/// PVORM, advanced by verify-then-apply.
pub struct RemoteBank {
    public_key: Point,
    pvorm: EncryptedPvorm,
}

impl RemoteBank {
    pub fn new(pvorm: EncryptedPvorm) -> Self {
        Self {
            public_key: pvorm.public_key(),
            pvorm,
        }
    }

    pub fn public_key(&self) -> Point {
        self.public_key
    }

    pub fn id(&self) -> String {
        bank_id(&self.public_key)
    }

    pub fn pvorm(&self) -> &EncryptedPvorm {
        &self.pvorm
    }

    pub fn verify_update(&mut self, update: &PvormUpdate, exec: &Executor) -> bool {
        self.pvorm.verify_update(update, exec)
    }

    pub fn apply_last_verified_update(&mut self) -> Result<(), BankError> {
        Ok(self.pvorm.apply_last_verified_update()?)
    }

    pub fn verify_and_apply(
        &mut self,
        update: &PvormUpdate,
        exec: &Executor,
    ) -> Result<(), BankError> {
        if !self.pvorm.verify_update(update, exec) {
            return Err(BankError::RejectedUpdate);
        }
        self.apply_last_verified_update()
    }

    pub fn serialize(&self, encoding: PointEncoding) -> Vec<u8> {
        let mut enc = codec::message_encoder(self.pvorm.params(), encoding);
        enc.put_point(&self.public_key);
        self.pvorm.encode_payload(&mut enc);
        enc.finish()
    }

    pub fn deserialize(params: &Arc<Params>, bytes: &[u8]) -> Result<Self, BankError> {
        let mut dec = codec::open_message(params, bytes)?;
        let public_key = dec.point()?;
        let pvorm = EncryptedPvorm::decode_payload(params, &mut dec)?;
        dec.finish()?;
        if pvorm.public_key() != public_key {
            return Err(BankError::Codec(CodecError::MalformedInput(
                "remote bank key disagrees with its PVORM",
            )));
        }
        Ok(Self { public_key, pvorm })
    }
}
