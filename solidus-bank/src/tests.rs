//! Bank-surface tests: request validation, header proofs, and artifact
//! round-trips.

use std::sync::Arc;

use solidus_primitives::group::{Point, PointEncoding, Scalar, G};
use solidus_primitives::params::{Params, ParamsBuilder};
use solidus_primitives::Executor;

use crate::txn::{Transaction, TransactionHeader, TransactionRequest};
use crate::{bank_id, BankError, LocalBank, LocalBankBuilder, RemoteBank};

struct TestNet {
    params: Arc<Params>,
    bank_a: LocalBank,
    bank_b: LocalBank,
    users_a: Vec<(Scalar, Point)>,
    users_b: Vec<(Scalar, Point)>,
}

fn test_net(seed: u8) -> TestNet {
    let params = ParamsBuilder::new()
        .max_balance_bits(8)
        .seed([seed; 32])
        .build()
        .expect("params");

    let mut build_bank = |balance: i64| {
        let secret = params.random_scalar();
        let mut builder = LocalBankBuilder::new(&params, secret, 3, 2, 5).expect("builder");
        let users: Vec<(Scalar, Point)> = (0..3)
            .map(|_| {
                let user_secret = params.random_scalar();
                let account = G * user_secret;
                builder.insert(account, balance).expect("insert");
                (user_secret, account)
            })
            .collect();
        (builder.build().expect("bank"), users)
    };
    let (bank_a, users_a) = build_bank(10);
    let (bank_b, users_b) = build_bank(10);
    TestNet {
        params,
        bank_a,
        bank_b,
        users_a,
        users_b,
    }
}

fn request(net: &TestNet, user: usize, dest_user: usize, value: i64) -> TransactionRequest {
    TransactionRequest::build(
        &net.params,
        1,
        net.bank_a.public_key(),
        net.bank_b.public_key(),
        &net.users_a[user].0,
        &net.users_b[dest_user].1,
        value,
    )
}

#[test]
fn bank_ids_are_base64url_of_the_compressed_key() {
    let net = test_net(60);
    let id = net.bank_a.id();
    assert_eq!(id.len(), 44);
    assert!(!id.contains('='));
    assert_ne!(id, net.bank_b.id());
    assert_eq!(id, bank_id(&net.bank_a.public_key()));
}

#[test]
fn request_signatures_bind_the_account() {
    let net = test_net(61);
    let req = request(&net, 0, 0, 5);
    assert!(req.verify_signature(&net.users_a[0].1));
    assert!(!req.verify_signature(&net.users_a[1].1));

    let mut forged = req;
    forged.txn_id = 2;
    assert!(!forged.verify_signature(&net.users_a[0].1));
}

#[test]
fn generate_header_validates_inputs() {
    let net = test_net(62);
    let exec = Executor::inline();

    // Happy path.
    let req = request(&net, 0, 0, 5);
    let header = net.bank_a.generate_header(&req, &exec).expect("header");
    assert!(header.verify(&net.params, &exec));

    // Wrong bank.
    assert!(matches!(
        net.bank_b.generate_header(&req, &exec),
        Err(BankError::WrongBank)
    ));

    // Unknown account: a customer of B signing through A.
    let foreign = TransactionRequest::build(
        &net.params,
        3,
        net.bank_a.public_key(),
        net.bank_b.public_key(),
        &net.users_b[0].0,
        &net.users_b[1].1,
        5,
    );
    assert!(matches!(
        net.bank_a.generate_header(&foreign, &exec),
        Err(BankError::UnknownAccount)
    ));

    // Tampered signature.
    let mut tampered = request(&net, 0, 0, 5);
    tampered.txn_id ^= 1;
    assert!(matches!(
        net.bank_a.generate_header(&tampered, &exec),
        Err(BankError::BadSignature)
    ));

    // Negative value.
    let negative = request(&net, 0, 0, -1);
    assert!(matches!(
        net.bank_a.generate_header(&negative, &exec),
        Err(BankError::NegativeTransfer)
    ));

    // Balance below transfer amount.
    let too_much = request(&net, 0, 0, 11);
    assert!(matches!(
        net.bank_a.generate_header(&too_much, &exec),
        Err(BankError::InsufficientBalance)
    ));

    // Exactly the whole balance is fine.
    let all_of_it = request(&net, 1, 0, 10);
    assert!(net.bank_a.generate_header(&all_of_it, &exec).is_ok());
}

#[test]
fn header_proofs_reject_substituted_ciphers() {
    let net = test_net(63);
    let exec = Executor::inline();
    let req = request(&net, 0, 0, 4);
    let header = net.bank_a.generate_header(&req, &exec).expect("header");

    let other = request(&net, 1, 1, 4);
    let other_header = net.bank_a.generate_header(&other, &exec).expect("header");

    let mut franken = header.clone();
    franken.enc_value_source = other_header.enc_value_source;
    assert!(!franken.verify(&net.params, &exec));

    let mut franken = header;
    franken.enc_value_dest = other_header.enc_value_dest;
    assert!(!franken.verify(&net.params, &exec));
}

#[test]
fn artifacts_round_trip_in_both_encodings() {
    let mut net = test_net(64);
    let exec = Executor::inline();
    let req = request(&net, 0, 1, 3);
    let header = net.bank_a.generate_header(&req, &exec).expect("header");
    let sender = net.bank_a.send_transaction(&header, &exec).expect("send");
    let receiver = net
        .bank_b
        .receive_transaction(&header, &exec)
        .expect("receive");
    let txn = Transaction {
        header: header.clone(),
        sender,
        receiver,
    };

    for encoding in [PointEncoding::Compressed, PointEncoding::Uncompressed] {
        let bytes = header.serialize(&net.params, encoding);
        let decoded = TransactionHeader::deserialize(&net.params, &bytes).expect("header");
        assert_eq!(decoded, header);
        assert_eq!(decoded.serialize(&net.params, encoding), bytes);

        let bytes = txn.serialize(&net.params, encoding);
        let decoded = Transaction::deserialize(&net.params, &bytes).expect("txn");
        assert_eq!(decoded, txn);
        assert_eq!(decoded.serialize(&net.params, encoding), bytes);
    }

    // A different deployment rejects the header outright.
    let foreign_params = ParamsBuilder::new()
        .max_balance_bits(8)
        .transaction_timeout_ms(1234)
        .seed([65u8; 32])
        .build()
        .expect("params");
    let bytes = txn.serialize(&net.params, PointEncoding::Compressed);
    assert!(Transaction::deserialize(&foreign_params, &bytes).is_err());
}

#[test]
fn remote_bank_state_round_trips() {
    let net = test_net(66);
    let remote = RemoteBank::new(net.bank_a.encrypted_snapshot());
    let bytes = remote.serialize(PointEncoding::Compressed);
    let decoded = RemoteBank::deserialize(&net.params, &bytes).expect("remote bank");
    assert_eq!(decoded.public_key(), net.bank_a.public_key());
    assert_eq!(decoded.serialize(PointEncoding::Compressed), bytes);
}
