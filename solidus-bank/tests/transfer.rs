//! The two-bank transfer scenario: a full confidential settlement observed
//! and replayed by third-party shadows, plus the overdraft rejection.

use solidus_primitives::group::{Point, PointKey, Scalar, G};
use solidus_primitives::params::ParamsBuilder;
use solidus_primitives::{Executor, PointEncoding};
use solidus_bank::{
    BankError, LocalBank, LocalBankBuilder, RemoteBank, Transaction, TransactionRequest,
};
use solidus_vectors::{
    MAX_BALANCE_BITS, TRANSFER_BUCKET_SIZE, TRANSFER_OPENING_BALANCE, TRANSFER_PARAMS_SEED,
    TRANSFER_STASH_SIZE, TRANSFER_TREE_DEPTH, TRANSFER_USERS_PER_BANK,
};

fn build_bank(
    params: &std::sync::Arc<solidus_primitives::Params>,
) -> (LocalBank, Vec<(Scalar, Point)>) {
    let secret = params.random_scalar();
    let mut builder = LocalBankBuilder::new(
        params,
        secret,
        TRANSFER_TREE_DEPTH,
        TRANSFER_BUCKET_SIZE,
        TRANSFER_STASH_SIZE,
    )
    .expect("builder");
    let users: Vec<(Scalar, Point)> = (0..TRANSFER_USERS_PER_BANK)
        .map(|_| {
            let user_secret = params.random_scalar();
            let account = G * user_secret;
            builder
                .insert(account, TRANSFER_OPENING_BALANCE)
                .expect("insert");
            (user_secret, account)
        })
        .collect();
    (builder.build().expect("bank"), users)
}

#[test]
fn full_transfer_settles_and_shadows_converge() {
    let params = ParamsBuilder::new()
        .max_balance_bits(MAX_BALANCE_BITS)
        .seed(TRANSFER_PARAMS_SEED)
        .build()
        .expect("params");
    let exec = Executor::with_threads(4).expect("pool");

    let (mut bank_a, users_a) = build_bank(&params);
    let (mut bank_b, users_b) = build_bank(&params);
    let mut shadow_a = RemoteBank::new(bank_a.encrypted_snapshot());
    let mut shadow_b = RemoteBank::new(bank_b.encrypted_snapshot());

    // User A0 sends their whole opening balance to user B0.
    let request = TransactionRequest::build(
        &params,
        7,
        bank_a.public_key(),
        bank_b.public_key(),
        &users_a[0].0,
        &users_b[0].1,
        TRANSFER_OPENING_BALANCE,
    );
    let header = bank_a.generate_header(&request, &exec).expect("header");

    let sender = bank_a.send_transaction(&header, &exec).expect("send");
    assert!(shadow_a.verify_update(&sender.update, &exec));
    shadow_a.apply_last_verified_update().expect("apply sender");

    let receiver = bank_b
        .receive_transaction(&header, &exec)
        .expect("receive");
    assert!(shadow_b.verify_update(&receiver.update, &exec));
    shadow_b.apply_last_verified_update().expect("apply receiver");

    // The assembled transaction also verifies as one artifact against fresh
    // shadows, survives the wire, and leaves both pending for apply.
    let txn = Transaction {
        header,
        sender,
        receiver,
    };
    let bytes = txn.serialize(&params, PointEncoding::Compressed);
    let replayed = Transaction::deserialize(&params, &bytes).expect("deserialize");
    assert_eq!(replayed, txn);

    let mut fresh_a = RemoteBank::new(bank_a.encrypted_snapshot());
    let mut fresh_b = RemoteBank::new(bank_b.encrypted_snapshot());
    // Fresh shadows were taken after the updates applied, so verification
    // against them must fail — the artifact binds to the pre-state.
    assert!(!replayed.verify(&params, &mut fresh_a, &mut fresh_b, &exec));

    // Balances: A0 drained, B0 doubled, everyone else untouched.
    let view_a = bank_a.decrypt_all().expect("decrypt A");
    assert_eq!(view_a[&PointKey::new(&users_a[0].1)], 0);
    for (_, account) in &users_a[1..] {
        assert_eq!(view_a[&PointKey::new(account)], TRANSFER_OPENING_BALANCE);
    }
    let view_b = bank_b.decrypt_all().expect("decrypt B");
    assert_eq!(
        view_b[&PointKey::new(&users_b[0].1)],
        2 * TRANSFER_OPENING_BALANCE
    );
    for (_, account) in &users_b[1..] {
        assert_eq!(view_b[&PointKey::new(account)], TRANSFER_OPENING_BALANCE);
    }
}

#[test]
fn observers_accept_a_transfer_via_the_transaction_artifact() {
    let params = ParamsBuilder::new()
        .max_balance_bits(MAX_BALANCE_BITS)
        .seed([0xc3; 32])
        .build()
        .expect("params");
    let exec = Executor::inline();

    let (mut bank_a, users_a) = build_bank(&params);
    let (mut bank_b, users_b) = build_bank(&params);
    let mut shadow_a = RemoteBank::new(bank_a.encrypted_snapshot());
    let mut shadow_b = RemoteBank::new(bank_b.encrypted_snapshot());

    let request = TransactionRequest::build(
        &params,
        8,
        bank_a.public_key(),
        bank_b.public_key(),
        &users_a[1].0,
        &users_b[2].1,
        4,
    );
    let header = bank_a.generate_header(&request, &exec).expect("header");
    let sender = bank_a.send_transaction(&header, &exec).expect("send");
    let receiver = bank_b
        .receive_transaction(&header, &exec)
        .expect("receive");
    let txn = Transaction {
        header,
        sender,
        receiver,
    };

    assert!(txn.verify(&params, &mut shadow_a, &mut shadow_b, &exec));
    shadow_a.apply_last_verified_update().expect("apply A");
    shadow_b.apply_last_verified_update().expect("apply B");

    assert_eq!(
        bank_a.decrypt_all().expect("A")[&PointKey::new(&users_a[1].1)],
        TRANSFER_OPENING_BALANCE - 4
    );
    assert_eq!(
        bank_b.decrypt_all().expect("B")[&PointKey::new(&users_b[2].1)],
        TRANSFER_OPENING_BALANCE + 4
    );
}

#[test]
fn transfer_above_balance_is_rejected_at_header_time() {
    let params = ParamsBuilder::new()
        .max_balance_bits(MAX_BALANCE_BITS)
        .seed([0xc4; 32])
        .build()
        .expect("params");
    let exec = Executor::inline();

    let (bank_a, users_a) = build_bank(&params);
    let (bank_b, users_b) = build_bank(&params);

    let request = TransactionRequest::build(
        &params,
        9,
        bank_a.public_key(),
        bank_b.public_key(),
        &users_a[0].0,
        &users_b[0].1,
        TRANSFER_OPENING_BALANCE + 1,
    );
    assert!(matches!(
        bank_a.generate_header(&request, &exec),
        Err(BankError::InsufficientBalance)
    ));
    // Nothing changed.
    for (_, account) in &users_a {
        assert_eq!(
            bank_a.decrypt_all().expect("A")[&PointKey::new(account)],
            TRANSFER_OPENING_BALANCE
        );
    }
}

#[test]
fn zero_value_transfers_are_allowed() {
    let params = ParamsBuilder::new()
        .max_balance_bits(MAX_BALANCE_BITS)
        .seed([0xc5; 32])
        .build()
        .expect("params");
    let exec = Executor::inline();

    let (mut bank_a, users_a) = build_bank(&params);
    let (mut bank_b, users_b) = build_bank(&params);

    let request = TransactionRequest::build(
        &params,
        10,
        bank_a.public_key(),
        bank_b.public_key(),
        &users_a[0].0,
        &users_b[0].1,
        0,
    );
    let header = bank_a.generate_header(&request, &exec).expect("header");
    bank_a.send_transaction(&header, &exec).expect("send");
    bank_b.receive_transaction(&header, &exec).expect("receive");

    assert_eq!(
        bank_a.decrypt_all().expect("A")[&PointKey::new(&users_a[0].1)],
        TRANSFER_OPENING_BALANCE
    );
    assert_eq!(
        bank_b.decrypt_all().expect("B")[&PointKey::new(&users_b[0].1)],
        TRANSFER_OPENING_BALANCE
    );
}
