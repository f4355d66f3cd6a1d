//! The drain/restore scenario: seven accounts emptied to zero and refilled,
//! with a duplicate PVORM verifying and applying every published update.

use std::collections::BTreeMap;

use solidus_primitives::group::{Point, PointKey, G};
use solidus_primitives::params::ParamsBuilder;
use solidus_primitives::{Encryptor, Executor, PointEncoding};
use solidus_pvorm::{OwnedPvormBuilder, PvormUpdate};
use solidus_vectors::{
    DRAIN_BALANCES, DRAIN_BUCKET_SIZE, DRAIN_PARAMS_SEED, DRAIN_STASH_SIZE, DRAIN_TREE_DEPTH,
    MAX_BALANCE_BITS,
};

#[test]
fn drain_to_zero_then_restore() {
    let params = ParamsBuilder::new()
        .max_balance_bits(MAX_BALANCE_BITS)
        .seed(DRAIN_PARAMS_SEED)
        .build()
        .expect("params");
    let secret = params.random_scalar();

    let mut builder = OwnedPvormBuilder::new(
        &params,
        secret,
        DRAIN_TREE_DEPTH,
        DRAIN_BUCKET_SIZE,
        DRAIN_STASH_SIZE,
    )
    .expect("builder");
    let accounts: Vec<Point> = DRAIN_BALANCES
        .iter()
        .map(|&balance| {
            let account = G * params.random_scalar();
            builder.insert(account, balance).expect("insert");
            account
        })
        .collect();
    let mut owner = builder.build().expect("build");
    let encryptor = Encryptor::for_key(&params, owner.public_key());
    let exec = Executor::with_threads(4).expect("pool");

    let mut duplicate = owner.encrypted_snapshot();
    assert_eq!(
        duplicate.decrypt_all(&secret).expect("initial decrypt"),
        owner.decrypt_all().expect("owner decrypt")
    );
    let initial = owner.decrypt_all().expect("initial state");

    let mut run = |owner: &mut solidus_pvorm::OwnedPvorm,
                   duplicate: &mut solidus_pvorm::EncryptedPvorm,
                   account: &Point,
                   delta: i64| {
        let enc_key = encryptor.encrypt_point(account);
        let enc_delta = encryptor.encrypt_value(delta);
        let update = owner
            .update(&enc_key, &enc_delta, true, &exec)
            .expect("update");

        // The published bytes reconstitute the exact same update.
        let bytes = update.serialize(&params, PointEncoding::Compressed);
        let decoded = PvormUpdate::deserialize(&params, &bytes).expect("deserialize");
        assert_eq!(decoded, update);
        assert_eq!(decoded.serialize(&params, PointEncoding::Compressed), bytes);

        assert!(duplicate.verify_update(&decoded, &exec), "update rejected");
        duplicate.apply_last_verified_update().expect("apply");
    };

    // Drain in an order different from insertion.
    for (i, &balance) in DRAIN_BALANCES.iter().enumerate().rev() {
        run(&mut owner, &mut duplicate, &accounts[i], -balance);
    }
    let zeroed: BTreeMap<PointKey, i64> = accounts
        .iter()
        .map(|account| (PointKey::new(account), 0))
        .collect();
    assert_eq!(duplicate.decrypt_all(&secret).expect("decrypt"), zeroed);
    assert_eq!(owner.decrypt_all().expect("decrypt"), zeroed);

    // Restore and converge on the initial state.
    for (i, &balance) in DRAIN_BALANCES.iter().enumerate() {
        run(&mut owner, &mut duplicate, &accounts[i], balance);
    }
    assert_eq!(duplicate.decrypt_all(&secret).expect("decrypt"), initial);
    assert_eq!(owner.decrypt_all().expect("decrypt"), initial);
}
