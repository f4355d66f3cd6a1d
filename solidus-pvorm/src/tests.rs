//! PVORM unit tests: plaintext ORAM invariants, owner/verifier lock-step,
//! update serialization, and the verify-then-apply protocol.

use std::collections::BTreeMap;
use std::sync::Arc;

use solidus_primitives::group::{Point, PointKey, Scalar, G};
use solidus_primitives::params::{Params, ParamsBuilder};
use solidus_primitives::{Encryptor, Executor, PointEncoding};

use crate::plain::PlainOram;
use crate::{OwnedPvorm, OwnedPvormBuilder, PvormError, PvormUpdate};

struct Bank {
    params: Arc<Params>,
    secret: Scalar,
    encryptor: Arc<Encryptor>,
    pvorm: OwnedPvorm,
    accounts: Vec<Point>,
}

fn make_bank(
    seed: u8,
    depth: u32,
    bucket_size: u8,
    stash_size: u8,
    balances: &[i64],
) -> Bank {
    let params = ParamsBuilder::new()
        .max_balance_bits(8)
        .seed([seed; 32])
        .build()
        .expect("params");
    let secret = params.random_scalar();
    let mut builder =
        OwnedPvormBuilder::new(&params, secret, depth, bucket_size, stash_size).expect("builder");
    let accounts: Vec<Point> = balances
        .iter()
        .map(|&balance| {
            let account = G * params.random_scalar();
            builder.insert(account, balance).expect("insert");
            account
        })
        .collect();
    let pvorm = builder.build().expect("build");
    let encryptor = Encryptor::for_key(&params, pvorm.public_key());
    Bank {
        params,
        secret,
        encryptor,
        pvorm,
        accounts,
    }
}

fn expected_map(accounts: &[Point], balances: &[i64]) -> BTreeMap<PointKey, i64> {
    accounts
        .iter()
        .zip(balances)
        .map(|(account, &balance)| (PointKey::new(account), balance))
        .collect()
}

fn update_for(bank: &mut Bank, account: usize, delta: i64, exec: &Executor) -> PvormUpdate {
    let enc_key = bank.encryptor.encrypt_point(&bank.accounts[account]);
    let enc_delta = bank.encryptor.encrypt_value(delta);
    bank.pvorm
        .update(&enc_key, &enc_delta, true, exec)
        .expect("update")
}

// ---------------- plaintext ORAM ----------------

#[test]
fn plain_oram_holds_invariants_across_updates() {
    let params = ParamsBuilder::new()
        .max_balance_bits(8)
        .seed([40u8; 32])
        .build()
        .expect("params");
    let mut oram = PlainOram::new(&params, 3, 2, 6).expect("oram");
    let accounts: Vec<Point> = (0..6).map(|_| G * params.random_scalar()).collect();
    for (i, account) in accounts.iter().enumerate() {
        oram.insert(*account, i as i64).expect("insert");
        oram.assert_invariants();
    }
    for round in 0..24 {
        let account = &accounts[round % accounts.len()];
        let delta = if round % 2 == 0 { 3 } else { -3 };
        let transcript = oram.update(account, delta).expect("update");
        assert_eq!(transcript.evictions.len(), 2);
        oram.assert_invariants();
    }
    for (i, account) in accounts.iter().enumerate() {
        assert_eq!(oram.balance_of(account), Some(i as i64));
    }
}

#[test]
fn plain_oram_rejects_duplicates_and_capacity() {
    let params = ParamsBuilder::new()
        .max_balance_bits(8)
        .seed([41u8; 32])
        .build()
        .expect("params");
    let mut oram = PlainOram::new(&params, 1, 2, 4).expect("oram");
    let a = G * params.random_scalar();
    let b = G * params.random_scalar();
    let c = G * params.random_scalar();
    oram.insert(a, 1).expect("first insert");
    assert!(matches!(oram.insert(a, 1), Err(PvormError::AccountExists)));
    oram.insert(b, 2).expect("second insert");
    assert!(matches!(
        oram.insert(c, 3),
        Err(PvormError::CapacityExceeded)
    ));
    assert!(matches!(
        oram.update(&c, 1),
        Err(PvormError::UnknownAccount)
    ));
}

#[test]
fn minimal_geometry_still_updates() {
    // depth 1, bucket 1, stash 1: a single account must keep working.
    let mut bank = make_bank(42, 1, 1, 1, &[7]);
    let exec = Executor::inline();
    let mut shadow = bank.pvorm.encrypted_snapshot();
    for delta in [1i64, -4, 3] {
        let update = update_for(&mut bank, 0, delta, &exec);
        assert!(shadow.verify_update(&update, &exec));
        shadow.apply_last_verified_update().expect("apply");
    }
    let decrypted = shadow.decrypt_all(&bank.secret).expect("decrypt");
    assert_eq!(decrypted, expected_map(&bank.accounts, &[7]));
}

// ---------------- owner / verifier lock-step ----------------

#[test]
fn decrypt_all_tracks_cumulative_changes() {
    let mut bank = make_bank(43, 3, 2, 4, &[10, 20, 30]);
    let exec = Executor::inline();
    let mut balances = [10i64, 20, 30];
    for (account, delta) in [(0usize, 5i64), (1, -20), (2, 12), (0, -15), (2, 0)] {
        update_for(&mut bank, account, delta, &exec);
        balances[account] += delta;
    }
    let decrypted = bank.pvorm.decrypt_all().expect("decrypt");
    assert_eq!(decrypted, expected_map(&bank.accounts, &balances));
}

#[test]
fn duplicates_verify_apply_and_converge() {
    let mut bank = make_bank(44, 3, 2, 4, &[50, 60]);
    let exec = Executor::with_threads(4).expect("pool");
    let mut shadow = bank.pvorm.encrypted_snapshot();

    for (account, delta) in [(0usize, -50i64), (1, 7), (0, 33)] {
        let update = update_for(&mut bank, account, delta, &exec);
        assert_eq!(update.public_key, bank.pvorm.public_key());
        assert!(update.valid_size(3, 2, 4));

        // Verification is deterministic.
        assert!(shadow.verify_update(&update, &exec));
        assert!(shadow.verify_update(&update, &exec));
        shadow.apply_last_verified_update().expect("apply");
    }

    let owner_view = bank.pvorm.decrypt_all().expect("owner decrypt");
    let shadow_view = shadow.decrypt_all(&bank.secret).expect("shadow decrypt");
    assert_eq!(owner_view, shadow_view);
    assert_eq!(shadow_view, expected_map(&bank.accounts, &[33, 67]));
}

#[test]
fn apply_without_pending_update_errors() {
    let bank = make_bank(45, 2, 2, 4, &[5]);
    let mut shadow = bank.pvorm.encrypted_snapshot();
    assert!(matches!(
        shadow.apply_last_verified_update(),
        Err(PvormError::NoVerifiedUpdate)
    ));
}

#[test]
fn failed_verification_retains_no_overlay() {
    let mut bank = make_bank(46, 2, 2, 4, &[9, 9]);
    let exec = Executor::inline();
    let mut shadow = bank.pvorm.encrypted_snapshot();

    let mut update = update_for(&mut bank, 0, -2, &exec);
    update.pre_swaps[3].new_temp = update.pre_swaps[2].new_temp;
    assert!(!shadow.verify_update(&update, &exec));
    assert!(matches!(
        shadow.apply_last_verified_update(),
        Err(PvormError::NoVerifiedUpdate)
    ));
}

#[test]
fn dimension_and_key_mismatches_are_rejected() {
    let mut bank = make_bank(47, 2, 2, 4, &[9]);
    let other = make_bank(48, 2, 2, 4, &[9]);
    let exec = Executor::inline();
    let update = update_for(&mut bank, 0, 1, &exec);

    let mut foreign = other.pvorm.encrypted_snapshot();
    assert!(!foreign.verify_update(&update, &exec));

    let mut wrong_shape = update.clone();
    wrong_shape.tree_depth = 3;
    let mut shadow = bank.pvorm.encrypted_snapshot();
    assert!(!shadow.verify_update(&wrong_shape, &exec));

    let mut truncated = update;
    truncated.post_swaps.pop();
    assert!(!shadow.verify_update(&truncated, &exec));
}

#[test]
fn unverified_apply_matches_verified_apply() {
    let mut bank = make_bank(49, 3, 2, 4, &[21, 34]);
    let exec = Executor::inline();
    let mut verified = bank.pvorm.encrypted_snapshot();
    let mut audited = bank.pvorm.encrypted_snapshot();

    for (account, delta) in [(0usize, -8i64), (1, 13)] {
        let update = update_for(&mut bank, account, delta, &exec);
        assert!(verified.verify_update(&update, &exec));
        verified.apply_last_verified_update().expect("apply");
        audited
            .apply_update_without_verification(&update)
            .expect("audit apply");
    }
    assert_eq!(
        verified.decrypt_all(&bank.secret).expect("decrypt"),
        audited.decrypt_all(&bank.secret).expect("decrypt")
    );
}

// ---------------- serialization ----------------

#[test]
fn updates_round_trip_in_both_encodings() {
    let mut bank = make_bank(50, 2, 2, 4, &[99]);
    let exec = Executor::inline();
    let update = update_for(&mut bank, 0, -42, &exec);

    for encoding in [PointEncoding::Compressed, PointEncoding::Uncompressed] {
        let bytes = update.serialize(&bank.params, encoding);
        let decoded = PvormUpdate::deserialize(&bank.params, &bytes).expect("decode");
        assert_eq!(decoded, update);
        assert_eq!(decoded.serialize(&bank.params, encoding), bytes);
    }
}

#[test]
fn snapshots_round_trip_and_reject_foreign_headers() {
    let bank = make_bank(51, 2, 2, 4, &[1, 2, 3]);
    let snapshot = bank.pvorm.encrypted_snapshot();
    let bytes = snapshot.serialize(PointEncoding::Compressed);
    let decoded =
        crate::EncryptedPvorm::deserialize(&bank.params, &bytes).expect("decode snapshot");
    assert_eq!(
        decoded.decrypt_all(&bank.secret).expect("decrypt"),
        snapshot.decrypt_all(&bank.secret).expect("decrypt")
    );

    let other_params = ParamsBuilder::new()
        .max_balance_bits(8)
        .transaction_timeout_ms(999)
        .seed([52u8; 32])
        .build()
        .expect("params");
    assert!(crate::EncryptedPvorm::deserialize(&other_params, &bytes).is_err());
}

#[test]
fn truncated_update_bytes_are_malformed() {
    let mut bank = make_bank(53, 2, 2, 4, &[4]);
    let exec = Executor::inline();
    let update = update_for(&mut bank, 0, 2, &exec);
    let bytes = update.serialize(&bank.params, PointEncoding::Compressed);
    assert!(PvormUpdate::deserialize(&bank.params, &bytes[..bytes.len() - 3]).is_err());
}
