use privacy_pool::{
    Address, FieldElement, Halo2Verifier, MerkleTree, NativeBalances, Note, PoolError, PoolEvent,
    PoolParams, PoseidonHasher, PrivacyPool, PublicInputs, TxContext, WithdrawKeys,
    WithdrawProver, WithdrawalRequest, CIRCUIT_K,
};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const DENOMINATION: u64 = 1_000_000_000;
const FEE: u64 = 100_000_000;

fn addr(byte: u8) -> Address {
    Address::new([byte; 20])
}

fn governance() -> Address {
    addr(0xaa)
}

fn new_pool(
    keys: &WithdrawKeys,
    height: u32,
    root_history_size: usize,
) -> PrivacyPool<Halo2Verifier, NativeBalances> {
    let params = PoolParams {
        height,
        root_history_size,
        denomination: DENOMINATION,
        governance: Some(governance()),
    };
    let mut assets = NativeBalances::new();
    assets.credit(addr(1), 100 * DENOMINATION).unwrap();
    PrivacyPool::new(params, PoseidonHasher, keys.verifier(), assets).unwrap()
}

fn withdrawal(
    prover: &WithdrawProver,
    note: &Note,
    root: FieldElement,
    fee: u64,
) -> WithdrawalRequest {
    let inputs = PublicInputs {
        root,
        nullifier_hash: note.nullifier_hash(&PoseidonHasher),
        recipient: addr(2),
        relayer: addr(3),
        fee,
        refund: 0,
    };
    WithdrawalRequest {
        proof: prover.generate_proof(&inputs).unwrap(),
        inputs,
    }
}

#[test]
fn test_deposit_then_relayed_withdrawal() {
    let keys = WithdrawKeys::generate(CIRCUIT_K).unwrap();
    let prover = keys.prover();
    let mut pool = new_pool(&keys, 20, 30);
    let ctx = TxContext::new(addr(1), 1_700_000_000);

    let notes: Vec<Note> = (0..3).map(|_| Note::random()).collect();
    for (i, note) in notes.iter().enumerate() {
        let index = pool.deposit(&ctx, note.commitment(&PoseidonHasher)).unwrap();
        assert_eq!(index, i as u64);
    }
    assert_eq!(pool.assets().pool_balance(), 3 * DENOMINATION);

    let request = withdrawal(&prover, &notes[1], pool.current_root(), FEE);
    pool.withdraw(&TxContext::new(addr(3), 1_700_000_100), &request)
        .unwrap();

    assert_eq!(pool.assets().balance_of(&addr(2)), DENOMINATION - FEE);
    assert_eq!(pool.assets().balance_of(&addr(3)), FEE);
    assert_eq!(pool.assets().pool_balance(), 2 * DENOMINATION);
    assert!(pool.is_spent(&notes[1].nullifier_hash(&PoseidonHasher)));
    assert_eq!(
        pool.events().last(),
        Some(&PoolEvent::Withdrawal {
            recipient: addr(2),
            nullifier_hash: notes[1].nullifier_hash(&PoseidonHasher),
            relayer: addr(3),
            fee: FEE,
        })
    );

    // A second proof for the same note is a double spend.
    let again = withdrawal(&prover, &notes[1], pool.current_root(), FEE);
    assert_eq!(
        pool.withdraw(&TxContext::new(addr(3), 1_700_000_200), &again),
        Err(PoolError::AlreadySpent)
    );
}

#[test]
fn test_proof_for_other_recipient_rejected() {
    let keys = WithdrawKeys::generate(CIRCUIT_K).unwrap();
    let mut pool = new_pool(&keys, 8, 5);
    let note = Note::random();
    pool.deposit(&TxContext::new(addr(1), 0), note.commitment(&PoseidonHasher))
        .unwrap();

    let mut request = withdrawal(&keys.prover(), &note, pool.current_root(), 0);
    request.inputs.recipient = addr(9);

    assert_eq!(
        pool.withdraw(&TxContext::new(addr(3), 0), &request),
        Err(PoolError::InvalidProof)
    );
    assert!(!pool.is_spent(&note.nullifier_hash(&PoseidonHasher)));
}

#[test]
fn test_stale_root_falls_out_of_history() {
    let keys = WithdrawKeys::generate(CIRCUIT_K).unwrap();
    let mut pool = new_pool(&keys, 8, 3);
    let ctx = TxContext::new(addr(1), 0);
    let note = Note::random();

    pool.deposit(&ctx, note.commitment(&PoseidonHasher)).unwrap();
    let root_after_deposit = pool.current_root();

    pool.deposit(&ctx, FieldElement::from(100)).unwrap();
    pool.deposit(&ctx, FieldElement::from(101)).unwrap();
    // The root is still inside a window of three.
    assert!(pool.is_known_root(&root_after_deposit));

    pool.deposit(&ctx, FieldElement::from(102)).unwrap();
    assert!(!pool.is_known_root(&root_after_deposit));

    let request = withdrawal(&keys.prover(), &note, root_after_deposit, 0);
    assert_eq!(
        pool.withdraw(&TxContext::new(addr(3), 0), &request),
        Err(PoolError::UnknownRoot)
    );
}

#[test]
fn test_revocation_matches_rebuilt_tree() {
    let keys = WithdrawKeys::generate(CIRCUIT_K).unwrap();
    let mut pool = new_pool(&keys, 6, 10);
    let ctx = TxContext::new(addr(1), 0);

    let commitments: Vec<FieldElement> = (1..=7).map(FieldElement::from).collect();
    for commitment in &commitments {
        pool.deposit(&ctx, *commitment).unwrap();
    }
    let honest_note = Note::random();
    pool.deposit(&ctx, honest_note.commitment(&PoseidonHasher)).unwrap();

    let mut reference = MerkleTree::new(
        PoseidonHasher,
        6,
        privacy_pool::events::leaves_from_events(pool.events(), pool.tree().empty_leaf()),
    )
    .unwrap();
    assert_eq!(reference.root(), pool.current_root());
    let old_root = pool.current_root();

    let request = reference.revocation_request(2).unwrap();
    let revoked_root = pool
        .revoke(&TxContext::new(governance(), 5), &request)
        .unwrap();
    reference.set_leaf(2, reference.empty_leaf());
    assert_eq!(revoked_root, reference.root());
    assert!(pool.tree().history().roots().iter().all(|r| *r == revoked_root));
    assert!(!pool.is_known_root(&old_root));

    // Later deposits extend the revoked tree.
    pool.deposit(&ctx, FieldElement::from(50)).unwrap();
    reference.push(FieldElement::from(50)).unwrap();
    assert_eq!(pool.current_root(), reference.root());

    let rebuilt = MerkleTree::new(
        PoseidonHasher,
        6,
        privacy_pool::events::leaves_from_events(pool.events(), pool.tree().empty_leaf()),
    )
    .unwrap();
    assert_eq!(rebuilt.root(), pool.current_root());

    // Honest depositors re-prove against the new root.
    let stale = withdrawal(&keys.prover(), &honest_note, old_root, 0);
    assert_eq!(
        pool.withdraw(&TxContext::new(addr(3), 0), &stale),
        Err(PoolError::UnknownRoot)
    );
    let fresh = withdrawal(&keys.prover(), &honest_note, pool.current_root(), 0);
    pool.withdraw(&TxContext::new(addr(3), 0), &fresh).unwrap();
}

#[test]
fn test_tampered_revocation_leaves_pool_unchanged() {
    let keys = WithdrawKeys::generate(CIRCUIT_K).unwrap();
    let mut pool = new_pool(&keys, 4, 4);
    let ctx = TxContext::new(addr(1), 0);
    let leaves: Vec<FieldElement> = (1..=5).map(FieldElement::from).collect();
    for leaf in &leaves {
        pool.deposit(&ctx, *leaf).unwrap();
    }
    let reference = MerkleTree::new(PoseidonHasher, 4, leaves).unwrap();
    let snapshot = pool.snapshot();

    let mut request = reference.revocation_request(1).unwrap();
    request.last_path[0] = FieldElement::from(999);
    assert_eq!(
        pool.revoke(&TxContext::new(governance(), 0), &request),
        Err(PoolError::InconsistentRevocation)
    );
    assert_eq!(pool.snapshot(), snapshot);
}

fn run(bin: &str, dir: &Path, args: &[&str]) -> Output {
    Command::new(bin)
        .current_dir(dir)
        .env("POOL_CONFIG", dir.join("pool.toml"))
        .env("POOL_STATE", dir.join("state.json"))
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("Failed to execute binary")
}

fn assert_success(output: &Output, what: &str) -> String {
    assert!(
        output.status.success(),
        "{what} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_deposit_prove_withdraw() {
    let pool_bin = env!("CARGO_BIN_EXE_pool");
    let note_bin = env!("CARGO_BIN_EXE_note");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();

    fs::write(
        dir.join("pool.toml"),
        "[tree]\nheight = 10\n\n[pool]\ndenomination = 1000\n",
    )
    .unwrap();

    let depositor = addr(1).to_string();
    let recipient = addr(2).to_string();
    let relayer = addr(3).to_string();

    assert_success(&run(pool_bin, dir, &["init"]), "init");
    assert!(!run(pool_bin, dir, &["init"]).status.success());
    assert_success(
        &run(pool_bin, dir, &["fund", "--account", &depositor, "--amount", "5000"]),
        "fund",
    );

    assert_success(&run(note_bin, dir, &["new", "--output", "note.json"]), "note new");
    let note: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("note.json")).unwrap()).unwrap();
    let commitment = note["commitment"].as_str().unwrap().to_string();
    let nullifier_hash = note["nullifier_hash"].as_str().unwrap().to_string();

    let stdout = assert_success(
        &run(
            pool_bin,
            dir,
            &["deposit", "--from", &depositor, "--commitment", &commitment],
        ),
        "deposit",
    );
    assert!(stdout.contains("Leaf Index: 0"));

    // Depositing the same commitment again is rejected.
    let duplicate = run(
        pool_bin,
        dir,
        &["deposit", "--from", &depositor, "--commitment", &commitment],
    );
    assert!(!duplicate.status.success());

    assert_success(
        &run(
            note_bin,
            dir,
            &[
                "prove",
                "--note",
                "note.json",
                "--recipient",
                &recipient,
                "--relayer",
                &relayer,
                "--fee",
                "10",
                "--output",
                "proof.json",
            ],
        ),
        "note prove",
    );

    let stdout = assert_success(
        &run(pool_bin, dir, &["withdraw", "--proof-file", "proof.json"]),
        "withdraw",
    );
    assert!(stdout.contains("Withdrawal accepted"));

    let stdout = assert_success(&run(pool_bin, dir, &["is-spent", &nullifier_hash]), "is-spent");
    assert!(stdout.contains(" spent"));

    let replay = run(pool_bin, dir, &["withdraw", "--proof-file", "proof.json"]);
    assert!(!replay.status.success());
    assert!(String::from_utf8_lossy(&replay.stderr).contains("already been spent"));

    let stdout = assert_success(&run(pool_bin, dir, &["status"]), "status");
    assert!(stdout.contains("Deposits: 1"));
    assert!(stdout.contains("Balance: 0"));
}

#[test]
fn test_cli_revoke_requires_governance() {
    let pool_bin = env!("CARGO_BIN_EXE_pool");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    let gov = governance().to_string();
    let depositor = addr(1).to_string();

    fs::write(
        dir.join("pool.toml"),
        format!("[tree]\nheight = 6\n\n[pool]\ndenomination = 10\ngovernance = \"{gov}\"\n"),
    )
    .unwrap();
    assert_success(&run(pool_bin, dir, &["init"]), "init");
    assert_success(
        &run(pool_bin, dir, &["fund", "--account", &depositor, "--amount", "100"]),
        "fund",
    );
    for value in 1..=3u64 {
        let commitment = privacy_pool::utils::field_to_hex(FieldElement::from(value));
        assert_success(
            &run(
                pool_bin,
                dir,
                &["deposit", "--from", &depositor, "--commitment", &commitment],
            ),
            "deposit",
        );
    }

    let denied = run(pool_bin, dir, &["revoke", "--caller", &depositor, "--index", "1"]);
    assert!(!denied.status.success());

    let stdout = assert_success(
        &run(pool_bin, dir, &["revoke", "--caller", &gov, "--index", "1"]),
        "revoke",
    );
    assert!(stdout.contains("Revoked leaf 1"));

    // The revoked leaf is now empty, so there is nothing left to revoke there.
    assert!(!run(pool_bin, dir, &["revoke", "--caller", &gov, "--index", "1"])
        .status
        .success());
}
