use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use privacy_pool::{
    Address, FieldElement, IncrementalMerkleTree, MerkleTree, PoseidonHasher, ProofVerifier,
    PublicInputs, WithdrawKeys, CIRCUIT_K,
};

fn sample_inputs() -> PublicInputs {
    PublicInputs {
        root: FieldElement::from(1),
        nullifier_hash: FieldElement::from(2),
        recipient: Address::new([0x11; 20]),
        relayer: Address::new([0x22; 20]),
        fee: 10,
        refund: 0,
    }
}

fn bench_accumulator_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator_insert");

    for height in [16u32, 20, 32].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(height), height, |b, &height| {
            let mut tree = IncrementalMerkleTree::new(PoseidonHasher, height, 30).unwrap();
            let mut next = 0u64;
            b.iter(|| {
                // Start over before a small tree fills up.
                if tree.next_index() == tree.capacity() {
                    tree = IncrementalMerkleTree::new(PoseidonHasher, height, 30).unwrap();
                }
                next += 1;
                black_box(tree.insert(FieldElement::from(next)).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_revocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("revocation");

    for leaf_count in [16u64, 128, 1024].iter() {
        let leaves: Vec<FieldElement> = (1..=*leaf_count).map(FieldElement::from).collect();
        let reference = MerkleTree::new(PoseidonHasher, 20, leaves.clone()).unwrap();
        let mut tree = IncrementalMerkleTree::new(PoseidonHasher, 20, 30).unwrap();
        for leaf in &leaves {
            tree.insert(*leaf).unwrap();
        }
        let request = reference.revocation_request(leaf_count / 2).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(leaf_count),
            leaf_count,
            |b, _| {
                b.iter(|| {
                    let mut fresh = tree.clone();
                    black_box(fresh.revoke_leaf(&request).unwrap())
                })
            },
        );
    }

    group.finish();
}

fn bench_reference_tree_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference_tree_construction");

    for leaf_count in [16u64, 128, 1024].iter() {
        let leaves: Vec<FieldElement> = (0..*leaf_count).map(FieldElement::from).collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(leaf_count),
            leaf_count,
            |b, _| {
                b.iter(|| {
                    black_box(MerkleTree::new(PoseidonHasher, 20, black_box(leaves.clone())).unwrap())
                })
            },
        );
    }

    group.finish();
}

fn bench_proof_generation(c: &mut Criterion) {
    let keys = WithdrawKeys::generate(CIRCUIT_K).unwrap();
    let prover = keys.prover();
    let inputs = sample_inputs();

    c.bench_function("proof_generation", |b| {
        b.iter(|| black_box(prover.generate_proof(&inputs).unwrap()))
    });
}

fn bench_proof_verification(c: &mut Criterion) {
    let keys = WithdrawKeys::generate(CIRCUIT_K).unwrap();
    let inputs = sample_inputs();
    let proof = keys.prover().generate_proof(&inputs).unwrap();
    let verifier = keys.verifier();

    c.bench_function("proof_verification", |b| {
        b.iter(|| black_box(verifier.verify(&proof, &inputs)))
    });
}

criterion_group!(
    benches,
    bench_accumulator_insert,
    bench_revocation,
    bench_reference_tree_construction,
    bench_proof_generation,
    bench_proof_verification
);
criterion_main!(benches);
