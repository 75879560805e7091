#![forbid(unsafe_code)]
//! End-to-end model scenarios: literal operation sequences with their
//! expected completions, covering crash and fsync interactions that the
//! per-module unit tests don't reach.

use sift_error::ErrorKind;
use sift_model::FsState;
use sift_types::{CompletionKind, Data, EventError, FsPath, Op};

fn p(components: &[&str]) -> FsPath {
    components.iter().map(|c| (*c).to_owned()).collect()
}

fn hex(s: &str) -> Data {
    Data::from_hex(s).expect("hex")
}

/// Expected outcome of one step.
enum Expect {
    Ok,
    OkRead(&'static str),
    Fail(ErrorKind),
}

fn run(steps: &[(Op, Expect)]) -> FsState {
    let mut state = FsState::new();
    for (i, (op, expect)) in steps.iter().enumerate() {
        let (next, completion) = state.apply(op);
        match expect {
            Expect::Ok => {
                assert_eq!(
                    completion.kind,
                    CompletionKind::Ok,
                    "step {i} ({op}) failed: {:?}",
                    completion.error
                );
            }
            Expect::OkRead(want) => {
                assert_eq!(completion.kind, CompletionKind::Ok, "step {i} ({op})");
                match &completion.op {
                    Op::Read(_, Some(data)) => {
                        assert_eq!(&data.to_hex(), want, "step {i} ({op}) read data");
                    }
                    other => panic!("step {i}: read completed as {other}"),
                }
            }
            Expect::Fail(kind) => {
                assert_eq!(completion.kind, CompletionKind::Fail, "step {i} ({op})");
                assert_eq!(
                    completion.error,
                    Some(EventError::Model(*kind)),
                    "step {i} ({op}) error kind"
                );
            }
        }
        let violations = sift_model::invariants::violations(&next);
        assert!(violations.is_empty(), "step {i} ({op}): {violations:?}");
        state = next;
    }
    state
}

#[test]
fn touch_read_rm_read() {
    run(&[
        (Op::Touch(p(&["a"])), Expect::Ok),
        (Op::Read(p(&["a"]), None), Expect::OkRead("")),
        (Op::Rm(p(&["a"])), Expect::Ok),
        (Op::Read(p(&["a"]), None), Expect::Fail(ErrorKind::DoesNotExist)),
    ]);
}

#[test]
fn unfsynced_write_loses_data_but_keeps_metadata() {
    run(&[
        (Op::Write(p(&["b"]), hex("00")), Expect::Ok),
        (Op::LoseUnfsyncedWrites, Expect::Ok),
        // The path survives (metadata is write-through); the bytes do not.
        (Op::Read(p(&["b"]), None), Expect::OkRead("")),
    ]);
}

#[test]
fn fsynced_write_survives_crash() {
    run(&[
        (Op::Write(p(&["a"]), hex("1a")), Expect::Ok),
        (Op::Read(p(&["a"]), None), Expect::OkRead("1a")),
        (Op::Fsync(p(&["a"])), Expect::Ok),
        (Op::LoseUnfsyncedWrites, Expect::Ok),
        (Op::Read(p(&["a"]), None), Expect::OkRead("1a")),
    ]);
}

#[test]
fn ln_under_file_fails_not_dir() {
    run(&[
        (Op::Touch(p(&["a"])), Expect::Ok),
        (Op::Ln(p(&["a", "a"]), p(&["a"])), Expect::Fail(ErrorKind::NotDir)),
    ]);
}

#[test]
fn mv_onto_non_empty_dir_rejected() {
    run(&[
        (Op::Mkdir(p(&["a"])), Expect::Ok),
        (Op::Mkdir(p(&["a", "b"])), Expect::Ok),
        (Op::Truncate(p(&["b"]), 0), Expect::Ok),
        (Op::Mv(p(&["b"]), p(&["a", "b"])), Expect::Ok),
        (Op::Mkdir(p(&["b"])), Expect::Ok),
        (Op::Mv(p(&["b"]), p(&["a"])), Expect::Fail(ErrorKind::NotEmpty)),
    ]);
}

#[test]
fn truncate_after_crash_zero_pads_preserved_data() {
    run(&[
        (Op::Append(p(&["a"]), hex("12")), Expect::Ok),
        (Op::Fsync(p(&["a"])), Expect::Ok),
        (Op::LoseUnfsyncedWrites, Expect::Ok),
        (Op::Read(p(&["a"]), None), Expect::OkRead("12")),
        (Op::Truncate(p(&["a"]), 2), Expect::Ok),
        (Op::Read(p(&["a"]), None), Expect::OkRead("120000")),
    ]);
}

#[test]
fn crash_is_idempotent_on_the_model() {
    let state = run(&[
        (Op::Write(p(&["a"]), hex("aa")), Expect::Ok),
        (Op::Fsync(p(&["a"])), Expect::Ok),
        (Op::Write(p(&["b"]), hex("bb")), Expect::Ok),
        (Op::LoseUnfsyncedWrites, Expect::Ok),
    ]);
    let (again, completion) = state.apply(&Op::LoseUnfsyncedWrites);
    assert_eq!(completion.kind, CompletionKind::Ok);
    assert_eq!(again, state);
}

#[test]
fn fsync_through_either_hard_link_persists_shared_data() {
    run(&[
        (Op::Write(p(&["a"]), hex("0102")), Expect::Ok),
        (Op::Ln(p(&["a"]), p(&["b"])), Expect::Ok),
        (Op::Fsync(p(&["b"])), Expect::Ok),
        (Op::LoseUnfsyncedWrites, Expect::Ok),
        (Op::Read(p(&["a"]), None), Expect::OkRead("0102")),
        (Op::Read(p(&["b"]), None), Expect::OkRead("0102")),
    ]);
}

#[test]
fn unfsynced_hard_link_mutation_is_lost_for_both_names() {
    run(&[
        (Op::Write(p(&["a"]), hex("01")), Expect::Ok),
        (Op::Fsync(p(&["a"])), Expect::Ok),
        (Op::Append(p(&["a"]), hex("02")), Expect::Ok),
        (Op::Ln(p(&["a"]), p(&["b"])), Expect::Ok),
        (Op::LoseUnfsyncedWrites, Expect::Ok),
        // The fsynced prefix survives; the cached append does not.
        (Op::Read(p(&["a"]), None), Expect::OkRead("01")),
        (Op::Read(p(&["b"]), None), Expect::OkRead("01")),
    ]);
}

#[test]
fn mkdir_then_rm_restores_entry_store() {
    let before = run(&[(Op::Touch(p(&["keep"])), Expect::Ok)]);
    let after = run(&[
        (Op::Touch(p(&["keep"])), Expect::Ok),
        (Op::Mkdir(p(&["d"])), Expect::Ok),
        (Op::Rm(p(&["d"])), Expect::Ok),
    ]);
    assert_eq!(before.disk().entries, after.disk().entries);
}

#[test]
fn rm_of_fsynced_file_destroys_inode_on_next_crash() {
    let state = run(&[
        (Op::Write(p(&["a"]), hex("aa")), Expect::Ok),
        (Op::Fsync(p(&["a"])), Expect::Ok),
        (Op::Rm(p(&["a"])), Expect::Ok),
        (Op::LoseUnfsyncedWrites, Expect::Ok),
    ]);
    assert!(state.disk().inodes.is_empty(), "no link reaches the inode");
    assert!(
        sift_model::invariants::post_crash_violations(&state).is_empty(),
        "post-crash image is self-contained"
    );
}

#[test]
fn moved_file_keeps_cached_data_until_crash() {
    run(&[
        (Op::Write(p(&["a"]), hex("aa")), Expect::Ok),
        (Op::Mv(p(&["a"]), p(&["b"])), Expect::Ok),
        (Op::Read(p(&["b"]), None), Expect::OkRead("aa")),
        (Op::LoseUnfsyncedWrites, Expect::Ok),
        // The rename was metadata (write-through); the bytes were not
        // fsynced, so the healed inode reads empty.
        (Op::Read(p(&["b"]), None), Expect::OkRead("")),
    ]);
}
