#![forbid(unsafe_code)]
//! Cross-check: the reference model against a real directory driven by
//! coreutils. Skipped wholesale when the required tools are missing.

use sift_engine::{execute, quickcheck, EngineConfig, Sut};
use sift_history::{generate, GeneratorConfig};
use sift_sut::DirSut;
use sift_types::{CompletionKind, Data, FsPath, Op};
use std::process::Command;

const REQUIRED_TOOLS: &[&str] = &[
    "touch", "cat", "tee", "mkdir", "rm", "mv", "ln", "truncate", "sync",
];

fn tools_available() -> bool {
    let present = REQUIRED_TOOLS.iter().all(|tool| {
        Command::new("which")
            .arg(tool)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    });
    // The error mapping matches GNU message text; skip on busybox et al.
    let gnu = Command::new("touch")
        .arg("--version")
        .output()
        .map(|output| String::from_utf8_lossy(&output.stdout).contains("coreutils"))
        .unwrap_or(false);
    present && gnu
}

fn p(components: &[&str]) -> FsPath {
    components.iter().map(|c| (*c).to_owned()).collect()
}

#[test]
fn basic_operations_complete_like_the_model() {
    if !tools_available() {
        eprintln!("skipping: coreutils not available");
        return;
    }
    let scratch = tempfile::tempdir().expect("tempdir");
    let mut sut = DirSut::new(scratch.path().join("root"));
    sut.setup().expect("setup");

    let ok = |sut: &mut DirSut, op: &Op| {
        let completion = sut.apply(op).expect("apply");
        assert_eq!(completion.kind, CompletionKind::Ok, "{op}: {:?}", completion.error);
        completion
    };

    ok(&mut sut, &Op::Mkdir(p(&["a"])));
    ok(&mut sut, &Op::Write(p(&["a", "b"]), Data::from_hex("00ff").expect("hex")));
    let completion = ok(&mut sut, &Op::Read(p(&["a", "b"]), None));
    match completion.op {
        Op::Read(_, Some(data)) => assert_eq!(data.to_hex(), "00ff"),
        other => panic!("unexpected completion {other}"),
    }
    ok(&mut sut, &Op::Ln(p(&["a", "b"]), p(&["b"])));
    ok(&mut sut, &Op::Append(p(&["b"]), Data::from_hex("aa").expect("hex")));
    let completion = ok(&mut sut, &Op::Read(p(&["a", "b"]), None));
    match completion.op {
        Op::Read(_, Some(data)) => assert_eq!(data.to_hex(), "00ffaa"),
        other => panic!("unexpected completion {other}"),
    }
    ok(&mut sut, &Op::Truncate(p(&["b"]), -1));
    ok(&mut sut, &Op::Fsync(p(&["b"])));
    ok(&mut sut, &Op::Rm(p(&["a"])));

    let completion = sut.apply(&Op::Read(p(&["a", "b"]), None)).expect("apply");
    assert_eq!(completion.kind, CompletionKind::Fail);
}

#[test]
fn generated_histories_cross_check_against_coreutils() {
    if !tools_available() {
        eprintln!("skipping: coreutils not available");
        return;
    }
    let scratch = tempfile::tempdir().expect("tempdir");
    let mut sut = DirSut::new(scratch.path().join("root"));

    // No crash ops: a plain directory never loses writes, so only the
    // durable subset of the grammar is comparable.
    let config = EngineConfig {
        trials: 3,
        scour: 1,
        seed: 0xBEEF,
        history_length: 120,
        lose_unfsynced_writes: false,
        time_limit: None,
    };
    let outcome = quickcheck(&config, &mut sut).expect("quickcheck");
    assert!(
        outcome.is_passed(),
        "model and coreutils disagree: {outcome:?}"
    );
}

#[test]
fn executions_are_isolated_by_setup() {
    if !tools_available() {
        eprintln!("skipping: coreutils not available");
        return;
    }
    let scratch = tempfile::tempdir().expect("tempdir");
    let mut sut = DirSut::new(scratch.path().join("root"));

    let ops = generate(&GeneratorConfig {
        seed: 5,
        length: 60,
        lose_unfsynced_writes: false,
    });
    let first = execute(&mut sut, &ops).expect("first run");
    let second = execute(&mut sut, &ops).expect("second run");

    // Deterministic ops on a wiped root: identical completions modulo
    // timestamps.
    let strip = |events: &[sift_types::Event]| {
        events
            .iter()
            .map(|event| (event.kind, event.op.clone(), event.error))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first), strip(&second));
}
