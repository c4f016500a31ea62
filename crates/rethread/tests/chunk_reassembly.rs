use rethread::error::ConvertError;
use rethread::upload::ChunkStore;

fn store() -> (tempfile::TempDir, ChunkStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = ChunkStore::new(dir.path().join("uploads"));
    (dir, store)
}

#[test]
fn reassembly_is_independent_of_arrival_order() {
    let (dir, store) = store();
    store.start_session("export.json").expect("start");

    for index in [2_usize, 0, 1] {
        let body = format!("part-{index};");
        let last = store
            .write_chunk("export.json", index, 3, body.as_bytes())
            .expect("write chunk");
        assert_eq!(last, index == 2);
    }

    let assembled = store.reassemble("export.json", 3).expect("reassemble");
    assert_eq!(assembled, b"part-0;part-1;part-2;");

    // The session is consumed; nothing of it survives on disk.
    assert!(!dir.path().join("uploads").join("export.json").exists());
}

#[test]
fn missing_chunks_fail_with_exact_indices_and_drop_the_session() {
    let (dir, store) = store();
    store.write_chunk("gappy.json", 0, 3, b"a").expect("chunk 0");
    store.write_chunk("gappy.json", 2, 3, b"c").expect("chunk 2");

    let error = store
        .reassemble("gappy.json", 3)
        .expect_err("gap must fail");
    match error {
        ConvertError::MissingChunks { upload, missing } => {
            assert_eq!(upload, "gappy.json");
            assert_eq!(missing, vec![1]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Failed sessions are discarded too, so a retry starts clean.
    assert!(!dir.path().join("uploads").join("gappy.json").exists());
}

#[test]
fn rejects_out_of_contract_chunks() {
    let (_dir, store) = store();

    let error = store
        .write_chunk("x.json", 0, 0, b"a")
        .expect_err("zero total must fail");
    assert_eq!(error.code(), "malformed_input");

    let error = store
        .write_chunk("x.json", 3, 3, b"a")
        .expect_err("index past total must fail");
    assert_eq!(error.code(), "malformed_input");

    let error = store
        .write_chunk("x.json", 0, 3, b"")
        .expect_err("empty chunk must fail");
    assert_eq!(error.code(), "malformed_input");
}

#[test]
fn restarting_a_session_keeps_already_received_chunks() {
    let (_dir, store) = store();
    store.start_session("resume.json").expect("start");
    store
        .write_chunk("resume.json", 0, 2, b"first")
        .expect("chunk 0");

    store.start_session("resume.json").expect("restart");
    store
        .write_chunk("resume.json", 1, 2, b"second")
        .expect("chunk 1");

    let assembled = store.reassemble("resume.json", 2).expect("reassemble");
    assert_eq!(assembled, b"firstsecond");
}

#[test]
fn discard_removes_an_abandoned_session() {
    let (dir, store) = store();
    store.write_chunk("gone.json", 0, 2, b"a").expect("chunk 0");
    store.discard("gone.json").expect("discard");
    assert!(!dir.path().join("uploads").join("gone.json").exists());

    // Discarding a session that never existed is not an error.
    store.discard("never-there.json").expect("noop discard");
}

#[test]
fn traversal_style_names_stay_inside_the_spool() {
    let (dir, store) = store();
    store
        .write_chunk("../escape.json", 0, 1, b"payload")
        .expect("chunk 0");

    assert!(!dir.path().join("escape.json").exists());
    let assembled = store.reassemble("../escape.json", 1).expect("reassemble");
    assert_eq!(assembled, b"payload");
}
