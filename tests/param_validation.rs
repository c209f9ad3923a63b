use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradesd");
    let mut child = Command::new(exe)
        .env_remove("GRADESD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradesd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{}", value);
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
}

#[test]
fn malformed_ids_are_rejected_before_the_store() {
    let workspace = temp_dir("gradesd-bad-ids");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    for (i, method) in ["grades.get", "grades.delete"].iter().enumerate() {
        for bad in ["123", "ZZZZZZZZZZZZZZZZZZZZZZZZ", "5F1E7C2B9D3A4E6F8A0B1C2D"] {
            let resp = request(
                &mut stdin,
                &mut reader,
                &format!("{i}-{bad}"),
                method,
                json!({ "id": bad }),
            );
            assert_eq!(error_code(&resp), "bad_id", "{} {}", method, bad);
        }
    }
    for method in ["grades.addScore", "grades.removeScore"] {
        let resp = request(
            &mut stdin,
            &mut reader,
            method,
            method,
            json!({ "id": "nope", "entry": { "type": "exam", "score": 1 } }),
        );
        assert_eq!(error_code(&resp), "bad_id");
    }

    let well_formed = request(
        &mut stdin,
        &mut reader,
        "2",
        "grades.get",
        json!({ "id": "5f1e7c2b9d3a4e6f8a0b1c2d" }),
    );
    assert_eq!(error_code(&well_formed), "not_found");
}

#[test]
fn malformed_numeric_params_are_client_errors() {
    let workspace = temp_dir("gradesd-bad-numbers");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let cases = [
        ("grades.byLearner", json!({ "learnerId": "abc" })),
        ("grades.byLearner", json!({ "learnerId": 1, "classId": "x" })),
        ("grades.byClass", json!({ "classId": 1.5 })),
        ("grades.learnerAverage", json!({})),
        ("grades.reassignClass", json!({ "classId": 1 })),
        ("grades.deleteByClass", json!({ "classId": "ten" })),
        ("grades.create", json!({ "record": { "class_id": 1 } })),
        ("grades.create", json!({})),
    ];
    for (i, (method, params)) in cases.into_iter().enumerate() {
        let resp = request(&mut stdin, &mut reader, &format!("n{i}"), method, params);
        assert_eq!(error_code(&resp), "bad_params", "{} {}", method, resp);
    }
}
