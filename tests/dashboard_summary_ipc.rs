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
    let exe = env!("CARGO_BIN_EXE_rosterd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rosterd");
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
            .get("error")
            .cloned()
            .unwrap_or_else(|| json!({ "code": "unknown" }))
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn dashboard_summary_buckets_enrollment_and_classifies_courses() {
    let workspace = temp_dir("rosterd-dashboard");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let students = [
        ("s1", "active", Some("2024-03-05")),
        ("s2", "inactive", Some("2023-03-20T09:30:00Z")),
        ("s3", "active", Some("2024-07-01")),
        ("s4", "active", None),
        ("s5", "active", Some("not a date")),
    ];
    for (id, status, enrolled) in students {
        let mut record = json!({ "name": id, "status": status });
        if let Some(d) = enrolled {
            record["enrolledDate"] = json!(d);
        }
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("w-{}", id),
            "collections.write",
            json!({ "collection": "students", "id": id, "record": record }),
        );
    }

    let courses = [
        ("c1", "2024-01-01", "2024-12-31"),
        ("c2", "2023-01-01", "2023-06-01"),
        ("c3", "2025-01-01", "2025-06-01"),
        ("c4", "2024-06-15", "2024-06-15"),
    ];
    for (id, start, end) in courses {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("w-{}", id),
            "collections.write",
            json!({
                "collection": "courses",
                "id": id,
                "record": { "name": id, "startDate": start, "endDate": end },
            }),
        );
    }
    request_ok(
        &mut stdin,
        &mut reader,
        "w-c5",
        "collections.write",
        json!({ "collection": "courses", "id": "c5", "record": { "name": "undated" } }),
    );

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "dashboard.summary",
        json!({ "now": "2024-06-15T00:00:00Z" }),
    );
    assert_eq!(summary["studentCount"].as_u64(), Some(5));
    assert_eq!(summary["courseCount"].as_u64(), Some(5));
    assert_eq!(summary["activeStudents"].as_u64(), Some(4));

    let labels = summary["enrollment"]["labels"].as_array().expect("labels");
    assert_eq!(labels.len(), 12);
    assert_eq!(labels[2].as_str(), Some("March"));
    let counts = summary["enrollment"]["counts"].as_array().expect("counts");
    assert_eq!(counts[2].as_u64(), Some(2));
    assert_eq!(counts[6].as_u64(), Some(1));
    let total: u64 = counts.iter().filter_map(|c| c.as_u64()).sum();
    assert_eq!(total, 3);

    // Boundaries are inclusive, and undated courses are not counted.
    assert_eq!(
        summary["courseStatus"],
        json!({ "inProgress": 2, "completed": 1, "upcoming": 1 })
    );

    let only_2024 = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "dashboard.enrollment",
        json!({ "year": 2024 }),
    );
    assert_eq!(only_2024["year"].as_i64(), Some(2024));
    assert_eq!(only_2024["counts"][2].as_u64(), Some(1));
    assert_eq!(only_2024["counts"][6].as_u64(), Some(1));

    let later = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "dashboard.courseStatus",
        json!({ "now": "2026-01-01" }),
    );
    assert_eq!(
        later,
        json!({ "inProgress": 0, "completed": 4, "upcoming": 0 })
    );

    let bad_now = request(
        &mut stdin,
        &mut reader,
        "5",
        "dashboard.summary",
        json!({ "now": "yesterday" }),
    );
    assert_eq!(bad_now["error"]["code"].as_str(), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn empty_workspace_summary_is_all_zeroes() {
    let workspace = temp_dir("rosterd-dashboard-empty");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let summary = request_ok(&mut stdin, &mut reader, "2", "dashboard.summary", json!({}));
    assert_eq!(summary["studentCount"].as_u64(), Some(0));
    assert_eq!(summary["enrollment"]["counts"], json!([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
    assert_eq!(
        summary["courseStatus"],
        json!({ "inProgress": 0, "completed": 0, "upcoming": 0 })
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
