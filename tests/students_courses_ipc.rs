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

fn select(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, workspace: &PathBuf) {
    request_ok(
        stdin,
        reader,
        "select",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
}

fn create_course(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    name: &str,
    start: &str,
    end: &str,
) -> String {
    let res = request_ok(
        stdin,
        reader,
        &format!("course-{}", name),
        "courses.create",
        json!({ "course": { "name": name, "startDate": start, "endDate": end } }),
    );
    res["id"].as_str().expect("course id").to_string()
}

fn student(name: &str, course: &str, status: &str, enrolled: &str) -> serde_json::Value {
    json!({
        "name": name,
        "email": format!("{}@example.org", name.to_lowercase()),
        "phone": "555-0100",
        "course": course,
        "status": status,
        "enrolledDate": enrolled,
    })
}

#[test]
fn student_crud_search_and_sort() {
    let workspace = temp_dir("rosterd-students");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    let mut ids = Vec::new();
    for (i, (name, status, enrolled)) in [
        ("Grace", "active", "2024-07-01"),
        ("ada", "inactive", "2024-03-05"),
        ("Alan", "active", ""),
    ]
    .iter()
    .enumerate()
    {
        let res = request_ok(
            &mut stdin,
            &mut reader,
            &format!("create-{}", i),
            "students.create",
            json!({ "student": student(name, "Mathematics", status, enrolled) }),
        );
        assert_eq!(res["created"].as_bool(), Some(true));
        assert_eq!(
            res["notification"]["message"].as_str(),
            Some("Data added successfully")
        );
        ids.push(res["id"].as_str().expect("id").to_string());
    }

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "list-1",
        "students.list",
        json!({ "sortBy": "name" }),
    );
    assert_eq!(listed["total"].as_u64(), Some(3));
    assert_eq!(listed["activeCount"].as_u64(), Some(2));
    let names: Vec<&str> = listed["students"]
        .as_array()
        .expect("students")
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(names, vec!["ada", "Alan", "Grace"]);

    let by_date = request_ok(
        &mut stdin,
        &mut reader,
        "list-2",
        "students.list",
        json!({ "sortBy": "enrolledDate", "sortDir": "desc" }),
    );
    let names: Vec<&str> = by_date["students"]
        .as_array()
        .expect("students")
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Grace", "ada", "Alan"]);

    let searched = request_ok(
        &mut stdin,
        &mut reader,
        "list-3",
        "students.list",
        json!({ "search": "GRACE@", "status": "active" }),
    );
    assert_eq!(searched["students"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(searched["total"].as_u64(), Some(3));

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "update",
        "students.update",
        json!({ "id": ids[1], "student": student("Ada", "Mathematics", "active", "2024-03-05") }),
    );
    assert_eq!(updated["created"].as_bool(), Some(false));
    assert_eq!(
        updated["notification"]["message"].as_str(),
        Some("Data updated successfully")
    );
    let fetched = request_ok(
        &mut stdin,
        &mut reader,
        "get",
        "students.get",
        json!({ "id": ids[1] }),
    );
    assert_eq!(fetched["student"]["name"].as_str(), Some("Ada"));
    assert_eq!(fetched["student"]["status"].as_str(), Some("active"));

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "delete",
        "students.delete",
        json!({ "id": ids[2] }),
    );
    assert_eq!(deleted["existed"].as_bool(), Some(true));
    assert_eq!(
        deleted["notification"]["message"].as_str(),
        Some("Data deleted successfully")
    );

    let after = request_ok(&mut stdin, &mut reader, "list-4", "students.list", json!({}));
    assert_eq!(after["total"].as_u64(), Some(2));
    assert_eq!(after["activeCount"].as_u64(), Some(2));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn invalid_student_reports_fields_without_a_toast() {
    let workspace = temp_dir("rosterd-students-invalid");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "student": { "name": "Ada", "email": "not-an-email" } }),
    );
    assert_eq!(resp["ok"].as_bool(), Some(false));
    assert_eq!(resp["error"]["code"].as_str(), Some("validation_failed"));
    let fields: Vec<&str> = resp["error"]["details"]["fields"]
        .as_array()
        .expect("field errors")
        .iter()
        .filter_map(|f| f["field"].as_str())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"phone"));
    assert!(fields.contains(&"course"));
    assert!(resp["error"]["details"].get("notification").is_none());

    let missing = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.update",
        json!({ "id": "ghost", "student": student("Ada", "Mathematics", "active", "") }),
    );
    assert_eq!(missing["error"]["code"].as_str(), Some("not_found"));
    assert_eq!(
        missing["error"]["details"]["notification"]["level"].as_str(),
        Some("error")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn course_listing_classifies_and_generates_codes() {
    let workspace = temp_dir("rosterd-courses");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    create_course(&mut stdin, &mut reader, "Algebra", "2024-01-01", "2024-12-31");
    create_course(&mut stdin, &mut reader, "Latin", "2023-01-01", "2023-06-01");
    create_course(&mut stdin, &mut reader, "Physics", "2025-01-01", "2025-06-01");

    let backwards = request_ok(
        &mut stdin,
        &mut reader,
        "backwards",
        "courses.create",
        json!({ "course": {
            "code": "BK-1",
            "name": "Backwards",
            "startDate": "2024-09-01",
            "endDate": "2024-08-01"
        } }),
    );
    assert_eq!(backwards["warnings"], json!(["start_after_end"]));
    assert_eq!(backwards["document"]["code"].as_str(), Some("BK-1"));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "list",
        "courses.list",
        json!({ "now": "2024-06-15T00:00:00Z", "sortBy": "startDate" }),
    );
    assert_eq!(listed["total"].as_u64(), Some(4));
    assert_eq!(
        listed["statusCounts"],
        json!({ "inProgress": 1, "completed": 1, "upcoming": 2 })
    );
    let courses = listed["courses"].as_array().expect("courses");
    let names: Vec<&str> = courses.iter().filter_map(|c| c["name"].as_str()).collect();
    assert_eq!(names, vec!["Latin", "Algebra", "Backwards", "Physics"]);
    assert_eq!(courses[1]["status"].as_str(), Some("in_progress"));
    assert_eq!(courses[1]["durationMonths"].as_i64(), Some(12));
    assert!(courses[1]["code"]
        .as_str()
        .expect("generated code")
        .starts_with("COURSE-"));

    let upcoming = request_ok(
        &mut stdin,
        &mut reader,
        "upcoming",
        "courses.list",
        json!({ "now": "2024-06-15T00:00:00Z", "status": "upcoming" }),
    );
    let names: Vec<&str> = upcoming["courses"]
        .as_array()
        .expect("courses")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    // A backwards span is neither running nor finished yet.
    assert_eq!(names, vec!["Physics", "Backwards"]);

    let invalid = request(
        &mut stdin,
        &mut reader,
        "invalid",
        "courses.create",
        json!({ "course": { "name": "Nowhen", "startDate": "someday", "endDate": "" } }),
    );
    assert_eq!(invalid["error"]["code"].as_str(), Some("validation_failed"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn enforce_policy_rejects_unknown_courses_and_delete_leaves_students() {
    let workspace = temp_dir("rosterd-enforce");
    std::fs::write(
        workspace.join("rosterd.toml"),
        "[references]\ncourse_policy = \"enforce\"\n",
    )
    .expect("write config");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select(&mut stdin, &mut reader, &workspace);

    let config = request_ok(&mut stdin, &mut reader, "cfg", "config.get", json!({}));
    assert_eq!(
        config["config"]["references"]["course_policy"].as_str(),
        Some("enforce")
    );

    let rejected = request(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "student": student("Ada", "Alchemy", "active", "") }),
    );
    assert_eq!(rejected["error"]["code"].as_str(), Some("dangling_reference"));
    assert_eq!(rejected["error"]["details"]["course"].as_str(), Some("Alchemy"));

    let course_id = create_course(&mut stdin, &mut reader, "Alchemy", "2024-01-01", "2024-06-01");
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "student": student("Ada", "Alchemy", "active", "") }),
    );

    let clean = request_ok(&mut stdin, &mut reader, "3", "students.danglingCourses", json!({}));
    assert_eq!(clean["students"].as_array().map(|a| a.len()), Some(0));

    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "courses.delete",
        json!({ "id": course_id }),
    );
    let dangling = request_ok(&mut stdin, &mut reader, "5", "students.danglingCourses", json!({}));
    let list = dangling["students"].as_array().expect("dangling list");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["course"].as_str(), Some("Alchemy"));

    let remaining = request_ok(&mut stdin, &mut reader, "6", "students.list", json!({}));
    assert_eq!(remaining["total"].as_u64(), Some(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
