use std::io::Read;
use std::path::Path;
use std::thread;

use assert_cmd::Command;
use insta::assert_snapshot;
use predicates::str::contains;
use tempfile::tempdir;
use tiny_http::{Header, Response, Server, StatusCode};

const WAYBILL_ENV: &[&str] = &[
    "WAYBILL_REST_URL",
    "WAYBILL_REST_ANON_KEY",
    "WAYBILL_REST_TABLE",
    "WAYBILL_FIRESTORE_API_KEY",
    "WAYBILL_FIRESTORE_PROJECT_ID",
    "WAYBILL_FIRESTORE_COLLECTION",
    "WAYBILL_FIRESTORE_ENDPOINT",
    "WAYBILL_PUBLIC_BASE_URL",
    "WAYBILL_STORE_DIR",
];

/// A command running in `dir` with a clean waybill environment.
fn waybill_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("waybill"));
    cmd.current_dir(dir).arg("--store-dir").arg(dir.join("store"));
    for key in WAYBILL_ENV {
        cmd.env_remove(key);
    }
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).expect("utf8")
}

fn create_record(dir: &Path) {
    waybill_cmd(dir)
        .args(["create", "ab12", "--origin", "Goiânia", "--destination", "Palmas"])
        .args(["--eta", "05/11/2026"])
        .assert()
        .success()
        .stdout(contains("AB12: saved locally, cloud skipped"));
}

struct CapturedRequest {
    method: String,
    url: String,
    body: String,
}

fn spawn_row_store(status: u16) -> (String, thread::JoinHandle<CapturedRequest>) {
    let server = Server::http("127.0.0.1:0").expect("server");
    let base_url = format!("http://{}", server.server_addr());
    let handle = thread::spawn(move || {
        let mut req = server.recv().expect("request");
        let mut body = String::new();
        req.as_reader().read_to_string(&mut body).expect("body");
        let captured = CapturedRequest {
            method: req.method().to_string(),
            url: req.url().to_string(),
            body,
        };
        let resp = Response::from_string("")
            .with_status_code(StatusCode(status))
            .with_header(Header::from_bytes("Content-Type", "application/json").expect("header"));
        req.respond(resp).expect("respond");
        captured
    });
    (base_url, handle)
}

#[test]
fn create_then_show_snapshot() {
    let td = tempdir().expect("tempdir");
    create_record(td.path());

    let stdout = stdout_of(waybill_cmd(td.path()).args(["show", "AB12"]));
    assert_snapshot!(stdout, @r#"
code: AB12
origin: Goiânia
destination: Palmas
current_location: -
estimated_delivery: 05/11/2026
status: Postado
steps: none
"#);
    assert!(td.path().join("store").join("AB12.json").exists());
}

#[test]
fn step_updates_status_and_current_flag() {
    let td = tempdir().expect("tempdir");
    create_record(td.path());

    for (status, location, date) in [
        ("Postado", "Goiânia", "01/11/2026"),
        ("Em trânsito", "Anápolis", "02/11/2026"),
    ] {
        waybill_cmd(td.path())
            .args(["step", "AB12", "--status", status, "--location", location])
            .args(["--date", date, "--time", "08:30"])
            .assert()
            .success();
    }

    let stdout = stdout_of(waybill_cmd(td.path()).args(["show", "ab12"]));
    assert_snapshot!(stdout, @r#"
code: AB12
origin: Goiânia
destination: Palmas
current_location: -
estimated_delivery: 05/11/2026
status: Em trânsito
steps:
  1. 01/11/2026 08:30 Postado @ Goiânia
  2. 02/11/2026 08:30 Em trânsito @ Anápolis (current)
"#);
}

#[test]
fn editing_details_keeps_steps() {
    let td = tempdir().expect("tempdir");
    create_record(td.path());
    waybill_cmd(td.path())
        .args(["step", "AB12", "--status", "Postado", "--location", "Goiânia"])
        .assert()
        .success();

    waybill_cmd(td.path())
        .args(["create", "AB12", "--origin", "Goiânia", "--destination", "Araguaína"])
        .assert()
        .success();

    let stdout = stdout_of(waybill_cmd(td.path()).arg("list"));
    assert!(stdout.contains("Goiânia -> Araguaína (1 steps)"));
}

#[test]
fn list_empty_store() {
    let td = tempdir().expect("tempdir");
    let stdout = stdout_of(waybill_cmd(td.path()).arg("list"));
    assert_eq!(stdout.trim(), "no records");
}

#[test]
fn step_for_unknown_code_fails() {
    let td = tempdir().expect("tempdir");
    waybill_cmd(td.path())
        .args(["step", "zz9", "--status", "Postado", "--location", "Goiânia"])
        .assert()
        .failure()
        .stderr(contains("no local record for code ZZ9"));
}

#[test]
fn share_link_uses_persisted_base_url() {
    let td = tempdir().expect("tempdir");
    create_record(td.path());

    let relative = stdout_of(waybill_cmd(td.path()).args(["share", "AB12"]));
    assert!(relative.starts_with("/?data="));

    waybill_cmd(td.path())
        .args(["config", "set-base-url", "https://track.test/"])
        .assert()
        .success()
        .stdout(contains("public_base_url: https://track.test/"));

    let absolute = stdout_of(waybill_cmd(td.path()).args(["share", "AB12"]));
    assert!(absolute.starts_with("https://track.test/?data="));
    assert!(!absolute.contains("code="));

    waybill_cmd(td.path()).args(["config", "clear-base-url"]).assert().success();
    let cleared = stdout_of(waybill_cmd(td.path()).args(["share", "AB12"]));
    assert!(cleared.starts_with("/?data="));
}

#[test]
fn env_base_url_applies_without_override() {
    let td = tempdir().expect("tempdir");
    create_record(td.path());

    let stdout = stdout_of(
        waybill_cmd(td.path())
            .env("WAYBILL_PUBLIC_BASE_URL", "https://env.test")
            .args(["share", "AB12"]),
    );
    assert!(stdout.starts_with("https://env.test/?data="));
}

#[test]
fn set_empty_base_url_fails() {
    let td = tempdir().expect("tempdir");
    waybill_cmd(td.path())
        .args(["config", "set-base-url", "  "])
        .assert()
        .failure()
        .stderr(contains("must not be empty"));
}

#[test]
fn open_link_into_fresh_store() {
    let sender = tempdir().expect("tempdir");
    create_record(sender.path());
    let link = stdout_of(waybill_cmd(sender.path()).args(["share", "AB12"]));

    let receiver = tempdir().expect("tempdir");
    waybill_cmd(receiver.path())
        .args(["open", link.trim()])
        .assert()
        .success()
        .stdout(contains("code: AB12"))
        .stderr(contains("[info] AB12: loaded from link"));

    assert!(receiver.path().join("store").join("AB12.json").exists());
}

#[test]
fn open_link_without_payload_fails() {
    let td = tempdir().expect("tempdir");
    waybill_cmd(td.path())
        .args(["open", "https://track.test/?foo=bar"])
        .assert()
        .failure()
        .stderr(contains("[warn] link carries no tracking data"));
}

#[test]
fn encode_then_decode() {
    let td = tempdir().expect("tempdir");
    create_record(td.path());

    let payload = stdout_of(waybill_cmd(td.path()).args(["encode", "AB12"]));
    let json = stdout_of(waybill_cmd(td.path()).args(["decode", payload.trim()]));

    let value: serde_json::Value = serde_json::from_str(&json).expect("json");
    assert_eq!(value["code"], "AB12");
    assert_eq!(value["destination"], "Palmas");
    assert_eq!(value["steps"], serde_json::json!([]));
}

#[test]
fn decode_garbage_fails() {
    let td = tempdir().expect("tempdir");
    waybill_cmd(td.path())
        .args(["decode", "not a payload"])
        .assert()
        .failure()
        .stderr(contains("invalid payload"));
}

#[test]
fn delete_record() {
    let td = tempdir().expect("tempdir");
    create_record(td.path());

    waybill_cmd(td.path())
        .args(["delete", "ab12"])
        .assert()
        .success()
        .stdout(contains("AB12: deleted"));
    waybill_cmd(td.path()).args(["delete", "AB12"]).assert().failure();
}

#[test]
fn push_without_cloud_is_skipped() {
    let td = tempdir().expect("tempdir");
    create_record(td.path());

    waybill_cmd(td.path())
        .args(["push", "AB12"])
        .assert()
        .success()
        .stdout(contains("AB12: cloud skipped"))
        .stderr(contains("[warn] cloud sync is not configured"));
}

#[test]
fn pull_without_cloud_fails() {
    let td = tempdir().expect("tempdir");
    waybill_cmd(td.path())
        .args(["pull", "AB12"])
        .assert()
        .failure()
        .stderr(contains("cloud sync is not configured"));
}

#[test]
fn push_upserts_into_row_store() {
    let td = tempdir().expect("tempdir");
    create_record(td.path());
    let (base_url, handle) = spawn_row_store(201);

    waybill_cmd(td.path())
        .env("WAYBILL_REST_URL", &base_url)
        .env("WAYBILL_REST_ANON_KEY", "anon-key")
        .args(["push", "ab12"])
        .assert()
        .success()
        .stdout(contains("AB12: cloud saved"));

    let captured = handle.join().expect("join");
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.url, "/rest/v1/tracking?on_conflict=code");
    assert!(captured.body.contains("\"code\":\"AB12\""));
}

#[test]
fn config_show_masks_key() {
    let td = tempdir().expect("tempdir");
    std::fs::write(
        td.path().join(".waybill.toml"),
        "[firestore]\napi_key = \"AIzaSyExampleKey0000\"\nproject_id = \"demo-project\"\n",
    )
    .expect("write config");

    let stdout = stdout_of(waybill_cmd(td.path()).args(["config", "show"]));
    let stdout = stdout
        .lines()
        .map(|line| {
            if line.starts_with("store_dir: ") {
                "store_dir: <STORE_DIR>".to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    assert_snapshot!(stdout, @r#"
store_dir: <STORE_DIR>
cloud_provider: firestore
rest.url: -
rest.anon_key: -
rest.table: tracking
firestore.project_id: demo-project
firestore.api_key: AIza****0000
firestore.collection: tracking
firestore.endpoint: https://firestore.googleapis.com
public_base_url: -
http.timeout_secs: 30
"#);
}

#[test]
fn missing_explicit_config_fails() {
    let td = tempdir().expect("tempdir");
    waybill_cmd(td.path())
        .arg("--config")
        .arg(td.path().join("absent.toml"))
        .arg("list")
        .assert()
        .failure()
        .stderr(contains("config file not found"));
}
