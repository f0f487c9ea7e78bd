use predicates::prelude::*;

mod common;
use common::{Workspace, all_pass};

const CONFIG: &str = r#"
[orders]
predictions = "results.jsonl"
labels_dir = "labels"
output = "from-config.json"
image_base = "/static/pods"
"#;

#[test]
fn config_flag_supplies_paths() {
    let ws = Workspace::new();
    ws.predictions(&[all_pass("a_b_1.jpg")]);
    ws.write("podorders.toml", CONFIG);

    ws.podorders()
        .args(["--config", "podorders.toml", "orders"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-config.json | orders=1"));

    let out = ws.read_json("from-config.json");
    assert_eq!(out["orders"][0]["images"][0]["image_src"], "/static/pods/a_b_1.jpg");
}

#[test]
fn config_env_var_supplies_paths() {
    let ws = Workspace::new();
    ws.predictions(&[all_pass("a_b_1.jpg")]);
    let config = ws.write("env.toml", CONFIG);

    ws.podorders()
        .env("PODORDERS_CONFIG", &config)
        .arg("orders")
        .assert()
        .success();

    assert!(ws.path("from-config.json").exists());
}

#[test]
fn user_config_dir_is_read() {
    let ws = Workspace::new();
    ws.predictions(&[all_pass("a_b_1.jpg")]);
    // dirs::config_dir honors XDG_CONFIG_HOME on Linux and ~/Library/Application Support on macOS.
    let config_dir = if cfg!(target_os = "macos") {
        "home/Library/Application Support/podorders/config.toml"
    } else {
        "home/.config/podorders/config.toml"
    };
    ws.write(config_dir, CONFIG);

    ws.podorders().arg("orders").assert().success();

    assert!(ws.path("from-config.json").exists());
}

#[test]
fn invalid_user_config_exits_with_usage_code() {
    let ws = Workspace::new();
    ws.predictions(&[all_pass("a_b_1.jpg")]);
    let config_dir = if cfg!(target_os = "macos") {
        "home/Library/Application Support/podorders/config.toml"
    } else {
        "home/.config/podorders/config.toml"
    };
    ws.write(config_dir, "[orders\npredictions = ");

    ws.orders()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid config file"))
        .stderr(predicate::str::contains("config.toml"));

    assert!(!ws.path("site/data_orders.json").exists());
}

#[test]
fn flags_override_config() {
    let ws = Workspace::new();
    ws.predictions(&[all_pass("a_b_1.jpg")]);
    ws.write("podorders.toml", CONFIG);

    ws.podorders()
        .args([
            "--config",
            "podorders.toml",
            "orders",
            "--output",
            "from-flag.json",
            "--image-base",
            "./img",
        ])
        .assert()
        .success();

    assert!(!ws.path("from-config.json").exists());
    let out = ws.read_json("from-flag.json");
    assert_eq!(out["orders"][0]["images"][0]["image_src"], "./img/a_b_1.jpg");
}

#[test]
fn missing_required_setting_exits_with_usage_code() {
    let ws = Workspace::new();
    ws.predictions(&[all_pass("a_b_1.jpg")]);

    ws.podorders()
        .args(["orders", "--predictions", "results.jsonl", "--output", "out.json"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains(
            "missing required setting `orders.labels_dir`",
        ))
        .stderr(predicate::str::contains("--labels-dir"));
}

#[test]
fn invalid_config_file_exits_with_usage_code() {
    let ws = Workspace::new();
    ws.write("bad.toml", "[orders]\non_label_error = \"sometimes\"\n");

    ws.podorders()
        .args(["--config", "bad.toml", "orders"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid config file bad.toml"));
}

#[test]
fn missing_explicit_config_file_exits_with_usage_code() {
    let ws = Workspace::new();

    ws.podorders()
        .args(["--config", "absent.toml", "orders"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("failed to read config file absent.toml"));
}
