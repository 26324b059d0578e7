// run the steward binary against temp descriptor and config files
use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::tempdir;

const SERVICES: &str = r#"{
  "version": "0.1.0",
  "services": [
    {
      "interface_name": "IOrderService",
      "namespace": "Shop",
      "operations": [
        { "name": "GetOrder", "params": [ { "name": "proxy", "type_name": "int" } ], "return_type": "Order" },
        { "name": "GetProxy" }
      ]
    },
    { "interface_name": "IBilling", "operations": [ { "name": "Charge" } ] }
  ]
}"#;

fn write_config(dir: &Path, generation: &str) -> std::path::PathBuf {
    let path = dir.join("steward.toml");
    let contents = format!(
        "[logging]\nlevel = \"warn\"\n\n[generation]\n{}\n\n[codegen]\ninput_path = \"{}\"\noutput_dir = \"{}\"\n",
        generation,
        dir.join("services.json").display(),
        dir.join("out").display()
    );
    fs::write(&path, contents).unwrap();
    path
}

fn steward() -> Command { Command::new(assert_cmd::cargo::cargo_bin!("steward")) }

#[test]
fn plan_prints_json() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("services.json");
    fs::write(&input, SERVICES).unwrap();
    let config = write_config(tmp.path(), "");

    let output = steward()
        .args(["plan", "--service", "IOrderService", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());

    let plans: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let plan = &plans[0];
    assert_eq!(plans.as_array().unwrap().len(), 1);
    assert_eq!(plan["type_name"], "OrderServiceClient");
    assert_eq!(plan["members"]["get_proxy"], "GetProxy_0");
    assert_eq!(plan["operations"][0]["locals"]["proxy"], "proxy_0");
}

#[test]
fn plan_writes_output_file_with_options() {
    let tmp = tempdir().unwrap();
    let input = tmp.path().join("services.json");
    fs::write(&input, SERVICES).unwrap();
    let config = write_config(tmp.path(), "wrapper = false\nsuppress_async_methods = true");
    let out = tmp.path().join("plans").join("all.json");

    steward()
        .args(["plan", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&out)
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    let plans: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(plans.as_array().unwrap().len(), 2);
    assert_eq!(plans[0]["kind"], "proxy");
    assert_eq!(plans[0]["type_name"], "OrderServiceProxy");
    assert_eq!(plans[1]["operations"][0]["variants"].as_array().unwrap().len(), 1);
}

#[test]
fn plan_write_uses_output_dir() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("services.json"), SERVICES).unwrap();
    let config = write_config(tmp.path(), "");

    steward()
        .args(["plan", "--write", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("BillingClient.plan.json"));

    assert!(tmp.path().join("out").join("OrderServiceClient.plan.json").exists());
    assert!(tmp.path().join("out").join("BillingClient.plan.json").exists());
}

#[test]
fn plan_unknown_service_fails() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("services.json"), SERVICES).unwrap();
    let config = write_config(tmp.path(), "");

    steward()
        .args(["plan", "--service", "IMissing", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("IMissing"));
}

#[test]
fn plan_missing_config_fails() {
    let tmp = tempdir().unwrap();
    steward()
        .args(["plan", "--config"])
        .arg(tmp.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn init_config_refuses_to_overwrite() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("nested").join("config.toml");

    steward().args(["init-config", "--path"]).arg(&path).assert().success();
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("[generation]"));
    assert!(contents.contains("output_dir = \"generated\""));

    steward()
        .args(["init-config", "--path"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    steward().args(["init-config", "--force", "--path"]).arg(&path).assert().success();
}

#[test]
fn demo_reports_recreated_channels() {
    let tmp = tempdir().unwrap();
    let config = write_config(tmp.path(), "");

    let output = steward()
        .args(["demo", "--calls", "4", "--fault-every", "2", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["succeeded"], 2);
    assert_eq!(report["failed"], 2);
    assert_eq!(report["channels_created"], 2);
}
