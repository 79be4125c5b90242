use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

const TOOL_CTD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tool name="sorter" version="2.0">
	<description>Sorts reads</description>
	<PARAMETERS version="1.6.2">
		<NODE name="sorter" description="Sorts reads">
			<ITEM name="version" value="2.0" type="string" tags="advanced"/>
			<NODE name="1" description="Parameters of sorter">
				<ITEM name="input" value="" type="input-file" required="true" supported_formats="*.bam,*.sam"/>
				<NODE name="algo" description="Algorithm settings">
					<ITEM name="threads" value="1" type="int" restrictions="1:64"/>
					<ITEM name="order" value="coordinate" type="string" restrictions="coordinate,name"/>
				</NODE>
				<ITEMLIST name="regions" type="string"/>
				<ITEM name="fast" value="false" type="boolean"/>
			</NODE>
		</NODE>
	</PARAMETERS>
</tool>
"#;

fn write_tool(dir: &Path) -> PathBuf {
    let path = dir.join("sorter.ctd");
    fs::write(&path, TOOL_CTD).expect("failed to write tool CTD");
    path
}

fn run(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_ctd-params"))
        .args(args)
        .output()
        .expect("failed to run ctd-params")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ---------------------------------------------------------------------------
// list / defaults / extract
// ---------------------------------------------------------------------------

#[test]
fn list_prints_flags_and_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let ctd = write_tool(dir.path());

    let output = run(&["list", "--ctd", ctd.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("sorter 2.0"));
    assert!(stdout.contains("--algo:threads"));
    assert!(stdout.contains("PARAMETER input (required)"));
    assert!(stdout.contains("type: list of strings"));
}

#[test]
fn defaults_prints_nested_json() {
    let dir = tempfile::tempdir().unwrap();
    let ctd = write_tool(dir.path());

    let output = run(&["defaults", "--ctd", ctd.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        serde_json::json!({
            "algo": { "threads": 1, "order": "coordinate" },
            "fast": false
        })
    );
}

#[test]
fn defaults_supports_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let ctd = write_tool(dir.path());

    let output = run(&["defaults", "--ctd", ctd.to_str().unwrap(), "--format", "yaml"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("threads: 1"));
}

#[test]
fn extract_reads_values_without_schema() {
    let dir = tempfile::tempdir().unwrap();
    let ctd = write_tool(dir.path());

    let output = run(&["extract", "--input", ctd.to_str().unwrap()]);
    assert!(output.status.success());
    let values = stdout_json(&output);
    assert_eq!(values["algo"]["threads"], "1");
    assert!(values.get("input").is_none());
    assert!(values.get("regions").is_none());
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_coerces_command_line_values() {
    let dir = tempfile::tempdir().unwrap();
    let ctd = write_tool(dir.path());

    let output = run(&[
        "validate",
        "--ctd",
        ctd.to_str().unwrap(),
        "--required",
        "2",
        "--types",
        "2",
        "--restrictions",
        "2",
        "--",
        "--input",
        "reads.bam",
        "--algo:threads",
        "8",
        "--regions",
        "chr1",
        "chr2",
        "--fast",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output),
        serde_json::json!({
            "input": "reads.bam",
            "algo": { "threads": 8, "order": "coordinate" },
            "regions": ["chr1", "chr2"],
            "fast": true
        })
    );
}

#[test]
fn validate_rejects_missing_required_argument() {
    let dir = tempfile::tempdir().unwrap();
    let ctd = write_tool(dir.path());

    let output = run(&["validate", "--ctd", ctd.to_str().unwrap(), "--required", "2"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: required argument input is missing"), "{stderr}");
}

#[test]
fn validate_warns_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let ctd = write_tool(dir.path());

    let output = run(&[
        "validate",
        "--ctd",
        ctd.to_str().unwrap(),
        "--required",
        "1",
        "--restrictions",
        "1",
        "--",
        "--algo:threads",
        "100",
    ]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("warning: required argument input is missing"), "{stderr}");
    assert!(stderr.contains("warning: algo:threads 100"), "{stderr}");
    assert_eq!(stdout_json(&output)["algo"]["threads"], 100);
}

#[test]
fn validate_uses_policy_file() {
    let dir = tempfile::tempdir().unwrap();
    let ctd = write_tool(dir.path());
    let policy = dir.path().join("policy.yml");
    fs::write(&policy, "required: ignore\ntypes: reject\nrestrictions: ignore\n").unwrap();

    let output = run(&[
        "validate",
        "--ctd",
        ctd.to_str().unwrap(),
        "--policy",
        policy.to_str().unwrap(),
        "--",
        "--algo:threads",
        "many",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("is not a valid int"), "{stderr}");
}

#[test]
fn validate_writes_and_reloads_parameter_ctd() {
    let dir = tempfile::tempdir().unwrap();
    let ctd = write_tool(dir.path());
    let params = dir.path().join("params.ctd");
    let tool_copy = dir.path().join("copy.ctd");

    let output = run(&[
        "validate",
        "--ctd",
        ctd.to_str().unwrap(),
        "--",
        "--input",
        "a.sam",
        "--algo:order",
        "name",
        "--write_param_ctd",
        params.to_str().unwrap(),
        "--write_tool_ctd",
        tool_copy.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(params.exists());
    assert!(tool_copy.exists());

    // Values from the written file, overridden on the command line.
    let output = run(&[
        "validate",
        "--ctd",
        tool_copy.to_str().unwrap(),
        "--required",
        "2",
        "--",
        "--input_ctd",
        params.to_str().unwrap(),
        "--algo:threads",
        "4",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let values = stdout_json(&output);
    assert_eq!(values["input"], "a.sam");
    assert_eq!(values["algo"]["order"], "name");
    assert_eq!(values["algo"]["threads"], 4);
}

#[test]
fn validate_round_trips_unset_optional_values() {
    let dir = tempfile::tempdir().unwrap();
    let ctd = dir.path().join("opt.ctd");
    fs::write(
        &ctd,
        r#"<tool name="opt" version="1"><PARAMETERS><NODE name="opt">
            <ITEM name="input" value="" type="input-file" required="true"/>
            <ITEM name="limit" value="" type="int"/>
            <ITEM name="label" value="" type="string"/>
        </NODE></PARAMETERS></tool>"#,
    )
    .unwrap();
    let params = dir.path().join("params.ctd");

    let output = run(&[
        "validate",
        "--ctd",
        ctd.to_str().unwrap(),
        "--",
        "--input",
        "a.txt",
        "--write_param_ctd",
        params.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run(&[
        "validate",
        "--ctd",
        ctd.to_str().unwrap(),
        "--types",
        "2",
        "--",
        "--input_ctd",
        params.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_json(&output), serde_json::json!({ "input": "a.txt" }));
}

#[test]
fn load_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.ctd");
    fs::write(&bad, "<PARAMETERS/>").unwrap();

    let output = run(&["list", "--ctd", bad.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: Failed to load"), "{stderr}");
}
