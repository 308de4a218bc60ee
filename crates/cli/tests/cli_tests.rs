// End-to-end tests for the smerge binary: exit codes, output files and the
// --json stdout contract.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

fn smerge() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_smerge"));
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn run(args: &[&str], dir: &Path) -> Output {
    smerge().args(args).current_dir(dir).output().expect("spawn smerge")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn json_stdout(out: &Output) -> serde_json::Value {
    let text = String::from_utf8_lossy(&out.stdout);
    serde_json::from_str(text.trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\nstdout:\n{text}"))
}

const HEADER: &str = "ID,Name,Elevation,Col elevation,Notes,geometry\n";

/// Two DEM layers: one summit seen by both, one seen by each alone.
fn write_layers(dir: &Path) {
    fs::write(
        dir.join("srtm.csv"),
        format!(
            "{HEADER}\
             0,300,1500,1200,,\"LINESTRING (0 0, 100 0)\"\n\
             1,120,900,780,,\"LINESTRING (1000 1000, 1100 1000)\"\n"
        ),
    )
    .unwrap();
    fs::write(
        dir.join("alos.csv"),
        format!(
            "{HEADER}\
             0,304,1502,1198,,\"LINESTRING (1 1, 101 1)\"\n\
             1,450,2000,1550,,\"LINESTRING (5000 5000, 5100 5000)\"\n"
        ),
    )
    .unwrap();
}

fn merge_config(layers: &[(&str, &str)]) -> String {
    let mut toml = String::from(
        "name = \"test\"\ncrs = \"EPSG:3844\"\ndistance = 10.0\n\n[output]\ncsv = \"out/merged.csv\"\n",
    );
    for (name, file) in layers {
        toml.push_str(&format!("\n[[layers]]\nname = \"{name}\"\nfile = \"{file}\"\n"));
    }
    toml
}

fn setup() -> TempDir {
    let dir = tempdir().unwrap();
    write_layers(dir.path());
    fs::create_dir(dir.path().join("out")).unwrap();
    fs::write(
        dir.path().join("merge.toml"),
        merge_config(&[("test_srtm", "srtm.csv"), ("test_alos", "alos.csv")]),
    )
    .unwrap();
    dir
}

// ===========================================================================
// merge
// ===========================================================================

#[test]
fn merge_run_json_ranks_by_prominence() {
    let dir = setup();
    let out = run(&["merge", "run", "merge.toml", "--json"], dir.path());
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let val = json_stdout(&out);
    assert_eq!(val["meta"]["config_name"], "test");
    assert_eq!(val["meta"]["crs"], "EPSG:3844");
    assert_eq!(val["summary"]["input_records"], 4);
    assert_eq!(val["summary"]["merged_groups"], 1);

    let entities = val["entities"].as_array().unwrap();
    let ids: Vec<&str> = entities.iter().map(|e| e["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["S0001", "S0002", "S0003"]);
    let proms: Vec<f64> = entities.iter().map(|e| e["prominence"].as_f64().unwrap()).collect();
    assert_eq!(proms, vec![450.0, 302.0, 120.0]);
    assert!(entities[1]["sources"]["SRTM"].is_object());
    assert!(entities[1]["sources"]["ALOS"].is_object());

    // [output] csv resolves against the config directory.
    let csv = fs::read_to_string(dir.path().join("out/merged.csv")).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("fid,ID,Name,Elevation,Col elevation,Reference,Prominence,Merge,Cross,Notes"));
    assert!(header.contains("SRTM Elevation"));
    assert!(header.ends_with("geometry"));
    assert_eq!(csv.lines().count(), 4);
}

#[test]
fn merge_run_is_independent_of_layer_order() {
    let dir = setup();
    fs::write(
        dir.path().join("swapped.toml"),
        merge_config(&[("test_alos", "alos.csv"), ("test_srtm", "srtm.csv")]),
    )
    .unwrap();
    let a = run(&["merge", "run", "merge.toml", "--json"], dir.path());
    let b = run(&["merge", "run", "swapped.toml", "--json"], dir.path());
    assert!(a.status.success() && b.status.success());
    assert_eq!(json_stdout(&a)["entities"], json_stdout(&b)["entities"]);
}

#[test]
fn merge_duplicate_dem_exits_4() {
    let dir = setup();
    fs::write(
        dir.path().join("dup.toml"),
        merge_config(&[("a_srtm", "srtm.csv"), ("b_srtm", "alos.csv")]),
    )
    .unwrap();
    let out = run(&["merge", "run", "dup.toml"], dir.path());
    assert_eq!(out.status.code(), Some(4));
    let err = stderr(&out);
    assert!(err.contains("same DEM"), "stderr: {err}");
    assert!(err.contains("hint:"));
    assert!(!dir.path().join("out/merged.csv").exists());
}

#[test]
fn merge_missing_layer_file_exits_10() {
    let dir = setup();
    fs::remove_file(dir.path().join("alos.csv")).unwrap();
    let out = run(&["merge", "run", "merge.toml"], dir.path());
    assert_eq!(out.status.code(), Some(10), "stderr: {}", stderr(&out));
}

#[test]
fn merge_layer_without_geometry_column_exits_12() {
    let dir = setup();
    fs::write(dir.path().join("alos.csv"), "ID,Elevation\n0,1500\n").unwrap();
    let out = run(&["merge", "run", "merge.toml"], dir.path());
    assert_eq!(out.status.code(), Some(12), "stderr: {}", stderr(&out));
}

#[test]
fn merge_validate() {
    let dir = setup();
    let out = run(&["merge", "validate", "merge.toml"], dir.path());
    assert!(out.status.success());
    let err = stderr(&out);
    assert!(err.contains("valid: merge 'test' with 2 layer(s)"), "stderr: {err}");
    assert!(err.contains("SRTM=test_srtm"));

    fs::write(dir.path().join("bad.toml"), "name = \"x\"\ndistance = -1.0\n").unwrap();
    let out = run(&["merge", "validate", "bad.toml"], dir.path());
    assert_eq!(out.status.code(), Some(3));

    fs::write(dir.path().join("lidar.toml"), merge_config(&[("test_lidar", "srtm.csv")])).unwrap();
    let out = run(&["merge", "validate", "lidar.toml"], dir.path());
    assert_eq!(out.status.code(), Some(4));
}

#[test]
fn merge_without_output_is_a_usage_error() {
    let dir = setup();
    let toml = merge_config(&[("test_srtm", "srtm.csv")]).replace("[output]\ncsv = \"out/merged.csv\"\n", "");
    fs::write(dir.path().join("noout.toml"), toml).unwrap();
    let out = run(&["merge", "run", "noout.toml"], dir.path());
    assert_eq!(out.status.code(), Some(2));
}

// ===========================================================================
// reconcile
// ===========================================================================

#[test]
fn reconcile_spatial_after_merge() {
    let dir = setup();
    let out = run(&["merge", "run", "merge.toml"], dir.path());
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    fs::write(
        dir.path().join("ref.csv"),
        "ref,name,action,check ele,check col,Match,geometry\n\
         YO/MM-001,Varful Mare,ok,2001,1549,,\"LINESTRING (5000 5000, 5100 5000)\"\n\
         YO/MM-002,Varful Mic,,,,,\"LINESTRING (1000 1000, 1300 1300)\"\n\
         YO/MM-003,Gone,delete,,,,\"LINESTRING (0 0, 100 0)\"\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("reconcile.toml"),
        "name = \"ref\"\nmode = \"spatial\"\ninput = \"out/merged.csv\"\nreference = \"ref.csv\"\n\n\
         [tolerance]\nanchor = 1.0\nsecondary = 1.0\n\n\
         [output]\ncsv = \"out/final.csv\"\nremainder = \"out/remainder.csv\"\n",
    )
    .unwrap();

    let out = run(&["reconcile", "run", "reconcile.toml", "--json"], dir.path());
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let val = json_stdout(&out);
    assert_eq!(val["mode"], "spatial");
    assert_eq!(val["summary"]["matched"], 1);

    let first = &val["entities"][0];
    assert_eq!(first["id"], "S0001");
    assert_eq!(first["reference"], "YO/MM-001");
    assert_eq!(first["name"], "Varful Mare");
    assert_eq!(first["elevation"], 2001);
    assert_eq!(first["prominence"].as_f64(), Some(452.0));

    let remainder = fs::read_to_string(dir.path().join("out/remainder.csv")).unwrap();
    let rows: Vec<&str> = remainder.lines().collect();
    assert_eq!(rows.len(), 2, "{remainder}");
    assert!(rows[1].starts_with("YO/MM-002,Varful Mic,"));
    assert!(rows[1].contains(",S0003,"), "{}", rows[1]);
}

#[test]
fn reconcile_validate_rejects_unknown_mode() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("r.toml"),
        "name = \"r\"\nmode = \"fuzzy\"\ninput = \"a.csv\"\nreference = \"b.csv\"\n",
    )
    .unwrap();
    let out = run(&["reconcile", "validate", "r.toml"], dir.path());
    assert_eq!(out.status.code(), Some(3));

    fs::write(
        dir.path().join("r.toml"),
        "name = \"r\"\nmode = \"key\"\ninput = \"a.csv\"\nreference = \"b.csv\"\n",
    )
    .unwrap();
    let out = run(&["reconcile", "validate", "r.toml"], dir.path());
    assert!(out.status.success());
    assert!(stderr(&out).contains("valid: key reconcile 'r'"));
}

// ===========================================================================
// import / prominence
// ===========================================================================

const GRID: &str = "ncols 4\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 10\nNODATA_value -9999\n\
                    1500 1300 1100 1000\n1400 1200 900 800\n";

#[test]
fn import_writes_detection_layer() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("dem.asc"), GRID).unwrap();
    fs::write(
        dir.path().join("peaks.lst"),
        "P 5. 15. 200\nP 25. 15. -200\nL 2 0.\n 25. 15.\n 5. 15.\n\
         P 15. 5. 50\nP 35. 5. -50\nL 2 0.\n 35. 5.\n 15. 5.\n",
    )
    .unwrap();

    let out = run(
        &["import", "peaks.lst", "--dem", "dem.asc", "-o", "peaks_srtm.csv", "--json"],
        dir.path(),
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let summary = json_stdout(&out);
    assert_eq!(summary["summits"], 2);
    assert_eq!(summary["imported"], 1);
    assert_eq!(summary["col_at_minimum"], 1);

    let layer = fs::read_to_string(dir.path().join("peaks_srtm.csv")).unwrap();
    let lines: Vec<&str> = layer.lines().collect();
    assert_eq!(lines[0], "ID,Name,Elevation,Col elevation,Notes,geometry");
    assert!(lines[1].starts_with("0,200,1500,1100,,"), "{}", lines[1]);
}

#[test]
fn import_reports_landserf_line() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("dem.asc"), GRID).unwrap();
    fs::write(dir.path().join("bad.lst"), "P 5. 15. 200\nL 2 0.\n").unwrap();
    let out = run(&["import", "bad.lst", "--dem", "dem.asc", "-o", "x.csv"], dir.path());
    assert_eq!(out.status.code(), Some(11));
    assert!(stderr(&out).contains("line 2"), "stderr: {}", stderr(&out));
}

#[test]
fn prominence_per_dem() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("dem.asc"), GRID).unwrap();
    fs::write(
        dir.path().join("merged.csv"),
        "fid,ID,Elevation,Col elevation,geometry\n\
         0,S0001,1502,1098,\"MULTILINESTRING ((5 15, 25 15))\"\n\
         1,S0002,,,\"MULTILINESTRING ((5 5, 25 5))\"\n",
    )
    .unwrap();

    let out = run(
        &["prominence", "merged.csv", "--dem", "SRTM=dem.asc", "-o", "prom.csv"],
        dir.path(),
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let table = fs::read_to_string(dir.path().join("prom.csv")).unwrap();
    assert_eq!(table, "ID,Prominence,SRTM Prominence\nS0001,404,400\n");

    let out = run(
        &["prominence", "merged.csv", "--dem", "LIDAR=dem.asc", "-o", "prom.csv"],
        dir.path(),
    );
    assert_eq!(out.status.code(), Some(2));
}
