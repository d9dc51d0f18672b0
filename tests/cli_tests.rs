use std::fs;
use std::path::Path;
use std::process::Command;

fn write_inputs(dir: &Path) {
    fs::write(dir.join("voc.txt"), "apple\npear\nplum\nfig\n").unwrap();
    fs::write(
        dir.join("docs.txt"),
        "0 1 0 1 0 1\n2 3 2 3\n\n0 3 1 2 0\n",
    )
    .unwrap();
    fs::write(dir.join("selected.txt"), "0\n1\n3\n").unwrap();
}

fn rtopic(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_rtopic"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

const INPUTS: [&str; 6] = [
    "--word-voc-file",
    "voc.txt",
    "--word-file",
    "docs.txt",
    "--num-top-words",
    "2",
];

#[test]
fn train_then_report_and_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let mut args = vec!["train", "--output-folder", "out", "--ks", "2,2"];
    args.extend(["--burn-in", "2", "--max-iter", "10", "--sample-lag", "2", "--seed", "5"]);
    args.extend(INPUTS);
    let out = rtopic(dir.path(), &args);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let name = "RANDOM_RecursiveLDA_K-2-2_B-2_M-10_L-2_a-0.1-0.1_b-0.1-0.1_opt-false";
    let folder = dir.path().join("out").join(name);
    assert!(folder.join(format!("{name}.state")).exists());
    assert!(folder.join("config.json").exists());
    let report = fs::read_to_string(folder.join("topwords.txt")).unwrap();
    assert_eq!(report.lines().count(), 6);

    let model_folder = format!("out/{name}");
    for cmd in ["report", "rebuild"] {
        let mut args = vec![cmd, "--model-folder", model_folder.as_str()];
        args.extend(INPUTS);
        let out = rtopic(dir.path(), &args);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        let again = fs::read_to_string(folder.join("topwords.txt")).unwrap();
        assert_eq!(again, report);
    }
}

#[test]
fn selected_docs_out_of_range_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    fs::write(dir.path().join("selected.txt"), "0\n9\n").unwrap();

    let mut args = vec!["train", "--output-folder", "out", "--ks", "2"];
    args.extend(["--alphas", "0.1", "--betas", "0.1", "--max-iter", "2", "--burn-in", "1"]);
    args.extend(["--selected-docs-file", "selected.txt"]);
    args.extend(INPUTS);
    let out = rtopic(dir.path(), &args);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("out of range"));
}

#[test]
fn mismatched_level_arrays_fail_before_training() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let mut args = vec!["train", "--output-folder", "out", "--ks", "2,2", "--betas", "0.1"];
    args.extend(INPUTS);
    let out = rtopic(dir.path(), &args);
    assert!(!out.status.success());
    assert!(!dir.path().join("out").exists());
}
