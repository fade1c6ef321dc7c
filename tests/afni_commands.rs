//
// afni_commands.rs
// Nifti-Tools-rs
//
// Drives AfniToolkit against shell stand-ins for the AFNI programs to check argument order, the
// sub-brick selector, environment, and how a non-zero exit is reported.
//
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use nifti_tools::batch::run_batch;
use nifti_tools::models::Step;
use nifti_tools::{AfniToolkit, FileRecord, OutputMode};
use tempfile::tempdir;

const SCRIPTS: [(&str, &str); 4] = [
    (
        "3dinfo",
        r#"case "$(cat "$2")" in 4D*) echo 3 ;; *) echo 1 ;; esac"#,
    ),
    (
        "3dcalc",
        r#"src="${2%\[0\]}"; { cat "$src"; printf '|vol0'; } > "$6""#,
    ),
    (
        "3dWarp",
        r#"[ "$AFNI_NO_OBLIQUE_WARNING" = YES ] || exit 9; { cat "$4"; printf '|deoblique'; } > "$3""#,
    ),
    (
        "3dresample",
        r#"if [ "$2" = SAL ]; then echo "** ERROR: orientation $2 refused" >&2; exit 1; fi; { cat "$6"; printf '|%s' "$2"; } > "$4""#,
    ),
];

fn install_scripts(bin: &Path) {
    fs::create_dir_all(bin).expect("bin dir");
    for (name, body) in SCRIPTS {
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }
}

#[test]
fn afni_command_lines_round_trip_through_stand_ins() {
    let work = tempdir().expect("tempdir");
    let bin = work.path().join("bin");
    install_scripts(&bin);

    let root = work.path().join("ds");
    let four_d = root.join("sub-01/anat/sub-01_T1w.nii.gz");
    let three_d = root.join("sub-02/anat/sub-02_T1w.nii.gz");
    for (path, content) in [(&four_d, "4D a"), (&three_d, "3D b")] {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    let toolkit = AfniToolkit::new(Some(bin.clone()));
    assert!(toolkit.missing_programs().is_empty());

    let out_root = work.path().join("out");
    let mode = OutputMode::Directory(out_root.clone());
    let records: Vec<FileRecord> = [four_d.clone(), three_d.clone()]
        .into_iter()
        .map(|p| FileRecord::new(&root, p, &mode).unwrap())
        .collect();

    let outcomes = run_batch(&toolkit, &records, "RAS".parse().unwrap(), 1, |_| {}).expect("batch");
    assert!(outcomes.iter().all(|o| o.is_success()), "{:?}", outcomes);
    assert_eq!(
        fs::read_to_string(out_root.join("sub-01/anat/sub-01_T1w.nii.gz")).unwrap(),
        "4D a|vol0|deoblique|RAS"
    );
    assert_eq!(
        fs::read_to_string(out_root.join("sub-02/anat/sub-02_T1w.nii.gz")).unwrap(),
        "3D b|deoblique|RAS"
    );

    // A refused orientation surfaces the tool's own stderr.
    let in_place: Vec<FileRecord> = [three_d.clone()]
        .into_iter()
        .map(|p| FileRecord::new(&root, p, &OutputMode::InPlace).unwrap())
        .collect();
    let outcomes = run_batch(&toolkit, &in_place, "SAL".parse().unwrap(), 1, |_| {}).expect("batch");
    let reason = outcomes[0].failure().expect("reorient should fail");
    assert_eq!(reason.step, Some(Step::Reorient));
    assert!(reason.detail.contains("3dresample"));
    assert!(reason.detail.contains("** ERROR: orientation SAL refused"));
    assert_eq!(fs::read_to_string(&three_d).unwrap(), "3D b");
}
