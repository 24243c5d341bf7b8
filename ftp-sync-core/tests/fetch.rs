mod common;

use std::path::Path;

use common::{seven_zip, FakeTree};
use ftp_sync_core::contract::{ExpandError, FetchError, MockExpander, RemoteError};
use ftp_sync_core::extract::SevenZipExpander;
use ftp_sync_core::fetch::{create_scratch_dir, download_one, extracted_files, fetch_all};
use tempfile::tempdir;

fn paths(items: &[&str]) -> Vec<String> {
    items.iter().map(|p| p.to_string()).collect()
}

#[test]
fn scratch_dirs_are_fresh_per_call() {
    let root = tempdir().unwrap();
    let first = create_scratch_dir(root.path()).unwrap();
    let second = create_scratch_dir(root.path()).unwrap();

    assert!(first.is_dir());
    assert!(second.is_dir());
    assert_ne!(first, second);
    assert!(first
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("ftp-sync-"));
}

#[test]
fn download_streams_under_base_name_and_removes_partial_files() {
    let scratch = tempdir().unwrap();
    let mut tree = FakeTree::new()
        .file_with_content("/data/2024/one.7z", b"one")
        .file_with_content("/data/2024/two.7z", b"two")
        .failing_retrieval("/data/2024/two.7z");

    let one = download_one(&mut tree, "/data/2024/one.7z", scratch.path()).unwrap();
    let two = download_one(&mut tree, "/data/2024/two.7z", scratch.path());

    assert_eq!(one, scratch.path().join("one.7z"));
    assert_eq!(std::fs::read(&one).unwrap(), b"one");
    assert!(matches!(two, Err(RemoteError::Connection(_))));
    assert!(!scratch.path().join("two.7z").exists());
}

#[test]
fn each_file_is_expanded_before_the_next_download() {
    let scratch = tempdir().unwrap();
    let mut tree = FakeTree::new()
        .file_with_content("/data/a.7z", b"a")
        .file_with_content("/data/b.7z", b"b");

    let mut expander = MockExpander::new();
    expander
        .expect_expand()
        .times(2)
        .returning(|archive: &Path, dest: &Path| {
            // The archive being expanded is the only one downloaded so far.
            let downloaded: Vec<_> = std::fs::read_dir(dest)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|name| name.ends_with(".7z"))
                .collect();
            let name = archive.file_name().unwrap().to_string_lossy().into_owned();
            if name == "a.7z" {
                assert_eq!(downloaded, vec!["a.7z"]);
            }
            let out = dest.join(name.replace(".7z", ".csv"));
            std::fs::write(&out, "x").unwrap();
            Ok(vec![out])
        });

    let fetched = fetch_all(&mut tree, &paths(&["/data/a.7z", "/data/b.7z"]), &expander, scratch.path());

    assert_eq!(
        extracted_files(fetched),
        vec![scratch.path().join("a.csv"), scratch.path().join("b.csv")]
    );
}

#[test]
fn same_named_archives_in_different_directories_are_both_expanded() {
    let scratch = tempdir().unwrap();
    let mut tree = FakeTree::new()
        .file_with_content("/pdet/2023/CAGED.7z", &seven_zip(&[("jan.txt", "janeiro")]))
        .file_with_content("/pdet/2024/CAGED.7z", &seven_zip(&[("feb.txt", "fevereiro")]));

    let fetched = fetch_all(
        &mut tree,
        &paths(&["/pdet/2023/CAGED.7z", "/pdet/2024/CAGED.7z"]),
        &SevenZipExpander,
        scratch.path(),
    );
    let extracted = extracted_files(fetched);

    let names: Vec<_> = extracted
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["jan.txt", "feb.txt"]);
    assert_eq!(std::fs::read_to_string(scratch.path().join("jan.txt")).unwrap(), "janeiro");
    assert_eq!(std::fs::read_to_string(scratch.path().join("feb.txt")).unwrap(), "fevereiro");
}

#[test]
fn download_and_expansion_failures_are_isolated_per_file() {
    let scratch = tempdir().unwrap();
    let mut tree = FakeTree::new()
        .file_with_content("/d/a.7z", b"a")
        .file_with_content("/d/b.7z", b"b")
        .file_with_content("/d/c.7z", b"c")
        .file_with_content("/d/d.7z", b"d")
        .failing_retrieval("/d/b.7z");

    let mut expander = MockExpander::new();
    expander
        .expect_expand()
        .times(3)
        .returning(|archive: &Path, dest: &Path| {
            let name = archive.file_name().unwrap().to_string_lossy().into_owned();
            match name.as_str() {
                "a.7z" => Ok(vec![dest.join("a1.csv"), dest.join("a2.csv")]),
                "c.7z" => Err(ExpandError::Archive {
                    path: archive.to_path_buf(),
                    message: "bad signature".into(),
                }),
                _ => Ok(vec![dest.join("d1.csv")]),
            }
        });

    let fetched = fetch_all(
        &mut tree,
        &paths(&["/d/a.7z", "/d/b.7z", "/d/c.7z", "/d/d.7z"]),
        &expander,
        scratch.path(),
    );

    assert_eq!(fetched.len(), 4);
    assert!(matches!(fetched[1].outcome, Err(FetchError::Download(_))));
    assert!(matches!(fetched[2].outcome, Err(FetchError::Expand(_))));
    assert_eq!(fetched[3].remote_path, "/d/d.7z");
    assert_eq!(
        extracted_files(fetched),
        vec![
            scratch.path().join("a1.csv"),
            scratch.path().join("a2.csv"),
            scratch.path().join("d1.csv"),
        ]
    );
}
