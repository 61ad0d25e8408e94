use lmv_translate::{
    error::PackagingError,
    packager::{Packager, ThumbnailSource, locate_svf, write_archive},
};
use std::fs::File;
use std::path::{Path, PathBuf};

/// `<root>/output/1/{stem}.svf` plus one sibling resource.
fn translated_tree(root: &Path, stem: &str) -> PathBuf {
    let primary = root.join("output/1");
    std::fs::create_dir_all(&primary).unwrap();
    std::fs::write(primary.join("0.pf"), b"pack").unwrap();
    let svf = primary.join(format!("{stem}.svf"));
    std::fs::write(&svf, b"svf-data").unwrap();
    svf
}

fn entry_names(archive: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    names
}

#[test]
fn packages_with_canonical_name() {
    let tmp = tempfile::tempdir().unwrap();
    let svf = translated_tree(tmp.path(), "part");

    let pkg = Packager::new()
        .package(
            tmp.path(),
            &svf,
            Some("42"),
            Some(&ThumbnailSource::Bytes(b"jpeg".to_vec())),
        )
        .unwrap();

    assert_eq!(pkg.archive_path, tmp.path().join("42.zip"));
    assert_eq!(pkg.svf_path, tmp.path().join("output/1/42.svf"));
    assert!(!svf.exists());
    let thumb = pkg.thumbnail_path.unwrap();
    assert_eq!(std::fs::read(&thumb).unwrap(), b"jpeg");

    let names = entry_names(&pkg.archive_path);
    assert!(names.contains(&"1/42.svf".to_string()));
    assert!(names.contains(&"1/0.pf".to_string()));
    assert!(names.contains(&"images/42.jpg".to_string()));
    assert!(names.iter().all(|n| !n.starts_with("output")));
}

#[test]
fn without_name_the_svf_stem_is_used() {
    let tmp = tempfile::tempdir().unwrap();
    let svf = translated_tree(tmp.path(), "part");
    let image = tmp.path().join("given.jpg");
    std::fs::write(&image, b"given").unwrap();

    let pkg = Packager::new()
        .package(tmp.path(), &svf, None, Some(&ThumbnailSource::File(image)))
        .unwrap();

    assert_eq!(pkg.archive_path, tmp.path().join("part.zip"));
    assert_eq!(pkg.svf_path, svf);
    assert!(entry_names(&pkg.archive_path).contains(&"images/part.jpg".to_string()));
}

#[test]
fn existing_target_is_a_collision() {
    let tmp = tempfile::tempdir().unwrap();
    let svf = translated_tree(tmp.path(), "part");
    std::fs::write(tmp.path().join("output/1/42.svf"), b"other").unwrap();

    let err = Packager::new()
        .package(tmp.path(), &svf, Some("42"), None)
        .unwrap_err();
    assert!(matches!(err, PackagingError::NameCollision { .. }));
    assert_eq!(std::fs::read(tmp.path().join("output/1/42.svf")).unwrap(), b"other");
    assert!(svf.exists());
}

#[test]
fn path_like_names_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let svf = translated_tree(tmp.path(), "part");

    for bad in ["", "..", "a/b", "a\\b"] {
        let err = Packager::new()
            .package(tmp.path(), &svf, Some(bad), None)
            .unwrap_err();
        assert!(matches!(err, PackagingError::InvalidName { .. }), "{bad:?}");
    }
}

#[test]
fn missing_tree_is_missing_output() {
    let tmp = tempfile::tempdir().unwrap();
    let gone = tmp.path().join("nope");
    let err = Packager::new()
        .package(&gone, &gone.join("output/1/x.svf"), None, None)
        .unwrap_err();
    assert!(matches!(err, PackagingError::MissingOutput { .. }));
}

#[test]
fn locate_prefers_stem_then_single_svf() {
    let tmp = tempfile::tempdir().unwrap();
    let svf = translated_tree(tmp.path(), "model");
    assert_eq!(locate_svf(tmp.path(), "model", None).unwrap(), svf);
    assert_eq!(locate_svf(tmp.path(), "renamed", None).unwrap(), svf);

    std::fs::write(tmp.path().join("output/1/second.svf"), b"").unwrap();
    assert_eq!(locate_svf(tmp.path(), "model", None).unwrap(), svf);
    let err = locate_svf(tmp.path(), "renamed", None).unwrap_err();
    assert!(matches!(err, PackagingError::MissingSvf { .. }));
}

#[test]
fn archive_is_deterministic() {
    let tmp = tempfile::tempdir().unwrap();
    translated_tree(tmp.path(), "part");
    let root = tmp.path().join("output");
    let a = tmp.path().join("a.zip");
    let b = tmp.path().join("b.zip");

    write_archive(&root, &a).unwrap();
    write_archive(&root, &b).unwrap();
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn rename_target_is_not_taken_for_the_asset() {
    let tmp = tempfile::tempdir().unwrap();
    let svf = translated_tree(tmp.path(), "part");
    std::fs::write(tmp.path().join("output/1/42.svf"), b"other").unwrap();

    assert!(locate_svf(tmp.path(), "model", None).is_err());
    let located = locate_svf(tmp.path(), "model", Some("42")).unwrap();
    assert_eq!(located, svf);

    let err = Packager::new()
        .package(tmp.path(), &located, Some("42"), None)
        .unwrap_err();
    assert!(matches!(err, PackagingError::NameCollision { .. }));
}
