use lmv_translate::{
    error::ResolutionError,
    formats::{Engine, FileType},
    resolver::{ExecutionContext, HostEngine, TranslatorResolver, first_existing},
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CONVERTER: &str = "LMV/conv.exe";

fn place_converter(root: &Path) -> PathBuf {
    let path = root.join(CONVERTER);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"").unwrap();
    path
}

fn resolver() -> TranslatorResolver {
    let mut table = BTreeMap::new();
    table.insert(Engine::Alias, PathBuf::from(CONVERTER));
    table.insert(Engine::Vred, PathBuf::from(CONVERTER));
    TranslatorResolver::new(table)
}

#[test]
fn first_existing_candidate_wins() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("missing");
    let older = tmp.path().join("older");
    let newer = tmp.path().join("newer");
    place_converter(&older);
    let expected = place_converter(&newer);

    let found = first_existing(
        Engine::Alias,
        Path::new(CONVERTER),
        &[missing, newer, older],
    )
    .unwrap();
    assert_eq!(found, expected);
}

#[test]
fn no_candidates_is_reported() {
    let err = first_existing(Engine::Vred, Path::new(CONVERTER), &[]).unwrap_err();
    assert!(matches!(err, ResolutionError::NoCandidates { engine: Engine::Vred }));
}

#[test]
fn not_found_lists_every_path_tried() {
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("a");
    let b = tmp.path().join("b");
    let err = first_existing(Engine::Alias, Path::new(CONVERTER), &[a.clone(), b.clone()])
        .unwrap_err();
    match err {
        ResolutionError::NotFound { tried, .. } => {
            assert_eq!(tried, vec![a.join(CONVERTER), b.join(CONVERTER)]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn host_bin_dir_comes_first_for_matching_engine() {
    let tmp = tempfile::tempdir().unwrap();
    let host_dir = tmp.path().join("host");
    let installed = tmp.path().join("installed");
    let bundled = tmp.path().join("resources");
    let host_exe = place_converter(&host_dir);
    place_converter(&installed);
    let bundled_exe = place_converter(&bundled);

    let mut install_roots = BTreeMap::new();
    install_roots.insert(Engine::Alias, vec![installed.clone()]);
    let ctx = ExecutionContext {
        host: Some(HostEngine {
            engine: Engine::Alias,
            bin_dir: host_dir,
        }),
        install_roots,
        resources_dir: Some(bundled),
    };

    let wire = resolver().resolve(FileType::Wire, &ctx).unwrap();
    assert_eq!(wire.engine, Engine::Alias);
    assert_eq!(wire.executable, host_exe);

    // Host is Alias, so VRED skips it and has no install roots.
    let vpb = resolver().resolve(FileType::Vpb, &ctx).unwrap();
    assert_eq!(vpb.engine, Engine::Vred);
    assert_eq!(vpb.executable, bundled_exe);
}

#[test]
fn candidates_are_deduplicated_keeping_first() {
    let shared = PathBuf::from("/opt/tools");
    let mut install_roots = BTreeMap::new();
    install_roots.insert(
        Engine::Vred,
        vec![shared.clone(), PathBuf::from("/opt/vred"), shared.clone()],
    );
    let ctx = ExecutionContext {
        host: Some(HostEngine {
            engine: Engine::Vred,
            bin_dir: shared.clone(),
        }),
        install_roots,
        resources_dir: Some(PathBuf::from("/opt/vred")),
    };

    assert_eq!(
        ctx.candidates_for(Engine::Vred),
        vec![shared, PathBuf::from("/opt/vred")]
    );
}

#[test]
fn never_returns_a_missing_executable() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = ExecutionContext {
        resources_dir: Some(tmp.path().to_path_buf()),
        ..Default::default()
    };
    let err = resolver().resolve(FileType::Wire, &ctx).unwrap_err();
    assert!(matches!(err, ResolutionError::NotFound { engine: Engine::Alias, .. }));
}

#[test]
fn missing_table_entry_is_no_engine_for_type() {
    let mut table = BTreeMap::new();
    table.insert(Engine::Alias, PathBuf::from(CONVERTER));
    let resolver = TranslatorResolver::new(table);

    let err = resolver
        .resolve(FileType::Vpb, &ExecutionContext::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ResolutionError::NoEngineForType {
            file_type: FileType::Vpb,
            engine: Engine::Vred
        }
    ));
}

#[test]
fn file_type_comes_from_extension() {
    assert_eq!(FileType::from_path(Path::new("a/b/Part.WIRE")).unwrap(), FileType::Wire);
    assert_eq!(FileType::from_path(Path::new("scene.vpb")).unwrap(), FileType::Vpb);
    let err = FileType::from_path(Path::new("model.step")).unwrap_err();
    assert!(matches!(err, ResolutionError::UnsupportedFileType { .. }));
    assert!(FileType::from_path(Path::new("noext")).is_err());
}
