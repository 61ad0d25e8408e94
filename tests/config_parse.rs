use lmv_translate::{config::Config, formats::Engine};
use std::time::Duration;

#[test]
fn parse_example_config() {
    let raw = include_str!("../lmv-translate.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.paths.workspace_prefix, "lmv_");
    assert_eq!(cfg.thumbnail.size, 1280);
    assert_eq!(cfg.limits.translate_timeout(), None);
    assert_eq!(cfg.limits.thumbnail_timeout(), Some(Duration::from_secs(300)));
    assert_eq!(cfg.converter_table().len(), 2);
}

#[test]
fn partial_sections_fall_back_to_defaults() {
    let raw = r#"
[thumbnail]
size = 512

[install_roots]
alias = ["/opt/alias/2025/bin", "/opt/alias/2024/bin"]
"#;
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.thumbnail.size, 512);
    assert_eq!(cfg.thumbnail.depth, 2);
    assert_eq!(cfg.thumbnail.passes, Some(4));
    assert_eq!(cfg.install_roots_for(Engine::Alias).len(), 2);
    assert!(cfg.install_roots_for(Engine::Vred).is_empty());
    assert!(cfg.security.reject_url_inputs);
}

#[test]
fn empty_converter_entry_is_left_out() {
    let raw = r#"
[converters]
alias = "bin/conv"
vred = ""
"#;
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    let table = cfg.converter_table();
    assert!(table.contains_key(&Engine::Alias));
    assert!(!table.contains_key(&Engine::Vred));
}
