//! Packaging with a plugin root given relative to the working directory.
//!
//! Kept in its own test binary because it changes the process's current
//! directory.


use std::env;
use std::fs;
use std::path::Path;
use test_utils::TestPlugin;
use unrealpack::{PackConfig, Packager};

#[test]
fn test_relative_root_stages_and_writes_next_to_plugin() {
    let plugin = TestPlugin::new();
    let mut config = PackConfig::default();
    config.target_versions = vec!["5.0.0".to_string()];

    let previous = env::current_dir().unwrap();
    env::set_current_dir(&plugin.source).unwrap();
    let result = Packager::new(config).run(Path::new("."));
    env::set_current_dir(previous).unwrap();

    let report = result.unwrap();
    assert_eq!(
        report.archives[0].path,
        plugin.archive_path("Pubnub-1.2.3-ue5.0.0.zip")
    );
    assert_eq!(plugin.archives(), vec!["Pubnub-1.2.3-ue5.0.0.zip"]);

    // Nothing was written into the plugin source
    let mut listing: Vec<String> = fs::read_dir(&plugin.source)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    listing.sort();
    assert_eq!(listing, vec!["PubnubLibrary.uplugin", "Source"]);
}
