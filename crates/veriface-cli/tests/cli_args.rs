use std::path::PathBuf;

use clap::Parser;

use veriface_cli::cli::{Cli, Commands, OutputMode};
use veriface_cli::engine::EngineSettings;
use veriface_config::ResolvedConfig;

#[test]
fn verify_args_parse_with_repeatable_backends() {
    let cli = Cli::try_parse_from([
        "veriface",
        "verify",
        "alice",
        "probe.jpg",
        "--backend",
        "cnn",
        "--backend",
        "hog",
        "--threshold",
        "0.5",
        "--no-cache",
    ])
    .unwrap();

    match cli.command {
        Commands::Verify(args) => {
            assert_eq!(args.user, "alice");
            assert_eq!(args.image, PathBuf::from("probe.jpg"));
            assert_eq!(args.backends, vec!["cnn".to_string(), "hog".to_string()]);
            assert_eq!(args.threshold, Some(0.5));
            assert!(args.no_cache);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn register_args_parse_with_precompute() {
    let cli = Cli::try_parse_from([
        "veriface",
        "--json",
        "register",
        "bob",
        "photo.png",
        "--precompute",
        "--users-dir",
        "/tmp/users",
    ])
    .unwrap();

    assert!(matches!(cli.output_mode(), OutputMode::Json));
    match cli.command {
        Commands::Register(args) => {
            assert_eq!(args.user, "bob");
            assert!(args.precompute);
            assert_eq!(args.users_dir, Some(PathBuf::from("/tmp/users")));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["veriface"]).is_err());
}

#[test]
fn flag_overrides_win_over_config_values() {
    let mut settings = EngineSettings::from_resolved(ResolvedConfig::default());
    settings.apply_overrides(
        Some(PathBuf::from("/srv/faces")),
        Some("ArcFace".into()),
        &["cnn".to_string()],
        None,
        None,
    );

    assert_eq!(settings.users_dir, PathBuf::from("/srv/faces"));
    assert_eq!(settings.model_name, "ArcFace");
    assert_eq!(settings.backends, vec!["cnn".to_string()]);
}

#[test]
fn empty_backend_list_keeps_configured_backends() {
    let mut settings = EngineSettings::from_resolved(ResolvedConfig::default());
    let configured = settings.backends.clone();
    settings.apply_overrides(None, None, &[], None, None);
    assert_eq!(settings.backends, configured);
}

#[cfg(not(feature = "dlib"))]
#[test]
fn extractor_is_unavailable_without_the_dlib_feature() {
    use veriface_cli::engine::build_extractor;
    use veriface_cli::errors::CliError;

    let settings = EngineSettings::from_resolved(ResolvedConfig::default());
    assert!(matches!(
        build_extractor(&settings),
        Err(CliError::ExtractorUnavailable)
    ));
}
