//! Tests for publisher CLI parsing.

use super::*;
use clap::CommandFactory;
use rstest::rstest;

#[test]
fn cli_parses_publish_with_defaults() {
    let cli = Cli::parse_from(["gallery-publisher", "publish"]);
    assert_eq!(cli.command, Command::Publish);
    assert_eq!(cli.options, GlobalArgs::default());
    assert_eq!(cli.options.overrides(), ConfigOverrides::default());
}

#[rstest]
#[case::build("build", Command::Build)]
#[case::manifest("manifest", Command::Manifest)]
#[case::environments("environments", Command::Environments)]
#[case::extract("extract", Command::Extract(ExtractArgs::default()))]
fn cli_parses_each_stage(#[case] name: &str, #[case] expected: Command) {
    let cli = Cli::parse_from(["gallery-publisher", name]);
    assert_eq!(cli.command, expected);
}

#[test]
fn cli_parses_extract_archives() {
    let cli = Cli::parse_from(["gallery-publisher", "extract", "a.zip", "b.zip"]);
    let Command::Extract(args) = cli.command else {
        panic!("expected Extract command");
    };
    assert_eq!(
        args.archives,
        [Utf8PathBuf::from("a.zip"), Utf8PathBuf::from("b.zip")]
    );
}

#[test]
fn global_options_are_accepted_after_the_subcommand() {
    let cli = Cli::parse_from([
        "gallery-publisher",
        "publish",
        "-i",
        "packages",
        "--output-dir",
        "/tmp/out",
        "--baseline",
        "live.json",
        "--whitelist",
        "whitelist.json",
        "--env-tool",
        "/opt/rcc",
        "--no-env-hash",
    ]);

    let overrides = cli.options.overrides();

    assert_eq!(overrides.input_dir, Some(Utf8PathBuf::from("packages")));
    assert_eq!(overrides.output_dir, Some(Utf8PathBuf::from("/tmp/out")));
    assert_eq!(overrides.baseline_manifest, Some(Utf8PathBuf::from("live.json")));
    assert_eq!(overrides.whitelist, Some(Utf8PathBuf::from("whitelist.json")));
    assert_eq!(overrides.env_tool.as_deref(), Some("/opt/rcc"));
    assert!(overrides.no_env_hash);
}

#[rstest]
#[case::default(&["gallery-publisher", "build"], "info")]
#[case::verbose(&["gallery-publisher", "build", "-v"], "debug")]
#[case::very_verbose(&["gallery-publisher", "-vv", "build"], "trace")]
#[case::quiet(&["gallery-publisher", "build", "--quiet"], "warn")]
fn log_level_follows_flags(#[case] args: &[&str], #[case] expected: &str) {
    let cli = Cli::parse_from(args);
    assert_eq!(cli.options.log_level(), expected);
}

#[test]
fn cli_rejects_verbose_with_quiet() {
    Cli::try_parse_from(["gallery-publisher", "build", "-v", "-q"])
        .expect_err("expected clap to reject conflicting flags");
}

#[test]
fn cli_requires_a_subcommand() {
    Cli::try_parse_from(["gallery-publisher"]).expect_err("expected a missing subcommand error");
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}
