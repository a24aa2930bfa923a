use clap::Parser;

use super::*;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["travelmap-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["travelmap-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn seed_path_is_optional() {
    let cli = Cli::try_parse_from(["travelmap-cli", "seed"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Seed { path: None })));

    let cli = Cli::try_parse_from(["travelmap-cli", "seed", "--path", "other.yaml"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Seed { path: Some(ref p) }) if p == std::path::Path::new("other.yaml")
    ));
}

#[test]
fn parses_collect_subcommands() {
    for (arg, expected) in [
        ("all", "All"),
        ("update", "Update"),
        ("process", "Process"),
    ] {
        let cli = Cli::try_parse_from(["travelmap-cli", "collect", arg]).unwrap();
        let Some(Commands::Collect { command }) = cli.command else {
            panic!("expected collect command for {arg}");
        };
        assert_eq!(format!("{command:?}"), expected);
    }
}

#[test]
fn collect_channel_takes_a_query() {
    let cli = Cli::try_parse_from(["travelmap-cli", "collect", "channel", "bbc travel"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Collect {
            command: CollectCommands::Channel { ref query }
        }) if query == "bbc travel"
    ));
}

#[test]
fn collect_requires_a_subcommand() {
    assert!(Cli::try_parse_from(["travelmap-cli", "collect"]).is_err());
}

#[test]
fn add_channel_with_name_and_gender() {
    let cli = Cli::try_parse_from([
        "travelmap-cli",
        "add-channel",
        "UCwandererwandererwander",
        "--name",
        "Wanderer",
        "--gender",
        "Female",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::AddChannel {
            ref query,
            name: Some(ref n),
            gender: Some(Gender::Female),
        }) if query == "UCwandererwandererwander" && n == "Wanderer"
    ));
}

#[test]
fn add_channel_rejects_unknown_gender() {
    let result = Cli::try_parse_from(["travelmap-cli", "add-channel", "q", "--gender", "robot"]);
    assert!(result.is_err());
}

#[test]
fn detect_accepts_home_override() {
    let cli = Cli::try_parse_from(["travelmap-cli", "detect", "도쿄 여행", "--home", "JP", "--json"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Detect { ref title, ref home, json: true }) if title == "도쿄 여행" && home == "JP"
    ));
}
