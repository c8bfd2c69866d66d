//! CLI command definitions using `clap`

use clap::{value_parser, Arg, ArgAction, Command as ClapCommand};

pub fn after_help_text(examples: &[&str]) -> String {
    let mut text = String::from("EXAMPLES:\n");
    for example in examples {
        text.push_str("  ");
        text.push_str(example);
        text.push('\n');
    }
    text
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

pub fn cmd_resolve() -> ClapCommand {
    ClapCommand::new("resolve")
        .about("Discover the client location and report it")
        .long_about(
            "Builds a session context, asks the configured location provider until the \
             location is Ready or the deadline passes, then prints the snapshot.\n\n\
             Exit status is 0 when the location is Ready and 3 otherwise.",
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .value_parser(value_parser!(std::path::PathBuf))
                .help("Path to a TOML configuration file"),
        )
        .arg(
            Arg::new("ip")
                .long("ip")
                .value_name("IP")
                .help("Client IP sent to the location service (overrides bind_ip)"),
        )
        .arg(
            Arg::new("timeout-ms")
                .long("timeout-ms")
                .value_name("MS")
                .value_parser(value_parser!(u64))
                .help("How long to wait for the location (overrides location.wait_ready_ms)"),
        )
        .arg(json_arg())
        .after_help(after_help_text(&[
            "locus resolve                            Resolve with defaults and LOCUS_* env",
            "locus resolve -c locus.toml --json       Resolve using a config file, JSON output",
            "locus resolve --ip 10.0.0.7 --timeout-ms 2000",
        ]))
}

pub fn cmd_identity() -> ClapCommand {
    ClapCommand::new("identity")
        .about("Print the identity this client would report")
        .arg(json_arg())
        .after_help(after_help_text(&[
            "locus identity                           Human-readable identity",
            "POD_NAME=web-0 locus identity --json     Identity inside a pod",
        ]))
}

pub fn build_cli() -> ClapCommand {
    ClapCommand::new("locus")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Locus Contributors")
        .about("Locus - resolve and report the location of a service-discovery client")
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .subcommand(cmd_resolve())
        .subcommand(cmd_identity())
}
