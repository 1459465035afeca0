use {
    clap::{App, AppSettings, Arg, SubCommand},
    hamt_bench::DEFAULT_KEY_PREFIX,
    solana_clap_utils::input_validators::{is_keypair, is_parsable, is_pubkey, is_url_or_moniker},
    solana_cli_config::CONFIG_FILE,
};

fn pubkey_arg<'a>(name: &'a str, help: &'a str) -> Arg<'a, 'a> {
    Arg::with_name(name)
        .index(1)
        .value_name("ADDRESS")
        .takes_value(true)
        .required(true)
        .validator(is_pubkey)
        .help(help)
}

pub fn get_clap_app<'a>(name: &str, about: &'a str, version: &'a str) -> App<'a, 'a> {
    App::new(name)
        .about(about)
        .version(version)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg({
            let arg = Arg::with_name("config_file")
                .short("C")
                .long("config")
                .value_name("FILEPATH")
                .takes_value(true)
                .global(true)
                .help("Configuration file to use");
            if let Some(ref config_file) = *CONFIG_FILE {
                arg.default_value(config_file)
            } else {
                arg
            }
        })
        .arg(
            Arg::with_name("json_rpc_url")
                .short("u")
                .long("url")
                .value_name("URL_OR_MONIKER")
                .takes_value(true)
                .global(true)
                .validator(is_url_or_moniker)
                .help(
                    "URL for the JSON RPC node or moniker (or their first letter): \
                     [mainnet-beta, testnet, devnet, localhost]",
                ),
        )
        .arg(
            Arg::with_name("keypair")
                .short("k")
                .long("keypair")
                .value_name("KEYPAIR")
                .takes_value(true)
                .global(true)
                .validator(is_keypair)
                .help("Keypair that signs and pays for operations"),
        )
        .arg(
            Arg::with_name("commitment")
                .long("commitment")
                .value_name("COMMITMENT_LEVEL")
                .takes_value(true)
                .global(true)
                .possible_values(&["processed", "confirmed", "finalized"])
                .hide_possible_values(true)
                .help("Commitment level for reads [possible values: processed, confirmed, finalized]"),
        )
        .arg(
            Arg::with_name("program_id")
                .long("program-id")
                .value_name("PROGRAM_ID")
                .takes_value(true)
                .global(true)
                .validator(is_pubkey)
                .help("Address of the trie program"),
        )
        .subcommand(
            SubCommand::with_name("init")
                .about("Create a new trie and print its state and root addresses"),
        )
        .subcommand(
            SubCommand::with_name("announce")
                .about("Publish a url together with the sha256 hash of some content")
                .arg(pubkey_arg("state", "State record of the trie"))
                .arg(
                    Arg::with_name("url")
                        .index(2)
                        .value_name("URL")
                        .takes_value(true)
                        .required(true)
                        .help("Url to announce"),
                )
                .arg(
                    Arg::with_name("content")
                        .index(3)
                        .value_name("CONTENT")
                        .takes_value(true)
                        .required(true)
                        .help("Content whose hash is announced with the url"),
                ),
        )
        .subcommand(
            SubCommand::with_name("announcement")
                .about("Print an announcement record")
                .arg(pubkey_arg("address", "Announcement record address")),
        )
        .subcommand(
            SubCommand::with_name("get")
                .about("Print the value stored under a key")
                .arg(pubkey_arg("state", "State record of the trie"))
                .arg(
                    Arg::with_name("key")
                        .index(2)
                        .value_name("KEY")
                        .takes_value(true)
                        .required(true)
                        .help("Key to look up"),
                ),
        )
        .subcommand(
            SubCommand::with_name("bench")
                .about("Set COUNT keys concurrently, report their cost and read them back")
                .arg(pubkey_arg("state", "State record of the trie"))
                .arg(
                    Arg::with_name("count")
                        .index(2)
                        .value_name("COUNT")
                        .takes_value(true)
                        .required(true)
                        .validator(is_parsable::<u64>)
                        .help("Number of keys to set"),
                )
                .arg(
                    Arg::with_name("max_batch_size")
                        .long("max-batch-size")
                        .value_name("N")
                        .takes_value(true)
                        .validator(is_parsable::<usize>)
                        .help("Ceiling for concurrent sets per batch [default: 64]"),
                )
                .arg(
                    Arg::with_name("max_retries")
                        .long("max-retries")
                        .value_name("N")
                        .takes_value(true)
                        .validator(is_parsable::<usize>)
                        .help("Give up after a key fails this many times [default: unlimited]"),
                )
                .arg(
                    Arg::with_name("retry_delay_ms")
                        .long("retry-delay-ms")
                        .value_name("MILLISECONDS")
                        .takes_value(true)
                        .validator(is_parsable::<u64>)
                        .help("Pause before each batch that carries retries [default: 0]"),
                )
                .arg(
                    Arg::with_name("key_prefix")
                        .long("key-prefix")
                        .value_name("PREFIX")
                        .takes_value(true)
                        .default_value(DEFAULT_KEY_PREFIX)
                        .help("Prefix of the generated keys"),
                ),
        )
}
