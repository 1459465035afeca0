use {
    clap::{crate_description, crate_name, crate_version},
    hamt_cli::{
        clap_app::get_clap_app,
        cli::{parse_command, process_command, CliConfig},
    },
    std::process::exit,
};

#[tokio::main]
async fn main() {
    solana_logger::setup_with_default("hamt_cli=info,hamt_client=info,hamt_bench=info");
    let matches = get_clap_app(crate_name!(), crate_description!(), crate_version!()).get_matches();

    let config = CliConfig::from_matches(&matches);
    let result = match parse_command(&matches) {
        Ok(command) => process_command(&config, command).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        eprintln!("Error: {err}");
        exit(1);
    }
}
