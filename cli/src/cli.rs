use {
    clap::ArgMatches,
    hamt_bench::{run_bench, verify, BenchConfig, BenchReport, DEFAULT_MAX_BATCH_SIZE},
    hamt_client::{
        rpc_gateway::RpcGateway, traversal, Gateway, HamtClient, HamtConfig, HamtError,
        OperationOutcome,
    },
    log::*,
    solana_clap_utils::input_parsers::{pubkey_of, value_of},
    solana_cli_config::{Config, ConfigInput},
    solana_sdk::{
        commitment_config::CommitmentConfig, hash::hashv, pubkey::Pubkey,
        signature::read_keypair_file,
    },
    std::time::Duration,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("bad parameter: {0}")]
    BadParameter(String),
    #[error("failed to read keypair {path}: {reason}")]
    KeypairFile { path: String, reason: String },
    #[error("key {0:?} not found")]
    KeyNotFound(String),
    #[error(transparent)]
    Hamt(#[from] HamtError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CliCommand {
    Init,
    Announce {
        state: Pubkey,
        url: String,
        content: String,
    },
    Announcement {
        address: Pubkey,
    },
    Get {
        state: Pubkey,
        key: String,
    },
    Bench {
        state: Pubkey,
        count: u64,
        max_batch_size: usize,
        max_retries: Option<usize>,
        retry_delay: Duration,
        key_prefix: String,
    },
}

#[derive(Debug, PartialEq)]
pub struct CliConfig {
    pub json_rpc_url: String,
    pub keypair_path: String,
    pub commitment: CommitmentConfig,
    pub program_id: Option<Pubkey>,
}

impl CliConfig {
    /// Resolves settings from the command line, falling back to the config
    /// file and then to the built in defaults.
    pub fn from_matches(matches: &ArgMatches<'_>) -> Self {
        let config = matches
            .value_of("config_file")
            .map(|config_file| Config::load(config_file).unwrap_or_default())
            .unwrap_or_default();

        let (_, json_rpc_url) = ConfigInput::compute_json_rpc_url_setting(
            matches.value_of("json_rpc_url").unwrap_or(""),
            &config.json_rpc_url,
        );
        let (_, keypair_path) = ConfigInput::compute_keypair_path_setting(
            matches.value_of("keypair").unwrap_or(""),
            &config.keypair_path,
        );
        let (_, commitment) = ConfigInput::compute_commitment_config(
            matches.value_of("commitment").unwrap_or(""),
            &config.commitment,
        );

        Self {
            json_rpc_url,
            keypair_path,
            commitment,
            program_id: pubkey_of(matches, "program_id"),
        }
    }

    fn hamt_config(&self) -> Result<HamtConfig, CliError> {
        let program_id = self
            .program_id
            .ok_or_else(|| CliError::BadParameter("--program-id is required".to_string()))?;
        let payer =
            read_keypair_file(&self.keypair_path).map_err(|err| CliError::KeypairFile {
                path: self.keypair_path.clone(),
                reason: err.to_string(),
            })?;
        Ok(HamtConfig::new(program_id, payer))
    }

    fn gateway(&self) -> RpcGateway {
        RpcGateway::new(self.json_rpc_url.clone(), self.commitment)
    }
}

fn required_pubkey(matches: &ArgMatches<'_>, name: &str) -> Result<Pubkey, CliError> {
    pubkey_of(matches, name).ok_or_else(|| CliError::BadParameter(format!("invalid {name}")))
}

fn required_value(matches: &ArgMatches<'_>, name: &str) -> Result<String, CliError> {
    matches
        .value_of(name)
        .map(str::to_string)
        .ok_or_else(|| CliError::BadParameter(format!("missing {name}")))
}

pub fn parse_command(matches: &ArgMatches<'_>) -> Result<CliCommand, CliError> {
    let command = match matches.subcommand() {
        ("init", Some(_)) => CliCommand::Init,
        ("announce", Some(matches)) => CliCommand::Announce {
            state: required_pubkey(matches, "state")?,
            url: required_value(matches, "url")?,
            content: required_value(matches, "content")?,
        },
        ("announcement", Some(matches)) => CliCommand::Announcement {
            address: required_pubkey(matches, "address")?,
        },
        ("get", Some(matches)) => CliCommand::Get {
            state: required_pubkey(matches, "state")?,
            key: required_value(matches, "key")?,
        },
        ("bench", Some(matches)) => CliCommand::Bench {
            state: required_pubkey(matches, "state")?,
            count: value_of(matches, "count")
                .ok_or_else(|| CliError::BadParameter("invalid count".to_string()))?,
            max_batch_size: value_of(matches, "max_batch_size").unwrap_or(DEFAULT_MAX_BATCH_SIZE),
            max_retries: value_of(matches, "max_retries"),
            retry_delay: Duration::from_millis(value_of(matches, "retry_delay_ms").unwrap_or(0)),
            key_prefix: required_value(matches, "key_prefix")?,
        },
        (command, _) => {
            return Err(CliError::BadParameter(format!(
                "unknown subcommand {command:?}"
            )))
        }
    };
    Ok(command)
}

fn print_outcome(outcome: &OperationOutcome) {
    println!(
        "Fee: {} lamports, rent: {} lamports, {} compute units, {} ms",
        outcome.fee, outcome.rent, outcome.compute_units, outcome.elapsed_ms
    );
}

fn print_report(report: &BenchReport) {
    println!(
        "Sets: {} in {} batches, {} retries, {} collision nodes",
        report.latency_ms.count, report.iterations, report.retries, report.new_records
    );
    println!("Latency (ms): {}", report.latency_ms);
    println!("Fee (lamports): {}", report.fee);
    println!("Rent (lamports): {}", report.rent);
    println!("Compute units: {}", report.compute_units);
}

/// Runs `command` against the node named by `config`.
pub async fn process_command(config: &CliConfig, command: CliCommand) -> Result<(), CliError> {
    debug!("{command:?} against {}", config.json_rpc_url);
    run_command(config.gateway(), || config.hamt_config(), command).await
}

/// Runs `command` against `gateway`. `hamt_config` is only loaded by
/// commands that sign.
pub async fn run_command<G, F>(
    gateway: G,
    hamt_config: F,
    command: CliCommand,
) -> Result<(), CliError>
where
    G: Gateway,
    F: FnOnce() -> Result<HamtConfig, CliError>,
{
    match command {
        CliCommand::Init => {
            let client = HamtClient::new(gateway, hamt_config()?);
            let outcome = client.init().await?;
            println!("State: {}", outcome.state);
            println!("Root: {}", outcome.root);
            print_outcome(&outcome.outcome);
        }
        CliCommand::Announce {
            state,
            url,
            content,
        } => {
            let client = HamtClient::new(gateway, hamt_config()?);
            let hash = hashv(&[content.as_bytes()]);
            let outcome = client.announce(&state, &url, &hash).await?;
            println!("Announcement: {}", outcome.announcement);
            println!("Hash: {hash}");
            print_outcome(&outcome.outcome);
        }
        CliCommand::Announcement { address } => {
            let announcement = traversal::read_announcement(&gateway, &address).await?;
            println!("Url: {}", announcement.url);
            println!("Hash: {}", announcement.hash);
            println!("Next: {}", announcement.next);
        }
        CliCommand::Get { state, key } => {
            let lookup = traversal::get(&gateway, &state, &key).await?;
            match lookup.value {
                Some(value) => println!("{value}"),
                None => return Err(CliError::KeyNotFound(key)),
            }
        }
        CliCommand::Bench {
            state,
            count,
            max_batch_size,
            max_retries,
            retry_delay,
            key_prefix,
        } => {
            let client = HamtClient::new(gateway, hamt_config()?);
            let bench_config = BenchConfig {
                count,
                key_prefix,
                max_batch_size,
                max_retries,
                retry_delay,
            };
            let report = run_bench(&client, &state, &bench_config).await?;
            report.log_summary();
            print_report(&report);
            verify(&client, &state, &bench_config).await?;
            println!("Verified {count} keys");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::clap_app::get_clap_app,
        assert_matches::assert_matches,
        hamt_client::{
            mock_gateway::MockGateway,
            state::{encode_node, encode_state, hash_key, slot_index, Node, Slot, StateHeader},
        },
        solana_sdk::{commitment_config::CommitmentLevel, signature::Keypair},
        test_case::test_case,
    };

    // A trie holding only "answer" = 42, with its state record.
    fn seeded_gateway() -> (MockGateway, Pubkey) {
        let gateway = MockGateway::new(Pubkey::new_unique());
        let state = Pubkey::new_unique();
        let root = Pubkey::new_unique();
        let digest = hash_key("answer");
        let mut node = Node::default();
        node.slots[slot_index(&digest, 0).unwrap()] = Slot {
            value: 42,
            key_hash: digest,
            link: Pubkey::default(),
        };
        gateway.insert_record(root, encode_node(&node).unwrap());
        gateway.insert_record(
            state,
            encode_state(&StateHeader {
                initialized: true,
                root,
                announcement_count: 0,
            })
            .unwrap(),
        );
        (gateway, state)
    }

    fn no_signer() -> Result<HamtConfig, CliError> {
        Err(CliError::BadParameter("no signer".to_string()))
    }

    fn parse(args: &[&str]) -> CliCommand {
        let app = get_clap_app("hamt", "test", "0.1.0");
        let matches = app.get_matches_from(std::iter::once("hamt").chain(args.iter().copied()));
        parse_command(&matches).unwrap()
    }

    #[test]
    fn test_parse_init() {
        assert_eq!(parse(&["init"]), CliCommand::Init);
    }

    #[test]
    fn test_parse_announce() {
        let state = Pubkey::new_unique();
        assert_eq!(
            parse(&[
                "announce",
                state.to_string().as_str(),
                "https://example.com/",
                "hello"
            ]),
            CliCommand::Announce {
                state,
                url: "https://example.com/".to_string(),
                content: "hello".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_get() {
        let state = Pubkey::new_unique();
        assert_eq!(
            parse(&["get", state.to_string().as_str(), "test7"]),
            CliCommand::Get {
                state,
                key: "test7".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_bench_defaults() {
        let state = Pubkey::new_unique();
        assert_eq!(
            parse(&["bench", state.to_string().as_str(), "100"]),
            CliCommand::Bench {
                state,
                count: 100,
                max_batch_size: DEFAULT_MAX_BATCH_SIZE,
                max_retries: None,
                retry_delay: Duration::ZERO,
                key_prefix: "test".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_bench_options() {
        let state = Pubkey::new_unique();
        assert_eq!(
            parse(&[
                "bench",
                state.to_string().as_str(),
                "10",
                "--max-batch-size",
                "8",
                "--max-retries",
                "3",
                "--retry-delay-ms",
                "250",
                "--key-prefix",
                "load",
            ]),
            CliCommand::Bench {
                state,
                count: 10,
                max_batch_size: 8,
                max_retries: Some(3),
                retry_delay: Duration::from_millis(250),
                key_prefix: "load".to_string(),
            }
        );
    }

    #[test_case(&["get", "not-a-pubkey", "key"]; "bad state address")]
    #[test_case(&["bench", "11111111111111111111111111111111", "many"]; "bad count")]
    #[test_case(&["get", "11111111111111111111111111111111"]; "missing key")]
    #[test_case(&[]; "missing subcommand")]
    #[test_case(&["--commitment", "eventually", "init"]; "unknown commitment")]
    fn test_parse_rejects(args: &[&str]) {
        let app = get_clap_app("hamt", "test", "0.1.0");
        assert!(app
            .get_matches_from_safe(std::iter::once("hamt").chain(args.iter().copied()))
            .is_err());
    }

    #[test]
    fn test_config_overrides() {
        let program_id = Pubkey::new_unique();
        let app = get_clap_app("hamt", "test", "0.1.0");
        let matches = app.get_matches_from(vec![
            "hamt",
            "--config",
            "/nonexistent/hamt-config.yml",
            "--url",
            "http://127.0.0.1:8899",
            "--commitment",
            "finalized",
            "--program-id",
            program_id.to_string().as_str(),
            "init",
        ]);

        let config = CliConfig::from_matches(&matches);
        assert_eq!(config.json_rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.commitment.commitment, CommitmentLevel::Finalized);
        assert_eq!(config.program_id, Some(program_id));
    }

    #[test]
    fn test_missing_program_id() {
        let app = get_clap_app("hamt", "test", "0.1.0");
        let matches = app.get_matches_from(vec![
            "hamt",
            "--config",
            "/nonexistent/hamt-config.yml",
            "init",
        ]);

        let config = CliConfig::from_matches(&matches);
        assert_matches!(config.hamt_config().err(), Some(CliError::BadParameter(_)));
    }

    #[tokio::test]
    async fn test_get_hit() {
        let (gateway, state) = seeded_gateway();
        let command = CliCommand::Get {
            state,
            key: "answer".to_string(),
        };
        run_command(gateway, no_signer, command).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_miss() {
        let (gateway, state) = seeded_gateway();
        let command = CliCommand::Get {
            state,
            key: "question".to_string(),
        };
        assert_matches!(
            run_command(gateway, no_signer, command).await,
            Err(CliError::KeyNotFound(key)) if key == "question"
        );
    }

    #[tokio::test]
    async fn test_get_uninitialized_state() {
        let (gateway, _state) = seeded_gateway();
        let missing = Pubkey::new_unique();
        let command = CliCommand::Get {
            state: missing,
            key: "answer".to_string(),
        };
        assert_matches!(
            run_command(gateway, no_signer, command).await,
            Err(CliError::Hamt(HamtError::RecordNotFound(address))) if address == missing
        );
    }

    #[tokio::test]
    async fn test_signing_command_loads_config() {
        let (gateway, state) = seeded_gateway();
        let program_id = *gateway.program_id();
        let command = CliCommand::Bench {
            state,
            count: 4,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_retries: None,
            retry_delay: Duration::ZERO,
            key_prefix: "test".to_string(),
        };
        assert_matches!(
            run_command(MockGateway::new(program_id), no_signer, command.clone()).await,
            Err(CliError::BadParameter(_))
        );

        let hamt_config =
            || Ok::<_, CliError>(HamtConfig::new(program_id, Keypair::new()));
        run_command(gateway, hamt_config, command).await.unwrap();
    }

    #[tokio::test]
    async fn test_init() {
        let gateway = MockGateway::new(Pubkey::new_unique());
        let program_id = *gateway.program_id();
        let hamt_config =
            || Ok::<_, CliError>(HamtConfig::new(program_id, Keypair::new()));
        run_command(gateway, hamt_config, CliCommand::Init)
            .await
            .unwrap();
    }
}
