use {
    crate::vaults::Family,
    alloy::primitives::Address,
    std::{
        fmt::{self, Display, Formatter},
        net::SocketAddr,
        path::PathBuf,
        time::Duration,
    },
    tracing::level_filters::LevelFilter,
    url::Url,
};

#[derive(clap::Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: LoggingArguments,

    /// The Ethereum node URL to connect to.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub node_url: Url,

    /// The account whose positions are aggregated.
    #[clap(long, env)]
    pub account: Option<Address>,

    /// TOML file with the per chain vault registries and subgraph endpoints.
    #[clap(long, env, default_value = "config/registry.toml")]
    pub registry: PathBuf,

    /// Token list used to resolve vault tokens. Tokens stay unresolved
    /// without one.
    #[clap(long, env)]
    pub token_list_url: Option<Url>,

    /// Time between two aggregation runs.
    #[clap(long, env, default_value = "30s", value_parser = humantime::parse_duration)]
    pub poll_interval: Duration,

    /// How long off-chain registry lookups are reused before they are
    /// fetched again.
    #[clap(long, env, default_value = "5m", value_parser = humantime::parse_duration)]
    pub registry_refresh_interval: Duration,

    /// Default timeout for http requests.
    #[clap(long, env, default_value = "10s", value_parser = humantime::parse_duration)]
    pub http_timeout: Duration,

    /// Vault families to aggregate, comma separated.
    #[clap(
        long,
        env,
        default_value = "unipilot,gamma,defiedge,steer,ichi",
        value_delimiter = ','
    )]
    pub vault_families: Vec<Family>,

    /// Exclude positions without liquidity from the position count.
    #[clap(long, env)]
    pub hide_closed: bool,

    /// Exclude positions deposited in a farming center from the position
    /// count.
    #[clap(long, env)]
    pub hide_farming: bool,

    #[clap(long, env, default_value = "0.0.0.0:9586")]
    pub metrics_address: SocketAddr,
}

#[derive(clap::Parser)]
pub struct LoggingArguments {
    #[clap(long, env, default_value = "warn,positions=debug,observe=info")]
    pub log_filter: String,

    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: LevelFilter,
}

impl Display for LoggingArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        Ok(())
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            node_url: _,
            account,
            registry,
            token_list_url,
            poll_interval,
            registry_refresh_interval,
            http_timeout,
            vault_families,
            hide_closed,
            hide_farming,
            metrics_address,
        } = self;

        write!(f, "{logging}")?;
        writeln!(f, "node_url: SECRET")?;
        writeln!(f, "account: {account:?}")?;
        writeln!(f, "registry: {}", registry.display())?;
        writeln!(f, "token_list_url: {token_list_url:?}")?;
        writeln!(f, "poll_interval: {poll_interval:?}")?;
        writeln!(f, "registry_refresh_interval: {registry_refresh_interval:?}")?;
        writeln!(f, "http_timeout: {http_timeout:?}")?;
        writeln!(
            f,
            "vault_families: {}",
            vault_families
                .iter()
                .map(Family::as_str)
                .collect::<Vec<_>>()
                .join(",")
        )?;
        writeln!(f, "hide_closed: {hide_closed}")?;
        writeln!(f, "hide_farming: {hide_farming}")?;
        writeln!(f, "metrics_address: {metrics_address}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, clap::Parser};

    #[test]
    fn parses_defaults() {
        let args = Arguments::try_parse_from(["positions"]).unwrap();
        assert_eq!(args.poll_interval, Duration::from_secs(30));
        assert_eq!(args.registry_refresh_interval, Duration::from_secs(300));
        assert_eq!(args.vault_families.len(), 5);
        assert!(!args.hide_closed);
        assert_eq!(args.logging.log_stderr_threshold, LevelFilter::ERROR);
    }

    #[test]
    fn parses_families_and_account() {
        let args = Arguments::try_parse_from([
            "positions",
            "--account",
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "--vault-families",
            "gamma,ichi",
            "--hide-farming",
        ])
        .unwrap();
        assert_eq!(args.account, Some(Address::repeat_byte(0xaa)));
        assert_eq!(args.vault_families, vec![Family::Gamma, Family::Ichi]);
        assert!(args.hide_farming);
        assert!(!args.to_string().contains("localhost"));
    }
}
