use {
    crate::{
        arguments::Arguments,
        infra::{Onchain, SubgraphDirectory, SubgraphFarmDiscovery},
        pipeline::{Pipeline, Snapshot, Sources, ViewOptions},
        registry::{PolledDirectory, Registry},
        tokens::TokenList,
    },
    alloy::providers::Provider as _,
    clap::Parser,
    std::sync::Arc,
};

pub async fn start(args: impl Iterator<Item = String>) {
    let args = Arguments::parse_from(args);
    observe::tracing::initialize(
        &args.logging.log_filter,
        args.logging.log_stderr_threshold,
    );
    tracing::info!("running position aggregator with validated arguments:\n{}", args);
    observe::metrics::setup_registry(Some("dashboard".into()), None);
    run(args).await;
}

/// Aggregates the positions of the configured account on every poll until a
/// shutdown signal arrives.
///
/// # Panics
///
/// Panics if the node, the registry file or the subgraph endpoints are
/// unusable.
pub async fn run(args: Arguments) {
    let metrics = observe::metrics::serve_metrics(args.metrics_address);

    let onchain = Onchain::connect(args.node_url.clone());
    let chain_id = onchain
        .provider()
        .get_chain_id()
        .await
        .expect("failed to fetch chain id");
    let registry = Registry::load(&args.registry)
        .await
        .unwrap_or_else(|err| panic!("failed to load registry: {err}"));
    let chain = registry.chain(chain_id);
    tracing::info!(
        chain_id,
        position_manager = ?chain.position_manager(),
        alternate_position_manager = ?chain.alternate_position_manager(),
        "loaded chain registry"
    );

    let client = reqwest::Client::builder()
        .timeout(args.http_timeout)
        .build()
        .expect("failed to build http client");
    let tokens = match &args.token_list_url {
        Some(url) => TokenList::from_url(url.clone(), chain_id, client.clone())
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(?err, "failed to load token list, tokens stay unresolved");
                TokenList::default()
            }),
        None => TokenList::default(),
    };
    let directory = SubgraphDirectory::new([&chain], client.clone())
        .expect("invalid off-chain registry endpoint");
    let farms = SubgraphFarmDiscovery::new(&chain, client).expect("invalid farming subgraph");
    let onchain = Arc::new(onchain);

    let mut pipeline = Pipeline::new(Sources {
        chain,
        managers: onchain.clone(),
        vaults: onchain,
        directory: Arc::new(PolledDirectory::new(
            Arc::new(directory),
            args.registry_refresh_interval,
        )),
        farms: Arc::new(farms),
        tokens: Arc::new(tokens),
    });
    let options = ViewOptions {
        hide_closed: args.hide_closed,
        hide_farming: args.hide_farming,
    };

    let mut polls = 0_u64;
    let poll = async {
        loop {
            polls += 1;
            let snapshot = pipeline
                .snapshot(args.account, options, &args.vault_families)
                .await;
            report(&snapshot);
            tokio::time::sleep(args.poll_interval).await;
        }
    };
    tokio::select! {
        _ = poll => {}
        signal = observe::shutdown::wait_for_signal() => {
            tracing::info!(%signal, "shutdown requested");
        }
    }
    tracing::info!(polls, "stopped position aggregator");
    metrics.abort();
}

fn report(snapshot: &Snapshot) {
    tracing::info!(
        positions = snapshot.positions.len(),
        alternate = snapshot.alternate.len(),
        count = snapshot.count.count,
        loading = snapshot.count.loading,
        "positions"
    );
    for (family, vaults) in &snapshot.vaults {
        tracing::info!(
            %family,
            count = vaults.positions.len(),
            loading = vaults.loading,
            "vault positions"
        );
        for vault in &vaults.positions {
            tracing::debug!(
                %family,
                address = ?vault.address,
                share = %vault.share,
                farming = vault.is_farming(),
                strategy_id = ?vault.strategy_id,
                "vault position"
            );
        }
    }
}
