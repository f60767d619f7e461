use clap::{value_parser, Arg, Command};
use weft_graph::OpRegistry;
use weft_panels::harness::{run_simulator, sample_registry, SimulatorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Command::new("weft-panels")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Weft panel pipeline simulator")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("simulate")
                .about("Open seeded random panels end to end and report")
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .default_value("500")
                        .value_parser(value_parser!(u64))
                        .help("Number of panels to open"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("chunk-size")
                        .long("chunk-size")
                        .default_value("4")
                        .value_parser(value_parser!(usize))
                        .help("Page size for chunked list queries"),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Print the sample registry and its op catalog"),
        );

    match cli.get_matches().subcommand() {
        Some(("simulate", matches)) => {
            let config = SimulatorConfig {
                iterations: *matches.get_one::<u64>("iterations").expect("defaulted"),
                seed: *matches.get_one::<u64>("seed").expect("defaulted"),
                chunk_size: *matches.get_one::<usize>("chunk-size").expect("defaulted"),
            };
            let report = run_simulator(&config).await?;

            println!("simulation complete in {}ms", report.elapsed_ms);
            println!("  resolved:          {}", report.stats.resolved);
            println!("  no panel:          {}", report.stats.no_panel);
            println!("  queries ok:        {}", report.stats.queries_succeeded);
            println!("  queries failed:    {}", report.stats.queries_failed);
            println!("  chunked lists:     {}", report.stats.chunked_lists);
            println!("  config commits:    {}", report.stats.config_commits);
            println!("  cached values:     {}", report.cache_entries);
        }
        Some(("report", _)) => {
            let registry = sample_registry()?;
            println!("panel registry ({} specs, registration order):", registry.len());
            for spec in registry.specs() {
                println!("  {}", spec.id());
            }
            let mut ops = OpRegistry::with_builtins();
            registry.register_ops(&mut ops)?;
            println!("op catalog ({} ops):", ops.len());
            for name in ops.names() {
                println!("  {name}");
            }
        }
        _ => unreachable!("arg_required_else_help"),
    }

    Ok(())
}
