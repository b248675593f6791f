use scrape_engine::mcp::stdio;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    // A client may probe stdio servers with `--version`/`--help` before
    // starting the JSON-RPC transport; answer those directly so host
    // compatibility detection doesn't cancel the session.
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("scrape-engine-mcp (stdio JSON-RPC server); usage: scrape-engine-mcp [--version|--help]");
        return Ok(());
    }

    stdio::run().await
}
