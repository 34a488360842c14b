use std::net::SocketAddr;
use std::time::Duration;

use rpcbench_testserver::{BenchServer, ServerBehavior};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut behavior = ServerBehavior::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:0")
                })?;
                bind_addr = addr.parse()?;
            }
            "--delay-ms" => {
                let ms = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--delay-ms requires a number"))?;
                behavior.delay = Duration::from_millis(ms.parse()?);
            }
            "-h" | "--help" => {
                eprintln!(
                    "rpcbench-testserver\n\nUSAGE:\n  rpcbench-testserver [--bind 127.0.0.1:0] [--delay-ms 0]\n\nOUTPUT:\n  Prints GRPC_URL=<host:port> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let server = BenchServer::start_with(bind_addr, behavior).await?;
    println!("GRPC_URL={}", server.target());

    tokio::signal::ctrl_c().await?;

    eprintln!("served {} requests", server.stats().requests_total());
    server.shutdown().await;
    Ok(())
}
