use dotenv::dotenv;
use log::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let port = mcp_inotes::mcp_port();
    info!("starting mcp-inotes server on port {}", port);

    mcp_inotes::mcp::serve(port).await
}
