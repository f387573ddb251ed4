#[tokio::main]
async fn main() -> std::io::Result<()> {
    match_server::run_with_config().await
}
