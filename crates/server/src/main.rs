#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chat_server::run().await
}
