#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    menuprobe_cli::cli::run().await
}
