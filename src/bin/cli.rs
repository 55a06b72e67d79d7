#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vitalwatch_ui_terminal::entrypoint().await
}
