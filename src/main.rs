#[tokio::main]
async fn main() -> anyhow::Result<()> {
    roleplay_api::cli::run_with_sys_args().await
}
