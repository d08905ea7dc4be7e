#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = picrete_exam_runner::run().await {
        eprintln!("picrete-exam-runner fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
