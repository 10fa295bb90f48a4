use tokio::io::{AsyncWriteExt, BufReader};

use transclude_core::{Engine, TransclusionConfig};

/// Minimal demo driver: reads a document from stdin, resolves `![[...]]`
/// references against the current directory, and writes the expanded
/// document to stdout.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("transclude-core starting");

    let config = TransclusionConfig::new();
    let mut engine = Engine::new(config);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    engine.process_document(stdin, &mut stdout, None).await?;
    stdout.flush().await?;

    for error in engine.errors() {
        tracing::warn!(code = %error.code, path = %error.path, "{}", error.message);
    }

    tracing::info!(
        processed_files = engine.processed_files().len(),
        errors = engine.errors().len(),
        "transclude-core finished"
    );

    if engine.config().strict && !engine.errors().is_empty() {
        anyhow::bail!(
            "{} transclusion error(s) recorded in strict mode",
            engine.errors().len()
        );
    }

    Ok(())
}
