// notekeep - store inspection entry point
// Opens the store, reports collection counts, exits.

use notekeep::database::Repository;
use notekeep::persistence::PersistenceController;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notekeep=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("NOTEKEEP_DATA_DIR").ok())
        .unwrap_or_else(|| "notekeep-data".to_string());

    tracing::info!("Opening store at: {}", data_dir);

    let controller = PersistenceController::open(&data_dir).await?;
    let repo = Repository::new(controller.pool().await);

    let notes = repo.list_notes().await?;
    let checklists = repo.list_checklists().await?;
    let folders = repo.list_folders().await?;
    let tags = repo.list_tags().await?;

    tracing::info!(
        "Store contains {} note(s), {} checklist(s), {} folder(s), {} tag(s)",
        notes.len(),
        checklists.len(),
        folders.len(),
        tags.len()
    );

    controller.close().await;

    Ok(())
}
