use engine::{FileStore, Tracker};

mod settings;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "barcontrol={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    tracing::info!("Opening store at {}...", settings.storage.path);
    let store = match FileStore::open(&settings.storage.path, settings.storage.quota_bytes) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!("failed to open store: {err}");
            return Err(err.into());
        }
    };

    let tracker = Tracker::init(store, settings.engine);
    let status = tracker.budget_status();
    tracing::info!(
        "{} items on the tab, total {} of {} ({}, {}%)",
        tracker.ledger().len(),
        tracker.ledger().total(),
        tracker.budget().limit,
        status.tier.label(),
        status.progress_percent
    );
    if status.alert {
        tracing::warn!("budget limit reached");
    }
    if let Some(location) = &tracker.budget().location {
        tracing::info!("location: {location}");
    }
    tracing::info!("{} sessions in history", tracker.history().len());

    Ok(())
}
