mod app;

use anyhow::Context;
use app::ReviewApp;
use chrono::Local;
use review_scheduler::config::Settings;
use review_scheduler::database::db::{self, SqliteStore};
use review_scheduler::{CatalogCard, LevelCap, Scheduler, ThemeSnapshot};
use std::path::Path;
use tracing::info;

fn sample_theme() -> ThemeSnapshot {
    let cards = [("cześć", "hello"), ("dziękuję", "thank you"), ("proszę", "please")]
        .into_iter()
        .zip(1..)
        .map(|((front, back), id)| CatalogCard {
            id,
            front: front.to_string(),
            back: back.to_string(),
        })
        .collect();

    ThemeSnapshot {
        id: 1,
        name: "Polish Vocabulary".to_string(),
        cards,
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_scheduler=info,flashcards=info".into()),
        )
        .init();

    let settings = Settings::load(Path::new("settings.toml")).context("loading settings.toml")?;
    let today = Local::now().date_naive();
    let store = SqliteStore::open(&settings.database_path, today)
        .with_context(|| format!("opening {}", settings.database_path.display()))?;

    let is_empty = {
        let conn = store.lock()?;
        db::get_all_users(&conn)?.is_empty()
    };
    if is_empty {
        let theme = sample_theme();
        let (user_id, current_date) = {
            let mut conn = store.lock()?;
            let user_id = db::new_user("demo", LevelCap::default(), &conn)?;
            db::save_theme(&theme, &mut conn)?;
            (user_id, db::get_current_date(&conn)?)
        };
        Scheduler::new(store.clone(), store.clone()).enroll_theme(user_id, &theme, current_date)?;
        info!("sample data created");
    }

    let app = ReviewApp::new(settings, store)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([500.0, 700.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Flashcards Review",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("review client failed: {e}"))
}
