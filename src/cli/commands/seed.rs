use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::document::{Document, ID_FIELD};
use crate::database::models::{bootcamp::DEFAULT_PHOTO, slugify};
use crate::observer::ChangeEvent;
use crate::server;
use crate::state::AppState;
use crate::types::Collection;

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Load users, bootcamps, courses and reviews from JSON files")]
    Import {
        #[arg(long, help = "Directory holding users.json, bootcamps.json, courses.json, reviews.json", default_value = "_data")]
        dir: PathBuf,
    },

    #[command(about = "Delete every document from every collection")]
    Destroy,
}

pub async fn handle(cmd: SeedCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = server::build_state(config::config().clone()).await?;

    match cmd {
        SeedCommands::Import { dir } => {
            let summary = import(&state, &dir).await?;
            output_success(output_format, "Data imported", &summary)
        }
        SeedCommands::Destroy => {
            let removed = destroy(&state).await?;
            output_success(output_format, "Data destroyed", &json!({ "removed": removed }))
        }
    }
}

/// Documents written per collection
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: usize,
    pub bootcamps: usize,
    pub courses: usize,
    pub reviews: usize,
}

/// Import every seed file found in `dir`. Courses and reviews are announced to the
/// observer pipeline so bootcamp aggregates are computed as they load.
pub async fn import(state: &AppState, dir: &Path) -> anyhow::Result<SeedSummary> {
    let mut ids = IdMap::default();
    let mut summary = SeedSummary::default();

    for mut doc in read_seed_file(dir, "users.json")? {
        ids.rewrite(&mut doc);
        prepare_user(&mut doc)?;
        state.store.insert(Collection::Users, doc).await.context("importing users")?;
        summary.users += 1;
    }

    for mut doc in read_seed_file(dir, "bootcamps.json")? {
        ids.rewrite(&mut doc);
        prepare_bootcamp(state, &mut doc).await;
        state.store.insert(Collection::Bootcamps, doc).await.context("importing bootcamps")?;
        summary.bootcamps += 1;
    }

    for (file, collection) in [("courses.json", Collection::Courses), ("reviews.json", Collection::Reviews)] {
        for mut doc in read_seed_file(dir, file)? {
            ids.rewrite(&mut doc);
            if collection == Collection::Courses {
                doc.entry("scholarshipAvailable".to_string())
                    .or_insert(Value::Bool(false));
            }
            let created = state
                .store
                .insert(collection, doc)
                .await
                .with_context(|| format!("importing {}", collection))?;
            state.pipeline.notify(ChangeEvent::created(collection, created)).await;
            match collection {
                Collection::Courses => summary.courses += 1,
                _ => summary.reviews += 1,
            }
        }
    }

    tracing::info!("Seed import finished: {:?}", summary);
    Ok(summary)
}

/// Remove every document; returns how many were deleted
pub async fn destroy(state: &AppState) -> anyhow::Result<u64> {
    let mut removed = 0;
    for collection in Collection::ALL {
        removed += state.store.delete_many(collection, &[]).await?;
    }
    tracing::info!("Removed {} seed document(s)", removed);
    Ok(removed)
}

fn read_seed_file(dir: &Path, name: &str) -> anyhow::Result<Vec<Document>> {
    let path = dir.join(name);
    if !path.exists() {
        tracing::info!("{} not found, skipping", path.display());
        return Ok(vec![]);
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Seed files may use any id format; ids that are not UUIDs are replaced consistently
/// across files so references keep pointing at the same document.
#[derive(Default)]
struct IdMap(HashMap<String, Uuid>);

impl IdMap {
    const ID_FIELDS: [&'static str; 3] = [ID_FIELD, "bootcamp", "user"];

    fn resolve(&mut self, raw: &str) -> Uuid {
        if let Ok(id) = Uuid::parse_str(raw) {
            return id;
        }
        *self.0.entry(raw.to_string()).or_insert_with(Uuid::new_v4)
    }

    fn rewrite(&mut self, doc: &mut Document) {
        for field in Self::ID_FIELDS {
            if let Some(Value::String(raw)) = doc.get(field) {
                let id = self.resolve(raw);
                doc.insert(field.to_string(), Value::String(id.to_string()));
            }
        }
    }
}

fn prepare_user(doc: &mut Document) -> anyhow::Result<()> {
    if let Some(Value::String(password)) = doc.get("password") {
        let hashed = hash_password(password)?;
        doc.insert("password".to_string(), Value::String(hashed));
    }
    if let Some(Value::String(email)) = doc.get("email") {
        let email = email.trim().to_lowercase();
        doc.insert("email".to_string(), Value::String(email));
    }
    doc.entry("role".to_string()).or_insert_with(|| Value::String("user".to_string()));
    Ok(())
}

async fn prepare_bootcamp(state: &AppState, doc: &mut Document) {
    if let Some(Value::String(name)) = doc.get("name") {
        let slug = slugify(name);
        doc.entry("slug".to_string()).or_insert(Value::String(slug));
    }
    doc.entry("photo".to_string())
        .or_insert_with(|| Value::String(DEFAULT_PHOTO.to_string()));

    if !state.geocoder.is_enabled() || doc.contains_key("location") {
        return;
    }
    let Some(address) = doc.get("address").and_then(Value::as_str).map(str::to_string) else {
        return;
    };
    match state.geocoder.geocode(&address).await {
        Ok(location) => {
            doc.insert("location".to_string(), location.to_geojson());
            doc.remove("address");
        }
        Err(e) => tracing::warn!("Could not geocode seed address '{}': {}", address, e),
    }
}
