use clap::{Parser, Subcommand};
use homesync::config::{AppPaths, Settings};
use homesync::db;
use homesync::error::Result;
use homesync::models::{
    AiModel, ContainerPatch, InventoryItem, ItemPatch, Language, LocationPatch, NewContainer,
    NewItem, NewLocation, PromptType,
};
use homesync::persistence::Persistence;
use homesync::recognition::{
    default_prompt, parse_recognized_items, BatchTarget, MediaKind, RecognitionBatch,
};
use homesync::{InventoryStore, InventoryView};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "homesync")]
#[command(about = "Track what is stored where around the house")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to HOMESYNC_DATA_DIR or the platform data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Counts for the home dashboard
    Summary,

    /// List all locations
    Locations,

    /// Show one location grouped by shelf
    Show { location_id: String },

    /// Find items by name or tag
    Search { query: String },

    AddLocation {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        photo: Option<String>,
    },

    UpdateLocation {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long, conflicts_with = "clear_photo")]
        photo: Option<String>,
        #[arg(long)]
        clear_photo: bool,
    },

    AddContainer {
        location_id: String,
        name: String,
        #[arg(long)]
        photo: Option<String>,
    },

    /// Rename a container or change its photo; its location is fixed
    UpdateContainer {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_photo")]
        photo: Option<String>,
        #[arg(long)]
        clear_photo: bool,
    },

    AddItem {
        name: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        container: Option<String>,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        /// Defaults to the unit for the current language
        #[arg(long)]
        unit: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    UpdateItem {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, conflicts_with = "no_container")]
        container: Option<String>,
        /// Take the item off its shelf
        #[arg(long)]
        no_container: bool,
        /// Replaces all tags when given
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Change an item's quantity by a signed amount
    Adjust {
        id: String,
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },

    Delete { id: String },

    /// Show or set the recognition model
    Model { model: Option<String> },

    /// Show the AI call log
    History {
        #[arg(long)]
        clear: bool,
    },

    /// Show or set the interface language (en, zh)
    Lang { lang: Option<String> },

    /// Add the items from a saved recognition reply
    Import {
        location_id: String,
        /// File holding the model's reply text
        #[arg(long)]
        reply: PathBuf,
        #[arg(long)]
        container: Option<String>,
        /// voice, photo or batch_scan
        #[arg(long, default_value = "batch_scan")]
        kind: String,
        /// Prompt that produced the reply, for the history log
        #[arg(long)]
        prompt: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if let Err(err) = run(cli) {
        log::error!("{err}");
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::discover(cli.data_dir.as_deref())?;
    let settings = Settings::load(&paths)?;
    let persistence = Persistence::new(db::init_database(&paths)?);
    let mut store = InventoryStore::open(persistence, settings.store.clone())?;

    match cli.command {
        Commands::Summary => {
            let summary = store.view().summary();
            println!("Locations:      {}", summary.location_count);
            println!("Items:          {}", summary.item_count);
            println!("Total quantity: {}", summary.total_quantity);
            println!("Model:          {}", store.view().selected_model());
        }
        Commands::Locations => {
            let view = store.view();
            for location in view.locations() {
                println!(
                    "{}\t{}\t{} item(s)",
                    location.id,
                    location.name,
                    view.items_by_location(&location.id).len()
                );
            }
        }
        Commands::Show { location_id } => {
            let view = store.view();
            match view.location_layout(&location_id) {
                Some(layout) => {
                    println!("{} ({} item(s))", layout.location.name, layout.item_count);
                    if let Some(description) = &layout.location.description {
                        println!("  {description}");
                    }
                    if !layout.uncategorized.is_empty() {
                        println!("  [uncategorized]");
                        for item in &layout.uncategorized {
                            print_item(item, "    ");
                        }
                    }
                    for shelf in &layout.shelves {
                        println!("  [{}] {}", shelf.container.id, shelf.container.name);
                        if shelf.items.is_empty() {
                            println!("    (empty)");
                        }
                        for item in &shelf.items {
                            print_item(item, "    ");
                        }
                    }
                }
                None => println!("No location with id {location_id}"),
            }
        }
        Commands::Search { query } => {
            let view = store.view();
            let hits = view.search_items(&query);
            if hits.is_empty() && !query.trim().is_empty() {
                println!("No items found");
            }
            for item in hits {
                print_search_hit(&view, item);
            }
        }
        Commands::AddLocation {
            name,
            description,
            photo,
        } => {
            let location = store.add_location(NewLocation {
                name,
                description,
                photo_url: photo,
            })?;
            println!("{}", location.id);
        }
        Commands::UpdateLocation {
            id,
            name,
            description,
            clear_description,
            photo,
            clear_photo,
        } => {
            let patch = LocationPatch {
                name,
                description: tri_state(description, clear_description),
                photo_url: tri_state(photo, clear_photo),
            };
            report_found(store.update_location(&id, patch)?, "location", &id);
        }
        Commands::AddContainer {
            location_id,
            name,
            photo,
        } => {
            let container = store.add_container(NewContainer {
                name,
                location_id,
                photo_url: photo,
            })?;
            println!("{}", container.id);
        }
        Commands::UpdateContainer {
            id,
            name,
            photo,
            clear_photo,
        } => {
            let patch = ContainerPatch {
                name,
                photo_url: tri_state(photo, clear_photo),
            };
            report_found(store.update_container(&id, patch)?, "container", &id);
        }
        Commands::AddItem {
            name,
            location,
            container,
            quantity,
            unit,
            tags,
        } => {
            let unit = unit.unwrap_or_else(|| store.language().default_unit().to_string());
            let item = store.add_item(NewItem {
                name,
                quantity,
                unit,
                location_id: location,
                container_id: container,
                tags,
                photo_url: None,
            })?;
            println!("{}", item.id);
        }
        Commands::UpdateItem {
            id,
            name,
            quantity,
            unit,
            location,
            container,
            no_container,
            tags,
        } => {
            let container_id = tri_state(container, no_container);
            let patch = ItemPatch {
                name,
                quantity,
                unit,
                location_id: location,
                container_id,
                tags: (!tags.is_empty()).then_some(tags),
                photo_url: None,
            };
            report_found(store.update_item(&id, patch)?, "item", &id);
        }
        Commands::Adjust { id, delta } => {
            if store.adjust_quantity(&id, delta)? {
                if let Some(item) = store.view().find_item(&id) {
                    print_item(item, "");
                }
            } else {
                report_found(false, "item", &id);
            }
        }
        Commands::Delete { id } => report_found(store.delete_item(&id)?, "item", &id),
        Commands::Model { model } => match model {
            Some(model) => {
                let model: AiModel = model.parse()?;
                store.set_selected_model(model)?;
                println!("{model}");
            }
            None => {
                let selected = store.view().selected_model();
                for model in AiModel::ALL {
                    let marker = if model == selected { "*" } else { " " };
                    println!("{marker} {model}");
                }
            }
        },
        Commands::History { clear } => {
            if clear {
                store.clear_prompt_history()?;
            }
            for entry in store.view().prompt_history() {
                let when = chrono::DateTime::from_timestamp_millis(entry.timestamp)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!("{when}\t{}\t{}\t{}", entry.kind, entry.model, entry.response_summary);
            }
        }
        Commands::Lang { lang } => match lang {
            Some(lang) => {
                let lang: Language = lang.parse()?;
                store.set_language(lang)?;
                println!("{}", lang.as_str());
            }
            None => println!("{}", store.language().as_str()),
        },
        Commands::Import {
            location_id,
            reply,
            container,
            kind,
            prompt,
        } => {
            let kind: PromptType = kind.parse()?;
            let text = std::fs::read_to_string(&reply)?;
            let media = match kind {
                PromptType::Voice => MediaKind::Audio,
                PromptType::Photo | PromptType::BatchScan => MediaKind::Image,
            };
            let batch = RecognitionBatch {
                target: BatchTarget {
                    location_id,
                    container_id: container,
                    kind,
                },
                model: store.view().selected_model(),
                prompt: prompt
                    .unwrap_or_else(|| default_prompt(media, settings.recognition.max_items)),
                items: parse_recognized_items(&text),
            };
            let report = store.add_recognized_items(batch)?;
            for item in &report.added {
                print_item(item, "+ ");
            }
            println!("{}", report.history.response_summary);
        }
    }
    Ok(())
}

fn print_item(item: &InventoryItem, indent: &str) {
    let tags = if item.tags.is_empty() {
        String::new()
    } else {
        format!(" #{}", item.tags.join(" #"))
    };
    println!(
        "{indent}{}\t{}\t{} {}{tags}",
        item.id, item.name, item.quantity, item.unit
    );
}

fn print_search_hit(view: &InventoryView<'_>, item: &InventoryItem) {
    let placement = view.placement(item);
    let mut place = placement
        .location
        .map(|l| l.name.clone())
        .unwrap_or_else(|| "?".to_string());
    if let Some(container) = placement.container {
        place.push_str(" > ");
        place.push_str(&container.name);
    }
    print_item(item, "");
    println!("\t@ {place}");
    if let Some(photo) = view.resolve_visual_source(item) {
        println!("\tphoto: {photo}");
    }
}

/// Maps a value flag and its `--clear-*` twin onto a patch field.
fn tri_state(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn report_found(found: bool, kind: &str, id: &str) {
    if found {
        println!("ok");
    } else {
        println!("No {kind} with id {id}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_flags_map_onto_patch_fields() {
        assert_eq!(tri_state(None, false), None);
        assert_eq!(tri_state(Some("shelf.jpg".into()), false), Some(Some("shelf.jpg".into())));
        assert_eq!(tri_state(None, true), Some(None));
    }

    #[test]
    fn update_location_parses_edits_and_clears() {
        let cli = Cli::try_parse_from([
            "homesync",
            "update-location",
            "1",
            "--name",
            "Hall closet",
            "--clear-description",
        ])
        .unwrap();
        match cli.command {
            Commands::UpdateLocation {
                id,
                name,
                description,
                clear_description,
                photo,
                clear_photo,
            } => {
                assert_eq!(id, "1");
                assert_eq!(name.as_deref(), Some("Hall closet"));
                assert_eq!(tri_state(description, clear_description), Some(None));
                assert_eq!(tri_state(photo, clear_photo), None);
            }
            _ => panic!("Expected update-location"),
        }

        let both = Cli::try_parse_from([
            "homesync",
            "update-container",
            "c1",
            "--photo",
            "a.jpg",
            "--clear-photo",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn adjust_accepts_negative_deltas() {
        let cli = Cli::try_parse_from(["homesync", "adjust", "i1", "-3"]).unwrap();
        assert!(matches!(cli.command, Commands::Adjust { delta: -3, .. }));
    }
}
