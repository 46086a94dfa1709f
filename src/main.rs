use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use sqlx::SqlitePool;

use escouade_lib::import::{self, ImportResult, SectionFlags};
use escouade_lib::store::{characters, history, house, settings, templates};
use escouade_lib::{db, export, migrate, squad};

#[derive(Debug, Parser)]
#[command(name = "escouade", about = "Gestionnaire d'escouade et d'inventaire", version)]
struct Cli {
    /// Database file; defaults to the per-user data directory.
    #[arg(long, global = true, env = "ESCOUADE_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import characters and related data from a file.
    #[command(subcommand)]
    Import(ImportCommand),
    /// Export the stored data to a file.
    #[command(subcommand)]
    Export(ExportCommand),
    /// Print the roster, sorted by name.
    List {
        /// Emit JSON instead of the table view.
        #[arg(long)]
        json: bool,
    },
    /// Print one character with its abilities, looked up by name.
    Show {
        nom: String,
        /// Emit JSON instead of the table view.
        #[arg(long)]
        json: bool,
    },
    /// Delete a character by name.
    Delete { nom: String },
    /// Print the active squad and the computed best squad.
    Squad {
        /// Emit JSON instead of the table view.
        #[arg(long)]
        json: bool,
    },
    /// Database maintenance and inspection commands.
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum ImportCommand {
    /// Import a `;`-separated CSV roster file.
    Csv { file: PathBuf },
    /// Import a PML document, optionally restricted to some sections.
    Pml {
        file: PathBuf,
        #[command(flatten)]
        sections: SectionArgs,
    },
}

#[derive(Debug, Subcommand)]
enum ExportCommand {
    /// Export a PML document, optionally restricted to some sections.
    Pml {
        output: PathBuf,
        #[command(flatten)]
        sections: SectionArgs,
    },
}

/// Section selectors shared by PML import and export. Selecting none means
/// all sections.
#[derive(Debug, Args)]
struct SectionArgs {
    /// Only the character inventory.
    #[arg(long)]
    inventaire: bool,
    /// Only the squad templates.
    #[arg(long)]
    templates: bool,
    /// Only the best-squad section.
    #[arg(long = "meilleur-escouade")]
    meilleur_escouade: bool,
    /// Only the ranking history records.
    #[arg(long)]
    historiques: bool,
    /// Only the Lucie house rooms.
    #[arg(long)]
    maison: bool,
}

impl SectionArgs {
    fn flags(&self) -> SectionFlags {
        let picked = SectionFlags {
            inventory: self.inventaire,
            templates: self.templates,
            best_squad: self.meilleur_escouade,
            histories: self.historiques,
            house: self.maison,
        };
        if picked.any() {
            picked
        } else {
            SectionFlags::ALL
        }
    }
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Report the migration state of the database.
    Status {
        /// Emit a machine-readable JSON object.
        #[arg(long)]
        json: bool,
    },
    /// Apply any pending schema migrations.
    Migrate,
}

#[tokio::main]
async fn main() {
    escouade_lib::logging::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path().context("determine database path")?,
    };
    let pool = db::open_pool(&db_path).await?;

    let code = match cli.command {
        Commands::Import(command) => {
            migrate::apply_migrations(&pool).await?;
            handle_import(&pool, command).await?
        }
        Commands::Export(command) => {
            migrate::apply_migrations(&pool).await?;
            handle_export(&pool, command).await?
        }
        Commands::List { json } => {
            migrate::apply_migrations(&pool).await?;
            handle_list(&pool, json).await?
        }
        Commands::Show { nom, json } => {
            migrate::apply_migrations(&pool).await?;
            handle_show(&pool, &nom, json).await?
        }
        Commands::Delete { nom } => {
            migrate::apply_migrations(&pool).await?;
            handle_delete(&pool, &nom).await?
        }
        Commands::Squad { json } => {
            migrate::apply_migrations(&pool).await?;
            handle_squad(&pool, json).await?
        }
        Commands::Db(command) => handle_db_command(&pool, command).await?,
    };

    pool.close().await;
    Ok(code)
}

async fn handle_import(pool: &SqlitePool, command: ImportCommand) -> Result<i32> {
    let result = match command {
        ImportCommand::Csv { file } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("read {}", file.display()))?;
            import::csv::import_csv(pool, &bytes).await?
        }
        ImportCommand::Pml { file, sections } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let filename = file.file_name().and_then(|n| n.to_str());
            import::pml::import_pml(pool, &bytes, sections.flags(), filename).await?
        }
    };
    print_import_result(&result);
    Ok(if result.is_success() { 0 } else { 1 })
}

fn print_import_result(result: &ImportResult) {
    println!("{} enregistrement(s) importé(s)", result.success_count);
    if let Some(error) = &result.error {
        eprintln!("Échec: {error}");
    }
    for error in &result.errors {
        eprintln!("Erreur: {error}");
    }
    for warning in &result.warnings {
        eprintln!("Avertissement: {warning}");
    }
}

async fn handle_export(pool: &SqlitePool, command: ExportCommand) -> Result<i32> {
    match command {
        ExportCommand::Pml { output, sections } => {
            let bytes = export::export_pml(pool, sections.flags()).await?;
            std::fs::write(&output, &bytes)
                .with_context(|| format!("write {}", output.display()))?;
            println!("Export écrit dans {}", output.display());
        }
    }
    Ok(0)
}

async fn handle_list(pool: &SqlitePool, json: bool) -> Result<i32> {
    let roster = characters::list(pool).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&roster)?);
        return Ok(0);
    }

    if roster.is_empty() {
        println!("Inventaire vide");
        return Ok(0);
    }
    println!(
        "{:<24} {:<6} {:<12} {:>7} {:>7} {:>5} {:>5}",
        "Nom", "Rareté", "Type", "Puiss.", "Niveau", "Rang", "Sél."
    );
    for p in &roster {
        println!(
            "{:<24} {:<6} {:<12} {:>7} {:>7} {:>5} {:>5}",
            p.nom,
            p.rarete.as_str(),
            p.archetype.as_str(),
            p.puissance,
            p.niveau,
            p.rang,
            if p.selectionne { "oui" } else { "non" },
        );
    }
    Ok(0)
}

async fn handle_show(pool: &SqlitePool, nom: &str, json: bool) -> Result<i32> {
    let Some(found) = characters::find_by_name_ci(pool, nom).await? else {
        eprintln!("Personnage {nom:?} introuvable");
        return Ok(1);
    };
    // Re-fetch by id to attach the abilities.
    let personnage = characters::get(pool, found.id).await?.unwrap_or(found);

    if json {
        println!("{}", serde_json::to_string_pretty(&personnage)?);
        return Ok(0);
    }
    println!(
        "{} ({} {})",
        personnage.nom,
        personnage.rarete.as_str(),
        personnage.archetype.as_str()
    );
    println!(
        "  Puissance {} | Niveau {} | Rang {} | PA {} | PV {}",
        personnage.puissance, personnage.niveau, personnage.rang, personnage.pa, personnage.pv
    );
    println!(
        "  Rôle {} | Faction {} | Attaque {} | Sélectionné: {}",
        personnage.role.as_str(),
        personnage.faction.as_str(),
        personnage.type_attaque.as_str(),
        if personnage.selectionne { "oui" } else { "non" },
    );
    if !personnage.description.is_empty() {
        println!("  {}", personnage.description);
    }
    for capacite in &personnage.capacites {
        println!("  Capacité: {}: {}", capacite.nom, capacite.description);
    }
    Ok(0)
}

async fn handle_delete(pool: &SqlitePool, nom: &str) -> Result<i32> {
    match characters::find_by_name_ci(pool, nom).await? {
        Some(found) => {
            characters::delete(pool, found.id).await?;
            println!("{} supprimé", found.nom);
            Ok(0)
        }
        None => {
            eprintln!("Personnage {nom:?} introuvable");
            Ok(1)
        }
    }
}

async fn handle_squad(pool: &SqlitePool, json: bool) -> Result<i32> {
    let roster = characters::list(pool).await?;
    let active = squad::escouade_active(&roster);
    let best = squad::meilleur_escouade(&roster);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "active": active.iter().map(|p| p.nom.as_str()).collect::<Vec<_>>(),
                "meilleure": {
                    "commandant": best.commandant.as_ref().map(|p| p.nom.as_str()),
                    "mercenaires": best.mercenaires.iter().map(|p| p.nom.as_str()).collect::<Vec<_>>(),
                    "androides": best.androides.iter().map(|p| p.nom.as_str()).collect::<Vec<_>>(),
                    "puissanceTotale": best.puissance_totale(),
                },
            }))?
        );
        return Ok(0);
    }

    println!("Escouade active ({})", active.len());
    for p in &active {
        println!("  {} ({})", p.nom, p.puissance);
    }
    println!(
        "Meilleure escouade (puissance totale {})",
        best.puissance_totale()
    );
    if let Some(commandant) = &best.commandant {
        println!("  Commandant: {} ({})", commandant.nom, commandant.puissance);
    }
    for p in &best.mercenaires {
        println!("  Mercenaire: {} ({})", p.nom, p.puissance);
    }
    for p in &best.androides {
        println!("  Androïde: {} ({})", p.nom, p.puissance);
    }
    Ok(0)
}

async fn handle_db_command(pool: &SqlitePool, command: DbCommand) -> Result<i32> {
    match command {
        DbCommand::Status { json } => {
            let pending = migrate::pending_migrations(pool).await?;
            if !pending.is_empty() {
                if json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "upToDate": false,
                            "pending": pending,
                        }))?
                    );
                } else {
                    println!("{} migration(s) en attente:", pending.len());
                    for name in &pending {
                        println!("  {name}");
                    }
                }
                return Ok(1);
            }

            let personnages = characters::count(pool).await?;
            let templates = templates::count(pool).await?;
            let historiques = history::count(pool).await?;
            let pieces = house::count(pool).await?;
            let dernier_import_fichier =
                settings::get(pool, settings::DERNIER_IMPORT_FICHIER).await?;
            let dernier_import_date = settings::get(pool, settings::DERNIER_IMPORT_DATE).await?;
            let dernier_export_date = settings::get(pool, settings::DERNIER_EXPORT_DATE).await?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "upToDate": true,
                        "pending": pending,
                        "counts": {
                            "personnages": personnages,
                            "templates": templates,
                            "historiques": historiques,
                            "pieces": pieces,
                        },
                        "dernierImportFichier": dernier_import_fichier,
                        "dernierImportDate": dernier_import_date,
                        "dernierExportDate": dernier_export_date,
                    }))?
                );
            } else {
                println!("Schéma à jour");
                println!("Personnages:  {personnages}");
                println!("Templates:    {templates}");
                println!("Historiques:  {historiques}");
                println!("Pièces:       {pieces}");
                match (dernier_import_fichier, dernier_import_date) {
                    (Some(fichier), Some(date)) => {
                        println!("Dernier import: {fichier} ({date})");
                    }
                    (Some(fichier), None) => println!("Dernier import: {fichier}"),
                    _ => println!("Dernier import: jamais"),
                }
                match dernier_export_date {
                    Some(date) => println!("Dernier export: {date}"),
                    None => println!("Dernier export: jamais"),
                }
            }
            Ok(0)
        }
        DbCommand::Migrate => {
            migrate::apply_migrations(pool).await?;
            println!("Schéma à jour");
            Ok(0)
        }
    }
}

fn default_db_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("no user data directory available")?;
    Ok(base.join("escouade").join("escouade.sqlite3"))
}
