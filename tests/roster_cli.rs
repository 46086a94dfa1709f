#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::process::Command;

use anyhow::Result;
use tempfile::tempdir;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_escouade")
}

const CSV: &str = "Nom;Rarete;Type;Puissance;PA;PV;TypeAttaque;Role;Niveau;Rang;Selectionne;Faction\n\
REGINA;SSR;Mercenaire;3320;140;509;Mêlée;Sentinelle;14;2;Oui;Syndicat\n\
ISABELLE;SSR;Commandant;4200;90;600;Distance;Attaquant;30;5;Non;Consortium\n";

fn seed(db_arg: &str, dir: &std::path::Path) -> Result<()> {
    let status = Command::new(bin()).args(["--db", db_arg, "db", "migrate"]).status()?;
    assert!(status.success());
    let csv = dir.join("roster.csv");
    std::fs::write(&csv, CSV)?;
    let status = Command::new(bin())
        .args(["--db", db_arg, "import", "csv", csv.to_str().unwrap()])
        .status()?;
    assert!(status.success());
    Ok(())
}

#[test]
fn show_finds_a_character_case_insensitively() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("show.sqlite3");
    let db_arg = db.to_str().unwrap();
    seed(db_arg, dir.path())?;

    let output = Command::new(bin())
        .args(["--db", db_arg, "show", "regina", "--json"])
        .output()?;
    assert!(output.status.success());

    let personnage: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(personnage["nom"], "REGINA");
    assert_eq!(personnage["puissance"], 3320);
    assert_eq!(personnage["rarete"], "Ssr");

    let output = Command::new(bin())
        .args(["--db", db_arg, "show", "FANTOME"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    Ok(())
}

#[test]
fn delete_removes_the_character() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("delete.sqlite3");
    let db_arg = db.to_str().unwrap();
    seed(db_arg, dir.path())?;

    let status = Command::new(bin())
        .args(["--db", db_arg, "delete", "regina"])
        .status()?;
    assert!(status.success());

    let output = Command::new(bin())
        .args(["--db", db_arg, "list", "--json"])
        .output()?;
    assert!(output.status.success());
    let roster: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let names: Vec<&str> = roster
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["nom"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["ISABELLE"]);

    let status = Command::new(bin())
        .args(["--db", db_arg, "delete", "REGINA"])
        .status()?;
    assert_eq!(status.code(), Some(1));
    Ok(())
}

#[test]
fn squad_reports_active_and_best() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("squad.sqlite3");
    let db_arg = db.to_str().unwrap();
    seed(db_arg, dir.path())?;

    let output = Command::new(bin())
        .args(["--db", db_arg, "squad", "--json"])
        .output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    // Only REGINA was imported with Selectionne=Oui.
    assert_eq!(report["active"], serde_json::json!(["REGINA"]));
    assert_eq!(report["meilleure"]["commandant"], "ISABELLE");
    assert_eq!(report["meilleure"]["mercenaires"], serde_json::json!(["REGINA"]));
    assert_eq!(report["meilleure"]["puissanceTotale"], 7520);
    Ok(())
}
