//! CDKGate server and operator CLI.
//!
//! `cdkgate serve` runs the HTTP API: the public surface (verify, device
//! check, gated download) on one port and the admin surface (generate,
//! list, cleanup) on another, so the admin port can be firewalled off.
//!
//! The remaining subcommands operate on the store directly for operators
//! working on the box:
//!
//!   cdkgate generate 100 --db cdks.db
//!   cdkgate list --db cdks.db
//!   cdkgate export unused.txt --db cdks.db
//!   cdkgate cleanup --db cdks.db --yes

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cdkgate_core::{delete_used_codes, format_export, generate_codes, list_codes, stats};
use cdkgate_server::{build_admin_router, build_router, AppState};
use cdkgate_store::{CdkStore, SqliteStore};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "cdkgate")]
#[command(about = "CDK activation and gated download server")]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Public API port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Admin API port (keep off the public interface)
        #[arg(long, default_value = "8081")]
        admin_port: u16,

        /// Path to the CDK database
        #[arg(long, default_value = "cdks.db")]
        db: PathBuf,

        /// Directory holding the staged download asset
        #[arg(long, default_value = "files")]
        assets_dir: PathBuf,
    },
    /// Generate new CDK codes
    Generate {
        /// How many codes to generate (1-1000)
        count: usize,

        /// Path to the CDK database
        #[arg(long, default_value = "cdks.db")]
        db: PathBuf,
    },
    /// List all codes and their binding state
    List {
        /// Path to the CDK database
        #[arg(long, default_value = "cdks.db")]
        db: PathBuf,
    },
    /// Export unused codes to a text file, one per line
    Export {
        /// Output file
        file: PathBuf,

        /// Path to the CDK database
        #[arg(long, default_value = "cdks.db")]
        db: PathBuf,
    },
    /// Delete all used codes (requires --yes)
    Cleanup {
        /// Path to the CDK database
        #[arg(long, default_value = "cdks.db")]
        db: PathBuf,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Command::Serve {
            port,
            admin_port,
            db,
            assets_dir,
        } => serve(port, admin_port, &db, assets_dir).await,
        Command::Generate { count, db } => generate(count, &db),
        Command::List { db } => list(&db),
        Command::Export { file, db } => export(&file, &db),
        Command::Cleanup { db, yes } => cleanup(&db, yes),
    }
}

fn open_store(db: &PathBuf) -> Result<Arc<dyn CdkStore>> {
    let store = SqliteStore::open(db)
        .with_context(|| format!("failed to open CDK database at {}", db.display()))?;
    Ok(Arc::new(store))
}

async fn serve(port: u16, admin_port: u16, db: &PathBuf, assets_dir: PathBuf) -> Result<()> {
    let store = open_store(db)?;
    let state = AppState {
        store,
        assets_dir: assets_dir.clone(),
    };

    let admin_app = build_admin_router(state.clone());
    let admin_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{admin_port}"))
        .await
        .with_context(|| format!("failed to bind admin port {admin_port}"))?;
    tokio::spawn(async move {
        info!("admin API listening on port {}", admin_port);
        if let Err(e) = axum::serve(admin_listener, admin_app).await {
            tracing::error!(error = %e, "admin server failed");
        }
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("failed to bind public port {port}"))?;

    println!("\n========================================");
    println!("  CDKGate Running");
    println!("========================================");
    println!("  Public Port: {port}");
    println!("  Admin Port:  {admin_port} (loopback only)");
    println!("  Database:    {}", db.display());
    println!("  Assets:      {}", assets_dir.display());
    println!("========================================\n");

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}

fn generate(count: usize, db: &PathBuf) -> Result<()> {
    let store = open_store(db)?;
    let codes = generate_codes(store.as_ref(), count)?;
    for code in &codes {
        println!("{code}");
    }
    info!(count = codes.len(), "generated codes");
    Ok(())
}

fn list(db: &PathBuf) -> Result<()> {
    let store = open_store(db)?;
    let records = list_codes(store.as_ref())?;
    if records.is_empty() {
        println!("no CDK records");
        return Ok(());
    }

    println!("{:<18} {:<8} {:<24} {:<20} {:<20}", "code", "state", "device", "created", "used");
    for rec in &records {
        let state = if rec.used { "used" } else { "unused" };
        let device = rec
            .bound_device
            .as_ref()
            .map(|d| d.as_str())
            .unwrap_or("");
        let created = rec.created_at.format("%Y-%m-%d %H:%M").to_string();
        let used = rec
            .used_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{:<18} {:<8} {:<24} {:<20} {:<20}", rec.code, state, device, created, used);
    }

    let s = stats(store.as_ref())?;
    println!("\n{} total, {} used", s.total, s.used);
    Ok(())
}

fn export(file: &PathBuf, db: &PathBuf) -> Result<()> {
    let store = open_store(db)?;
    let unused = store.list_unused()?;
    if unused.is_empty() {
        println!("no unused codes to export");
        return Ok(());
    }

    std::fs::write(file, format_export(&unused))
        .with_context(|| format!("failed to write {}", file.display()))?;
    println!("exported {} unused codes to {}", unused.len(), file.display());
    Ok(())
}

fn cleanup(db: &PathBuf, yes: bool) -> Result<()> {
    let store = open_store(db)?;
    let s = stats(store.as_ref())?;
    if s.used == 0 {
        println!("no used codes to delete");
        return Ok(());
    }
    if !yes {
        println!("would delete {} used codes; re-run with --yes to confirm", s.used);
        return Ok(());
    }
    let deleted = delete_used_codes(store.as_ref())?;
    println!("deleted {deleted} used codes");
    Ok(())
}
