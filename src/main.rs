#![forbid(unsafe_code)]

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use log::{error, info};
use poem::listener::TcpListener;

// Wiki Utilities
use crate::utils::config::{init_runtime_context, init_wiki_args, init_wiki_dirs, RuntimeCtx};
use crate::utils::errors::Errors;
use crate::utils::wiki_utils::get_absolute_path;
use crate::wiki::{build_app, WikiCtx};

// Modules
mod utils;
mod wiki;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SERVER_NAME : &str = "WikiServer"; // for poem logging

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> ExitCode {
    // Announce ourselves.
    println!("Starting wiki_server!");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The logger may not be up yet, so report on both channels.
            error!("wiki_server aborted: {:#}", e);
            eprintln!("wiki_server aborted: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// run:
// ---------------------------------------------------------------------------
async fn run() -> Result<()> {
    // --------------- Initialize Wiki ----------------
    let args = init_wiki_args();
    if args.create_dirs_only {
        let dirs = init_wiki_dirs(&args)?;
        println!("Created wiki directories under {}.", dirs.root_dir);
        return Ok(());
    }
    let runtime_ctx = init_runtime_context(&args)?;
    info!("{}", Errors::InputParms(format!("{:#?}", runtime_ctx)));
    match &runtime_ctx.parms.config_file {
        Some(f) => info!("Configuration file: {}", f),
        None => info!("No configuration file, using defaults."),
    }
    print_version_info();

    // Templates are parsed here so a bad template stops startup.
    let wiki_ctx = Arc::new(init_wiki_ctx(&runtime_ctx)?);

    // --------------- Main Loop Set Up ---------------
    let config = &runtime_ctx.parms.config;
    let addr = format!("{}:{}", config.http_addr, config.http_port);
    let wiki_url = format!("http://{}", addr);
    info!("Serving pages from {} at {}", wiki_ctx.store.data_dir().display(), wiki_url);
    let app = build_app(wiki_ctx, &config.title, &wiki_url);
    info!("Log directory: {}", runtime_ctx.wiki_dirs.logs_dir);

    // ------------------ Main Loop -------------------
    poem::Server::new(TcpListener::bind(addr))
        .name(SERVER_NAME)
        .run(app)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// init_wiki_ctx:
// ---------------------------------------------------------------------------
fn init_wiki_ctx(runtime_ctx: &RuntimeCtx) -> Result<WikiCtx> {
    let config = &runtime_ctx.parms.config;
    let templates_dir = config.templates_dir.as_deref().map(get_absolute_path);
    let ctx = WikiCtx::new(
        Path::new(&runtime_ctx.wiki_dirs.data_dir),
        templates_dir.as_deref().map(Path::new),
        &config.front_page,
    )?;
    Ok(ctx)
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    info!("*** Running {}={}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
}
