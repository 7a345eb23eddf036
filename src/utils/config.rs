#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use fs_mistrust::Mistrust;
use log::{info, error, LevelFilter};
use serde::Deserialize;
use std::{env, fs, path::Path};
use std::os::unix::fs::PermissionsExt;
use structopt::StructOpt;

use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;

// Wiki Utilities
use crate::utils::{wiki_utils, errors::Errors};

use super::wiki_utils::get_absolute_path;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Directory and file locations. Unless otherwise noted, all files and directories
// are relative to the root directory.
const ENV_WIKI_ROOT_DIR    : &str = "WIKI_ROOT_DIR";
const DEFAULT_ROOT_DIR     : &str = "~/.wiki";
const CONFIG_DIR           : &str = "/config";
const LOGS_DIR             : &str = "/logs";
const DATA_DIR             : &str = "/data";
const LOG4RS_CONFIG_FILE   : &str = "/log4rs.yml";  // relative to config dir
const WIKI_CONFIG_FILE     : &str = "/wiki.toml";   // relative to config dir
const WIKI_DIR_MODE        : u32  = 0o700;

// Networking.
const DEFAULT_HTTP_ADDR    : &str = "127.0.0.1";
const DEFAULT_HTTP_PORT    : u16  = 8080;

// Page shown when the web root is requested.
const DEFAULT_FRONT_PAGE   : &str = "FrontPage";

// Console logging used when no log4rs file is installed.
const DEFAULT_LOG_PATTERN  : &str = "{d(%Y-%m-%dT%H:%M:%S%.3f)} {h({l})} {t} - {m}{n}";

// ***************************************************************************
//                             Directory Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// WikiDirs:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct WikiDirs {
    pub root_dir: String,
    pub config_dir: String,
    pub logs_dir: String,
    pub data_dir: String,
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// WikiArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, StructOpt)]
#[structopt(name = "wiki_args", about = "Command line arguments for Wiki Server.")]
pub struct WikiArgs {
    /// Specify the wiki's root data directory.
    ///
    /// This directory contains the configuration, logs and page files.
    #[structopt(short, long)]
    pub root_dir: Option<String>,

    /// Create the data directories and then exit.
    ///
    /// The data directories will be rooted at a root directory calculated
    /// using the following priority order:
    ///
    ///   1. If set, the value of the WIKI_ROOT_DIR environment,
    ///
    ///   2. Otherwise, if set, the value of the --root_dir command line argument,
    ///
    ///   3. Otherwise, ~/.wiki
    ///
    #[structopt(short, long)]
    pub create_dirs_only: bool,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct Parms {
    pub config_file: Option<String>,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
/** Everything computed at startup before the server is assembled. */
#[derive(Debug)]
pub struct RuntimeCtx {
    pub parms: Parms,
    pub wiki_dirs: WikiDirs,
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub http_addr: String,
    pub http_port: u16,
    pub front_page: String,
    pub templates_dir: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Wiki Server".to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            front_page: DEFAULT_FRONT_PAGE.to_string(),
            templates_dir: None,
        }
    }
}

// ***************************************************************************
//                            Directory Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_wiki_args:
// ---------------------------------------------------------------------------
/** Get the command line arguments. */
pub fn init_wiki_args() -> WikiArgs {
    let args = WikiArgs::from_args();
    println!("{:?}", args);
    args
}

// ---------------------------------------------------------------------------
// init_wiki_dirs:
// ---------------------------------------------------------------------------
/** Calculate the external data directories, creating any that don't exist. */
pub fn init_wiki_dirs(args: &WikiArgs) -> Result<WikiDirs> {
    // Initialize the mistrust object.
    let mistrust = get_mistrust()?;

    // Check that each path is absolute and is a directory with the
    // proper permission assign if it exists.  If it doesn't exist,
    // create it.
    let root_dir = get_root_dir(args);
    check_wiki_dir(&root_dir, "root directory", &mistrust)?;

    let config_dir = root_dir.clone() + CONFIG_DIR;
    check_wiki_dir(&config_dir, "config directory", &mistrust)?;

    let logs_dir = root_dir.clone() + LOGS_DIR;
    check_wiki_dir(&logs_dir, "logs directory", &mistrust)?;

    let data_dir = root_dir.clone() + DATA_DIR;
    check_wiki_dir(&data_dir, "data directory", &mistrust)?;

    // Package up and return the directories.
    Ok(WikiDirs { root_dir, config_dir, logs_dir, data_dir })
}

// ---------------------------------------------------------------------------
// check_wiki_dir:
// ---------------------------------------------------------------------------
/** Check that the path is absolute and, if it exists, that is has the proper
 * permissions assigned.  If it doesn't exist, create it along with any
 * missing parents.  The mistrust package creates directories with 0o700
 * permissions and verifies every directory on the way.
 */
fn check_wiki_dir(dir: &str, msgname: &str, mistrust: &Mistrust) -> Result<()> {
    // Get the path object.
    let path = Path::new(dir);
    if !path.is_absolute() {
        return Err(anyhow!("The wiki {} path must be absolute: {}", msgname, dir));
    }
    if path.exists() {
        // Make sure the path represents a directory.
        if !path.is_dir() {
            return Err(anyhow!("The wiki {} path must be a directory: {}", msgname, dir));
        }

        // Make sure the directory had rwx for owner only.
        let meta = path.metadata()
            .map_err(|e| anyhow!("Unable to read metadata for {}: {}: {}", msgname, dir, e))?;
        let perm = meta.permissions().mode();
        if perm & 0o777 != WIKI_DIR_MODE {
            return Err(anyhow!("The wiki {} path must be have 0o700 permissions: {}", msgname, dir));
        }
    } else {
        // Create the directory with the correct permissions.
        mistrust.make_directory(path)
            .map_err(|e| anyhow!("Make directory error for {:?}: {}", path, e))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// get_mistrust:
// ---------------------------------------------------------------------------
/** Configure a new mistrust object for initial directory processing. */
fn get_mistrust() -> Result<Mistrust> {
    Mistrust::builder()
        .ignore_prefix(get_absolute_path("~"))
        .trust_group(0)
        .build()
        .map_err(|e| anyhow!("Mistrust configuration error: {}", e))
}

// ---------------------------------------------------------------------------
// get_root_dir:
// ---------------------------------------------------------------------------
fn get_root_dir(args: &WikiArgs) -> String {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --root-dir argument
    //  3. Default location
    //
    let root_dir = env::var(ENV_WIKI_ROOT_DIR).unwrap_or_else(
        |_| {
            match args.root_dir.clone() {
                Some(r) => r,
                None => DEFAULT_ROOT_DIR.to_string(),
            }
        });

    // Canonicalize the path.
    get_absolute_path(&root_dir)
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
/** Initialize log4rs from the installed configuration file or, when there
 * is none, with a console appender at info level.
 */
pub fn init_log(dirs: &WikiDirs) -> Result<()> {
    let logconfig = dirs.config_dir.clone() + LOG4RS_CONFIG_FILE;
    if Path::new(&logconfig).is_file() {
        log4rs::init_file(&logconfig, Default::default())
            .map_err(|e| anyhow!("{}\n   {}", Errors::Log4rsInitialization(logconfig.clone()), e))?;
        info!("Log4rs initialized using: {}", logconfig);
    } else {
        log4rs::init_config(default_log_config()?)?;
        info!("Log4rs initialized with console defaults, no file at: {}", logconfig);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// default_log_config:
// ---------------------------------------------------------------------------
fn default_log_config() -> Result<log4rs::Config> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN)))
        .build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    Ok(config)
}

// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Retrieve the application parameters from the configuration file in the
 * config directory.  If the file cannot be read, default values are used.
 */
pub fn get_parms(dirs: &WikiDirs) -> Result<Parms> {
    // Get the config file path from its data directory.
    let config_file = dirs.config_dir.clone() + WIKI_CONFIG_FILE;

    // Read the cofiguration file.
    let config_file_abs = wiki_utils::get_absolute_path(&config_file);
    info!("{}", Errors::ReadingConfigFile(config_file_abs.clone()));
    let contents = match fs::read_to_string(&config_file_abs) {
        Ok(c) => c,
        Err(_) => {
            info!("Unable to read configuration at {}. Using default values.", config_file);
            return Ok(Parms { config_file: None, config: Config::new() });
        }
    };

    // Parse the toml configuration.
    let config = parse_config(&contents).map_err(|e| {
        let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file_abs.clone()), e);
        error!("{}", msg);
        anyhow!(msg)
    })?;

    Ok(Parms { config_file: Some(config_file_abs), config })
}

// ---------------------------------------------------------------------------
// parse_config:
// ---------------------------------------------------------------------------
fn parse_config(contents: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(contents)
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
/** Resolve and create directories, start logging and read the parameters.
 * Any failure here aborts startup.
 */
pub fn init_runtime_context(wiki_args: &WikiArgs) -> Result<RuntimeCtx> {
    let wiki_dirs = init_wiki_dirs(wiki_args)?;
    init_log(&wiki_dirs)?;
    let parms = get_parms(&wiki_dirs)?;
    Ok(RuntimeCtx { parms, wiki_dirs })
}
