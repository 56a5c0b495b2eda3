#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use log::{info, error, LevelFilter};
use serde::Deserialize;
use std::{env, fs, path::{Path, PathBuf}};
use lazy_static::lazy_static;
use structopt::StructOpt;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

// Blog Utilities
use crate::utils::{blog_utils, errors::Errors};

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Directory and file locations. Unless otherwise noted, all files and directories
// are relative to the project root directory.
const ENV_BLOG_ROOT_DIR    : &str = "HAC_BLOG_ROOT_DIR";
const DEFAULT_ROOT_DIR     : &str = ".";
const CONFIG_DIR           : &str = "/config";
const LOG4RS_CONFIG_FILE   : &str = "/log4rs.yml"; // relative to config dir
const BLOG_CONFIG_FILE     : &str = "/blog.toml";  // relative to config dir
const LOG_PATTERN          : &str = "{d(%Y-%m-%dT%H:%M:%S%.3f)} {h({l})} {t} - {m}{n}";

// Networking.
const DEFAULT_HTTP_ADDR    : &str = "http://localhost";
const DEFAULT_HTTP_PORT    : u16  = 5173;

// Site layout.
pub const DEFAULT_BASE_PATH     : &str = "/hac-blog/";
pub const DEFAULT_SAVE_ENDPOINT : &str = "/__update_messages";
const DEFAULT_DIST_DIR          : &str = "dist";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Assign the command line arguments BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref BLOG_ARGS: BlogArgs = init_blog_args();
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// BlogArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, StructOpt)]
#[structopt(name = "hac_blog_server", about = "Development server for the hac-blog site.")]
pub struct BlogArgs {
    /// Specify the project root directory.
    ///
    /// The save endpoint only writes files inside this directory.  The root
    /// is calculated using the following priority order:
    ///
    ///   1. If set, the value of the HAC_BLOG_ROOT_DIR environment,
    ///
    ///   2. Otherwise, if set, the value of the --root-dir command line argument,
    ///
    ///   3. Otherwise, the current directory.
    ///
    #[structopt(short, long)]
    pub root_dir: Option<String>,

    /// Override the http port from the configuration file.
    #[structopt(short, long)]
    pub port: Option<u16>,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
#[allow(dead_code)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
#[derive(Debug)]
#[allow(dead_code)]
pub struct RuntimeCtx {
    pub parms: Parms,
    pub project_root: PathBuf,
    pub blog_args: &'static BlogArgs,
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
    pub base_path: String,
    pub save_endpoint: String,
    pub enable_save_endpoint: bool,
    pub dist_dir: String,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// The base path without its trailing slash, suitable for nesting routes.
    /// The root base path yields the empty string.
    pub fn base_prefix(&self) -> String {
        normalize_base_path(&self.base_path).trim_end_matches('/').to_string()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "HAC Blog".to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            base_path: DEFAULT_BASE_PATH.to_string(),
            save_endpoint: DEFAULT_SAVE_ENDPOINT.to_string(),
            enable_save_endpoint: true,
            dist_dir: DEFAULT_DIST_DIR.to_string(),
        }
    }
}

// ***************************************************************************
//                            Directory Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_blog_args:
// ---------------------------------------------------------------------------
/** Get the command line arguments. */
fn init_blog_args() -> BlogArgs {
    let args = BlogArgs::from_args();
    println!("{:?}", args);
    args
}

// ---------------------------------------------------------------------------
// get_root_dir:
// ---------------------------------------------------------------------------
pub fn get_root_dir() -> PathBuf {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --root-dir argument
    //  3. Current directory
    //
    let root_dir = env::var(ENV_BLOG_ROOT_DIR).unwrap_or_else(
        |_| {
            match BLOG_ARGS.root_dir.clone() {
                Some(r) => r,
                None => DEFAULT_ROOT_DIR.to_string(),
            }
        });

    blog_utils::get_project_root(&root_dir)
}

// ---------------------------------------------------------------------------
// normalize_base_path:
// ---------------------------------------------------------------------------
/** Base paths always start and end with a slash. */
pub fn normalize_base_path(base: &str) -> String {
    let trimmed = base.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
/** Initialize log4rs from the project's config directory when a
 * configuration file exists there, otherwise log to the console.
 */
pub fn init_log(project_root: &Path) {
    let logconfig = init_log_config(project_root);
    if Path::new(&logconfig).exists() {
        match log4rs::init_file(logconfig.clone(), Default::default()) {
            Ok(_) => (),
            Err(e) => {
                println!("{}", e);
                let s = format!("{}", Errors::Log4rsInitialization(logconfig));
                panic!("{}", s);
            },
        }
        info!("Log4rs initialized using: {}", logconfig);
    } else {
        if let Err(e) = init_console_log() {
            panic!("{}", Errors::Log4rsInitialization(e.to_string()));
        }
        info!("Log4rs initialized to console, no configuration found at: {}", logconfig);
    }
}

// ---------------------------------------------------------------------------
// init_console_log:
// ---------------------------------------------------------------------------
fn init_console_log() -> Result<()> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// init_log_config:
// ---------------------------------------------------------------------------
fn init_log_config(project_root: &Path) -> String {
    project_root.to_string_lossy().to_string() + CONFIG_DIR + LOG4RS_CONFIG_FILE
}

// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Retrieve the application parameters from the configuration file in the
 * project's config directory.  A missing file yields the default values, a
 * file that doesn't parse is an error.
 */
pub fn get_parms(project_root: &Path) -> Result<Parms> {
    // Get the config file path from the project root.
    let config_file = project_root.to_string_lossy().to_string() + CONFIG_DIR + BLOG_CONFIG_FILE;

    // Read the configuration file.
    let config_file_abs = blog_utils::get_absolute_path(&config_file);
    info!("{}", Errors::ReadingConfigFile(config_file_abs.clone()));
    let contents = match fs::read_to_string(&config_file_abs) {
        Ok(c) => c,
        Err(_) => {
            println!("Unable to read configuration at {}. Using default values.", config_file);
            return Ok(Parms { config_file: Default::default(), config: Config::new() });
        }
    };

    // Parse the toml configuration.
    let config = parse_config(&contents).map_err(|e| {
        let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file_abs.clone()), e);
        error!("{}", msg);
        anyhow!(msg)
    })?;

    Ok(Parms { config_file: config_file_abs, config })
}

// ---------------------------------------------------------------------------
// parse_config:
// ---------------------------------------------------------------------------
fn parse_config(contents: &str) -> Result<Config, toml::de::Error> {
    let mut config: Config = toml::from_str(contents)?;
    config.base_path = normalize_base_path(&config.base_path);
    Ok(config)
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
pub fn init_runtime_context() -> RuntimeCtx {
    // If this fails the application aborts.
    let project_root = get_root_dir();
    let mut parms = get_parms(&project_root).expect("FAILED to read configuration file.");
    if let Some(port) = BLOG_ARGS.port {
        parms.config.http_port = port;
    }
    RuntimeCtx {parms, project_root, blog_args: &BLOG_ARGS}
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_dev_server() {
        let config = Config::new();
        assert_eq!(config.http_port, 5173);
        assert_eq!(config.base_path, "/hac-blog/");
        assert_eq!(config.save_endpoint, "/__update_messages");
        assert!(config.enable_save_endpoint);
        assert_eq!(config.base_prefix(), "/hac-blog");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = parse_config("http_port = 8080\nbase_path = \"blog\"\n").unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.base_path, "/blog/");
        assert_eq!(config.save_endpoint, DEFAULT_SAVE_ENDPOINT);
        assert_eq!(config.title, "HAC Blog");
    }

    #[test]
    fn bad_toml_is_rejected() {
        assert!(parse_config("http_port = \"not a port\"").is_err());
    }

    #[test]
    fn root_base_path_has_empty_prefix() {
        assert_eq!(normalize_base_path(""), "/");
        assert_eq!(normalize_base_path("//"), "/");
        let config = Config { base_path: "/".to_string(), ..Config::default() };
        assert_eq!(config.base_prefix(), "");
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let parms = get_parms(dir.path()).unwrap();
        assert!(parms.config_file.is_empty());
        assert_eq!(parms.config.http_port, DEFAULT_HTTP_PORT);
    }

    #[test]
    fn config_file_is_read_from_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/blog.toml"),
                  "title = \"Test Blog\"\nenable_save_endpoint = false\n").unwrap();
        let parms = get_parms(dir.path()).unwrap();
        assert_eq!(parms.config.title, "Test Blog");
        assert!(!parms.config.enable_save_endpoint);
        assert!(parms.config_file.ends_with("config/blog.toml"));
    }
}
