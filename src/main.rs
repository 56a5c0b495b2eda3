#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use log::{info, error};
use poem::{listener::TcpListener, EndpointExt, Route};
use poem_openapi::OpenApiService;

// Blog Utilities
use crate::middleware::chain::DevChain;
use crate::middleware::save_messages::SaveMessagesHandler;
use crate::router::pages::{site_endpoint, SiteCtx};
use crate::router::routes::RouteTable;
use crate::utils::config::{get_root_dir, init_log, init_runtime_context, RuntimeCtx};
use crate::utils::errors::Errors;
use crate::v1::blog::routes_list::RoutesListApi;
use crate::v1::blog::version::VersionApi;

// Modules
mod middleware;
mod router;
mod utils;
mod v1;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SERVER_NAME : &str = "HacBlogServer"; // for poem logging

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Lazily initialize the parameters variable so that is has a 'static lifetime.
// We exit if we can't read our parameters.
lazy_static! {
    static ref RUNTIME_CTX: RuntimeCtx = init_runtime_context();
}

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    // --------------- Initialize Server --------------
    // Announce ourselves.
    println!("Starting hac_blog_server!");

    // Initialize the server.
    blog_init();
    let config = &RUNTIME_CTX.parms.config;

    // --------------- Main Loop Set Up ---------------
    // Assign base URL.
    let api_url = format!("{}:{}{}", config.http_addr, config.http_port, "/v1");

    let endpoints = (VersionApi, RoutesListApi);
    let api_service =
        OpenApiService::new(endpoints, config.title.as_str(), env!("CARGO_PKG_VERSION")).server(api_url);

    // Allow the generated openapi specs to be retrieved from the server.
    let spec = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();
    let ui = api_service.swagger_ui();

    // The page shell for each route, mounted under the base path.
    let site = match SiteCtx::new(RouteTable::standard(), &config.title, &config.base_path) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("{}", e);
            return Err(std::io::Error::other(e.to_string()));
        }
    };
    let assets_dir = RUNTIME_CTX.project_root.join(&config.dist_dir).join("assets");
    let site = site_endpoint(site, &assets_dir);

    // Create the routes.
    let mut app = Route::new()
        .nest("/v1", api_service)
        .nest("/docs", ui)
        .at("/spec", spec)
        .at("/spec_yaml", spec_yaml);
    let prefix = config.base_prefix();
    app = if prefix.is_empty() { app.nest("/", site) } else { app.nest(prefix, site) };

    // Development-only interception layer in front of everything else.
    let chain = dev_chain(&RUNTIME_CTX.project_root);

    // ------------------ Main Loop -------------------
    let addr = format!("{}{}", "0.0.0.0:", config.http_port);
    info!("Serving {} at {}{} from {:?}", config.title, addr, config.base_path, RUNTIME_CTX.project_root);
    poem::Server::new(TcpListener::bind(addr))
        .name(SERVER_NAME)
        .run(app.with(chain))
        .await
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// blog_init:
// ---------------------------------------------------------------------------
/** Initialing all subsystems and data structures other than those needed
 * to configure the main loop processor.
 */
fn blog_init() {
    // Configure our log before anything else writes to it.
    init_log(&get_root_dir());

    // Force the reading of input parameters and initialization of runtime context.
    info!("{}", Errors::InputParms(format!("{:#?}", *RUNTIME_CTX)));

    // Log build info.
    print_version_info();
}

// ---------------------------------------------------------------------------
// dev_chain:
// ---------------------------------------------------------------------------
fn dev_chain(project_root: &Path) -> DevChain {
    let config = &RUNTIME_CTX.parms.config;
    let mut chain = DevChain::new();
    if config.enable_save_endpoint {
        info!("Save endpoint enabled: POST {} writes below {:?}", config.save_endpoint, project_root);
        chain = chain.push(SaveMessagesHandler::new(project_root, &config.save_endpoint));
    }
    info!("Development chain has {} handler(s)", chain.len());
    chain
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    // Log build info.
    info!("{}.", format!("\n*** Running HAC_BLOG={}, BRANCH={}, COMMIT={}, DIRTY={}, RUSTC={}",
                        option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
                        option_env!("GIT_BRANCH").unwrap_or("unknown"),
                        option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
                        option_env!("GIT_DIRTY").unwrap_or("unknown"),
                        option_env!("RUSTC_VERSION").unwrap_or("unknown")),
    );
}
