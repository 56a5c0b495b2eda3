#![forbid(unsafe_code)]

use thiserror::Error;

/// Error enumerates the errors returned by this application.
#[derive(Error, Debug)]
pub enum Errors {
    /// Input parameter logging.
    #[error("hac_blog_server input parameters:\n{}", .0)]
    InputParms(String),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),

    /// Two route table entries match the same path.
    #[error("Duplicate route path in route table: {}", .0)]
    DuplicateRoute(String),

    /// A redirect names a path that is not in the route table.
    #[error("Route {} redirects to unknown path {}", .0, .1)]
    UnknownRedirect(String, String),

    /// Following redirects from a path never reaches a component.
    #[error("Redirect loop detected starting at route {}", .0)]
    RedirectLoop(String),

    #[error("Unable to render page template {}: {}", .0, .1)]
    TemplateError(String, String),
}
