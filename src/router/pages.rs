#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use log::{error, debug};
use poem::endpoint::{BoxEndpoint, StaticFilesEndpoint};
use poem::http::StatusCode;
use poem::web::{Data, Html, Redirect};
use poem::{get, handler, EndpointExt, IntoResponse, Request, Response, Route as PoemRoute};
use tera::{Context, Tera};

use crate::router::routes::{ComponentRef, Route, RouteTable, RouteTarget};
use crate::utils::errors::Errors;

const SHELL_TEMPLATE : &str = "index.html";

// ***************************************************************************
//                                 SiteCtx
// ***************************************************************************
/** Everything needed to answer a navigation request: the validated route
 * table and the page shell template.
 */
pub struct SiteCtx {
    routes: RouteTable,
    tera: Tera,
    title: String,
    base_path: String,
}

impl SiteCtx {
    pub fn new(routes: RouteTable, title: &str, base_path: &str) -> Result<Self, Errors> {
        routes.validate()?;

        let mut tera = Tera::default();
        tera.add_raw_template(SHELL_TEMPLATE, include_str!("../../templates/index.html"))
            .map_err(|e| Errors::TemplateError(SHELL_TEMPLATE.to_string(), e.to_string()))?;

        Ok(Self {routes, tera, title: title.to_string(), base_path: base_path.to_string()})
    }

    /// Prefix a site path with the base path.
    pub fn site_url(&self, path: &str) -> String {
        format!("{}{}", self.base_path.trim_end_matches('/'), path)
    }

    pub fn render_shell(&self, route: &Route, component: ComponentRef) -> Result<String, Errors> {
        let mut ctx = Context::new();
        ctx.insert("title", &self.title);
        ctx.insert("base_path", &self.base_path);
        ctx.insert("route_name", route.name.unwrap_or(route.path));
        ctx.insert("route_path", route.path);
        ctx.insert("component", component.component().as_str());
        ctx.insert("load_mode", component.load_mode());
        self.tera.render(SHELL_TEMPLATE, &ctx)
            .map_err(|e| Errors::TemplateError(SHELL_TEMPLATE.to_string(), e.to_string()))
    }

    /// Answer a navigation to a path relative to the base path.
    pub fn page(&self, path: &str) -> Response {
        let route = match self.routes.lookup(path) {
            Some(r) => r,
            None => {
                debug!("No route for {}", path);
                return StatusCode::NOT_FOUND.into_response();
            }
        };

        match route.target {
            RouteTarget::Redirect(to) => Redirect::temporary(self.site_url(to)).into_response(),
            RouteTarget::Component(component) => match self.render_shell(route, component) {
                Ok(html) => Html(html).into_response(),
                Err(e) => {
                    error!("{}", e);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            },
        }
    }
}

// ***************************************************************************
//                                Endpoints
// ***************************************************************************
#[handler]
pub fn render_page(req: &Request, Data(site): Data<&Arc<SiteCtx>>) -> Response {
    site.page(req.uri().path())
}

// ---------------------------------------------------------------------------
// site_endpoint:
// ---------------------------------------------------------------------------
/** The routes mounted under the base path.  Built assets are served when the
 * assets directory exists.
 */
pub fn site_endpoint(site: Arc<SiteCtx>, assets_dir: &Path) -> BoxEndpoint<'static, Response> {
    let mut app = PoemRoute::new()
        .at("/", get(render_page))
        .at("/*path", get(render_page));
    if assets_dir.is_dir() {
        app = app.nest("/assets", StaticFilesEndpoint::new(assets_dir));
    }
    app.data(site).boxed()
}
