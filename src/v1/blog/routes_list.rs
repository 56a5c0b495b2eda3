#![forbid(unsafe_code)]

use poem_openapi::{ OpenApi, payload::Json, Object };

use crate::router::routes::{Route, RouteTable, RouteTarget};

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct RoutesListApi;

#[derive(Object, Debug)]
struct RouteItem
{
    path: String,
    name: Option<String>,
    component: Option<String>,
    load_mode: Option<String>,
    redirect: Option<String>,
}

#[derive(Object, Debug)]
struct RespRoutesList
{
    result_code: String,
    result_msg: String,
    num_routes: i32,
    routes: Vec<RouteItem>,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl RoutesListApi {
    #[oai(path = "/blog/routes", method = "get")]
    async fn list_routes(&self) -> Json<RespRoutesList> {
        Json(RespRoutesList::process(&RouteTable::standard()))
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RouteItem {
    fn new(route: &Route) -> Self {
        let (component, load_mode, redirect) = match route.target {
            RouteTarget::Component(c) =>
                (Some(c.component().to_string()), Some(c.load_mode().to_string()), None),
            RouteTarget::Redirect(to) => (None, None, Some(to.to_string())),
        };
        Self {path: route.path.to_string(),
              name: route.name.map(str::to_string),
              component, load_mode, redirect}
    }
}

impl RespRoutesList {
    fn process(table: &RouteTable) -> Self {
        let routes: Vec<RouteItem> = table.routes().iter().map(RouteItem::new).collect();
        Self {result_code: "0".to_string(),
              result_msg: "success".to_string(),
              num_routes: routes.len() as i32,
              routes}
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_covers_every_route() {
        let resp = RespRoutesList::process(&RouteTable::standard());
        assert_eq!(resp.num_routes, 7);

        let root = resp.routes.iter().find(|r| r.path == "/").unwrap();
        assert_eq!(root.redirect.as_deref(), Some("/home"));
        assert!(root.component.is_none());

        let board = resp.routes.iter().find(|r| r.path == "/message-board").unwrap();
        assert_eq!(board.component.as_deref(), Some("MessageBoard"));
        assert_eq!(board.load_mode.as_deref(), Some("lazy"));
    }
}
