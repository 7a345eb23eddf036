#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use poem::{get, post, Endpoint, Route};
use poem_openapi::OpenApiService;

use crate::utils::errors::Errors;
use crate::wiki::front_page::FrontPageEndpoint;
use crate::wiki::page::{PageStore, Title};
use crate::wiki::router::{make_handler, Op, TitleMatcher};
use crate::wiki::templates::TemplateRegistry;
use crate::wiki::version::VersionApi;

pub mod edit;
pub mod front_page;
pub mod page;
pub mod router;
pub mod save;
pub mod templates;
pub mod version;
pub mod view;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const API_PREFIX : &str = "/api";

// ***************************************************************************
//                                 WikiCtx
// ***************************************************************************
/** Everything a request handler needs.  Built once at startup and shared
 * read-only; the page files are the only mutable state.
 */
#[derive(Debug)]
pub struct WikiCtx {
    pub store: PageStore,
    pub templates: TemplateRegistry,
    pub matcher: TitleMatcher,
    pub front_page: Title,
}

impl WikiCtx {
    /// Assemble the context.  Templates come from `templates_dir` when given,
    /// otherwise the built-in ones are used.
    pub fn new(data_dir: &Path, templates_dir: Option<&Path>, front_page: &str) -> Result<Self, Errors> {
        let templates = match templates_dir {
            Some(dir) => TemplateRegistry::from_dir(dir)?,
            None => TemplateRegistry::builtin()?,
        };
        Ok(WikiCtx {
            store: PageStore::new(data_dir),
            templates,
            matcher: TitleMatcher::new()?,
            front_page: Title::parse(front_page)?,
        })
    }
}

// ---------------------------------------------------------------------------
// build_app:
// ---------------------------------------------------------------------------
/** All wiki routes.  Paths outside these prefixes fall through to poem's
 * 404; titles under them are checked by the `make_handler` wrapper.
 */
pub fn build_app(ctx: Arc<WikiCtx>, api_title: &str, server_url: &str) -> impl Endpoint {
    let api_service = OpenApiService::new(VersionApi, api_title, env!("CARGO_PKG_VERSION"))
        .server(server_url.to_string() + API_PREFIX);

    Route::new()
        .at("/", get(FrontPageEndpoint::new(&ctx.front_page)))
        .at("/view/*title", get(make_handler(&ctx, Op::View, view::view_handler)))
        .at("/edit/*title", get(make_handler(&ctx, Op::Edit, edit::edit_handler)))
        .at("/save/*title", post(make_handler(&ctx, Op::Save, save::save_handler)))
        .nest(API_PREFIX, api_service)
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use poem::http::{header, StatusCode};
    use poem::test::{TestClient, TestResponse};
    use tempfile::TempDir;

    fn test_client() -> (TestClient<impl Endpoint>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Arc::new(WikiCtx::new(dir.path(), None, "FrontPage").unwrap());
        (TestClient::new(build_app(ctx, "Wiki Server", "http://localhost:8080")), dir)
    }

    async fn body_text(resp: TestResponse) -> String {
        resp.0.into_body().into_string().await.unwrap()
    }

    fn entries(dir: &TempDir) -> usize {
        fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn view_of_missing_page_redirects_to_edit() {
        let (cli, _dir) = test_client();
        let resp = cli.get("/view/Abc123").send().await;
        resp.assert_status(StatusCode::FOUND);
        resp.assert_header(header::LOCATION, "/edit/Abc123");
    }

    #[tokio::test]
    async fn edit_of_missing_page_shows_empty_form() {
        let (cli, dir) = test_client();
        let resp = cli.get("/edit/Abc123").send().await;
        resp.assert_status_is_ok();
        let html = body_text(resp).await;
        assert!(html.contains("Editing Abc123"));
        assert!(html.contains(r#"action="/save/Abc123""#));
        assert!(html.contains("></textarea>"));
        assert_eq!(entries(&dir), 0);
    }

    #[tokio::test]
    async fn save_then_view() {
        let (cli, dir) = test_client();
        let resp = cli.post("/save/Abc123").form(&[("body", "Hello")]).send().await;
        resp.assert_status(StatusCode::FOUND);
        resp.assert_header(header::LOCATION, "/view/Abc123");
        assert_eq!(fs::read(dir.path().join("Abc123.txt")).unwrap(), b"Hello".to_vec());

        let resp = cli.get("/view/Abc123").send().await;
        resp.assert_status_is_ok();
        let html = body_text(resp).await;
        assert!(html.contains("<h1>Abc123</h1>"));
        assert!(html.contains("Hello"));
    }

    #[tokio::test]
    async fn edit_of_existing_page_shows_body() {
        let (cli, _dir) = test_client();
        cli.post("/save/Notes").form(&[("body", "first draft")]).send().await
            .assert_status(StatusCode::FOUND);
        let html = body_text(cli.get("/edit/Notes").send().await).await;
        assert!(html.contains(">first draft</textarea>"));
    }

    #[tokio::test]
    async fn saved_markup_is_escaped() {
        let (cli, _dir) = test_client();
        cli.post("/save/Xss").form(&[("body", "<b>bold</b> [Other]")]).send().await
            .assert_status(StatusCode::FOUND);
        let html = body_text(cli.get("/view/Xss").send().await).await;
        assert!(!html.contains("<b>bold"));
        assert!(html.contains("&lt;b&gt;bold"));
        assert!(html.contains(r#"<a href="/view/Other">Other</a>"#));
    }

    #[tokio::test]
    async fn save_without_body_field_saves_empty_page() {
        let (cli, dir) = test_client();
        cli.post("/save/Blank").form(&[("other", "x")]).send().await
            .assert_status(StatusCode::FOUND);
        assert_eq!(fs::read(dir.path().join("Blank.txt")).unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn save_keeps_non_utf8_bytes() {
        let (cli, dir) = test_client();
        let resp = cli.post("/save/Bin")
            .content_type("application/x-www-form-urlencoded")
            .body("body=%FF%FE")
            .send().await;
        resp.assert_status(StatusCode::FOUND);
        assert_eq!(fs::read(dir.path().join("Bin.txt")).unwrap(), vec![0xFF, 0xFE]);
    }

    #[tokio::test]
    async fn save_of_non_form_body_saves_empty_page() {
        let (cli, dir) = test_client();
        let resp = cli.post("/save/Plain")
            .content_type("text/plain")
            .body("hello")
            .send().await;
        resp.assert_status(StatusCode::FOUND);
        resp.assert_header(header::LOCATION, "/view/Plain");
        assert_eq!(fs::read(dir.path().join("Plain.txt")).unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn save_reads_body_from_query_string() {
        let (cli, dir) = test_client();
        cli.post("/save/Query").query("body", &"from query").send().await
            .assert_status(StatusCode::FOUND);
        assert_eq!(fs::read(dir.path().join("Query.txt")).unwrap(), b"from query".to_vec());
    }

    #[tokio::test]
    async fn save_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let ctx = Arc::new(WikiCtx::new(&missing, None, "FrontPage").unwrap());
        let cli = TestClient::new(build_app(ctx, "Wiki Server", "http://localhost:8080"));
        let resp = cli.post("/save/Abc").form(&[("body", "x")]).send().await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body_text(resp).await.is_empty());
    }

    #[tokio::test]
    async fn invalid_paths_are_404_without_touching_disk() {
        let (cli, dir) = test_client();
        for path in ["/view/../etc", "/delete/x", "/view/", "/view/a.b", "/edit/a/b",
                     "/view/has%20space", "/nothing"] {
            cli.get(path).send().await.assert_status(StatusCode::NOT_FOUND);
        }
        cli.post("/save/bad.name").form(&[("body", "x")]).send().await
            .assert_status(StatusCode::NOT_FOUND);
        assert_eq!(entries(&dir), 0);
    }

    #[tokio::test]
    async fn wrong_method_is_rejected() {
        let (cli, dir) = test_client();
        cli.get("/save/Abc").send().await.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(entries(&dir), 0);
    }

    #[tokio::test]
    async fn root_redirects_to_front_page() {
        let (cli, _dir) = test_client();
        let resp = cli.get("/").send().await;
        resp.assert_status(StatusCode::FOUND);
        resp.assert_header(header::LOCATION, "/view/FrontPage");
    }

    #[tokio::test]
    async fn version_endpoint() {
        let (cli, _dir) = test_client();
        let resp = cli.get("/api/version").send().await;
        resp.assert_status_is_ok();
        let json = resp.json().await;
        json.value().object().get("result_code").assert_string("0");
        json.value().object().get("wiki_name").assert_string("wiki_server");
    }

    #[test]
    fn bad_front_page_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(WikiCtx::new(dir.path(), None, "Front Page"), Err(Errors::InvalidTitle(_))));
    }

    #[test]
    fn missing_templates_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("templates");
        assert!(WikiCtx::new(dir.path(), Some(missing.as_path()), "FrontPage").is_err());
    }
}
