#![forbid(unsafe_code)]

use std::sync::Arc;

use log::{debug, error};
use poem::{Request, Response};

use crate::utils::errors::Errors;
use crate::utils::wiki_utils::{self, RequestDebug, error_chain_string, make_http_200, make_http_500};
use crate::wiki::page::{Page, Title};
use crate::wiki::templates::View;
use crate::wiki::WikiCtx;

// ***************************************************************************
//                          Request Definitions
// ***************************************************************************
struct ReqEditPage<'a> {
    title: &'a Title,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqEditPage<'_> {
    type Req = Title;
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(64);
        s.push_str("  Edit page:");
        s.push_str("\n    title: ");
        s.push_str(self.title.as_str());
        s
    }
}

// ---------------------------------------------------------------------------
// edit_handler:
// ---------------------------------------------------------------------------
/** Show the edit form, starting from an empty body for new pages. */
pub async fn edit_handler(ctx: Arc<WikiCtx>, http_req: Request, title: Title) -> Response {
    wiki_utils::debug_request(&http_req, &ReqEditPage { title: &title });

    let page = match ctx.store.load(&title) {
        Ok(p) => p,
        Err(Errors::PageNotFound(_)) => {
            debug!("Editing new page {}.", title);
            Page::empty(title)
        },
        Err(e) => {
            error!("Unable to load page {} for editing: {}", title, e);
            Page::empty(title)
        },
    };

    match ctx.templates.render(View::Edit, &page) {
        Ok(html) => make_http_200(html),
        Err(e) => {
            let msg = error_chain_string(&e);
            error!("Unable to render edit form for {}: {}", page.title, msg);
            make_http_500(msg)
        },
    }
}
