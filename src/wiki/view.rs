#![forbid(unsafe_code)]

use std::sync::Arc;

use log::{error, info};
use poem::{Request, Response};

use crate::utils::errors::Errors;
use crate::utils::wiki_utils::{self, RequestDebug, error_chain_string, make_http_200, make_http_302, make_http_500};
use crate::wiki::page::Title;
use crate::wiki::router::Op;
use crate::wiki::templates::View;
use crate::wiki::WikiCtx;

// ***************************************************************************
//                          Request Definitions
// ***************************************************************************
struct ReqViewPage<'a> {
    title: &'a Title,
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqViewPage<'_> {
    type Req = Title;
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(64);
        s.push_str("  View page:");
        s.push_str("\n    title: ");
        s.push_str(self.title.as_str());
        s
    }
}

// ---------------------------------------------------------------------------
// view_handler:
// ---------------------------------------------------------------------------
/** Show a page.  Pages that don't exist yet redirect to their edit form. */
pub async fn view_handler(ctx: Arc<WikiCtx>, http_req: Request, title: Title) -> Response {
    wiki_utils::debug_request(&http_req, &ReqViewPage { title: &title });

    let page = match ctx.store.load(&title) {
        Ok(p) => p,
        Err(Errors::PageNotFound(_)) => {
            info!("Page {} does not exist, redirecting to edit.", title);
            return make_http_302(&Op::Edit.path(&title));
        },
        Err(e) => {
            // Unreadable pages are treated like missing ones.
            error!("Unable to load page {}: {}", title, e);
            return make_http_302(&Op::Edit.path(&title));
        },
    };

    match ctx.templates.render(View::View, &page) {
        Ok(html) => make_http_200(html),
        Err(e) => {
            let msg = error_chain_string(&e);
            error!("Unable to render page {}: {}", title, msg);
            make_http_500(msg)
        },
    }
}
