#![forbid(unsafe_code)]

use std::sync::Arc;

use log::{error, info};
use percent_encoding::percent_decode;
use poem::{Request, Response};

use crate::utils::wiki_utils::{self, RequestDebug, error_chain_string, make_http_302, make_http_400, make_http_500};
use crate::wiki::page::{Page, Title};
use crate::wiki::router::Op;
use crate::wiki::WikiCtx;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const FORM_CONTENT_TYPE : &str  = "application/x-www-form-urlencoded";
const BODY_FIELD        : &[u8] = b"body";

// ***************************************************************************
//                          Request Definitions
// ***************************************************************************
struct ReqSavePage<'a> {
    title: &'a Title,
    body: &'a [u8],
}

// Implement the debug record trait for logging.
impl RequestDebug for ReqSavePage<'_> {
    type Req = Vec<u8>;
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(128);
        s.push_str("  Save page:");
        s.push_str("\n    title: ");
        s.push_str(self.title.as_str());
        s.push_str("\n    body bytes: ");
        s.push_str(&self.body.len().to_string());
        s
    }
}

// ---------------------------------------------------------------------------
// save_handler:
// ---------------------------------------------------------------------------
/** Store the posted body and redirect to the page.
 *
 * The `body` field is taken from a urlencoded request body first and then
 * from the query string.  Other content types carry no form, so the field
 * is missing and an empty page is saved.  Field values are percent-decoded
 * to raw bytes and stored as-is.
 */
pub async fn save_handler(ctx: Arc<WikiCtx>, mut http_req: Request, title: Title) -> Response {
    let raw = match http_req.take_body().into_vec().await {
        Ok(raw) => raw,
        Err(e) => {
            let msg = format!("Unable to read request body for page {}: {}", title, e);
            error!("{}", msg);
            return make_http_400(msg);
        },
    };

    let posted = if is_form(&http_req) { form_value(&raw, BODY_FIELD) } else { None };
    let body = posted
        .or_else(|| http_req.uri().query().and_then(|q| form_value(q.as_bytes(), BODY_FIELD)))
        .unwrap_or_default();
    wiki_utils::debug_request(&http_req, &ReqSavePage { title: &title, body: &body });

    let page = Page::new(title, body);
    match ctx.store.save(&page) {
        Ok(()) => {
            info!("Saved page {} ({} bytes).", page.title, page.body.len());
            make_http_302(&Op::View.path(&page.title))
        },
        Err(e) => {
            let msg = error_chain_string(&e);
            error!("Unable to save page {}: {}", page.title, msg);
            make_http_500(msg)
        },
    }
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// is_form:
// ---------------------------------------------------------------------------
fn is_form(http_req: &Request) -> bool {
    http_req.content_type().map_or(false, |ct| {
        ct.split(';').next().map_or(false, |mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
    })
}

// ---------------------------------------------------------------------------
// form_value:
// ---------------------------------------------------------------------------
/** Return the decoded value of the first `name` field in urlencoded data. */
fn form_value(raw: &[u8], name: &[u8]) -> Option<Vec<u8>> {
    raw.split(|b| *b == b'&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| {
            let mut kv = pair.splitn(2, |b| *b == b'=');
            let key = decode_component(kv.next()?);
            if key != name {
                return None;
            }
            Some(decode_component(kv.next().unwrap_or_default()))
        })
}

// ---------------------------------------------------------------------------
// decode_component:
// ---------------------------------------------------------------------------
// '+' is a space; malformed escapes are kept literally.
fn decode_component(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw.iter().map(|b| if *b == b'+' { b' ' } else { *b }).collect();
    percent_decode(&spaced).collect()
}
