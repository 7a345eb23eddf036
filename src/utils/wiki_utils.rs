#![forbid(unsafe_code)]

use path_absolutize::Absolutize;
use std::ops::Deref;
use std::path::Path;

use poem::http::{header, StatusCode};
use poem::{Request, Response};

use log::{debug, LevelFilter};

// ***************************************************************************
//                                Constants
// ***************************************************************************
const HTML_CONTENT_TYPE  : &str = "text/html; charset=utf-8";
const PLAIN_CONTENT_TYPE : &str = "text/plain; charset=utf-8";

// ***************************************************************************
// GENERAL PUBLIC FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_absolute_path:
// ---------------------------------------------------------------------------
/** Replace tilde (~) and environment variable values in a path name and
 * then construct the absolute path name.  Unlike canonicalize, absolutize
 * does not care whether the file exists.
 *
 * On any failure the original path is returned unchanged.
 */
pub fn get_absolute_path(path: &str) -> String {
    // Replace ~ and environment variable values if possible.
    let s = match shellexpand::full(path) {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };

    // Convert to absolute path if necessary.
    let p = Path::new(s.deref());
    let p1 = match p.absolutize() {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };
    let p2 = match p1.to_str() {
        Some(x) => x,
        None => return path.to_owned(),
    };

    p2.to_owned()
}

// ---------------------------------------------------------------------------
// error_chain_string:
// ---------------------------------------------------------------------------
/** Flatten an error and all of its sources into a single line.  Template
 * errors keep the interesting part of the message in their source chain.
 */
pub fn error_chain_string(e: &dyn std::error::Error) -> String {
    let mut s = e.to_string();
    let mut cur = e.source();
    while let Some(src) = cur {
        s.push_str(": ");
        s.push_str(&src.to_string());
        cur = src.source();
    }
    s
}

// ***************************************************************************
//                             Response Builders
// ***************************************************************************
pub fn make_http_200(html: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .content_type(HTML_CONTENT_TYPE)
        .body(html)
}

/// Redirects use 302 Found, matching what browsers expect after a form post.
pub fn make_http_302(location: &str) -> Response {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .finish()
}

pub fn make_http_400(msg: String) -> Response {
    make_plain(StatusCode::BAD_REQUEST, msg)
}

pub fn make_http_404() -> Response {
    make_plain(StatusCode::NOT_FOUND, "404 page not found".to_string())
}

pub fn make_http_500(msg: String) -> Response {
    make_plain(StatusCode::INTERNAL_SERVER_ERROR, msg)
}

// ***************************************************************************
//                                  Traits
// ***************************************************************************
pub trait RequestDebug {
    type Req;
    fn get_request_info(&self) -> String;
}

// ---------------------------------------------------------------------------
// debug_request:
// ---------------------------------------------------------------------------
// Dump http request information to the log.
pub fn debug_request(http_req: &Request, req: &impl RequestDebug) {
    // Check that debug or higher logging is in effect.
    let level = log::max_level();
    if level < LevelFilter::Debug {
        return;
    }

    // Accumulate the output.
    let mut s = "\n".to_string();

    // Restate the method and URI.
    let uri = http_req.uri();
    s += format!("  Method: {}\n", http_req.method()).as_str();
    s += format!("  URI: {:?}\n", uri).as_str();

    // Accumulate the headers
    for v in http_req.headers().iter() {
         s += format!("  Header: {} = {:?} \n", v.0, v.1).as_str();
    };

    // Add the request's information.
    s += req.get_request_info().as_str();

    // Write the single log record.
    debug!("{}", s);
}

// ***************************************************************************
// PRIVATE FUNCTIONS
// ***************************************************************************
fn make_plain(status: StatusCode, msg: String) -> Response {
    Response::builder()
        .status(status)
        .content_type(PLAIN_CONTENT_TYPE)
        .body(msg)
}
