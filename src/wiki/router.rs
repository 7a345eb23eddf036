#![forbid(unsafe_code)]

use std::future::Future;
use std::sync::Arc;

use log::debug;
use poem::{Endpoint, Request, Response};
use regex::Regex;

use crate::utils::errors::Errors;
use crate::utils::wiki_utils::make_http_404;
use crate::wiki::page::Title;
use crate::wiki::WikiCtx;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Every titled request must match this in full.
const WIKI_PATH_PATTERN : &str = r"^/(edit|save|view)/([a-zA-Z0-9]+)$";

// ***************************************************************************
//                                   Op
// ***************************************************************************
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    View,
    Edit,
    Save,
}

impl Op {
    fn from_prefix(s: &str) -> Option<Op> {
        match s {
            "view" => Some(Op::View),
            "edit" => Some(Op::Edit),
            "save" => Some(Op::Save),
            _ => None,
        }
    }

    /// Path to this operation on a page, e.g. `/edit/FrontPage`.
    pub fn path(self, title: &Title) -> String {
        let prefix = match self {
            Op::View => "view",
            Op::Edit => "edit",
            Op::Save => "save",
        };
        format!("/{}/{}", prefix, title)
    }
}

// ***************************************************************************
//                               TitleMatcher
// ***************************************************************************
#[derive(Debug)]
pub struct TitleMatcher {
    re: Regex,
}

impl TitleMatcher {
    pub fn new() -> Result<Self, Errors> {
        let re = Regex::new(WIKI_PATH_PATTERN)
            .map_err(|e| Errors::WikiError(format!("Invalid wiki path pattern: {}", e)))?;
        Ok(TitleMatcher { re })
    }

    /// Split a request path into its operation and validated title.
    pub fn match_path(&self, path: &str) -> Option<(Op, Title)> {
        let caps = self.re.captures(path)?;
        let op = Op::from_prefix(caps.get(1)?.as_str())?;
        let title = Title::parse(caps.get(2)?.as_str()).ok()?;
        Some((op, title))
    }
}

// ***************************************************************************
//                              TitledEndpoint
// ***************************************************************************
/** Wraps a page handler so that it only runs for paths that match the wiki
 * path pattern for its operation.  Anything else gets a 404 and the handler
 * is never called, so handlers never look at the raw path.
 */
pub struct TitledEndpoint<F> {
    ctx: Arc<WikiCtx>,
    op: Op,
    handler: F,
}

// ---------------------------------------------------------------------------
// make_handler:
// ---------------------------------------------------------------------------
pub fn make_handler<F, Fut>(ctx: &Arc<WikiCtx>, op: Op, handler: F) -> TitledEndpoint<F>
where
    F: Fn(Arc<WikiCtx>, Request, Title) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send,
{
    TitledEndpoint { ctx: Arc::clone(ctx), op, handler }
}

impl<F, Fut> Endpoint for TitledEndpoint<F>
where
    F: Fn(Arc<WikiCtx>, Request, Title) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send,
{
    type Output = Response;

    async fn call(&self, req: Request) -> poem::Result<Self::Output> {
        let matched = self.ctx.matcher.match_path(req.uri().path());
        match matched {
            Some((op, title)) if op == self.op => {
                Ok((self.handler)(Arc::clone(&self.ctx), req, title).await)
            },
            _ => {
                debug!("Rejected wiki path: {}", req.uri().path());
                Ok(make_http_404())
            },
        }
    }
}
