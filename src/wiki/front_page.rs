#![forbid(unsafe_code)]

use poem::{Endpoint, Request, Response};

use crate::utils::wiki_utils::make_http_302;
use crate::wiki::page::Title;
use crate::wiki::router::Op;

// ---------------------------------------------------------------------------
// FrontPageEndpoint:
// ---------------------------------------------------------------------------
/** Redirects the web root to the configured front page. */
pub struct FrontPageEndpoint {
    location: String,
}

impl FrontPageEndpoint {
    pub fn new(front_page: &Title) -> Self {
        FrontPageEndpoint { location: Op::View.path(front_page) }
    }
}

impl Endpoint for FrontPageEndpoint {
    type Output = Response;

    async fn call(&self, _req: Request) -> poem::Result<Self::Output> {
        Ok(make_http_302(&self.location))
    }
}
