#![forbid(unsafe_code)]

use poem_openapi::{ OpenApi, payload::Json, Object };

// From cargo.toml.
const WIKI_NAME   : &str = env!("CARGO_PKG_NAME");
const WIKI_VERSION: &str = env!("CARGO_PKG_VERSION");

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
pub struct VersionApi;

#[derive(Object)]
struct RespVersion
{
    result_code: String,
    result_msg: String,
    wiki_name: String,
    wiki_version: String,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl VersionApi {
    #[oai(path = "/version", method = "get")]
    async fn get_version(&self) -> Json<RespVersion> {
        Json(RespVersion::process())
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespVersion {
    fn process() -> RespVersion {
        RespVersion {
            result_code: "0".to_string(),
            result_msg: "success".to_string(),
            wiki_name: WIKI_NAME.to_string(),
            wiki_version: WIKI_VERSION.to_string(),
        }
    }
}
