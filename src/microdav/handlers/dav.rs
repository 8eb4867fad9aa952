use axum::{extract::Request, response::IntoResponse, Extension};
use dav_server::DavHandler;
use std::sync::Arc;

// hands the untouched request to the WebDAV engine
pub async fn dav(Extension(handler): Extension<Arc<DavHandler>>, request: Request) -> impl IntoResponse {
    handler.handle(request).await
}
