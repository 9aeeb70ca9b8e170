pub mod upload_http;

pub use upload_http::spawn_upload_server;
