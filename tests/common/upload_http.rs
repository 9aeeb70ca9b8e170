use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

//===========
// App Factory
//===========

/// Routes shaped like the CMS upload API the transport targets:
/// - `/images/upload/` accepts multipart and answers a structured body
/// - `/files/upload/` always rejects with a structured error payload
/// - `/media/upload/` accepts but answers plain text
pub fn upload_router() -> Router {
    Router::new()
        .route("/images/upload/", post(accept_images))
        .route("/files/upload/", post(reject_quota))
        .route("/media/upload/", post(accept_plain))
}

/// Bind an ephemeral port, serve the router in the background, and return
/// the base URL.
pub async fn spawn_upload_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, upload_router())
            .await
            .expect("serve test app");
    });

    format!("http://{addr}")
}

//=========
// Handlers
//=========

async fn accept_images(multipart: Multipart) -> Json<Value> {
    let received = drain_multipart(multipart).await;

    Json(json!({
        "images": [{
            "url": format!("https://cdn.example.com/content/{}", received.file_name),
        }],
        "fields": received.fields,
    }))
}

async fn reject_quota(multipart: Multipart) -> (StatusCode, Json<Value>) {
    drain_multipart(multipart).await;

    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "errors": [{
                "message": "quota exceeded",
                "context": "plan limit",
            }],
        })),
    )
}

async fn accept_plain(multipart: Multipart) -> &'static str {
    drain_multipart(multipart).await;
    "created"
}

struct ReceivedUpload {
    file_name: String,
    fields: Value,
}

// Read the full request before answering so the client never sees the
// response while still streaming the body.
async fn drain_multipart(mut multipart: Multipart) -> ReceivedUpload {
    let mut file_name = String::new();
    let mut fields = serde_json::Map::new();

    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            file_name = field.file_name().unwrap_or_default().to_string();
            let _ = field.bytes().await.expect("file bytes");
        } else {
            let value = field.text().await.expect("field text");
            fields.insert(name, Value::String(value));
        }
    }

    ReceivedUpload {
        file_name,
        fields: Value::Object(fields),
    }
}
