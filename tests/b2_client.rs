use std::sync::{Arc, Mutex};

use bbup::b2::B2Client;
use bbup_core::contract::{Storage, UploadRequest};
use bbup_core::error::AuthError;
use bbup_core::profile::Credentials;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
struct Recorded {
    request_line: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Copy, Default)]
struct Stub {
    restricted: bool,
    reject_auth: bool,
    fail_upload: bool,
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<Recorded> {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    };

    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let length: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);

    let mut body = raw[head_end..].to_vec();
    while body.len() < length {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&buf[..n]),
        }
    }
    Some(Recorded {
        request_line,
        headers,
        body,
    })
}

/// Minimal stand-in for the B2 API endpoints bbup calls.
async fn serve_b2(stub: Stub) -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let api = base.clone();
    let log = seen.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let api = api.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Some(req) = read_request(&mut socket).await else {
                    return;
                };
                log.lock().unwrap().push(req.clone());

                let path = req.request_line.split(' ').nth(1).unwrap_or_default();
                let allowed = if stub.restricted {
                    r#"{"bucketId":"b-1","bucketName":"photos"}"#
                } else {
                    r#"{"bucketId":null,"bucketName":null}"#
                };
                let (status, body) = match path {
                    "/b2api/v2/b2_authorize_account" if stub.reject_auth => (
                        "401 Unauthorized",
                        r#"{"status":401,"code":"unauthorized","message":"bad key"}"#.to_string(),
                    ),
                    "/b2api/v2/b2_authorize_account" => (
                        "200 OK",
                        format!(
                            r#"{{"accountId":"acc","authorizationToken":"acct-token","apiUrl":"{api}","downloadUrl":"{api}","allowed":{allowed}}}"#
                        ),
                    ),
                    "/b2api/v2/b2_list_buckets" => (
                        "200 OK",
                        r#"{"buckets":[{"bucketId":"b-1","bucketName":"photos"}]}"#.to_string(),
                    ),
                    "/b2api/v2/b2_get_upload_url" => (
                        "200 OK",
                        format!(
                            r#"{{"bucketId":"b-1","uploadUrl":"{api}/upload","authorizationToken":"upload-token"}}"#
                        ),
                    ),
                    "/upload" if stub.fail_upload => (
                        "503 Service Unavailable",
                        r#"{"status":503,"code":"service_unavailable","message":"try later"}"#
                            .to_string(),
                    ),
                    "/upload" => (
                        "200 OK",
                        format!(
                            r#"{{"fileId":"4_z1","fileName":"{}","contentLength":{},"contentType":"{}"}}"#,
                            req.header("X-Bz-File-Name").unwrap_or_default(),
                            req.body.len(),
                            req.header("Content-Type").unwrap_or_default()
                        ),
                    ),
                    _ => ("404 Not Found", String::from("{}")),
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (base, seen)
}

fn credentials(bucket: &str) -> Credentials {
    Credentials {
        key_id: "key-id".into(),
        app_key: "secret".into(),
        bucket: bucket.into(),
    }
}

#[tokio::test]
async fn authorizes_and_resolves_bucket() {
    let (base, seen) = serve_b2(Stub::default()).await;
    let client = B2Client::with_api_base(format!("{base}/"));

    let handle = client.authorize(&credentials("photos")).await.unwrap();
    assert_eq!(handle.bucket_id, "b-1");
    assert_eq!(handle.bucket_name, "photos");
    assert_eq!(handle.authorization_token, "acct-token");

    let seen = seen.lock().unwrap();
    let auth = &seen[0];
    assert!(auth.request_line.starts_with("GET /b2api/v2/b2_authorize_account"));
    // "key-id:secret" in base64
    assert_eq!(auth.header("Authorization"), Some("Basic a2V5LWlkOnNlY3JldA=="));
    assert_eq!(seen[1].header("Authorization"), Some("acct-token"));
}

#[tokio::test]
async fn unknown_bucket_is_reported() {
    let (base, _) = serve_b2(Stub::default()).await;
    let client = B2Client::with_api_base(base);

    let err = client.authorize(&credentials("videos")).await.unwrap_err();
    assert!(matches!(err, AuthError::BucketNotFound(ref b) if b == "videos"));
}

#[tokio::test]
async fn restricted_key_is_refused() {
    let (base, seen) = serve_b2(Stub {
        restricted: true,
        ..Stub::default()
    })
    .await;
    let client = B2Client::with_api_base(base);

    let err = client.authorize(&credentials("photos")).await.unwrap_err();
    assert!(matches!(err, AuthError::RestrictedKey));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_credentials_carry_the_api_message() {
    let (base, _) = serve_b2(Stub {
        reject_auth: true,
        ..Stub::default()
    })
    .await;
    let client = B2Client::with_api_base(base);

    match client.authorize(&credentials("photos")).await {
        Err(AuthError::Rejected(msg)) => {
            assert!(msg.contains("unauthorized"), "got {msg}");
            assert!(msg.contains("bad key"), "got {msg}");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn uploads_with_sha1_and_encoded_name() {
    let (base, seen) = serve_b2(Stub::default()).await;
    let client = B2Client::with_api_base(base);
    let handle = client.authorize(&credentials("photos")).await.unwrap();

    let dir = tempdir().unwrap();
    let source = dir.path().join("hello.txt");
    std::fs::write(&source, b"hello world").unwrap();

    let uploaded = client
        .upload_file(
            &handle,
            &UploadRequest {
                source: source.clone(),
                file_name: "notes/hello world.txt".into(),
                content_type: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(uploaded.file_id, "4_z1");
    assert_eq!(uploaded.content_length, 11);

    let seen = seen.lock().unwrap();
    let upload = seen
        .iter()
        .find(|r| r.request_line.starts_with("POST /upload"))
        .expect("upload request recorded");
    assert_eq!(upload.header("Authorization"), Some("upload-token"));
    assert_eq!(upload.header("X-Bz-File-Name"), Some("notes/hello%20world.txt"));
    assert_eq!(upload.header("Content-Type"), Some("b2/x-auto"));
    assert_eq!(
        upload.header("X-Bz-Content-Sha1"),
        Some("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed")
    );
    assert_eq!(upload.header("Content-Length"), Some("11"));
    assert_eq!(upload.body, b"hello world");
}

#[tokio::test]
async fn large_file_is_streamed_with_declared_length() {
    let (base, seen) = serve_b2(Stub::default()).await;
    let client = B2Client::with_api_base(base);
    let handle = client.authorize(&credentials("photos")).await.unwrap();

    let dir = tempdir().unwrap();
    let source = dir.path().join("video.bin");
    let data: Vec<u8> = (0..1_500_000u32).map(|i| (i % 253) as u8).collect();
    std::fs::write(&source, &data).unwrap();

    let uploaded = client
        .upload_file(
            &handle,
            &UploadRequest {
                source: source.clone(),
                file_name: "video.bin".into(),
                content_type: Some("application/octet-stream".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(uploaded.content_length, 1_500_000);

    let seen = seen.lock().unwrap();
    let upload = seen
        .iter()
        .find(|r| r.request_line.starts_with("POST /upload"))
        .expect("upload request recorded");
    assert_eq!(upload.header("Content-Length"), Some("1500000"));
    assert!(upload.header("Transfer-Encoding").is_none());
    assert_eq!(upload.body, data);
}

#[tokio::test]
async fn failed_upload_is_an_error() {
    let (base, _) = serve_b2(Stub {
        fail_upload: true,
        ..Stub::default()
    })
    .await;
    let client = B2Client::with_api_base(base);
    let handle = client.authorize(&credentials("photos")).await.unwrap();

    let dir = tempdir().unwrap();
    let source = dir.path().join("a.bin");
    std::fs::write(&source, [1u8, 2, 3]).unwrap();

    let err = client
        .upload_file(
            &handle,
            &UploadRequest {
                source: source.clone(),
                file_name: "a.bin".into(),
                content_type: Some("application/octet-stream".into()),
            },
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("try later"), "got {err}");
}
