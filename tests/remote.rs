mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use common::*;
use nupkg_meta::{
    ExtractionError, ExtractorConfig, HttpOptions, HttpRangeReader, ReadAt, extract_from_reader,
};

/// How the test server treats `Range` headers on GET.
#[derive(Debug, Clone, Copy)]
enum Ranges {
    Honoured,
    /// Advertised on HEAD, then answered with the whole body and 200
    Ignored,
}

/// Serve `body` over plain HTTP/1.1, one request per connection.
async fn serve(body: Vec<u8>, ranges: Ranges) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Arc::new(body);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(respond(stream, body.clone(), ranges));
        }
    });

    format!("http://{addr}/Foo.1.0.0.nupkg")
}

async fn respond(mut stream: TcpStream, body: Arc<Vec<u8>>, ranges: Ranges) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let request = String::from_utf8_lossy(&request).into_owned();
    let range = request.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.eq_ignore_ascii_case("range")
            .then(|| value.trim().to_string())
    });

    let mut head = String::new();
    let payload: &[u8] = if request.starts_with("HEAD ") {
        head.push_str("HTTP/1.1 200 OK\r\n");
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        &[]
    } else {
        match (range, ranges) {
            (Some(range), Ranges::Honoured) => {
                let (start, end) = parse_range(&range, body.len());
                head.push_str("HTTP/1.1 206 Partial Content\r\n");
                head.push_str(&format!("Content-Range: bytes {start}-{end}/{}\r\n", body.len()));
                head.push_str(&format!("Content-Length: {}\r\n", end - start + 1));
                &body[start..=end]
            }
            _ => {
                head.push_str("HTTP/1.1 200 OK\r\n");
                head.push_str(&format!("Content-Length: {}\r\n", body.len()));
                &body[..]
            }
        }
    };
    head.push_str("Accept-Ranges: bytes\r\nConnection: close\r\n\r\n");

    // The client may hang up early once it has rejected a response
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(payload).await;
    let _ = stream.shutdown().await;
}

/// Parse `bytes=<start>-<end>`, clamping the end to the body.
fn parse_range(value: &str, len: usize) -> (usize, usize) {
    let (start, end) = value
        .trim_start_matches("bytes=")
        .split_once('-')
        .unwrap();
    let start: usize = start.parse().unwrap();
    let end = end
        .parse::<usize>()
        .map_or(len - 1, |end| end.min(len - 1));
    (start, end)
}

/// A package whose bulk sits in a payload entry the extractor never reads.
fn bulky_package() -> Vec<u8> {
    package_skeleton()
        .stored("lib/netcoreapp3.0/payload.bin", &vec![7u8; 256 * 1024])
        .deflated("DummyProject.DummyPackage.nuspec", DUMMY_NUSPEC.as_bytes())
        .build()
}

fn options() -> HttpOptions {
    HttpOptions {
        timeout: Duration::from_secs(5),
        max_retry: 2,
    }
}

#[tokio::test]
async fn extracts_over_range_requests() {
    let bytes = bulky_package();
    let url = serve(bytes.clone(), Ranges::Honoured).await;

    let reader = Arc::new(HttpRangeReader::with_options(url, options()).await.unwrap());
    assert_eq!(reader.size(), bytes.len() as u64);

    let metadata = extract_from_reader(reader.clone(), &ExtractorConfig::default())
        .await
        .unwrap();
    assert_eq!(metadata.package_name, "DummyProject.DummyPackage");
    assert_eq!(metadata.package_version, "1.0.0");

    // Tail, central directory and the manifest entry only
    let transferred = reader.transferred_bytes();
    assert!(transferred > 0);
    assert!(
        transferred < bytes.len() as u64 / 10,
        "fetched {transferred} of {} bytes",
        bytes.len()
    );
}

#[tokio::test]
async fn reads_are_clamped_to_the_object() {
    let bytes = dummy_package();
    let url = serve(bytes.clone(), Ranges::Honoured).await;
    let reader = HttpRangeReader::with_options(url, options()).await.unwrap();

    let mut buf = vec![0u8; 64];
    let offset = bytes.len() as u64 - 10;
    assert_eq!(reader.read_at(offset, &mut buf).await.unwrap(), 10);
    assert_eq!(&buf[..10], &bytes[bytes.len() - 10..]);
    assert_eq!(reader.read_at(bytes.len() as u64, &mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn server_ignoring_ranges_is_rejected() {
    let url = serve(dummy_package(), Ranges::Ignored).await;
    let reader = Arc::new(HttpRangeReader::with_options(url, options()).await.unwrap());

    let mut buf = [0u8; 4];
    assert!(reader.read_at(0, &mut buf).await.is_err());

    let err = extract_from_reader(reader, &ExtractorConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err, ExtractionError::InvalidPackageFile);
}
